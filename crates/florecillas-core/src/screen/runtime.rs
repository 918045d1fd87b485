use super::{Effect, Message, ReaderScreen, ScreenConfig, ScreenSnapshot};
use crate::cancellation::CancellationToken;
use crate::content::{ContentError, ContentStore};
use crate::session::ReaderSession;
use crate::speech::{NarrationOutcome, Narrator, Utterance};
use crate::surface::RenderSurface;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info};

/// Sends messages to a running [`ScreenRuntime`].
#[derive(Debug, Clone)]
pub struct ScreenHandle {
    tx: mpsc::UnboundedSender<Message>,
}

impl ScreenHandle {
    /// Returns `false` once the screen has shut down.
    pub fn send(&self, message: Message) -> bool {
        self.tx.send(message).is_ok()
    }
}

/// Event loop for one open book.
///
/// Persistence is awaited inline so writes land in message order. Jumps,
/// retry timers and narration replies run as tasks that report back on a
/// channel private to the runtime, so only [`ScreenHandle`]s keep the screen
/// mounted.
pub struct ScreenRuntime<'a> {
    session: &'a mut ReaderSession,
    screen: ReaderScreen,
    surface: Arc<dyn RenderSurface>,
    narrator: &'a mut dyn Narrator,
    handles: mpsc::UnboundedReceiver<Message>,
    task_tx: mpsc::UnboundedSender<Message>,
    task_rx: mpsc::UnboundedReceiver<Message>,
    retry_token: Option<CancellationToken>,
    snapshots: watch::Sender<ScreenSnapshot>,
    initial_effects: Vec<Effect>,
}

impl<'a> ScreenRuntime<'a> {
    /// Mount `book_id`. Fails only when the book has no chapters.
    pub fn open(
        session: &'a mut ReaderSession,
        content: &dyn ContentStore,
        book_id: &str,
        surface: Arc<dyn RenderSurface>,
        narrator: &'a mut dyn Narrator,
        config: ScreenConfig,
    ) -> Result<(Self, ScreenHandle, watch::Receiver<ScreenSnapshot>), ContentError> {
        let chapters = content.chapters(book_id)?.to_vec();
        info!(book_id, chapters = chapters.len(), "Opening reader screen");

        let (screen, initial_effects) =
            ReaderScreen::mount(book_id, chapters, session.progress(), &config);
        let (snapshots, snapshot_rx) = watch::channel(screen.snapshot(session));
        let (tx, handles) = mpsc::unbounded_channel();
        let (task_tx, task_rx) = mpsc::unbounded_channel();
        let handle = ScreenHandle { tx };

        let runtime = Self {
            session,
            screen,
            surface,
            narrator,
            handles,
            task_tx,
            task_rx,
            retry_token: None,
            snapshots,
            initial_effects,
        };
        Ok((runtime, handle, snapshot_rx))
    }

    /// Run until the screen closes or every handle is dropped.
    pub async fn run(mut self) {
        let initial = std::mem::take(&mut self.initial_effects);
        self.run_effects(initial).await;
        self.publish();

        while !self.screen.is_closed() {
            let message = self.next_message().await;
            let effects = self.screen.update(message);
            self.run_effects(effects).await;
            self.publish();
        }
    }

    async fn next_message(&mut self) -> Message {
        tokio::select! {
            biased;
            Some(message) = self.task_rx.recv() => message,
            message = self.handles.recv() => message.unwrap_or_else(|| {
                debug!("All screen handles dropped; unmounting");
                Message::Unmount
            }),
        }
    }

    fn publish(&self) {
        self.snapshots
            .send_replace(self.screen.snapshot(&*self.session));
    }

    async fn run_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            self.run_effect(effect).await;
        }
    }

    async fn run_effect(&mut self, effect: Effect) {
        match effect {
            Effect::Jump {
                kind,
                index,
                animated,
            } => {
                let tx = self.task_tx.clone();
                let surface = Arc::clone(&self.surface);
                tokio::spawn(async move {
                    let result = surface.jump_to(index, animated).await;
                    let _ = tx.send(Message::JumpFinished {
                        kind,
                        index,
                        result,
                    });
                });
            }
            Effect::ScheduleRestoreRetry { attempt, delay } => {
                self.schedule_retry(attempt, delay);
            }
            Effect::CancelRestoreRetry => {
                if let Some(token) = self.retry_token.take() {
                    token.cancel();
                }
            }
            Effect::SaveProgress {
                book_id,
                chapter_index,
            } => {
                self.session.save_progress(&book_id, chapter_index).await;
            }
            Effect::ToggleBookmark {
                book_id,
                chapter_index,
            } => {
                self.session.toggle_bookmark(&book_id, chapter_index).await;
            }
            Effect::Speak(utterance) => self.speak(utterance),
            Effect::StopNarration => self.narrator.stop_all(),
            Effect::ChangePreferences(change) => {
                self.session.apply_preference(change).await;
            }
            Effect::Close => {
                info!(book_id = self.screen.book_id(), "Reader screen closed");
            }
        }
    }

    fn schedule_retry(&mut self, attempt: u32, delay: Duration) {
        if let Some(previous) = self.retry_token.take() {
            previous.cancel();
        }
        let tx = self.task_tx.clone();
        let token = CancellationToken::new();
        self.retry_token = Some(token.clone());
        debug!(attempt, delay_ms = delay.as_millis() as u64, "Scheduling restore retry");
        tokio::spawn(async move {
            if token.sleep(delay).await {
                let _ = tx.send(Message::RestoreRetryDue { attempt });
            }
        });
    }

    fn speak(&mut self, utterance: Utterance) {
        let tx = self.task_tx.clone();
        let session_id = utterance.session_id;
        let chunk_index = utterance.chunk_index;
        let (reply_tx, reply_rx) = oneshot::channel();
        self.narrator.speak(utterance, reply_tx);
        tokio::spawn(async move {
            let outcome = reply_rx.await.unwrap_or(NarrationOutcome::Stopped);
            let _ = tx.send(Message::Narration {
                session_id,
                chunk_index,
                outcome,
            });
        });
    }
}
