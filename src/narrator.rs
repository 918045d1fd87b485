//! Console stand-in for a speech engine: prints each chunk and takes as long
//! as reading it aloud would.

use florecillas_core::cancellation::CancellationToken;
use florecillas_core::speech::{NarrationOutcome, Narrator, Utterance};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

const PREVIEW_CHARS: usize = 72;

pub struct ConsoleNarrator {
    words_per_minute: u32,
    active: Vec<(CancellationToken, JoinHandle<()>)>,
}

impl ConsoleNarrator {
    pub fn new(words_per_minute: u32) -> Self {
        Self {
            words_per_minute: words_per_minute.max(1),
            active: Vec::new(),
        }
    }

    fn speaking_time(&self, text: &str) -> Duration {
        let words = text.split_whitespace().count().max(1) as u64;
        Duration::from_millis(words * 60_000 / u64::from(self.words_per_minute))
    }
}

impl Narrator for ConsoleNarrator {
    fn speak(&mut self, utterance: Utterance, reply: oneshot::Sender<NarrationOutcome>) {
        self.active.retain(|(_, task)| !task.is_finished());

        let duration = self.speaking_time(&utterance.text);
        println!("   ♪ {}", preview(&utterance.text));
        debug!(
            session_id = utterance.session_id,
            chunk_index = utterance.chunk_index,
            duration_ms = duration.as_millis() as u64,
            "Speaking chunk"
        );

        let token = CancellationToken::new();
        let waiter = token.clone();
        let task = tokio::spawn(async move {
            let outcome = if waiter.sleep(duration).await {
                NarrationOutcome::Done
            } else {
                NarrationOutcome::Stopped
            };
            let _ = reply.send(outcome);
        });
        self.active.push((token, task));
    }

    fn stop_all(&mut self) {
        for (token, _) in self.active.drain(..) {
            token.cancel();
        }
    }
}

fn preview(text: &str) -> String {
    let mut preview: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().nth(PREVIEW_CHARS).is_some() {
        preview.push('…');
    }
    preview
}
