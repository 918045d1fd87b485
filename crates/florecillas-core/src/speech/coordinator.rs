use super::chunking::split_for_speech;
use super::{NarrationOutcome, Utterance};
use crate::content::ChapterRef;
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlaybackStatus {
    Idle,
    Speaking,
    Stopped,
    Errored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSession {
    pub id: u64,
    pub book_id: String,
    pub chapter_index: usize,
    pub chunks: Vec<String>,
    pub current_chunk_index: usize,
    pub status: PlaybackStatus,
}

impl PlaybackSession {
    fn utterance(&self) -> Option<Utterance> {
        self.chunks
            .get(self.current_chunk_index)
            .map(|text| Utterance {
                session_id: self.id,
                chunk_index: self.current_chunk_index,
                text: text.clone(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechAction {
    /// Flush the engine before anything else happens.
    StopAll,
    Speak(Utterance),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    User,
    ChapterChanged,
    ScreenClosed,
    Restart,
}

impl StopReason {
    pub fn as_str(self) -> &'static str {
        match self {
            StopReason::User => "user",
            StopReason::ChapterChanged => "chapter changed",
            StopReason::ScreenClosed => "screen closed",
            StopReason::Restart => "restart",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SpeechCoordinator {
    max_chunk_chars: usize,
    last_session_id: u64,
    session: Option<PlaybackSession>,
}

impl SpeechCoordinator {
    pub fn new(max_chunk_chars: usize) -> Self {
        Self {
            max_chunk_chars,
            last_session_id: 0,
            session: None,
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        self.session
            .as_ref()
            .map_or(PlaybackStatus::Idle, |session| session.status)
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    /// Chapter currently being narrated, if any.
    pub fn narrated_index(&self) -> Option<usize> {
        self.session.as_ref().map(|session| session.chapter_index)
    }

    /// Narrate `chapter`, fully stopping any running session first.
    pub fn start(&mut self, book_id: &str, chapter: &ChapterRef) -> Vec<SpeechAction> {
        let mut actions = self.stop(StopReason::Restart);

        let chunks = split_for_speech(&chapter.content, self.max_chunk_chars);
        if chunks.is_empty() {
            info!(
                book_id,
                chapter_index = chapter.index,
                "Chapter has no text to narrate"
            );
            return actions;
        }

        self.last_session_id = self.last_session_id.wrapping_add(1);
        let session = PlaybackSession {
            id: self.last_session_id,
            book_id: book_id.to_string(),
            chapter_index: chapter.index,
            chunks,
            current_chunk_index: 0,
            status: PlaybackStatus::Speaking,
        };
        info!(
            book_id,
            chapter_index = session.chapter_index,
            session_id = session.id,
            chunks = session.chunks.len(),
            "Starting narration"
        );
        actions.extend(session.utterance().map(SpeechAction::Speak));
        self.session = Some(session);
        actions
    }

    /// No-op when idle.
    pub fn stop(&mut self, reason: StopReason) -> Vec<SpeechAction> {
        let Some(mut session) = self.session.take() else {
            return Vec::new();
        };
        session.status = PlaybackStatus::Stopped;
        info!(
            reason = reason.as_str(),
            session_id = session.id,
            chapter_index = session.chapter_index,
            chunk = session.current_chunk_index,
            "Narration stopped"
        );
        vec![SpeechAction::StopAll]
    }

    pub fn on_outcome(
        &mut self,
        session_id: u64,
        chunk_index: usize,
        outcome: NarrationOutcome,
    ) -> Vec<SpeechAction> {
        let Some(session) = self.session.as_mut() else {
            debug!(session_id, chunk_index, "Ignoring narration outcome while idle");
            return Vec::new();
        };
        if session.id != session_id || session.current_chunk_index != chunk_index {
            debug!(
                session_id,
                chunk_index,
                active_session = session.id,
                "Ignoring stale narration outcome"
            );
            return Vec::new();
        }

        match outcome {
            NarrationOutcome::Done => {
                session.current_chunk_index += 1;
                if let Some(next) = session.utterance() {
                    debug!(session_id, chunk_index = next.chunk_index, "Next chunk");
                    return vec![SpeechAction::Speak(next)];
                }
                info!(
                    session_id,
                    chapter_index = session.chapter_index,
                    "Narration finished"
                );
                self.session = None;
                Vec::new()
            }
            NarrationOutcome::Stopped => {
                session.status = PlaybackStatus::Stopped;
                info!(session_id, chunk_index, "Narration engine stopped playback");
                self.session = None;
                Vec::new()
            }
            NarrationOutcome::Failed(reason) => {
                session.status = PlaybackStatus::Errored;
                warn!(session_id, chunk_index, "Narration engine failed: {reason}");
                self.session = None;
                vec![SpeechAction::StopAll]
            }
        }
    }
}
