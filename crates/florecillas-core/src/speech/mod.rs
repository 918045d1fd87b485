//! Chapter narration.
//!
//! [`SpeechCoordinator`] owns at most one [`PlaybackSession`]; the screen
//! runtime hands its [`Utterance`]s to a [`Narrator`] and feeds every
//! [`NarrationOutcome`] back through a per-chunk channel.

mod chunking;
mod coordinator;

pub use chunking::split_for_speech;
pub use coordinator::{
    PlaybackSession, PlaybackStatus, SpeechAction, SpeechCoordinator, StopReason,
};

use tokio::sync::oneshot;

/// One chunk handed to the narration engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utterance {
    pub session_id: u64,
    pub chunk_index: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NarrationOutcome {
    Done,
    Stopped,
    Failed(String),
}

/// Process-wide narration engine.
pub trait Narrator: Send {
    /// Queue `utterance`. Exactly one outcome should be sent on `reply`;
    /// dropping it unanswered counts as [`NarrationOutcome::Stopped`].
    fn speak(&mut self, utterance: Utterance, reply: oneshot::Sender<NarrationOutcome>);

    /// Cancel the current and every queued utterance before returning.
    fn stop_all(&mut self);
}
