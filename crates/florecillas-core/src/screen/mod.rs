//! The reader screen: one open book, its restoration, its viewport and its
//! narration.
//!
//! [`ReaderScreen`] is a pure reducer. Every [`Message`] becomes a list of
//! [`Effect`]s that [`ScreenRuntime`] carries out against the surface, the
//! narration engine and the shared [`ReaderSession`].

mod reducer;
mod runtime;

pub use runtime::{ScreenHandle, ScreenRuntime};

use crate::config::AppConfig;
use crate::content::ChapterRef;
use crate::preferences::{PreferenceChange, ReaderPreferences};
use crate::progress::ReadingProgress;
use crate::restore::{RestoreState, RetryPolicy, ScrollRestorer};
use crate::session::ReaderSession;
use crate::speech::{NarrationOutcome, PlaybackStatus, SpeechCoordinator, Utterance};
use crate::surface::{JumpError, VisibleRow};
use crate::viewport::ViewportTracker;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JumpKind {
    Restore,
    Manual,
}

#[derive(Debug, Clone)]
pub enum Message {
    VisibilityChanged(Vec<VisibleRow>),
    JumpFinished {
        kind: JumpKind,
        index: usize,
        result: Result<(), JumpError>,
    },
    RestoreRetryDue {
        attempt: u32,
    },
    /// Table-of-contents selection.
    NavigateToChapter(usize),
    ToggleBookmark(usize),
    StartNarration,
    StopNarration,
    Narration {
        session_id: u64,
        chunk_index: usize,
        outcome: NarrationOutcome,
    },
    ChangePreferences(PreferenceChange),
    Unmount,
}

/// Work the reducer cannot do itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Jump {
        kind: JumpKind,
        index: usize,
        animated: bool,
    },
    ScheduleRestoreRetry {
        attempt: u32,
        delay: Duration,
    },
    CancelRestoreRetry,
    SaveProgress {
        book_id: String,
        chapter_index: usize,
    },
    ToggleBookmark {
        book_id: String,
        chapter_index: usize,
    },
    Speak(Utterance),
    StopNarration,
    ChangePreferences(PreferenceChange),
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenConfig {
    pub min_dwell: Duration,
    pub retry: RetryPolicy,
    pub speech_chunk_max_chars: usize,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ScreenConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            min_dwell: config.min_dwell(),
            retry: RetryPolicy {
                delay: config.restore_retry_delay(),
                max_attempts: config.restore_max_attempts.max(2),
            },
            speech_chunk_max_chars: config.speech_chunk_max_chars.max(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChapterView {
    pub index: usize,
    pub title: Option<String>,
    pub bookmarked: bool,
    pub narrated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NarrationView {
    pub session_id: u64,
    pub chapter_index: usize,
    pub chunk_index: usize,
    pub chunk_count: usize,
}

/// What a front-end needs to draw the screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScreenSnapshot {
    pub book_id: String,
    pub current_index: usize,
    pub restore_state: Option<RestoreState>,
    pub narration_status: PlaybackStatus,
    pub narrated_index: Option<usize>,
    pub narration: Option<NarrationView>,
    pub chapters: Vec<ChapterView>,
    pub preferences: ReaderPreferences,
    pub closed: bool,
}

pub struct ReaderScreen {
    book_id: String,
    chapters: Vec<ChapterRef>,
    viewport: ViewportTracker,
    restorer: ScrollRestorer,
    speech: SpeechCoordinator,
    closed: bool,
}

impl ReaderScreen {
    /// Open `book_id` and start restoring `progress` if it belongs to it.
    pub fn mount(
        book_id: &str,
        chapters: Vec<ChapterRef>,
        progress: Option<&ReadingProgress>,
        config: &ScreenConfig,
    ) -> (Self, Vec<Effect>) {
        let mut screen = Self {
            book_id: book_id.to_string(),
            chapters,
            viewport: ViewportTracker::new(config.min_dwell),
            restorer: ScrollRestorer::new(config.retry),
            speech: SpeechCoordinator::new(config.speech_chunk_max_chars),
            closed: false,
        };
        let mut effects = Vec::new();
        let actions = screen.restorer.begin(book_id, progress);
        screen.apply_restore_actions(actions, &mut effects);
        (screen, effects)
    }

    pub fn book_id(&self) -> &str {
        &self.book_id
    }

    pub fn chapters(&self) -> &[ChapterRef] {
        &self.chapters
    }

    pub fn current_index(&self) -> usize {
        self.viewport.current_index()
    }

    pub fn restore_state(&self) -> Option<RestoreState> {
        self.restorer.state()
    }

    pub fn narration_status(&self) -> PlaybackStatus {
        self.speech.status()
    }

    pub fn narrated_index(&self) -> Option<usize> {
        self.speech.narrated_index()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn snapshot(&self, session: &ReaderSession) -> ScreenSnapshot {
        let narrated_index = self.speech.narrated_index();
        let chapters = self
            .chapters
            .iter()
            .map(|chapter| ChapterView {
                index: chapter.index,
                title: chapter.title.clone(),
                bookmarked: session.is_bookmarked(&self.book_id, chapter.index),
                narrated: narrated_index == Some(chapter.index),
            })
            .collect();
        let narration = self.speech.session().map(|playback| NarrationView {
            session_id: playback.id,
            chapter_index: playback.chapter_index,
            chunk_index: playback.current_chunk_index,
            chunk_count: playback.chunks.len(),
        });

        ScreenSnapshot {
            book_id: self.book_id.clone(),
            current_index: self.viewport.current_index(),
            restore_state: self.restorer.state(),
            narration_status: self.speech.status(),
            narrated_index,
            narration,
            chapters,
            preferences: *session.preferences(),
            closed: self.closed,
        }
    }
}
