//! Scroll restoration: drive the surface back to the saved chapter once per
//! screen lifetime.
//!
//! The restorer is a plain state machine. It never touches the surface or a
//! timer itself; it returns [`RestoreAction`]s for the screen runtime to carry
//! out and is fed the results back.

use crate::progress::ReadingProgress;
use crate::surface::JumpError;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RestoreState {
    /// Waiting for the retry timer.
    Pending,
    /// A jump is in flight.
    Attempting,
    Succeeded,
    Abandoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub delay: Duration,
    /// Total jumps allowed, first one included.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(100),
            max_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollRestorationRequest {
    /// Chapter the saved progress pointed at.
    pub requested_index: usize,
    pub target_index: usize,
    pub attempt_count: u32,
    pub state: RestoreState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreAction {
    Jump { index: usize },
    ScheduleRetry { attempt: u32, delay: Duration },
    CancelRetry,
    /// The view now sits on `index`, which differs from `requested_index`
    /// when a retry settled for the surface's best effort.
    Restored { index: usize, requested_index: usize },
}

#[derive(Debug, Clone)]
pub struct ScrollRestorer {
    policy: RetryPolicy,
    request: Option<ScrollRestorationRequest>,
}

impl ScrollRestorer {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            request: None,
        }
    }

    pub fn request(&self) -> Option<&ScrollRestorationRequest> {
        self.request.as_ref()
    }

    pub fn state(&self) -> Option<RestoreState> {
        self.request.as_ref().map(|request| request.state)
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(
            self.state(),
            Some(RestoreState::Pending | RestoreState::Attempting)
        )
    }

    /// Start restoring `book_id`. Only the first call per restorer does
    /// anything; progress saved for another book counts as no progress.
    pub fn begin(
        &mut self,
        book_id: &str,
        progress: Option<&ReadingProgress>,
    ) -> Vec<RestoreAction> {
        if self.request.is_some() {
            debug!(book_id, "Restoration already ran for this screen");
            return Vec::new();
        }

        let Some(progress) = progress.filter(|progress| progress.book_id == book_id) else {
            debug!(book_id, "No saved progress for book; starting at the top");
            self.request = Some(ScrollRestorationRequest {
                requested_index: 0,
                target_index: 0,
                attempt_count: 0,
                state: RestoreState::Succeeded,
            });
            return Vec::new();
        };

        let target_index = progress.chapter_index;
        info!(book_id, target_index, "Restoring saved reading position");
        self.request = Some(ScrollRestorationRequest {
            requested_index: target_index,
            target_index,
            attempt_count: 1,
            state: RestoreState::Attempting,
        });
        vec![RestoreAction::Jump {
            index: target_index,
        }]
    }

    pub fn on_jump_result(&mut self, result: Result<(), JumpError>) -> Vec<RestoreAction> {
        let policy = self.policy;
        let Some(request) = self
            .request
            .as_mut()
            .filter(|request| request.state == RestoreState::Attempting)
        else {
            debug!("Ignoring jump result with no restoration attempt in flight");
            return Vec::new();
        };

        match result {
            Ok(()) => {
                request.state = RestoreState::Succeeded;
                info!(
                    index = request.target_index,
                    attempts = request.attempt_count,
                    "Scroll position restored"
                );
                vec![RestoreAction::Restored {
                    index: request.target_index,
                    requested_index: request.requested_index,
                }]
            }
            Err(err) if request.attempt_count < policy.max_attempts => {
                request.state = RestoreState::Pending;
                request.target_index = err.best_effort_index;
                debug!(
                    attempt = request.attempt_count,
                    next_target = request.target_index,
                    "Restore jump failed; retrying: {err}"
                );
                vec![RestoreAction::ScheduleRetry {
                    attempt: request.attempt_count + 1,
                    delay: policy.delay,
                }]
            }
            Err(err) => {
                request.state = RestoreState::Abandoned;
                warn!(
                    attempts = request.attempt_count,
                    "Giving up on restoring scroll position: {err}"
                );
                Vec::new()
            }
        }
    }

    /// Retry timer fired. Timers from an earlier attempt are ignored.
    pub fn on_retry_due(&mut self, attempt: u32) -> Vec<RestoreAction> {
        let Some(request) = self.request.as_mut() else {
            return Vec::new();
        };
        if request.state != RestoreState::Pending || attempt != request.attempt_count + 1 {
            debug!(attempt, state = ?request.state, "Ignoring stale restore retry");
            return Vec::new();
        }
        request.attempt_count = attempt;
        request.state = RestoreState::Attempting;
        vec![RestoreAction::Jump {
            index: request.target_index,
        }]
    }

    /// Drop an in-flight restoration, e.g. because the reader navigated
    /// manually or the screen is closing.
    pub fn abandon(&mut self, reason: &str) -> Vec<RestoreAction> {
        let Some(request) = self.request.as_mut() else {
            return Vec::new();
        };
        let had_timer = match request.state {
            RestoreState::Pending => true,
            RestoreState::Attempting => false,
            RestoreState::Succeeded | RestoreState::Abandoned => return Vec::new(),
        };
        request.state = RestoreState::Abandoned;
        info!(reason, target = request.target_index, "Abandoned scroll restoration");
        if had_timer {
            vec![RestoreAction::CancelRetry]
        } else {
            Vec::new()
        }
    }
}
