use super::{Effect, JumpKind, Message, ReaderScreen};
use crate::preferences::PreferenceChange;
use crate::restore::RestoreAction;
use crate::speech::{NarrationOutcome, SpeechAction, StopReason};
use crate::surface::{JumpError, VisibleRow};
use tracing::{debug, info, warn};

impl ReaderScreen {
    pub fn update(&mut self, message: Message) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.closed {
            debug!(?message, "Screen closed; dropping message");
            return effects;
        }

        match message {
            Message::VisibilityChanged(rows) => self.handle_visibility_changed(&rows, &mut effects),
            Message::JumpFinished {
                kind,
                index,
                result,
            } => self.handle_jump_finished(kind, index, result, &mut effects),
            Message::RestoreRetryDue { attempt } => {
                let actions = self.restorer.on_retry_due(attempt);
                self.apply_restore_actions(actions, &mut effects);
            }
            Message::NavigateToChapter(index) => self.handle_navigate(index, &mut effects),
            Message::ToggleBookmark(index) => self.handle_toggle_bookmark(index, &mut effects),
            Message::StartNarration => self.handle_start_narration(&mut effects),
            Message::StopNarration => {
                let actions = self.speech.stop(StopReason::User);
                apply_speech_actions(actions, &mut effects);
            }
            Message::Narration {
                session_id,
                chunk_index,
                outcome,
            } => self.handle_narration(session_id, chunk_index, outcome, &mut effects),
            Message::ChangePreferences(change) => {
                self.handle_change_preferences(change, &mut effects)
            }
            Message::Unmount => self.handle_unmount(&mut effects),
        }

        effects
    }

    fn handle_visibility_changed(&mut self, rows: &[VisibleRow], effects: &mut Vec<Effect>) {
        if self.restorer.is_in_flight() {
            debug!(
                rows = rows.len(),
                "Ignoring visibility while scroll restoration is in flight"
            );
            return;
        }
        if let Some(chapter_index) = self.viewport.observe(rows) {
            debug!(chapter_index, "Accepted visible chapter");
            effects.push(Effect::SaveProgress {
                book_id: self.book_id.clone(),
                chapter_index,
            });
        }
    }

    fn handle_jump_finished(
        &mut self,
        kind: JumpKind,
        index: usize,
        result: Result<(), JumpError>,
        effects: &mut Vec<Effect>,
    ) {
        match kind {
            JumpKind::Restore => {
                let actions = self.restorer.on_jump_result(result);
                self.apply_restore_actions(actions, effects);
            }
            JumpKind::Manual => match result {
                Ok(()) => debug!(index, "Jumped to chapter"),
                Err(err) => warn!(index, "Chapter jump failed: {err}"),
            },
        }
    }

    fn handle_navigate(&mut self, index: usize, effects: &mut Vec<Effect>) {
        if index >= self.chapters.len() {
            warn!(
                index,
                chapters = self.chapters.len(),
                "Ignoring navigation to a missing chapter"
            );
            return;
        }

        let actions = self.restorer.abandon("manual navigation");
        self.apply_restore_actions(actions, effects);

        if self
            .speech
            .narrated_index()
            .is_some_and(|narrated| narrated != index)
        {
            let actions = self.speech.stop(StopReason::ChapterChanged);
            apply_speech_actions(actions, effects);
        }

        info!(index, "Navigating to chapter");
        effects.push(Effect::Jump {
            kind: JumpKind::Manual,
            index,
            animated: true,
        });
    }

    fn handle_toggle_bookmark(&mut self, index: usize, effects: &mut Vec<Effect>) {
        if index >= self.chapters.len() {
            warn!(index, "Ignoring bookmark for a missing chapter");
            return;
        }
        effects.push(Effect::ToggleBookmark {
            book_id: self.book_id.clone(),
            chapter_index: index,
        });
    }

    fn handle_start_narration(&mut self, effects: &mut Vec<Effect>) {
        let index = self.viewport.current_index();
        let Some(chapter) = self.chapters.get(index) else {
            warn!(index, "Current chapter is not loaded; cannot narrate");
            return;
        };
        let actions = self.speech.start(&self.book_id, chapter);
        apply_speech_actions(actions, effects);
    }

    fn handle_narration(
        &mut self,
        session_id: u64,
        chunk_index: usize,
        outcome: NarrationOutcome,
        effects: &mut Vec<Effect>,
    ) {
        let actions = self.speech.on_outcome(session_id, chunk_index, outcome);
        apply_speech_actions(actions, effects);
    }

    fn handle_change_preferences(&mut self, change: PreferenceChange, effects: &mut Vec<Effect>) {
        effects.push(Effect::ChangePreferences(change));
    }

    fn handle_unmount(&mut self, effects: &mut Vec<Effect>) {
        self.speech.stop(StopReason::ScreenClosed);
        self.restorer.abandon("screen closed");
        self.closed = true;
        info!(book_id = %self.book_id, "Closing reader screen");
        // The engine and the timer are released even when nothing is running.
        effects.push(Effect::StopNarration);
        effects.push(Effect::CancelRestoreRetry);
        effects.push(Effect::Close);
    }

    pub(super) fn apply_restore_actions(
        &mut self,
        actions: Vec<RestoreAction>,
        effects: &mut Vec<Effect>,
    ) {
        for action in actions {
            match action {
                RestoreAction::Jump { index } => effects.push(Effect::Jump {
                    kind: JumpKind::Restore,
                    index,
                    animated: false,
                }),
                RestoreAction::ScheduleRetry { attempt, delay } => {
                    effects.push(Effect::ScheduleRestoreRetry { attempt, delay })
                }
                RestoreAction::CancelRetry => effects.push(Effect::CancelRestoreRetry),
                RestoreAction::Restored {
                    index,
                    requested_index,
                } => {
                    self.viewport.seed(index);
                    // Stored progress still names the chapter we could not reach.
                    if index != requested_index {
                        info!(index, requested_index, "Restored short of saved chapter");
                        effects.push(Effect::SaveProgress {
                            book_id: self.book_id.clone(),
                            chapter_index: index,
                        });
                    }
                }
            }
        }
    }
}

fn apply_speech_actions(actions: Vec<SpeechAction>, effects: &mut Vec<Effect>) {
    effects.extend(actions.into_iter().map(|action| match action {
        SpeechAction::StopAll => Effect::StopNarration,
        SpeechAction::Speak(utterance) => Effect::Speak(utterance),
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ChapterRef;
    use crate::progress::ReadingProgress;
    use crate::restore::{RestoreState, RetryPolicy};
    use crate::screen::ScreenConfig;
    use crate::speech::{PlaybackStatus, Utterance};
    use std::time::Duration;

    fn chapters(count: usize) -> Vec<ChapterRef> {
        (0..count)
            .map(|index| ChapterRef {
                index,
                title: Some(format!("Capítulo {}", index + 1)),
                content: format!("Texto del capítulo {index}"),
            })
            .collect()
    }

    fn config() -> ScreenConfig {
        ScreenConfig {
            min_dwell: Duration::from_millis(500),
            retry: RetryPolicy {
                delay: Duration::from_millis(100),
                max_attempts: 3,
            },
            speech_chunk_max_chars: 3000,
        }
    }

    fn saved(chapter_index: usize) -> ReadingProgress {
        ReadingProgress {
            book_id: "libro1".to_string(),
            chapter_index,
        }
    }

    fn unmeasured(best_effort_index: usize) -> JumpError {
        JumpError {
            best_effort_index,
            highest_measured_index: None,
        }
    }

    fn fresh_screen() -> ReaderScreen {
        let (screen, effects) = ReaderScreen::mount("libro1", chapters(8), None, &config());
        assert!(effects.is_empty());
        screen
    }

    #[test]
    fn mount_with_progress_jumps_without_animation() {
        let progress = saved(5);
        let (screen, effects) =
            ReaderScreen::mount("libro1", chapters(8), Some(&progress), &config());
        assert_eq!(
            effects,
            vec![Effect::Jump {
                kind: JumpKind::Restore,
                index: 5,
                animated: false
            }]
        );
        assert_eq!(screen.restore_state(), Some(RestoreState::Attempting));
    }

    #[test]
    fn restore_success_seeds_current_index() {
        let progress = saved(5);
        let (mut screen, _) =
            ReaderScreen::mount("libro1", chapters(8), Some(&progress), &config());
        let effects = screen.update(Message::JumpFinished {
            kind: JumpKind::Restore,
            index: 5,
            result: Ok(()),
        });
        assert!(effects.is_empty());
        assert_eq!(screen.current_index(), 5);
        assert_eq!(screen.restore_state(), Some(RestoreState::Succeeded));
    }

    #[test]
    fn best_effort_restore_saves_landed_chapter() {
        let progress = saved(9);
        let (mut screen, _) =
            ReaderScreen::mount("libro1", chapters(12), Some(&progress), &config());
        screen.update(Message::JumpFinished {
            kind: JumpKind::Restore,
            index: 9,
            result: Err(unmeasured(6)),
        });
        assert_eq!(
            screen.update(Message::RestoreRetryDue { attempt: 2 }),
            vec![Effect::Jump {
                kind: JumpKind::Restore,
                index: 6,
                animated: false
            }]
        );

        let effects = screen.update(Message::JumpFinished {
            kind: JumpKind::Restore,
            index: 6,
            result: Ok(()),
        });
        assert_eq!(
            effects,
            vec![Effect::SaveProgress {
                book_id: "libro1".to_string(),
                chapter_index: 6
            }]
        );
        assert_eq!(screen.current_index(), 6);
        assert!(
            screen
                .update(Message::VisibilityChanged(vec![VisibleRow::new(6, 5000)]))
                .is_empty()
        );
        assert_eq!(
            screen.update(Message::VisibilityChanged(vec![VisibleRow::new(5, 800)])),
            vec![Effect::SaveProgress {
                book_id: "libro1".to_string(),
                chapter_index: 5
            }]
        );
    }

    #[test]
    fn visibility_is_ignored_while_restoring() {
        let progress = saved(5);
        let (mut screen, _) =
            ReaderScreen::mount("libro1", chapters(8), Some(&progress), &config());
        let effects = screen.update(Message::VisibilityChanged(vec![VisibleRow::new(0, 900)]));
        assert!(effects.is_empty());
    }

    #[test]
    fn dwelled_row_saves_progress_once() {
        let mut screen = fresh_screen();
        let batch = vec![VisibleRow::new(3, 600)];
        assert_eq!(
            screen.update(Message::VisibilityChanged(batch.clone())),
            vec![Effect::SaveProgress {
                book_id: "libro1".to_string(),
                chapter_index: 3
            }]
        );
        assert!(screen.update(Message::VisibilityChanged(batch)).is_empty());
        assert!(
            screen
                .update(Message::VisibilityChanged(vec![VisibleRow::new(4, 100)]))
                .is_empty()
        );
    }

    #[test]
    fn manual_navigation_supersedes_pending_restore() {
        let progress = saved(5);
        let (mut screen, _) =
            ReaderScreen::mount("libro1", chapters(8), Some(&progress), &config());
        screen.update(Message::JumpFinished {
            kind: JumpKind::Restore,
            index: 5,
            result: Err(unmeasured(5)),
        });

        let effects = screen.update(Message::NavigateToChapter(2));
        assert_eq!(
            effects,
            vec![
                Effect::CancelRestoreRetry,
                Effect::Jump {
                    kind: JumpKind::Manual,
                    index: 2,
                    animated: true
                }
            ]
        );
        assert_eq!(screen.restore_state(), Some(RestoreState::Abandoned));
        assert!(screen.update(Message::RestoreRetryDue { attempt: 2 }).is_empty());
    }

    #[test]
    fn manual_jump_failure_is_not_retried() {
        let mut screen = fresh_screen();
        screen.update(Message::NavigateToChapter(6));
        let effects = screen.update(Message::JumpFinished {
            kind: JumpKind::Manual,
            index: 6,
            result: Err(unmeasured(3)),
        });
        assert!(effects.is_empty());
    }

    #[test]
    fn navigating_away_stops_narration() {
        let mut screen = fresh_screen();
        let effects = screen.update(Message::StartNarration);
        assert_eq!(
            effects,
            vec![Effect::Speak(Utterance {
                session_id: 1,
                chunk_index: 0,
                text: "Texto del capítulo 0".to_string()
            })]
        );

        let effects = screen.update(Message::NavigateToChapter(0));
        assert!(!effects.contains(&Effect::StopNarration));
        assert_eq!(screen.narrated_index(), Some(0));

        let effects = screen.update(Message::NavigateToChapter(1));
        assert_eq!(effects[0], Effect::StopNarration);
        assert_eq!(screen.narration_status(), PlaybackStatus::Idle);
    }

    #[test]
    fn narration_reads_the_current_chapter() {
        let mut screen = fresh_screen();
        screen.update(Message::VisibilityChanged(vec![VisibleRow::new(4, 700)]));
        screen.update(Message::StartNarration);
        assert_eq!(screen.narrated_index(), Some(4));
    }

    #[test]
    fn bookmark_requires_existing_chapter() {
        let mut screen = fresh_screen();
        assert!(screen.update(Message::ToggleBookmark(8)).is_empty());
        assert_eq!(
            screen.update(Message::ToggleBookmark(7)),
            vec![Effect::ToggleBookmark {
                book_id: "libro1".to_string(),
                chapter_index: 7
            }]
        );
    }

    #[test]
    fn unmount_releases_engine_and_timer() {
        let mut screen = fresh_screen();
        screen.update(Message::StartNarration);
        assert_eq!(
            screen.update(Message::Unmount),
            vec![
                Effect::StopNarration,
                Effect::CancelRestoreRetry,
                Effect::Close
            ]
        );
        assert!(screen.is_closed());
        assert_eq!(screen.narrated_index(), None);
        assert!(screen.update(Message::StartNarration).is_empty());
    }
}
