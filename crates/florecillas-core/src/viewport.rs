//! Turns visibility batches into the "current chapter".

use crate::surface::VisibleRow;
use std::time::Duration;
use tracing::trace;

#[derive(Debug, Clone)]
pub struct ViewportTracker {
    min_dwell: Duration,
    current: Option<usize>,
}

impl ViewportTracker {
    pub fn new(min_dwell: Duration) -> Self {
        Self {
            min_dwell,
            current: None,
        }
    }

    /// Accept the topmost row of `batch` once it has dwelled long enough.
    ///
    /// Returns the newly accepted index, or `None` when the batch is empty,
    /// the top row is too fresh, or it is already current. Backward moves are
    /// accepted like forward ones.
    pub fn observe(&mut self, batch: &[VisibleRow]) -> Option<usize> {
        let top = batch.first()?;
        if u128::from(top.continuous_visible_ms) < self.min_dwell.as_millis() {
            trace!(
                index = top.index,
                visible_ms = top.continuous_visible_ms,
                "Top row below dwell threshold"
            );
            return None;
        }
        if self.current == Some(top.index) {
            return None;
        }
        self.current = Some(top.index);
        Some(top.index)
    }

    /// Index narration should start from; defaults to the first chapter.
    pub fn current_index(&self) -> usize {
        self.current.unwrap_or(0)
    }

    pub fn accepted_index(&self) -> Option<usize> {
        self.current
    }

    /// Adopt an index reached without a visibility sample, e.g. a restored
    /// position.
    pub fn seed(&mut self, index: usize) {
        self.current = Some(index);
    }
}
