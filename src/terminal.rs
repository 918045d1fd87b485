//! A pretend virtualized list for the terminal front-end.
//!
//! Rows are measured a few at a time, the way a lazily rendered list only
//! lays out what it has scrolled near. Jumping past the measured rows fails
//! and triggers another layout pass, so the restore retry path is exercised
//! for real.

use async_trait::async_trait;
use florecillas_core::{JumpError, Message, RenderSurface, ScreenHandle, VisibleRow};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug)]
struct Layout {
    /// Highest measured row.
    measured: usize,
}

pub struct TerminalSurface {
    row_count: usize,
    rows_per_layout: usize,
    settle: Duration,
    layout: Mutex<Layout>,
    viewer: Mutex<Option<ScreenHandle>>,
}

impl TerminalSurface {
    pub fn new(row_count: usize, rows_per_layout: usize, settle: Duration) -> Self {
        let rows_per_layout = rows_per_layout.max(1);
        Self {
            row_count,
            rows_per_layout,
            settle,
            layout: Mutex::new(Layout {
                measured: rows_per_layout.min(row_count).saturating_sub(1),
            }),
            viewer: Mutex::new(None),
        }
    }

    /// Report visibility of rows that land on screen to `handle`.
    pub fn attach(&self, handle: ScreenHandle) {
        match self.viewer.lock() {
            Ok(mut viewer) => *viewer = Some(handle),
            Err(_) => warn!("Surface viewer lock poisoned; visibility will not be reported"),
        }
    }

    /// Rows visible with `top` at the top of the screen.
    pub fn rows_from(&self, top: usize, visible_ms: u64) -> Vec<VisibleRow> {
        (top..self.row_count.min(top.saturating_add(2)))
            .map(|index| VisibleRow::new(index, visible_ms))
            .collect()
    }

    fn viewer(&self) -> Option<ScreenHandle> {
        self.viewer.lock().ok().and_then(|viewer| viewer.clone())
    }

    /// Run one layout pass; returns the new highest measured row.
    fn lay_out_more(&self) -> Option<usize> {
        let mut layout = self.layout.lock().ok()?;
        let last = self.row_count.saturating_sub(1);
        layout.measured = (layout.measured + self.rows_per_layout).min(last);
        Some(layout.measured)
    }

    fn measured(&self) -> usize {
        self.layout.lock().map(|layout| layout.measured).unwrap_or(0)
    }
}

#[async_trait]
impl RenderSurface for TerminalSurface {
    async fn jump_to(&self, index: usize, animated: bool) -> Result<(), JumpError> {
        let measured = self.measured();
        if index > measured {
            let highest = self.lay_out_more();
            debug!(index, ?highest, "Jump target not measured yet");
            return Err(JumpError {
                best_effort_index: index.min(self.row_count.saturating_sub(1)),
                highest_measured_index: highest,
            });
        }

        if animated {
            println!("~> capítulo {}", index + 1);
        } else {
            println!("-> capítulo {}", index + 1);
        }

        if let Some(viewer) = self.viewer() {
            let rows = self.rows_from(index, self.settle.as_millis() as u64);
            let settle = self.settle;
            tokio::spawn(async move {
                tokio::time::sleep(settle).await;
                viewer.send(Message::VisibilityChanged(rows));
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unmeasured_rows_fail_until_laid_out() {
        let surface = TerminalSurface::new(10, 4, Duration::from_millis(500));
        assert!(surface.jump_to(3, false).await.is_ok());

        let err = surface.jump_to(6, false).await.expect_err("row 6 unmeasured");
        assert_eq!(err.best_effort_index, 6);
        assert_eq!(err.highest_measured_index, Some(7));

        assert!(surface.jump_to(6, false).await.is_ok());
    }

    #[tokio::test]
    async fn layout_stops_at_last_row() {
        let surface = TerminalSurface::new(5, 4, Duration::from_millis(500));
        let err = surface.jump_to(4, false).await.expect_err("row 4 unmeasured");
        assert_eq!(err.highest_measured_index, Some(4));
        assert!(surface.jump_to(4, true).await.is_ok());
    }

    #[test]
    fn visible_rows_are_clipped_to_the_book() {
        let surface = TerminalSurface::new(3, 4, Duration::from_millis(500));
        assert_eq!(
            surface.rows_from(2, 700),
            vec![VisibleRow::new(2, 700)]
        );
        assert_eq!(surface.rows_from(0, 700).len(), 2);
        assert!(surface.rows_from(7, 700).is_empty());
        assert!(surface.rows_from(usize::MAX - 1, 700).is_empty());
    }
}
