//! Boundary to whatever draws the chapter list.

use async_trait::async_trait;

/// Jump failure reported by a virtualized list whose target row has not been
/// measured yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpError {
    /// Index the surface suggests trying next.
    pub best_effort_index: usize,
    pub highest_measured_index: Option<usize>,
}

impl std::fmt::Display for JumpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.highest_measured_index {
            Some(highest) => write!(
                f,
                "row not measured yet (best effort {}, highest measured {highest})",
                self.best_effort_index
            ),
            None => write!(
                f,
                "row not measured yet (best effort {})",
                self.best_effort_index
            ),
        }
    }
}

impl std::error::Error for JumpError {}

#[async_trait]
pub trait RenderSurface: Send + Sync {
    async fn jump_to(&self, index: usize, animated: bool) -> Result<(), JumpError>;
}

/// One row of a visibility batch, in top-to-bottom order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleRow {
    pub index: usize,
    pub continuous_visible_ms: u64,
}

impl VisibleRow {
    pub fn new(index: usize, continuous_visible_ms: u64) -> Self {
        Self {
            index,
            continuous_visible_ms,
        }
    }
}
