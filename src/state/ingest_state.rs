/// Ingestion state definitions for one store
use std::fmt;

/// Represents where a store is in its ingestion cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IngestState {
    /// Waiting for the timer or a manual trigger
    Idle,

    /// A crawl cycle is in progress
    Running,

    /// The last cycle committed records and pruned stale ones
    Succeeded,

    /// The last cycle timed out or produced no records
    Failed,
}

impl IngestState {
    /// Returns true if `next` is a legal successor of this state
    ///
    /// `Running -> Idle` covers a cycle that was cancelled by a newer
    /// trigger before it could finish.
    pub fn can_transition_to(&self, next: IngestState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Running)
                | (Self::Running, Self::Succeeded)
                | (Self::Running, Self::Failed)
                | (Self::Running, Self::Idle)
                | (Self::Succeeded, Self::Idle)
                | (Self::Failed, Self::Idle)
        )
    }

    /// Returns the lowercase name used in logs and health output
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for IngestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
