/// Task status definitions for tracking crawl progress
///
/// A task moves strictly forward through these states. The transition table
/// lives here so that the storage boundary and the engine agree on it.
use std::fmt;

/// Represents the current state of a task in the crawl queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    // ===== Active States =====
    /// Task is queued and waiting to be claimed
    NotStarted,

    /// Task has been claimed by a worker
    InProgress,

    // ===== Terminal States =====
    /// Task finished, possibly having enqueued child tasks
    Completed,

    /// Task aborted on an error; never retried
    Failed,
}

impl TaskStatus {
    /// Returns true if this is a terminal state (no further processing needed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if the task is still queued or being worked on
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Returns true if moving from `self` to `next` is a forward transition
    ///
    /// | From        | Allowed to              |
    /// |-------------|-------------------------|
    /// | NotStarted  | InProgress              |
    /// | InProgress  | Completed, Failed       |
    /// | Completed   | (none)                  |
    /// | Failed      | (none)                  |
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (Self::NotStarted, Self::InProgress)
                | (Self::InProgress, Self::Completed)
                | (Self::InProgress, Self::Failed)
        )
    }

    /// Returns every state from which `self` may legally be entered
    pub fn predecessors(&self) -> Vec<TaskStatus> {
        Self::all_states()
            .into_iter()
            .filter(|from| from.can_transition_to(*self))
            .collect()
    }

    /// Converts the task status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::NotStarted => "NOT_STARTED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    /// Parses a task status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "NOT_STARTED" => Some(Self::NotStarted),
            "IN_PROGRESS" => Some(Self::InProgress),
            "COMPLETED" => Some(Self::Completed),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns all possible task states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::NotStarted,
            Self::InProgress,
            Self::Completed,
            Self::Failed,
        ]
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
