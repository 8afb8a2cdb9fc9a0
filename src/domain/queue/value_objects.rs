use serde::{Deserialize, Serialize};

/// Lifecycle status of a queue item
///
/// # Status Transitions
/// ```text
/// Pending -> Running -> Done
///    |          └-----> Failed
///    └-----> Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    /// Waiting for the assigned agent
    Pending,
    /// Being executed by the assigned agent
    Running,
    /// Completed successfully
    Done,
    /// Cancelled before it started
    Cancelled,
    /// Execution failed
    Failed,
}

impl QueueStatus {
    /// Checks if a transition from current status to next status is valid
    ///
    /// # Example
    /// ```
    /// use squad_api::domain::queue::QueueStatus;
    ///
    /// assert!(QueueStatus::Pending.can_transition_to(QueueStatus::Running));
    /// assert!(!QueueStatus::Cancelled.can_transition_to(QueueStatus::Running));
    /// ```
    pub fn can_transition_to(&self, next: QueueStatus) -> bool {
        use QueueStatus::*;
        matches!(
            (self, next),
            (Pending, Running) | (Pending, Cancelled) | (Running, Done) | (Running, Failed)
        )
    }

    /// Whether no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QueueStatus::Done | QueueStatus::Cancelled | QueueStatus::Failed
        )
    }
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueStatus::Pending => write!(f, "pending"),
            QueueStatus::Running => write!(f, "running"),
            QueueStatus::Done => write!(f, "done"),
            QueueStatus::Cancelled => write!(f, "cancelled"),
            QueueStatus::Failed => write!(f, "failed"),
        }
    }
}
