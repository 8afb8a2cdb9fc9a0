use super::value_objects::QueueStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Maximum length of the stored result summary, in characters
pub const RESULT_MAX_CHARS: usize = 500;

/// A free-text command as submitted
#[derive(Debug, Clone, Serialize)]
pub struct Command {
    pub id: Uuid,
    pub text: String,
    /// `None` means the router picks the agent
    pub target_agent_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Command {
    pub fn new(text: impl Into<String>, target_agent_id: Option<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            text: text.into(),
            target_agent_id,
            created_at: Utc::now(),
        }
    }
}

/// One unit of routed work derived from a command
///
/// # Invariants
/// - `id` equals the command id
/// - Status changes only through `start`, `complete`, `fail` and `cancel`,
///   which enforce [`QueueStatus::can_transition_to`]
/// - `result` never exceeds [`RESULT_MAX_CHARS`] characters
#[derive(Debug, Clone, Serialize)]
pub struct QueueItem {
    id: Uuid,
    command: Command,
    task: String,
    status: QueueStatus,
    assigned_agent_id: Option<String>,
    parent_id: Option<Uuid>,
    depth: u32,
    delegated_to: Vec<String>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    result: Option<String>,
}

impl QueueItem {
    /// Creates a pending item whose task is the command text
    pub fn new(command: Command) -> Self {
        Self {
            id: command.id,
            task: command.text.clone(),
            command,
            status: QueueStatus::Pending,
            assigned_agent_id: None,
            parent_id: None,
            depth: 0,
            delegated_to: Vec::new(),
            started_at: None,
            completed_at: None,
            result: None,
        }
    }

    /// Marks this item as derived from another one
    pub fn with_origin(mut self, parent_id: Uuid, depth: u32) -> Self {
        self.parent_id = Some(parent_id);
        self.depth = depth;
        self
    }

    pub fn assign(&mut self, agent_id: impl Into<String>) {
        self.assigned_agent_id = Some(agent_id.into());
    }

    /// Replaces the executed text, e.g. with a delegation remainder
    pub fn set_task(&mut self, task: impl Into<String>) {
        self.task = task.into();
    }

    pub fn record_delegation(&mut self, agent_id: impl Into<String>) {
        self.delegated_to.push(agent_id.into());
    }

    /// Pending -> Running
    pub fn start(&mut self, agent_id: &str) -> Result<(), String> {
        self.transition(QueueStatus::Running)?;
        self.assigned_agent_id = Some(agent_id.to_string());
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// Running -> Done
    pub fn complete(&mut self, result: &str) -> Result<(), String> {
        self.transition(QueueStatus::Done)?;
        self.finish(if result.trim().is_empty() {
            "Task completed"
        } else {
            result
        });
        Ok(())
    }

    /// Running -> Failed
    pub fn fail(&mut self, error: &str) -> Result<(), String> {
        self.transition(QueueStatus::Failed)?;
        self.finish(error);
        Ok(())
    }

    /// Pending -> Cancelled
    pub fn cancel(&mut self, reason: Option<&str>) -> Result<(), String> {
        self.transition(QueueStatus::Cancelled)?;
        self.completed_at = Some(Utc::now());
        self.result = reason.map(summarize);
        Ok(())
    }

    fn transition(&mut self, next: QueueStatus) -> Result<(), String> {
        if !self.status.can_transition_to(next) {
            return Err(format!(
                "Cannot move command {} from {} to {}",
                self.id, self.status, next
            ));
        }
        self.status = next;
        Ok(())
    }

    fn finish(&mut self, result: &str) {
        self.completed_at = Some(Utc::now());
        self.result = Some(summarize(result));
    }

    // ===== Getters =====

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn task(&self) -> &str {
        &self.task
    }

    pub fn status(&self) -> QueueStatus {
        self.status
    }

    pub fn assigned_agent_id(&self) -> Option<&str> {
        self.assigned_agent_id.as_deref()
    }

    pub fn parent_id(&self) -> Option<Uuid> {
        self.parent_id
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn delegated_to(&self) -> &[String] {
        &self.delegated_to
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }
}

/// Truncates text to [`RESULT_MAX_CHARS`] characters on a char boundary
pub fn summarize(text: &str) -> String {
    text.chars().take(RESULT_MAX_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(text: &str) -> QueueItem {
        QueueItem::new(Command::new(text, None))
    }

    #[test]
    fn new_item_shares_command_id_and_is_pending() {
        let item = pending("build the maze");

        assert_eq!(item.id(), item.command().id);
        assert_eq!(item.status(), QueueStatus::Pending);
        assert_eq!(item.task(), "build the maze");
        assert_eq!(item.depth(), 0);
        assert!(item.assigned_agent_id().is_none());
    }

    #[test]
    fn start_then_complete() {
        let mut item = pending("build the maze");

        item.start("ariadne").unwrap();
        assert_eq!(item.status(), QueueStatus::Running);
        assert_eq!(item.assigned_agent_id(), Some("ariadne"));
        assert!(item.started_at().is_some());

        item.complete("maze built").unwrap();
        assert_eq!(item.status(), QueueStatus::Done);
        assert_eq!(item.result(), Some("maze built"));
        assert!(item.completed_at().is_some());
    }

    #[test]
    fn empty_result_is_reported_as_completed() {
        let mut item = pending("noop");
        item.start("cobb").unwrap();
        item.complete("  ").unwrap();

        assert_eq!(item.result(), Some("Task completed"));
    }

    #[test]
    fn cancelled_item_cannot_start() {
        let mut item = pending("kick");
        item.cancel(None).unwrap();

        let result = item.start("eames");
        assert!(result.is_err());
        assert_eq!(item.status(), QueueStatus::Cancelled);
        assert!(item.assigned_agent_id().is_none());
    }

    #[test]
    fn running_item_cannot_be_cancelled() {
        let mut item = pending("kick");
        item.start("eames").unwrap();

        assert!(item.cancel(None).is_err());
        assert_eq!(item.status(), QueueStatus::Running);
    }

    #[test]
    fn result_is_truncated_to_limit() {
        let mut item = pending("long");
        item.start("cobb").unwrap();
        item.complete(&"é".repeat(RESULT_MAX_CHARS + 40)).unwrap();

        assert_eq!(item.result().unwrap().chars().count(), RESULT_MAX_CHARS);
    }

    #[test]
    fn origin_and_delegations_are_recorded() {
        let parent = pending("ask Ariadne to fix the layout");
        let mut child = pending("fix the layout").with_origin(parent.id(), 1);
        child.record_delegation("eames");

        assert_eq!(child.parent_id(), Some(parent.id()));
        assert_eq!(child.depth(), 1);
        assert_eq!(child.delegated_to(), ["eames".to_string()]);
    }
}
