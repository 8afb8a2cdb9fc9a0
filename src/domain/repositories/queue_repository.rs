use async_trait::async_trait;
use uuid::Uuid;

use crate::agents::errors::SquadResult;
use crate::domain::queue::QueueItem;

/// A status change applied atomically by the repository
#[derive(Debug, Clone)]
pub enum QueueTransition {
    Start { agent_id: String },
    Complete { result: String },
    Fail { error: String },
    Cancel { reason: Option<String> },
}

/// Repository trait for the command queue
///
/// The queue is an ordered list; its order is the pending execution order
/// within each agent.
#[async_trait]
pub trait QueueRepository: Send + Sync {
    /// Append an item to the end of the queue
    async fn insert(&self, item: QueueItem) -> SquadResult<()>;

    /// Find an item by its command id
    async fn find_by_id(&self, id: Uuid) -> Option<QueueItem>;

    /// All items in queue order
    async fn list(&self) -> Vec<QueueItem>;

    /// Items assigned to one agent, in queue order
    async fn list_by_agent(&self, agent_id: &str) -> Vec<QueueItem>;

    /// Apply a status change, failing if the transition is not allowed
    async fn transition(&self, id: Uuid, transition: QueueTransition) -> SquadResult<QueueItem>;

    /// Move an item to `position` (clamped to the queue length)
    async fn reorder(&self, id: Uuid, position: usize) -> SquadResult<()>;
}
