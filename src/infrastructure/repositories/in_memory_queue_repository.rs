use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::agents::errors::{SquadError, SquadResult};
use crate::domain::queue::QueueItem;
use crate::domain::repositories::{QueueRepository, QueueTransition};

/// Default number of items kept in the queue history
pub const DEFAULT_HISTORY_LIMIT: usize = 500;

/// In-process implementation of QueueRepository
///
/// When the list grows past `history_limit`, the oldest terminal items are
/// evicted. Pending and running items are never evicted.
pub struct InMemoryQueueRepository {
    items: RwLock<Vec<QueueItem>>,
    history_limit: usize,
}

impl InMemoryQueueRepository {
    pub fn new(history_limit: usize) -> Self {
        Self {
            items: RwLock::new(Vec::new()),
            history_limit: history_limit.max(1),
        }
    }

    fn evict(items: &mut Vec<QueueItem>, limit: usize) {
        let mut excess = items.len().saturating_sub(limit);
        if excess == 0 {
            return;
        }
        items.retain(|item| {
            if excess > 0 && item.status().is_terminal() {
                excess -= 1;
                false
            } else {
                true
            }
        });
    }
}

impl Default for InMemoryQueueRepository {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

#[async_trait]
impl QueueRepository for InMemoryQueueRepository {
    async fn insert(&self, item: QueueItem) -> SquadResult<()> {
        let mut items = self.items.write().await;
        if items.iter().any(|existing| existing.id() == item.id()) {
            return Err(SquadError::Validation(format!(
                "Command already queued: {}",
                item.id()
            )));
        }

        items.push(item);
        Self::evict(&mut items, self.history_limit);
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Option<QueueItem> {
        self.items
            .read()
            .await
            .iter()
            .find(|item| item.id() == id)
            .cloned()
    }

    async fn list(&self) -> Vec<QueueItem> {
        self.items.read().await.clone()
    }

    async fn list_by_agent(&self, agent_id: &str) -> Vec<QueueItem> {
        self.items
            .read()
            .await
            .iter()
            .filter(|item| item.assigned_agent_id() == Some(agent_id))
            .cloned()
            .collect()
    }

    async fn transition(&self, id: Uuid, transition: QueueTransition) -> SquadResult<QueueItem> {
        let mut items = self.items.write().await;
        let item = items
            .iter_mut()
            .find(|item| item.id() == id)
            .ok_or_else(|| SquadError::UnknownCommand(id.to_string()))?;

        let from = item.status();
        let applied = match &transition {
            QueueTransition::Start { agent_id } => item.start(agent_id),
            QueueTransition::Complete { result } => item.complete(result),
            QueueTransition::Fail { error } => item.fail(error),
            QueueTransition::Cancel { reason } => item.cancel(reason.as_deref()),
        };

        applied.map_err(|_| SquadError::InvalidStateTransition {
            from: from.to_string(),
            to: match transition {
                QueueTransition::Start { .. } => "running",
                QueueTransition::Complete { .. } => "done",
                QueueTransition::Fail { .. } => "failed",
                QueueTransition::Cancel { .. } => "cancelled",
            }
            .to_string(),
        })?;

        Ok(item.clone())
    }

    async fn reorder(&self, id: Uuid, position: usize) -> SquadResult<()> {
        let mut items = self.items.write().await;
        let current = items
            .iter()
            .position(|item| item.id() == id)
            .ok_or_else(|| SquadError::UnknownCommand(id.to_string()))?;

        let item = items.remove(current);
        let position = position.min(items.len());
        items.insert(position, item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::queue::{Command, QueueStatus};

    fn item_for(agent: &str, text: &str) -> QueueItem {
        let mut item = QueueItem::new(Command::new(text, Some(agent.to_string())));
        item.assign(agent);
        item
    }

    #[tokio::test]
    async fn insert_and_find() {
        let repo = InMemoryQueueRepository::default();
        let item = item_for("cobb", "plan");
        let id = item.id();

        repo.insert(item).await.unwrap();

        let found = repo.find_by_id(id).await.unwrap();
        assert_eq!(found.task(), "plan");
        assert_eq!(found.status(), QueueStatus::Pending);
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let repo = InMemoryQueueRepository::default();
        let item = item_for("cobb", "plan");

        repo.insert(item.clone()).await.unwrap();
        assert!(repo.insert(item).await.is_err());
    }

    #[tokio::test]
    async fn cancelled_item_cannot_be_started() {
        let repo = InMemoryQueueRepository::default();
        let item = item_for("cobb", "plan");
        let id = item.id();
        repo.insert(item).await.unwrap();

        repo.transition(id, QueueTransition::Cancel { reason: None })
            .await
            .unwrap();
        let result = repo
            .transition(id, QueueTransition::Start { agent_id: "cobb".to_string() })
            .await;

        assert!(matches!(
            result,
            Err(SquadError::InvalidStateTransition { ref from, ref to }) if from == "cancelled" && to == "running"
        ));
        assert_eq!(repo.find_by_id(id).await.unwrap().status(), QueueStatus::Cancelled);
    }

    #[tokio::test]
    async fn unknown_command_transition() {
        let repo = InMemoryQueueRepository::default();
        let result = repo
            .transition(Uuid::new_v4(), QueueTransition::Cancel { reason: None })
            .await;

        assert!(matches!(result, Err(SquadError::UnknownCommand(_))));
    }

    #[tokio::test]
    async fn list_by_agent_keeps_queue_order() {
        let repo = InMemoryQueueRepository::default();
        let first = item_for("cobb", "one");
        let other = item_for("eames", "two");
        let second = item_for("cobb", "three");
        let (first_id, second_id) = (first.id(), second.id());

        repo.insert(first).await.unwrap();
        repo.insert(other).await.unwrap();
        repo.insert(second).await.unwrap();

        let ids: Vec<Uuid> = repo.list_by_agent("cobb").await.iter().map(|i| i.id()).collect();
        assert_eq!(ids, vec![first_id, second_id]);
    }

    #[tokio::test]
    async fn reorder_moves_item_and_clamps_position() {
        let repo = InMemoryQueueRepository::default();
        let a = item_for("cobb", "a");
        let b = item_for("cobb", "b");
        let c = item_for("cobb", "c");
        let (a_id, b_id, c_id) = (a.id(), b.id(), c.id());
        for item in [a, b, c] {
            repo.insert(item).await.unwrap();
        }

        repo.reorder(c_id, 0).await.unwrap();
        let ids: Vec<Uuid> = repo.list().await.iter().map(|i| i.id()).collect();
        assert_eq!(ids, vec![c_id, a_id, b_id]);

        repo.reorder(c_id, 99).await.unwrap();
        let ids: Vec<Uuid> = repo.list().await.iter().map(|i| i.id()).collect();
        assert_eq!(ids, vec![a_id, b_id, c_id]);
    }

    #[tokio::test]
    async fn history_limit_evicts_oldest_terminal_items_only() {
        let repo = InMemoryQueueRepository::new(2);
        let pending = item_for("cobb", "still waiting");
        let done = item_for("cobb", "finished");
        let (pending_id, done_id) = (pending.id(), done.id());

        repo.insert(pending).await.unwrap();
        repo.insert(done).await.unwrap();
        repo.transition(done_id, QueueTransition::Start { agent_id: "cobb".to_string() })
            .await
            .unwrap();
        repo.transition(done_id, QueueTransition::Complete { result: "ok".to_string() })
            .await
            .unwrap();

        let newest = item_for("cobb", "newest");
        let newest_id = newest.id();
        repo.insert(newest).await.unwrap();

        let ids: Vec<Uuid> = repo.list().await.iter().map(|i| i.id()).collect();
        assert_eq!(ids, vec![pending_id, newest_id]);
    }
}
