use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

use super::router::CommandRouter;

#[derive(Default)]
struct Mailbox {
    queue: Mutex<VecDeque<Uuid>>,
    notify: Notify,
    closed: AtomicBool,
}

impl Mailbox {
    fn with_queue<R>(&self, f: impl FnOnce(&mut VecDeque<Uuid>) -> R) -> R {
        let mut queue = self.queue.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut queue)
    }
}

fn sort_by_order(queue: &mut VecDeque<Uuid>, order: &[Uuid]) {
    queue
        .make_contiguous()
        .sort_by_key(|id| order.iter().position(|o| o == id).unwrap_or(usize::MAX));
}

/// Processes one agent's commands strictly one after another
///
/// The worker owns a private ordered list of queue item ids. It takes the
/// front id, runs it to completion or failure, then takes the next one, so
/// an agent's backend session never sees two exchanges at once.
pub struct AgentWorker {
    agent_id: String,
    mailbox: Arc<Mailbox>,
    handle: JoinHandle<()>,
}

impl AgentWorker {
    /// Spawn the worker loop for an agent
    pub fn spawn(agent_id: impl Into<String>, router: CommandRouter) -> Self {
        let agent_id = agent_id.into();
        let mailbox = Arc::new(Mailbox::default());

        let handle = tokio::spawn({
            let mailbox = mailbox.clone();
            let agent_id = agent_id.clone();
            async move {
                debug!(agent_id = %agent_id, "Worker started");
                while !mailbox.closed.load(Ordering::Acquire) {
                    match mailbox.with_queue(VecDeque::pop_front) {
                        Some(item_id) => router.process(item_id).await,
                        None => mailbox.notify.notified().await,
                    }
                }
                debug!(agent_id = %agent_id, "Worker stopped");
            }
        });

        Self {
            agent_id,
            mailbox,
            handle,
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Queue an item behind everything already waiting
    pub fn push(&self, item_id: Uuid) {
        self.mailbox.with_queue(|queue| queue.push_back(item_id));
        self.mailbox.notify.notify_one();
    }

    /// Drop a waiting item; false if it was not waiting
    pub fn remove(&self, item_id: Uuid) -> bool {
        self.mailbox.with_queue(|queue| {
            let before = queue.len();
            queue.retain(|id| *id != item_id);
            queue.len() != before
        })
    }

    /// Re-sort waiting items to follow `order`; unknown ids keep their place at the end
    pub fn reorder(&self, order: &[Uuid]) {
        self.mailbox.with_queue(|queue| sort_by_order(queue, order));
    }

    /// Stop after the item in flight, if any
    pub fn close(&self) {
        self.mailbox.closed.store(true, Ordering::Release);
        self.mailbox.notify.notify_one();
    }

    /// Stop immediately, abandoning the item in flight
    pub fn abort(&self) {
        self.close();
        self.handle.abort();
    }
}
