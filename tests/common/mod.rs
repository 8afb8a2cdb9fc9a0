//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use squad_api::agents::messages::SessionEvent;
use squad_api::agents::{
    CommandRouter, ConnectPolicy, ConnectionMonitor, EventBroadcaster, ExecutionBackend,
    LocalSimulator, PatternDelegationAnalyzer, RemoteExecutionClient, RouterConfig,
    SessionTransport, SimulatorPacing, SquadError, SquadResult,
};
use squad_api::domain::queue::QueueItem;
use squad_api::infrastructure::repositories::{InMemoryAgentRegistry, InMemoryQueueRepository};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use uuid::Uuid;

pub const WAIT_LIMIT: Duration = Duration::from_secs(5);

/// How the scripted backend answers each prompt
#[derive(Debug, Clone)]
pub enum Script {
    /// Stream the text as one delta, then go idle
    Reply(String),
    /// Like `Reply`, but each prompt waits for a permit on the transport's gate
    Gated(String),
    /// Session creation fails
    FailSession,
    /// Session creation fails because the backend cannot be reached
    Unreachable,
    /// Like `Reply`, but session creation waits for a permit on the gate
    SlowSession(String),
    /// Never complete
    Hang,
    /// Emit an error event
    ErrorEvent(String),
}

/// In-process stand-in for the session backend
pub struct ScriptedTransport {
    pub script: Script,
    pub gate: Arc<Semaphore>,
    pub prompts: Mutex<Vec<String>>,
    pub requested: AtomicUsize,
    pub created: AtomicUsize,
    pub destroyed: AtomicUsize,
}

impl ScriptedTransport {
    pub fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            gate: Arc::new(Semaphore::new(0)),
            prompts: Mutex::new(Vec::new()),
            requested: AtomicUsize::new(0),
            created: AtomicUsize::new(0),
            destroyed: AtomicUsize::new(0),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn release(&self, permits: usize) {
        self.gate.add_permits(permits);
    }
}

fn reply_events(text: &str) -> Vec<SessionEvent> {
    vec![
        SessionEvent::MessageDelta {
            content: text.to_string(),
        },
        SessionEvent::Idle,
    ]
}

#[async_trait]
impl SessionTransport for ScriptedTransport {
    async fn ping(&self) -> SquadResult<()> {
        Ok(())
    }

    async fn create_session(&self, _system_prompt: &str) -> SquadResult<String> {
        self.requested.fetch_add(1, Ordering::SeqCst);
        match self.script {
            Script::FailSession => {
                return Err(SquadError::Backend("backend refused session".to_string()));
            }
            Script::Unreachable => {
                return Err(SquadError::Unreachable("connection refused".to_string()));
            }
            Script::SlowSession(_) => {
                if let Ok(permit) = self.gate.acquire().await {
                    permit.forget();
                }
            }
            _ => {}
        }
        let n = self.created.fetch_add(1, Ordering::SeqCst);
        Ok(format!("session-{}", n))
    }

    async fn send(
        &self,
        _session_id: &str,
        prompt: &str,
    ) -> SquadResult<mpsc::Receiver<SessionEvent>> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let (tx, rx) = mpsc::channel(16);

        match self.script.clone() {
            Script::Reply(text) | Script::SlowSession(text) => {
                for event in reply_events(&text) {
                    let _ = tx.send(event).await;
                }
            }
            Script::Gated(text) => {
                let gate = self.gate.clone();
                tokio::spawn(async move {
                    if let Ok(permit) = gate.acquire().await {
                        permit.forget();
                        for event in reply_events(&text) {
                            let _ = tx.send(event).await;
                        }
                    }
                });
            }
            Script::Hang => {
                tokio::spawn(async move {
                    let _held = tx;
                    std::future::pending::<()>().await;
                });
            }
            Script::ErrorEvent(message) => {
                let _ = tx.send(SessionEvent::Error { message }).await;
            }
            Script::FailSession | Script::Unreachable => {}
        }
        Ok(rx)
    }

    async fn destroy_session(&self, _session_id: &str) -> SquadResult<()> {
        self.destroyed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Seeded router that only ever uses the instant simulator
pub async fn simulated_router() -> CommandRouter {
    let router = CommandRouter::simulated(SimulatorPacing::instant());
    router.seed_default_roster().await.unwrap();
    router
}

/// Seeded router connected to a scripted backend
pub async fn remote_router(transport: Arc<ScriptedTransport>, timeout: Duration) -> CommandRouter {
    let events = EventBroadcaster::default();
    let connection = ConnectionMonitor::new(events.clone());
    let backend = ExecutionBackend::new(
        Some(RemoteExecutionClient::new(transport, timeout)),
        LocalSimulator::new(SimulatorPacing::instant()),
        connection,
        ConnectPolicy {
            retries: 0,
            retry_delay: Duration::ZERO,
        },
    );

    let router = CommandRouter::new(
        Arc::new(InMemoryAgentRegistry::default()),
        Arc::new(InMemoryQueueRepository::default()),
        backend,
        Arc::new(PatternDelegationAnalyzer::default()),
        events,
        RouterConfig {
            max_delegation_depth: 3,
            error_reset: Duration::from_millis(50),
        },
    );
    router.seed_default_roster().await.unwrap();
    assert!(router.reconnect().await, "scripted backend should connect");
    router
}

/// Poll until `check` passes or the wait limit runs out
pub async fn wait_until<F, Fut>(what: &str, mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + WAIT_LIMIT;
    while !check().await {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {}",
            what
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Wait for an item to reach Done, Cancelled or Failed
pub async fn wait_for_terminal(router: &CommandRouter, id: Uuid) -> QueueItem {
    wait_until("item to finish", move || async move {
        router
            .find_item(id)
            .await
            .map(|item| item.status().is_terminal())
            .unwrap_or(false)
    })
    .await;
    router.find_item(id).await.unwrap()
}

/// Wait until every item is terminal and no new items appeared for a while
pub async fn wait_for_quiet(router: &CommandRouter) -> Vec<QueueItem> {
    let mut settled_len = usize::MAX;
    loop {
        wait_until("queue to drain", move || async move {
            router
                .list_queue(None)
                .await
                .iter()
                .all(|item| item.status().is_terminal())
        })
        .await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        let queue = router.list_queue(None).await;
        if queue.len() == settled_len && queue.iter().all(|item| item.status().is_terminal()) {
            return queue;
        }
        settled_len = queue.len();
    }
}
