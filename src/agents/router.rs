// Command routing and execution
//
// The router owns the roster, the queue and one worker per agent. Submitting
// a command only records and dispatches it; execution happens on the
// assigned agent's worker.

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::backend::{ConnectPolicy, ExecutionBackend, ExecutionRequest, OutputSink};
use super::delegation::{DelegationAnalyzer, PatternDelegationAnalyzer, DEFAULT_MIN_REMAINDER_LEN};
use super::errors::{SquadError, SquadResult};
use super::events::EventBroadcaster;
use super::remote::RemoteExecutionClient;
use super::selector::RoundRobinSelector;
use super::simulator::{LocalSimulator, SimulatorPacing};
use super::state::ConnectionMonitor;
use super::types::{Delegation, DelegationPlan, StateSnapshot};
use super::worker::AgentWorker;
use crate::config::AppConfig;
use crate::domain::agent::{Agent, AgentStatus};
use crate::domain::events::{ConnectionStatus, OutputKind, SquadEvent};
use crate::domain::queue::{Command, QueueItem, QueueStatus};
use crate::domain::repositories::{AgentRegistry, QueueRepository, QueueTransition};
use crate::infrastructure::http_session_transport::HttpSessionTransport;
use crate::infrastructure::repositories::{InMemoryAgentRegistry, InMemoryQueueRepository};

/// Name used on output lines that belong to no agent
pub const SYSTEM_NAME: &str = "System";

const REMOVED_REASON: &str = "agent removed";

/// Roster seeded at startup: name, role, emoji
pub const DEFAULT_ROSTER: [(&str, &str, &str); 3] = [
    ("Cobb", "Lead / Architect", "🏗️"),
    ("Ariadne", "Frontend Dev", "⚛️"),
    ("Eames", "Systems Dev", "⚙️"),
];

#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub max_delegation_depth: u32,
    /// How long an agent stays in `Error` before returning to `Idle`
    pub error_reset: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_delegation_depth: 3,
            error_reset: Duration::from_millis(3000),
        }
    }
}

struct Inner {
    agents: Arc<dyn AgentRegistry>,
    queue: Arc<dyn QueueRepository>,
    backend: ExecutionBackend,
    analyzer: Arc<dyn DelegationAnalyzer>,
    events: EventBroadcaster,
    selector: Mutex<RoundRobinSelector>,
    workers: Mutex<HashMap<String, AgentWorker>>,
    config: RouterConfig,
}

/// Entry point for every roster and command operation
#[derive(Clone)]
pub struct CommandRouter {
    inner: Arc<Inner>,
}

/// Forwards executor output to the agent's buffer and the event stream
struct AgentOutput<'a> {
    router: &'a CommandRouter,
    agent_id: &'a str,
    agent_name: &'a str,
}

#[async_trait]
impl OutputSink for AgentOutput<'_> {
    async fn emit(&self, kind: OutputKind, line: String) {
        self.router
            .emit_line(self.agent_id, self.agent_name, kind, line)
            .await;
    }
}

impl CommandRouter {
    /// `events` must be the broadcaster the backend's connection monitor publishes to
    pub fn new(
        agents: Arc<dyn AgentRegistry>,
        queue: Arc<dyn QueueRepository>,
        backend: ExecutionBackend,
        analyzer: Arc<dyn DelegationAnalyzer>,
        events: EventBroadcaster,
        config: RouterConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                agents,
                queue,
                backend,
                analyzer,
                events,
                selector: Mutex::new(RoundRobinSelector::new()),
                workers: Mutex::new(HashMap::new()),
                config,
            }),
        }
    }

    /// Router backed by in-memory stores and the local simulator only
    pub fn simulated(pacing: SimulatorPacing) -> Self {
        let events = EventBroadcaster::default();
        let connection = ConnectionMonitor::new(events.clone());
        Self::new(
            Arc::new(InMemoryAgentRegistry::default()),
            Arc::new(InMemoryQueueRepository::default()),
            ExecutionBackend::simulated(LocalSimulator::new(pacing), connection),
            Arc::new(PatternDelegationAnalyzer::new(DEFAULT_MIN_REMAINDER_LEN)),
            events,
            RouterConfig::default(),
        )
    }

    /// Wire up every component from configuration
    pub fn from_config(config: &AppConfig) -> SquadResult<Self> {
        let events = EventBroadcaster::new(config.event_buffer);
        let connection = ConnectionMonitor::new(events.clone());

        let remote = match &config.backend_url {
            Some(url) => {
                let transport = HttpSessionTransport::new(url)?;
                Some(RemoteExecutionClient::new(
                    Arc::new(transport),
                    config.execution_timeout,
                ))
            }
            None => None,
        };

        let pacing = if config.simulator_instant {
            SimulatorPacing::instant()
        } else {
            SimulatorPacing::default()
        };

        let backend = ExecutionBackend::new(
            remote,
            LocalSimulator::new(pacing),
            connection,
            ConnectPolicy {
                retries: config.connect_retries,
                retry_delay: config.retry_delay,
            },
        );

        Ok(Self::new(
            Arc::new(InMemoryAgentRegistry::new(config.output_capacity)),
            Arc::new(InMemoryQueueRepository::new(config.queue_history)),
            backend,
            Arc::new(PatternDelegationAnalyzer::new(config.min_remainder_len)),
            events,
            RouterConfig {
                max_delegation_depth: config.max_delegation_depth,
                error_reset: config.error_reset,
            },
        ))
    }

    // ===== Roster =====

    /// Add the default roster when no agents exist yet
    pub async fn seed_default_roster(&self) -> SquadResult<Vec<Agent>> {
        if !self.inner.agents.list().await.is_empty() {
            return Ok(Vec::new());
        }

        let mut seeded = Vec::with_capacity(DEFAULT_ROSTER.len());
        for (name, role, emoji) in DEFAULT_ROSTER {
            seeded.push(self.add_agent(name, role, Some(emoji)).await?);
        }
        Ok(seeded)
    }

    pub async fn add_agent(&self, name: &str, role: &str, emoji: Option<&str>) -> SquadResult<Agent> {
        let agent = self.inner.agents.add(name, role, emoji).await?;

        let worker = AgentWorker::spawn(agent.id(), self.clone());
        self.inner
            .workers
            .lock()
            .await
            .insert(agent.id().to_string(), worker);

        info!(agent_id = %agent.id(), name = %agent.name(), "Agent added");
        self.inner.events.publish(SquadEvent::AgentAdded {
            agent: agent.clone(),
        });
        Ok(agent)
    }

    /// Remove an agent, cancelling its pending commands and releasing its session
    pub async fn remove_agent(&self, agent_id: &str) -> SquadResult<Agent> {
        let agent = self.inner.agents.remove(agent_id).await?;

        if let Some(worker) = self.inner.workers.lock().await.remove(agent_id) {
            worker.close();
        }

        for item in self.inner.queue.list_by_agent(agent_id).await {
            if item.status() != QueueStatus::Pending {
                continue;
            }
            let cancel = QueueTransition::Cancel {
                reason: Some(REMOVED_REASON.to_string()),
            };
            if let Ok(cancelled) = self.inner.queue.transition(item.id(), cancel).await {
                self.inner
                    .events
                    .publish(SquadEvent::QueueItemUpdated { item: cancelled });
            }
        }

        self.inner.backend.release_session(agent_id).await;

        info!(agent_id, "Agent removed");
        self.inner.events.publish(SquadEvent::AgentRemoved {
            agent_id: agent_id.to_string(),
        });
        Ok(agent)
    }

    pub async fn list_agents(&self) -> Vec<Agent> {
        self.inner.agents.list().await
    }

    pub async fn find_agent(&self, agent_id: &str) -> Option<Agent> {
        self.inner.agents.find(agent_id).await
    }

    // ===== Commands =====

    /// Record a command and hand it to an agent; never waits for execution
    pub async fn submit(&self, text: &str, target_agent_id: Option<&str>) -> SquadResult<QueueItem> {
        self.submit_inner(
            text.to_string(),
            target_agent_id.map(str::to_string),
            None,
            0,
        )
        .await
    }

    fn submit_inner(
        &self,
        text: String,
        target: Option<String>,
        parent: Option<Uuid>,
        depth: u32,
    ) -> BoxFuture<'_, SquadResult<QueueItem>> {
        Box::pin(async move {
            let text = text.trim().to_string();
            if text.is_empty() {
                return Err(SquadError::Validation(
                    "Command text cannot be empty".to_string(),
                ));
            }

            let roster = self.inner.agents.list().await;
            if roster.is_empty() {
                self.inner.events.output(
                    None,
                    SYSTEM_NAME,
                    OutputKind::Warning,
                    "⚠️ No agents available. Add an agent first.",
                );
                return Err(SquadError::NoAgentsAvailable);
            }

            let (agent, task) = self.resolve_target(&text, target.as_deref(), &roster).await?;

            let mut item = QueueItem::new(Command::new(text.clone(), target));
            if let Some(parent) = parent {
                item = item.with_origin(parent, depth);
            }
            item.assign(agent.id());

            let plan = if depth < self.inner.config.max_delegation_depth {
                self.inner.analyzer.analyze(&task, &agent, &roster)
            } else {
                DelegationPlan::keep(&task)
            };
            item.set_task(plan.remainder.clone().unwrap_or_else(|| task.clone()));
            for delegation in &plan.delegations {
                item.record_delegation(delegation.target_agent_id.clone());
            }

            self.inner.queue.insert(item.clone()).await?;
            self.inner
                .events
                .publish(SquadEvent::QueueItemUpdated { item: item.clone() });
            info!(
                command_id = %item.id(),
                agent_id = %agent.id(),
                depth,
                delegations = plan.delegations.len(),
                "Command queued"
            );

            self.fan_out(&agent, item.id(), depth, &plan.delegations).await;

            if plan.is_fully_delegated() {
                return self.complete_delegated(&item, &plan.delegations).await;
            }

            self.dispatch(&item).await;
            Ok(item)
        })
    }

    /// Pick the agent and the text it should execute
    async fn resolve_target(
        &self,
        text: &str,
        target: Option<&str>,
        roster: &[Agent],
    ) -> SquadResult<(Agent, String)> {
        if let Some(target) = target {
            let agent = roster
                .iter()
                .find(|a| a.id() == target)
                .cloned()
                .ok_or_else(|| SquadError::UnknownAgent(target.to_string()))?;
            return Ok((agent, text.to_string()));
        }

        if let Some((agent, rest)) = leading_mention(text, roster) {
            let task = if rest.is_empty() { text } else { rest };
            return Ok((agent.clone(), task.to_string()));
        }

        let picked = self
            .inner
            .selector
            .lock()
            .await
            .next(roster)
            .ok_or(SquadError::NoAgentsAvailable)?;
        let agent = roster
            .iter()
            .find(|a| a.id() == picked)
            .cloned()
            .ok_or_else(|| SquadError::UnknownAgent(picked.clone()))?;
        Ok((agent, text.to_string()))
    }

    /// Submit delegated work on behalf of `source`; failures are logged
    async fn fan_out(&self, source: &Agent, parent: Uuid, depth: u32, delegations: &[Delegation]) {
        for delegation in delegations {
            self.emit_line(
                source.id(),
                source.name(),
                OutputKind::Action,
                format!(
                    "🔀 {} → {}: {}",
                    source.name(),
                    delegation.target_name,
                    delegation.task
                ),
            )
            .await;

            let submitted = self
                .submit_inner(
                    delegation.task.clone(),
                    Some(delegation.target_agent_id.clone()),
                    Some(parent),
                    depth + 1,
                )
                .await;
            if let Err(e) = submitted {
                warn!(
                    parent_id = %parent,
                    target = %delegation.target_agent_id,
                    error = %e,
                    "Failed to submit delegated task"
                );
            }
        }
    }

    /// Close out an item whose whole command went to teammates
    async fn complete_delegated(
        &self,
        item: &QueueItem,
        delegations: &[Delegation],
    ) -> SquadResult<QueueItem> {
        let names = delegations
            .iter()
            .map(|d| d.target_name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let agent_id = item.assigned_agent_id().unwrap_or_default().to_string();

        self.inner
            .queue
            .transition(item.id(), QueueTransition::Start { agent_id: agent_id.clone() })
            .await?;
        self.inner.events.publish(SquadEvent::CommandStarted {
            command_id: item.id(),
            agent_id,
        });

        let done = self
            .inner
            .queue
            .transition(
                item.id(),
                QueueTransition::Complete {
                    result: format!("Delegated to {}", names),
                },
            )
            .await?;
        self.publish_completed(&done);
        Ok(done)
    }

    /// Hand an item to its agent's worker
    async fn dispatch(&self, item: &QueueItem) {
        let agent_id = item.assigned_agent_id().unwrap_or_default();
        let queued = match self.inner.workers.lock().await.get(agent_id) {
            Some(worker) => {
                worker.push(item.id());
                true
            }
            None => false,
        };

        if !queued {
            warn!(command_id = %item.id(), agent_id, "No worker for agent; cancelling command");
            let cancel = QueueTransition::Cancel {
                reason: Some(REMOVED_REASON.to_string()),
            };
            if let Ok(cancelled) = self.inner.queue.transition(item.id(), cancel).await {
                self.inner
                    .events
                    .publish(SquadEvent::QueueItemUpdated { item: cancelled });
            }
        }
    }

    /// Cancel a pending item; items in any other state are returned unchanged
    pub async fn cancel(&self, id: Uuid) -> SquadResult<QueueItem> {
        let item = self
            .inner
            .queue
            .find_by_id(id)
            .await
            .ok_or_else(|| SquadError::UnknownCommand(id.to_string()))?;

        if item.status() != QueueStatus::Pending {
            debug!(command_id = %id, status = %item.status(), "Cancel ignored for non-pending item");
            return Ok(item);
        }

        match self
            .inner
            .queue
            .transition(id, QueueTransition::Cancel { reason: None })
            .await
        {
            Ok(cancelled) => {
                if let Some(agent_id) = cancelled.assigned_agent_id() {
                    if let Some(worker) = self.inner.workers.lock().await.get(agent_id) {
                        worker.remove(id);
                    }
                }
                info!(command_id = %id, "Command cancelled");
                self.inner.events.publish(SquadEvent::QueueItemUpdated {
                    item: cancelled.clone(),
                });
                Ok(cancelled)
            }
            // The worker started it first
            Err(SquadError::InvalidStateTransition { .. }) => {
                Ok(self.inner.queue.find_by_id(id).await.unwrap_or(item))
            }
            Err(e) => Err(e),
        }
    }

    /// Move an item within the queue; pending items run in the new order
    pub async fn reorder(&self, id: Uuid, position: usize) -> SquadResult<Vec<QueueItem>> {
        self.inner.queue.reorder(id, position).await?;

        let item = self.inner.queue.find_by_id(id).await;
        if let Some(agent_id) = item
            .as_ref()
            .filter(|item| item.status() == QueueStatus::Pending)
            .and_then(QueueItem::assigned_agent_id)
        {
            let order: Vec<Uuid> = self
                .inner
                .queue
                .list_by_agent(agent_id)
                .await
                .iter()
                .filter(|item| item.status() == QueueStatus::Pending)
                .map(QueueItem::id)
                .collect();
            if let Some(worker) = self.inner.workers.lock().await.get(agent_id) {
                worker.reorder(&order);
            }
        }

        let queue = self.inner.queue.list().await;
        self.inner.events.publish(SquadEvent::QueueUpdated {
            queue: queue.clone(),
        });
        Ok(queue)
    }

    pub async fn list_queue(&self, agent_id: Option<&str>) -> Vec<QueueItem> {
        match agent_id {
            Some(agent_id) => self.inner.queue.list_by_agent(agent_id).await,
            None => self.inner.queue.list().await,
        }
    }

    pub async fn find_item(&self, id: Uuid) -> Option<QueueItem> {
        self.inner.queue.find_by_id(id).await
    }

    // ===== Execution =====

    /// Run one queued item; called only by the owning agent's worker
    pub(crate) async fn process(&self, id: Uuid) {
        let Some(item) = self.inner.queue.find_by_id(id).await else {
            debug!(command_id = %id, "Skipping unknown command");
            return;
        };
        let Some(agent_id) = item.assigned_agent_id().map(str::to_string) else {
            return;
        };

        // Fails if the item was cancelled while waiting
        let item = match self
            .inner
            .queue
            .transition(id, QueueTransition::Start { agent_id: agent_id.clone() })
            .await
        {
            Ok(item) => item,
            Err(e) => {
                debug!(command_id = %id, error = %e, "Skipping command that is no longer pending");
                return;
            }
        };

        self.inner.events.publish(SquadEvent::CommandStarted {
            command_id: id,
            agent_id: agent_id.clone(),
        });
        self.inner
            .events
            .publish(SquadEvent::QueueItemUpdated { item: item.clone() });

        let agent = match self
            .inner
            .agents
            .set_status(&agent_id, AgentStatus::Busy, Some(item.task().to_string()))
            .await
        {
            Ok(agent) => agent,
            Err(e) => {
                warn!(command_id = %id, agent_id = %agent_id, error = %e, "Agent vanished before execution");
                self.record_failure(id, REMOVED_REASON.to_string()).await;
                return;
            }
        };
        self.inner.events.publish(SquadEvent::AgentUpdated {
            agent: agent.clone(),
        });

        let roster = self.inner.agents.list().await;
        let executor = self.inner.backend.select();
        info!(command_id = %id, agent_id = %agent_id, executor = %executor.kind(), "Executing command");

        let sink = AgentOutput {
            router: self,
            agent_id: agent.id(),
            agent_name: agent.name(),
        };
        let request = ExecutionRequest {
            command_id: id,
            agent: &agent,
            roster: &roster,
            text: item.task(),
        };

        match executor.execute(request, &sink).await {
            Ok(response) => self.on_success(&item, &agent, &response).await,
            Err(e) => self.on_failure(&item, &agent, e).await,
        }
    }

    async fn on_success(&self, item: &QueueItem, agent: &Agent, response: &str) {
        match self
            .inner
            .queue
            .transition(
                item.id(),
                QueueTransition::Complete {
                    result: response.to_string(),
                },
            )
            .await
        {
            Ok(done) => self.publish_completed(&done),
            Err(e) => warn!(command_id = %item.id(), error = %e, "Failed to mark command done"),
        }
        info!(command_id = %item.id(), agent_id = %agent.id(), "Command completed");

        self.update_status(agent.id(), AgentStatus::Idle).await;

        if item.depth() >= self.inner.config.max_delegation_depth {
            return;
        }
        let roster = self.inner.agents.list().await;
        // Removed while the command ran
        if !roster.iter().any(|a| a.id() == agent.id()) {
            return;
        }
        let follow_ups = self.inner.analyzer.follow_ups(response, agent, &roster);
        self.fan_out(agent, item.id(), item.depth(), &follow_ups).await;
    }

    async fn on_failure(&self, item: &QueueItem, agent: &Agent, error: SquadError) {
        let message = error.to_string();
        warn!(command_id = %item.id(), agent_id = %agent.id(), error = %message, "Command failed");

        self.emit_line(
            agent.id(),
            agent.name(),
            OutputKind::Error,
            format!("🔴 Error: {}", message),
        )
        .await;

        // Before the item turns Failed, so the next command already sees the error
        if error.is_connection_failure() {
            self.inner.backend.connection().mark_error(message.clone());
        }
        self.record_failure(item.id(), message).await;

        self.update_status(agent.id(), AgentStatus::Error).await;
        self.schedule_recovery(agent.id().to_string());
    }

    async fn record_failure(&self, id: Uuid, error: String) {
        match self
            .inner
            .queue
            .transition(id, QueueTransition::Fail { error: error.clone() })
            .await
        {
            Ok(failed) => {
                self.inner
                    .events
                    .publish(SquadEvent::QueueItemUpdated { item: failed });
                self.inner.events.publish(SquadEvent::CommandFailed {
                    command_id: id,
                    error,
                });
            }
            Err(e) => warn!(command_id = %id, error = %e, "Failed to mark command failed"),
        }
    }

    /// Return the agent to `Idle` after the reset delay, if it is still in `Error`
    fn schedule_recovery(&self, agent_id: String) {
        let router = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(router.inner.config.error_reset).await;
            match router.inner.agents.recover(&agent_id).await {
                Ok(Some(agent)) => {
                    debug!(agent_id = %agent_id, "Agent recovered from error");
                    router.inner.events.publish(SquadEvent::AgentUpdated { agent });
                }
                Ok(None) => {}
                Err(e) => debug!(agent_id = %agent_id, error = %e, "Skipping recovery"),
            }
        });
    }

    async fn update_status(&self, agent_id: &str, status: AgentStatus) {
        match self.inner.agents.set_status(agent_id, status, None).await {
            Ok(agent) => {
                self.inner.events.publish(SquadEvent::AgentUpdated { agent });
            }
            Err(e) => debug!(agent_id, error = %e, "Skipping status update"),
        }
    }

    fn publish_completed(&self, done: &QueueItem) {
        self.inner.events.publish(SquadEvent::QueueItemUpdated {
            item: done.clone(),
        });
        self.inner.events.publish(SquadEvent::CommandCompleted {
            command_id: done.id(),
            result: done.result().unwrap_or_default().to_string(),
        });
    }

    /// Append to the agent's output buffer and publish the line
    async fn emit_line(&self, agent_id: &str, agent_name: &str, kind: OutputKind, line: String) {
        match self.inner.agents.append_output(agent_id, &line).await {
            Ok(agent) => {
                self.inner.events.publish(SquadEvent::AgentUpdated { agent });
            }
            Err(e) => debug!(agent_id, error = %e, "Output for unknown agent"),
        }
        self.inner
            .events
            .output(Some(agent_id), agent_name, kind, line);
    }

    // ===== Observation =====

    /// Everything an observer needs to catch up
    pub async fn snapshot(&self) -> StateSnapshot {
        // Read first so replaying events after `last_seq` never skips a change
        let last_seq = self.inner.events.last_seq();
        StateSnapshot {
            agents: self.inner.agents.list().await,
            queue: self.inner.queue.list().await,
            connection: self.inner.backend.connection().current(),
            last_seq,
        }
    }

    pub fn events(&self) -> &EventBroadcaster {
        &self.inner.events
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.inner.backend.connection().current()
    }

    /// Try the remote backend again; returns whether it is connected
    pub async fn reconnect(&self) -> bool {
        self.inner.backend.reconnect().await
    }

    /// Stop every worker and release all backend sessions
    pub async fn shutdown(&self) {
        let workers: Vec<AgentWorker> = self
            .inner
            .workers
            .lock()
            .await
            .drain()
            .map(|(_, worker)| worker)
            .collect();
        for worker in &workers {
            debug!(agent_id = %worker.agent_id(), "Stopping worker");
            worker.abort();
        }
        self.inner.backend.shutdown().await;
        info!("Router shut down");
    }
}

/// Agent named by a leading `@mention`, and the text after it
fn leading_mention<'a, 'r>(text: &'a str, roster: &'r [Agent]) -> Option<(&'r Agent, &'a str)> {
    let rest = text.strip_prefix('@')?;
    let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let mention = rest[..end].trim_end_matches(|c: char| ",:;.!?".contains(c));
    if mention.is_empty() {
        return None;
    }

    let agent = roster
        .iter()
        .find(|a| a.id().eq_ignore_ascii_case(mention) || a.name().eq_ignore_ascii_case(mention))?;
    Some((agent, rest[end..].trim()))
}
