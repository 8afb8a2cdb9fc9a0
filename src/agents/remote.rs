// Remote execution client
//
// Drives one stateful backend session per agent. Sessions are created lazily
// on an agent's first command and torn down on removal or shutdown.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use super::backend::{ExecutionRequest, Executor, OutputSink};
use super::errors::{SquadError, SquadResult};
use super::messages::SessionEvent;
use super::prompts::agent_system_prompt;
use super::types::ExecutorKind;
use crate::domain::agent::Agent;
use crate::domain::events::OutputKind;

/// Default budget for a single command, five minutes
pub const DEFAULT_EXECUTION_TIMEOUT: Duration = Duration::from_millis(300_000);

/// Wire protocol to a session backend
#[async_trait]
pub trait SessionTransport: Send + Sync {
    /// Cheap liveness check
    async fn ping(&self) -> SquadResult<()>;

    /// Open a session and return its id
    async fn create_session(&self, system_prompt: &str) -> SquadResult<String>;

    /// Send a prompt; the receiver yields events until the backend goes idle
    async fn send(
        &self,
        session_id: &str,
        prompt: &str,
    ) -> SquadResult<mpsc::Receiver<SessionEvent>>;

    async fn destroy_session(&self, session_id: &str) -> SquadResult<()>;
}

#[derive(Default)]
struct SessionTable {
    /// agent id -> session id
    active: HashMap<String, String>,
    /// Agents whose sessions were released; they never get a new one
    released: HashSet<String>,
}

/// Executes commands through backend sessions
pub struct RemoteExecutionClient {
    transport: Arc<dyn SessionTransport>,
    sessions: Mutex<SessionTable>,
    timeout: Duration,
}

impl RemoteExecutionClient {
    pub fn new(transport: Arc<dyn SessionTransport>, timeout: Duration) -> Self {
        Self {
            transport,
            sessions: Mutex::new(SessionTable::default()),
            timeout,
        }
    }

    pub async fn probe(&self) -> SquadResult<()> {
        self.transport.ping().await
    }

    /// Session id for `agent`, creating one if it has none
    ///
    /// Fails for an agent that was released, including one released while
    /// its session was being created.
    pub async fn ensure_session(&self, agent: &Agent, roster: &[Agent]) -> SquadResult<String> {
        {
            let sessions = self.sessions.lock().await;
            if let Some(existing) = sessions.active.get(agent.id()) {
                return Ok(existing.clone());
            }
            if sessions.released.contains(agent.id()) {
                return Err(released_error(agent.id()));
            }
        }

        let prompt = agent_system_prompt(agent, roster);
        let session_id = self
            .transport
            .create_session(&prompt)
            .await
            .map_err(|e| match e {
                SquadError::Unreachable(_) => e,
                other => SquadError::SessionCreation(other.to_string()),
            })?;

        let mut sessions = self.sessions.lock().await;
        let existing = sessions.active.get(agent.id()).cloned();
        let outcome = if sessions.released.contains(agent.id()) {
            Err(released_error(agent.id()))
        } else if let Some(existing) = existing {
            Ok(existing)
        } else {
            info!(agent_id = %agent.id(), session_id = %session_id, "Created backend session");
            sessions
                .active
                .insert(agent.id().to_string(), session_id.clone());
            return Ok(session_id);
        };
        drop(sessions);

        if let Err(e) = self.transport.destroy_session(&session_id).await {
            warn!(session_id = %session_id, error = %e, "Failed to destroy unused session");
        }
        outcome
    }

    /// Send `text` into a session and wait for the final reply
    pub async fn run(
        &self,
        session_id: &str,
        text: &str,
        sink: &dyn OutputSink,
    ) -> SquadResult<String> {
        match tokio::time::timeout(self.timeout, self.stream_reply(session_id, text, sink)).await
        {
            Ok(result) => result,
            Err(_) => Err(SquadError::Timeout(self.timeout.as_millis() as u64)),
        }
    }

    async fn stream_reply(
        &self,
        session_id: &str,
        text: &str,
        sink: &dyn OutputSink,
    ) -> SquadResult<String> {
        let mut events = self.transport.send(session_id, text).await?;
        let mut response = String::new();

        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::MessageDelta { content } => {
                    response.push_str(&content);
                    sink.emit(OutputKind::Working, format!("→ {}", content.trim_end()))
                        .await;
                }
                SessionEvent::Message { content } => {
                    if response.is_empty() {
                        response = content;
                    }
                }
                SessionEvent::ToolStarted { .. } => {
                    if let Some(line) = event.tool_line() {
                        sink.emit(OutputKind::Action, line).await;
                    }
                }
                SessionEvent::ToolCompleted { .. } => {
                    if let Some(line) = event.tool_line() {
                        sink.emit(OutputKind::Working, line).await;
                    }
                }
                SessionEvent::Idle => return Ok(response),
                SessionEvent::Error { message } => return Err(SquadError::Backend(message)),
            }
        }

        Err(SquadError::Backend(
            "Session stream closed before completion".to_string(),
        ))
    }

    /// Destroy the agent's session and refuse it new ones; failures are only logged
    pub async fn release(&self, agent_id: &str) {
        let session_id = {
            let mut sessions = self.sessions.lock().await;
            sessions.released.insert(agent_id.to_string());
            sessions.active.remove(agent_id)
        };
        if let Some(session_id) = session_id {
            match self.transport.destroy_session(&session_id).await {
                Ok(()) => debug!(agent_id, session_id = %session_id, "Destroyed backend session"),
                Err(e) => {
                    warn!(agent_id, session_id = %session_id, error = %e, "Failed to destroy session")
                }
            }
        }
    }

    pub async fn release_all(&self) {
        let sessions: Vec<(String, String)> = {
            let mut table = self.sessions.lock().await;
            let drained: Vec<(String, String)> = table.active.drain().collect();
            table.released.extend(drained.iter().map(|(agent_id, _)| agent_id.clone()));
            drained
        };
        for (agent_id, session_id) in sessions {
            if let Err(e) = self.transport.destroy_session(&session_id).await {
                warn!(agent_id = %agent_id, error = %e, "Failed to destroy session on shutdown");
            }
        }
    }
}

fn released_error(agent_id: &str) -> SquadError {
    SquadError::SessionCreation(format!("agent {} was removed", agent_id))
}

#[async_trait]
impl Executor for RemoteExecutionClient {
    fn kind(&self) -> ExecutorKind {
        ExecutorKind::Remote
    }

    async fn execute(
        &self,
        request: ExecutionRequest<'_>,
        sink: &dyn OutputSink,
    ) -> SquadResult<String> {
        let agent = request.agent;
        sink.emit(
            OutputKind::Received,
            format!("📥 {} received: \"{}\"", agent.name(), request.text),
        )
        .await;

        let session_id = self.ensure_session(agent, request.roster).await?;
        debug!(command_id = %request.command_id, session_id = %session_id, "Sending command to backend");

        let response = self.run(&session_id, request.text, sink).await?;

        for line in response.lines().filter(|l| !l.trim().is_empty()) {
            sink.emit(OutputKind::Response, format!("💬 {}", line)).await;
        }
        sink.emit(
            OutputKind::Success,
            format!("✅ {} completed task", agent.name()),
        )
        .await;

        Ok(response)
    }
}
