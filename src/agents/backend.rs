// Execution backend adapter
//
// Commands run either against the remote session backend or the local
// simulator. The choice is made once per command from the connection state.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use super::errors::SquadResult;
use super::remote::RemoteExecutionClient;
use super::simulator::LocalSimulator;
use super::state::ConnectionMonitor;
use super::types::ExecutorKind;
use crate::domain::agent::Agent;
use crate::domain::events::OutputKind;

/// Receives output lines as an executor produces them
#[async_trait]
pub trait OutputSink: Send + Sync {
    async fn emit(&self, kind: OutputKind, line: String);
}

/// Everything an executor needs to handle one command
pub struct ExecutionRequest<'a> {
    pub command_id: Uuid,
    pub agent: &'a Agent,
    pub roster: &'a [Agent],
    pub text: &'a str,
}

/// A strategy that turns a command into a final response text
#[async_trait]
pub trait Executor: Send + Sync {
    fn kind(&self) -> ExecutorKind;

    async fn execute(
        &self,
        request: ExecutionRequest<'_>,
        sink: &dyn OutputSink,
    ) -> SquadResult<String>;
}

/// Retry policy for (re)connecting to the remote backend
#[derive(Debug, Clone, Copy)]
pub struct ConnectPolicy {
    pub retries: u32,
    pub retry_delay: Duration,
}

impl Default for ConnectPolicy {
    fn default() -> Self {
        Self {
            retries: 2,
            retry_delay: Duration::from_millis(2000),
        }
    }
}

/// Chooses between the remote client and the simulator
#[derive(Clone)]
pub struct ExecutionBackend {
    remote: Option<Arc<RemoteExecutionClient>>,
    simulator: Arc<LocalSimulator>,
    connection: ConnectionMonitor,
    policy: ConnectPolicy,
}

impl ExecutionBackend {
    pub fn new(
        remote: Option<RemoteExecutionClient>,
        simulator: LocalSimulator,
        connection: ConnectionMonitor,
        policy: ConnectPolicy,
    ) -> Self {
        Self {
            remote: remote.map(Arc::new),
            simulator: Arc::new(simulator),
            connection,
            policy,
        }
    }

    /// Backend with no remote client; every command is simulated
    pub fn simulated(simulator: LocalSimulator, connection: ConnectionMonitor) -> Self {
        Self::new(None, simulator, connection, ConnectPolicy::default())
    }

    pub fn connection(&self) -> &ConnectionMonitor {
        &self.connection
    }

    /// Strategy for the next command
    pub fn select(&self) -> Arc<dyn Executor> {
        match &self.remote {
            Some(remote) if self.connection.is_connected() => remote.clone() as Arc<dyn Executor>,
            _ => self.simulator.clone() as Arc<dyn Executor>,
        }
    }

    /// Probe the remote backend, retrying per the connect policy
    ///
    /// Returns whether the backend is connected afterwards.
    pub async fn reconnect(&self) -> bool {
        let Some(remote) = &self.remote else {
            self.connection
                .mark_error("No execution backend configured; using local simulator");
            return false;
        };

        for attempt in 0..=self.policy.retries {
            self.connection.set_connecting();
            match remote.probe().await {
                Ok(()) => {
                    info!(attempt, "Connected to execution backend");
                    self.connection.set_connected();
                    return true;
                }
                Err(e) if attempt < self.policy.retries => {
                    warn!(attempt, error = %e, "Backend connection attempt failed, retrying");
                    tokio::time::sleep(self.policy.retry_delay).await;
                }
                Err(e) => {
                    warn!(error = %e, "Backend connection failed; falling back to simulator");
                    self.connection.mark_error(e.to_string());
                }
            }
        }
        false
    }

    /// Tear down the remote session for an agent, if it has one
    pub async fn release_session(&self, agent_id: &str) {
        if let Some(remote) = &self.remote {
            remote.release(agent_id).await;
        }
    }

    /// Tear down every remote session
    pub async fn shutdown(&self) {
        if let Some(remote) = &self.remote {
            remote.release_all().await;
        }
        self.connection.set_disconnected();
    }
}
