use async_trait::async_trait;

use crate::agents::errors::SquadResult;
use crate::domain::agent::{Agent, AgentStatus};

/// Repository trait for the agent roster
///
/// Implementations own id generation and the output cap. Every mutation
/// returns the updated snapshot so callers can publish it.
#[async_trait]
pub trait AgentRegistry: Send + Sync {
    /// Add an idle agent with a derived, unique id
    async fn add(&self, name: &str, role: &str, emoji: Option<&str>) -> SquadResult<Agent>;

    /// Remove an agent, returning its last snapshot
    async fn remove(&self, agent_id: &str) -> SquadResult<Agent>;

    /// All agents in insertion order
    async fn list(&self) -> Vec<Agent>;

    /// Find an agent by id
    async fn find(&self, agent_id: &str) -> Option<Agent>;

    /// Append an output line, truncating to the configured cap
    async fn append_output(&self, agent_id: &str, line: &str) -> SquadResult<Agent>;

    /// Update status and current task
    async fn set_status(
        &self,
        agent_id: &str,
        status: AgentStatus,
        task: Option<String>,
    ) -> SquadResult<Agent>;

    /// Move an agent from `Error` back to `Idle`; `None` if it was not in `Error`
    async fn recover(&self, agent_id: &str) -> SquadResult<Option<Agent>>;
}
