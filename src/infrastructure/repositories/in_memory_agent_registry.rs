use async_trait::async_trait;
use std::collections::HashSet;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::agents::errors::{SquadError, SquadResult};
use crate::domain::agent::value_objects::slugify;
use crate::domain::agent::{Agent, AgentStatus, DEFAULT_OUTPUT_CAPACITY};
use crate::domain::repositories::AgentRegistry;

#[derive(Default)]
struct Roster {
    agents: Vec<Agent>,
    /// Ids of removed agents; never handed out again
    retired: HashSet<String>,
}

impl Roster {
    fn is_taken(&self, id: &str) -> bool {
        self.retired.contains(id) || self.agents.iter().any(|a| a.id() == id)
    }
}

/// In-process implementation of AgentRegistry
///
/// Agents live in a `Vec` so listing preserves insertion order. An id is
/// unique over the registry's lifetime, so work still in flight for a
/// removed agent can never land on a newcomer with the same name.
pub struct InMemoryAgentRegistry {
    roster: RwLock<Roster>,
    output_capacity: usize,
}

impl InMemoryAgentRegistry {
    /// Creates an empty registry
    ///
    /// # Arguments
    /// * `output_capacity` - Lines of output retained per agent (at least 1)
    pub fn new(output_capacity: usize) -> Self {
        Self {
            roster: RwLock::new(Roster::default()),
            output_capacity: output_capacity.max(1),
        }
    }

    fn unique_id(roster: &Roster, name: &str) -> String {
        let base = slugify(name).unwrap_or_else(|| {
            let short = Uuid::new_v4().simple().to_string();
            format!("agent-{}", &short[..8])
        });

        if !roster.is_taken(&base) {
            return base;
        }

        let mut suffix = 2;
        loop {
            let candidate = format!("{}-{}", base, suffix);
            if !roster.is_taken(&candidate) {
                return candidate;
            }
            suffix += 1;
        }
    }

    async fn update<F>(&self, agent_id: &str, apply: F) -> SquadResult<Agent>
    where
        F: FnOnce(&mut Agent) + Send,
    {
        let mut roster = self.roster.write().await;
        let agent = roster
            .agents
            .iter_mut()
            .find(|a| a.id() == agent_id)
            .ok_or_else(|| SquadError::UnknownAgent(agent_id.to_string()))?;

        apply(agent);
        Ok(agent.clone())
    }
}

impl Default for InMemoryAgentRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_CAPACITY)
    }
}

#[async_trait]
impl AgentRegistry for InMemoryAgentRegistry {
    async fn add(&self, name: &str, role: &str, emoji: Option<&str>) -> SquadResult<Agent> {
        let mut roster = self.roster.write().await;
        let id = Self::unique_id(&roster, name);
        let agent = Agent::new(id, name, role, emoji).map_err(SquadError::Validation)?;

        roster.agents.push(agent.clone());
        Ok(agent)
    }

    async fn remove(&self, agent_id: &str) -> SquadResult<Agent> {
        let mut roster = self.roster.write().await;
        let index = roster
            .agents
            .iter()
            .position(|a| a.id() == agent_id)
            .ok_or_else(|| SquadError::UnknownAgent(agent_id.to_string()))?;

        roster.retired.insert(agent_id.to_string());
        Ok(roster.agents.remove(index))
    }

    async fn list(&self) -> Vec<Agent> {
        self.roster.read().await.agents.clone()
    }

    async fn find(&self, agent_id: &str) -> Option<Agent> {
        self.roster
            .read()
            .await
            .agents
            .iter()
            .find(|a| a.id() == agent_id)
            .cloned()
    }

    async fn append_output(&self, agent_id: &str, line: &str) -> SquadResult<Agent> {
        let capacity = self.output_capacity;
        self.update(agent_id, |agent| agent.push_output(line, capacity))
            .await
    }

    async fn set_status(
        &self,
        agent_id: &str,
        status: AgentStatus,
        task: Option<String>,
    ) -> SquadResult<Agent> {
        self.update(agent_id, |agent| agent.set_status(status, task))
            .await
    }

    async fn recover(&self, agent_id: &str) -> SquadResult<Option<Agent>> {
        let mut roster = self.roster.write().await;
        let agent = roster
            .agents
            .iter_mut()
            .find(|a| a.id() == agent_id)
            .ok_or_else(|| SquadError::UnknownAgent(agent_id.to_string()))?;

        if agent.status() != AgentStatus::Error {
            return Ok(None);
        }
        agent.set_status(AgentStatus::Idle, None);
        Ok(Some(agent.clone()))
    }
}
