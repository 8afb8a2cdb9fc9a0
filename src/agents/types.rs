use serde::Serialize;

use crate::domain::agent::Agent;
use crate::domain::events::ConnectionStatus;
use crate::domain::queue::QueueItem;

/// A piece of work handed to another agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delegation {
    pub target_agent_id: String,
    pub target_name: String,
    pub task: String,
}

/// Outcome of analyzing a command before dispatch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DelegationPlan {
    /// What the source agent still has to do; `None` when fully delegated
    pub remainder: Option<String>,
    pub delegations: Vec<Delegation>,
}

impl DelegationPlan {
    /// A plan that keeps the whole command with the source agent
    pub fn keep(text: &str) -> Self {
        Self {
            remainder: Some(text.to_string()),
            delegations: Vec::new(),
        }
    }

    pub fn is_fully_delegated(&self) -> bool {
        self.remainder.is_none() && !self.delegations.is_empty()
    }
}

/// Which strategy executed a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    Remote,
    Simulator,
}

impl std::fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutorKind::Remote => write!(f, "remote"),
            ExecutorKind::Simulator => write!(f, "simulator"),
        }
    }
}

/// Full current state for observers catching up
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub agents: Vec<Agent>,
    pub queue: Vec<QueueItem>,
    pub connection: ConnectionStatus,
    /// Events up to and including this sequence number are reflected
    pub last_seq: u64,
}
