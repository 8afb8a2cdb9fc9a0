use super::agent::Agent;
use super::queue::QueueItem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Category of a line in the live output stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Info,
    Received,
    Analyzing,
    Working,
    Action,
    Response,
    Success,
    Warning,
    Error,
}

/// State of the link to the execution backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Connection state plus the last error, as shown to observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub error: Option<String>,
}

impl ConnectionStatus {
    pub fn new(state: ConnectionState) -> Self {
        Self { state, error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            state: ConnectionState::Error,
            error: Some(error.into()),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

/// Events published to every observer of the squad
///
/// Serialized as `{"type": "...", "data": {...}}` with kebab-case type
/// names, which is the shape UI clients consume.
///
/// # Example
/// ```
/// use squad_api::domain::events::SquadEvent;
///
/// let event = SquadEvent::AgentRemoved { agent_id: "eames".to_string() };
/// let json = serde_json::to_value(&event).unwrap();
/// assert_eq!(json["type"], "agent-removed");
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum SquadEvent {
    /// Full snapshot after any change to an agent
    AgentUpdated { agent: Agent },
    AgentAdded { agent: Agent },
    AgentRemoved { agent_id: String },
    CommandStarted { command_id: Uuid, agent_id: String },
    CommandCompleted { command_id: Uuid, result: String },
    CommandFailed { command_id: Uuid, error: String },
    /// Delta for a single queue item
    QueueItemUpdated { item: QueueItem },
    /// Full queue, sent after reordering
    QueueUpdated { queue: Vec<QueueItem> },
    OutputLine {
        text: String,
        kind: OutputKind,
        timestamp: DateTime<Utc>,
        agent_id: Option<String>,
        agent_name: String,
    },
    ConnectionStatusChanged {
        state: ConnectionState,
        error: Option<String>,
    },
}

impl SquadEvent {
    /// Returns the command id for command and queue events
    pub fn command_id(&self) -> Option<Uuid> {
        match self {
            SquadEvent::CommandStarted { command_id, .. }
            | SquadEvent::CommandCompleted { command_id, .. }
            | SquadEvent::CommandFailed { command_id, .. } => Some(*command_id),
            SquadEvent::QueueItemUpdated { item } => Some(item.id()),
            _ => None,
        }
    }

    /// Returns the agent id this event concerns, if any
    pub fn agent_id(&self) -> Option<&str> {
        match self {
            SquadEvent::AgentUpdated { agent } | SquadEvent::AgentAdded { agent } => {
                Some(agent.id())
            }
            SquadEvent::AgentRemoved { agent_id } | SquadEvent::CommandStarted { agent_id, .. } => {
                Some(agent_id.as_str())
            }
            SquadEvent::OutputLine { agent_id, .. } => agent_id.as_deref(),
            SquadEvent::QueueItemUpdated { item } => item.assigned_agent_id(),
            _ => None,
        }
    }
}
