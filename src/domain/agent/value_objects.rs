use serde::{Deserialize, Serialize};

/// Represents the current availability of an agent
///
/// `Busy` is set for the duration of a running command. `Error` is
/// transient: the router resets it to `Idle` shortly after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Agent is waiting for work
    Idle,
    /// Agent is processing a command
    Busy,
    /// Agent cannot make progress
    Blocked,
    /// Agent is not reachable
    Offline,
    /// Agent's last command failed
    Error,
}

impl AgentStatus {
    /// Whether the agent is free to pick up auto-routed work
    pub fn is_available(&self) -> bool {
        matches!(self, AgentStatus::Idle)
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AgentStatus::Idle => write!(f, "idle"),
            AgentStatus::Busy => write!(f, "busy"),
            AgentStatus::Blocked => write!(f, "blocked"),
            AgentStatus::Offline => write!(f, "offline"),
            AgentStatus::Error => write!(f, "error"),
        }
    }
}

/// Derives a stable agent id from a display name
///
/// Lowercases, turns whitespace runs into `-` and drops anything that is
/// not alphanumeric or `-`. Returns `None` when nothing usable remains.
///
/// # Example
/// ```
/// use squad_api::domain::agent::value_objects::slugify;
///
/// assert_eq!(slugify("Mister Eames").as_deref(), Some("mister-eames"));
/// assert_eq!(slugify("🤖"), None);
/// ```
pub fn slugify(name: &str) -> Option<String> {
    let slug = name
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric() || *c == '-')
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if slug.is_empty() {
        None
    } else {
        Some(slug)
    }
}
