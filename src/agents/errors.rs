use thiserror::Error;

/// Errors that can occur while routing and executing commands
#[derive(Debug, Error)]
pub enum SquadError {
    #[error("No agents available to handle command")]
    NoAgentsAvailable,

    #[error("Session creation failed: {0}")]
    SessionCreation(String),

    #[error("Execution timed out after {0} ms")]
    Timeout(u64),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Backend unreachable: {0}")]
    Unreachable(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Agent not found: {0}")]
    UnknownAgent(String),

    #[error("Command not found: {0}")]
    UnknownCommand(String),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SquadError {
    /// True for failures that mean the execution backend itself is unreachable
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, SquadError::Backend(_) | SquadError::Unreachable(_))
    }

    /// True for errors rejected synchronously at the boundary
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SquadError::Validation(_) | SquadError::UnknownAgent(_) | SquadError::UnknownCommand(_)
        )
    }
}

impl From<reqwest::Error> for SquadError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() {
            SquadError::Unreachable(err.to_string())
        } else {
            SquadError::Backend(err.to_string())
        }
    }
}

pub type SquadResult<T> = Result<T, SquadError>;
