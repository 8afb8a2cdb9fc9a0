// Messages exchanged with the remote execution backend
//
// The backend streams one JSON object per line while it works on a prompt.

use serde::{Deserialize, Serialize};

/// Request body for creating a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub system_prompt: String,
}

/// Response body for a created session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
}

/// Request body for sending a prompt into a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendPromptRequest {
    pub prompt: String,
}

/// Incremental events observed while the backend handles a prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A chunk of the assistant's reply
    MessageDelta { content: String },
    /// The complete reply, sent once at the end
    Message { content: String },
    ToolStarted { tool_name: String },
    ToolCompleted { tool_name: String },
    /// The backend finished handling the prompt
    Idle,
    Error { message: String },
}

impl SessionEvent {
    /// Line shown in the output stream for tool activity
    pub fn tool_line(&self) -> Option<String> {
        match self {
            SessionEvent::ToolStarted { tool_name } => Some(format!("🔧 Using tool: {}", tool_name)),
            SessionEvent::ToolCompleted { tool_name } => {
                Some(format!("✓ Tool complete: {}", tool_name))
            }
            _ => None,
        }
    }
}
