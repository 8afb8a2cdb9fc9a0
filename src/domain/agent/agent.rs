use super::value_objects::AgentStatus;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

/// Default number of output lines retained per agent
pub const DEFAULT_OUTPUT_CAPACITY: usize = 100;

/// Emoji used when an agent is added without one
pub const DEFAULT_EMOJI: &str = "🤖";

/// A named persona that receives commands
///
/// # Invariants
/// - Name and role are never blank
/// - `output` never holds more than the capacity it was appended with;
///   the oldest lines are dropped first
/// - `updated_at` is bumped on every mutation
///
/// # Example
/// ```
/// use squad_api::domain::agent::Agent;
///
/// let agent = Agent::new("cobb", "Cobb", "Lead / Architect", None).expect("valid agent");
/// assert_eq!(agent.name(), "Cobb");
/// assert_eq!(agent.emoji(), "🤖");
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct Agent {
    id: String,
    name: String,
    role: String,
    emoji: String,
    status: AgentStatus,
    current_task: Option<String>,
    output: VecDeque<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Agent {
    /// Creates a new idle agent
    ///
    /// # Returns
    /// * `Err(String)` - If name or role is blank
    pub fn new(
        id: impl Into<String>,
        name: &str,
        role: &str,
        emoji: Option<&str>,
    ) -> Result<Self, String> {
        let name = name.trim();
        let role = role.trim();

        if name.is_empty() {
            return Err("Agent name cannot be empty".to_string());
        }
        if role.is_empty() {
            return Err("Agent role cannot be empty".to_string());
        }

        let emoji = emoji
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .unwrap_or(DEFAULT_EMOJI);

        let now = Utc::now();
        Ok(Self {
            id: id.into(),
            name: name.to_string(),
            role: role.to_string(),
            emoji: emoji.to_string(),
            status: AgentStatus::Idle,
            current_task: None,
            output: VecDeque::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Appends an output line, dropping the oldest lines beyond `capacity`
    pub fn push_output(&mut self, line: impl Into<String>, capacity: usize) {
        self.output.push_back(line.into());
        while self.output.len() > capacity {
            self.output.pop_front();
        }
        self.touch();
    }

    /// Updates status and the task description shown alongside it
    pub fn set_status(&mut self, status: AgentStatus, task: Option<String>) {
        self.status = status;
        self.current_task = task;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    // ===== Getters =====

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn emoji(&self) -> &str {
        &self.emoji
    }

    pub fn status(&self) -> AgentStatus {
        self.status
    }

    pub fn current_task(&self) -> Option<&str> {
        self.current_task.as_deref()
    }

    /// Retained output, oldest first
    pub fn output(&self) -> impl Iterator<Item = &str> {
        self.output.iter().map(String::as_str)
    }

    pub fn output_len(&self) -> usize {
        self.output.len()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
