use crate::domain::agent::{Agent, AgentStatus};

/// Picks the agent for commands that name no target
///
/// Walks the roster from a persistent cursor and takes the first idle agent,
/// or the agent under the cursor when none is idle. Consecutive picks over an
/// idle roster therefore follow roster order and wrap around.
#[derive(Debug, Default)]
pub struct RoundRobinSelector {
    cursor: usize,
}

impl RoundRobinSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the next agent, or `None` for an empty roster
    pub fn next(&mut self, roster: &[Agent]) -> Option<String> {
        if roster.is_empty() {
            return None;
        }

        let len = roster.len();
        let start = self.cursor % len;
        let index = (0..len)
            .map(|offset| (start + offset) % len)
            .find(|&i| roster[i].status() == AgentStatus::Idle)
            .unwrap_or(start);

        self.cursor = index + 1;
        Some(roster[index].id().to_string())
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
    }
}
