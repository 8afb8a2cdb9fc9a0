// Local command simulator
//
// Stands in for the remote backend when it is unreachable. Responses are
// canned per intent; pacing only exists so the UI shows progress.

use async_trait::async_trait;
use rand::Rng;
use std::ops::RangeInclusive;
use std::time::Duration;

use super::backend::{ExecutionRequest, Executor, OutputSink};
use super::errors::SquadResult;
use super::types::ExecutorKind;
use crate::domain::agent::{Agent, AgentStatus};
use crate::domain::events::OutputKind;

/// Intent recognised in a command's text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Introduction,
    Status,
    Help,
    Architecture,
    Build,
    Test,
    Acknowledge,
}

impl Intent {
    /// Classify by case-insensitive substring, first match wins
    ///
    /// A bare "team" only means an introduction when no status keyword is
    /// present, so "what's the team status?" is a status request.
    pub fn classify(text: &str) -> Intent {
        let text = text.to_lowercase();
        let has = |keywords: &[&str]| keywords.iter().any(|k| text.contains(k));

        if has(&["introduce", "who"]) {
            Intent::Introduction
        } else if has(&["status", "health", "how are"]) {
            Intent::Status
        } else if has(&["team"]) {
            Intent::Introduction
        } else if has(&["help", "what can"]) {
            Intent::Help
        } else if has(&["architect", "design", "plan"]) {
            Intent::Architecture
        } else if has(&["build", "code", "implement", "create"]) {
            Intent::Build
        } else if has(&["test", "verify", "check"]) {
            Intent::Test
        } else {
            Intent::Acknowledge
        }
    }
}

/// Pauses between simulator output stages, in milliseconds
#[derive(Debug, Clone)]
pub struct SimulatorPacing {
    pub before_thinking: RangeInclusive<u64>,
    pub before_body: RangeInclusive<u64>,
    pub between_lines: RangeInclusive<u64>,
}

impl SimulatorPacing {
    /// No pauses at all
    pub fn instant() -> Self {
        Self {
            before_thinking: 0..=0,
            before_body: 0..=0,
            between_lines: 0..=0,
        }
    }

    fn pick(range: &RangeInclusive<u64>) -> Duration {
        if range.start() >= range.end() {
            return Duration::from_millis(*range.start());
        }
        Duration::from_millis(rand::thread_rng().gen_range(range.clone()))
    }
}

impl Default for SimulatorPacing {
    fn default() -> Self {
        Self {
            before_thinking: 600..=1200,
            before_body: 800..=1600,
            between_lines: 200..=500,
        }
    }
}

/// Canned-response executor used while the backend is unavailable
#[derive(Debug, Clone, Default)]
pub struct LocalSimulator {
    pacing: SimulatorPacing,
}

impl LocalSimulator {
    pub fn new(pacing: SimulatorPacing) -> Self {
        Self { pacing }
    }

    /// Body lines for a command, without pacing
    pub fn respond(agent: &Agent, roster: &[Agent], text: &str) -> Vec<String> {
        let name = agent.name();
        let role = agent.role();

        match Intent::classify(text) {
            Intent::Introduction => {
                let mut lines = vec![format!("👋 {}: Let me introduce the team —", name)];
                lines.extend(
                    roster
                        .iter()
                        .map(|a| format!("   {} {} — {}", a.emoji(), a.name(), a.role())),
                );
                lines.push(format!("That's {} agents ready to work.", roster.len()));
                lines
            }
            Intent::Status => {
                let count = |status: AgentStatus| roster.iter().filter(|a| a.status() == status).count();
                vec![
                    format!("📊 {}: Current team status —", name),
                    format!(
                        "   {} idle, {} busy, {} total",
                        count(AgentStatus::Idle),
                        count(AgentStatus::Busy),
                        roster.len()
                    ),
                    "   All systems operational.".to_string(),
                ]
            }
            Intent::Help => vec![
                format!("📖 {}: Here's what I can help with —", name),
                "   • \"introduce me to the team\" — meet all agents".to_string(),
                "   • \"status\" — check team health".to_string(),
                "   • \"@agent <task>\" — direct a specific agent".to_string(),
                format!(
                    "   • Any task — I'll analyze and respond based on my role ({})",
                    role
                ),
            ],
            Intent::Architecture => vec![
                format!("🏗️ {} ({}): Analyzing architecture requirements...", name, role),
                "   → Evaluating component structure".to_string(),
                "   → Checking dependency graph".to_string(),
                "   → Proposing module boundaries".to_string(),
                "   Recommendation: Break this into smaller, testable modules with clear interfaces."
                    .to_string(),
            ],
            Intent::Build => vec![
                format!("⚡ {} ({}): Working on implementation...", name, role),
                "   → Setting up scaffolding".to_string(),
                "   → Writing core logic".to_string(),
                "   → Adding error handling".to_string(),
                "   Implementation ready for review.".to_string(),
            ],
            Intent::Test => vec![
                format!("🧪 {} ({}): Running verification...", name, role),
                "   → Analyzing test coverage".to_string(),
                "   → Checking edge cases".to_string(),
                "   → Validating outputs".to_string(),
                "   All checks passed. ✓".to_string(),
            ],
            Intent::Acknowledge => vec![
                format!("⚡ {} ({}): Processing \"{}\"", name, role, text),
                "   → Understood. Working on it...".to_string(),
                "   → Task completed.".to_string(),
            ],
        }
    }

    /// Stream a simulated exchange into `sink` and return the body lines
    ///
    /// Order is always: received, thinking, body lines, done.
    pub async fn run(
        &self,
        agent: &Agent,
        roster: &[Agent],
        text: &str,
        sink: &dyn OutputSink,
    ) -> Vec<String> {
        let name = agent.name();

        sink.emit(OutputKind::Received, format!("📥 {} received: \"{}\"", name, text))
            .await;
        pause(SimulatorPacing::pick(&self.pacing.before_thinking)).await;

        sink.emit(
            OutputKind::Analyzing,
            format!("💭 {} is analyzing the request...", name),
        )
        .await;
        pause(SimulatorPacing::pick(&self.pacing.before_body)).await;

        let body = Self::respond(agent, roster, text);
        for line in &body {
            sink.emit(OutputKind::Response, line.clone()).await;
            pause(SimulatorPacing::pick(&self.pacing.between_lines)).await;
        }

        sink.emit(OutputKind::Success, "✅ Done.".to_string()).await;
        body
    }
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

#[async_trait]
impl Executor for LocalSimulator {
    fn kind(&self) -> ExecutorKind {
        ExecutorKind::Simulator
    }

    async fn execute(
        &self,
        request: ExecutionRequest<'_>,
        sink: &dyn OutputSink,
    ) -> SquadResult<String> {
        let body = self
            .run(request.agent, request.roster, request.text, sink)
            .await;
        Ok(body.join("\n"))
    }
}
