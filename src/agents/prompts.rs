// Prompt templates for backend sessions
//
// Templates use `{{variable}}` placeholders. Unknown placeholders are left
// in place so a missing variable is visible in the rendered prompt.

use std::collections::HashMap;

use crate::domain::agent::Agent;

/// Prompt template structure
pub struct PromptTemplate {
    pub template: String,
}

impl PromptTemplate {
    /// Render the template with variables
    pub fn render(&self, variables: &HashMap<&str, String>) -> String {
        let mut rendered = self.template.clone();
        for (key, value) in variables {
            rendered = rendered.replace(&format!("{{{{{}}}}}", key), value);
        }
        rendered
    }
}

/// System prompt for an agent's session, introducing its teammates
pub fn agent_system_prompt(agent: &Agent, roster: &[Agent]) -> String {
    let teammates = roster
        .iter()
        .filter(|a| a.id() != agent.id())
        .map(|a| format!("- {} {} ({})", a.emoji(), a.name(), a.role()))
        .collect::<Vec<_>>();

    let team = if teammates.is_empty() {
        "- (no teammates yet)".to_string()
    } else {
        teammates.join("\n")
    };

    let variables = HashMap::from([
        ("name", agent.name().to_string()),
        ("role", agent.role().to_string()),
        ("team", team),
    ]);

    library::agent_system().render(&variables)
}

pub mod library {
    use super::PromptTemplate;

    pub fn agent_system() -> PromptTemplate {
        PromptTemplate {
            template: "You are {{name}}, a {{role}} AI agent. You work as part of a Squad team. \
                       Be concise and actionable in your responses. Focus on your role expertise.\n\n\
                       Your teammates:\n\
                       {{team}}\n\n\
                       When part of a task belongs to a teammate, say so explicitly, \
                       for example \"I've asked <name> to ...\"."
                .to_string(),
        }
    }
}
