//! Prompt assembly
//!
//! [`render_prompt`] is a pure function of the agent persona, the task and the
//! outputs of the task's dependencies.

use crate::agent::Agent;
use crate::task::{Task, TaskOutput};
use serde::{Deserialize, Serialize};

/// A rendered prompt: persona priming plus task instructions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    /// Persona priming (role, backstory, goal)
    pub system: String,

    /// Task instructions, upstream context and expected output
    pub user: String,
}

/// Compose the prompt for `task` executed by `agent`
///
/// `dependency_outputs` are appended as context in the order given; the crew
/// passes them in task declaration order.
pub fn render_prompt(agent: &Agent, task: &Task, dependency_outputs: &[&TaskOutput]) -> Prompt {
    let persona = agent.render_context();
    let system = format!(
        "You are {}. {}\nYour personal goal is: {}",
        persona.role, persona.backstory, persona.goal
    );

    let mut user = format!("Current Task: {}\n\n", task.description().trim());
    user.push_str(&format!(
        "This is the expected criteria for your final answer: {}\n\
         You MUST return the actual complete content as the final answer, not a summary.",
        task.expected_output().trim()
    ));

    if !dependency_outputs.is_empty() {
        user.push_str("\n\nThis is the context you're working with:\n");
        let context = dependency_outputs
            .iter()
            .map(|output| {
                format!(
                    "### {} ({})\n{}",
                    output.task_id,
                    output.agent_role,
                    output.raw.trim()
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        user.push_str(&context);
    }

    user.push_str(
        "\n\nBegin! This is VERY important to you, use the tools available and give your best \
         Final Answer.",
    );

    Prompt { system, user }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn advisor() -> Arc<Agent> {
        Arc::new(
            Agent::builder("Private Investment Advisor")
                .goal("Give advice")
                .backstory("Long track record.")
                .build(),
        )
    }

    fn output(id: &str, raw: &str) -> TaskOutput {
        TaskOutput {
            task_id: id.to_string(),
            agent_role: "Analyst".to_string(),
            raw: raw.to_string(),
        }
    }

    #[test]
    fn test_persona_in_system() {
        let agent = advisor();
        let task = Task::builder("advice")
            .description("Advise on ACME")
            .expected_output("A strategy")
            .agent(agent.clone())
            .build();

        let prompt = render_prompt(&agent, &task, &[]);
        assert!(prompt.system.starts_with("You are Private Investment Advisor."));
        assert!(prompt.system.contains("Your personal goal is: Give advice"));
        assert!(prompt.user.contains("Current Task: Advise on ACME"));
        assert!(prompt.user.contains("expected criteria for your final answer: A strategy"));
        assert!(!prompt.user.contains("context you're working with"));
    }

    #[test]
    fn test_dependency_context_keeps_order() {
        let agent = advisor();
        let task = Task::builder("advice")
            .description("Advise")
            .expected_output("A strategy")
            .agent(agent.clone())
            .build();

        let research = output("research", "news summary");
        let financial = output("financial_analysis", "ratios");
        let prompt = render_prompt(&agent, &task, &[&research, &financial]);

        let first = prompt.user.find("### research").unwrap();
        let second = prompt.user.find("### financial_analysis").unwrap();
        assert!(first < second);
        assert!(prompt.user.contains("news summary"));
        assert!(prompt.user.contains("ratios"));
    }

    #[test]
    fn test_render_is_pure() {
        let agent = advisor();
        let task = Task::builder("advice")
            .description("Advise")
            .expected_output("A strategy")
            .agent(agent.clone())
            .build();

        assert_eq!(render_prompt(&agent, &task, &[]), render_prompt(&agent, &task, &[]));
    }
}
