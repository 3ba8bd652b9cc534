//! Task definition and execution

use crate::agent::Agent;
use crate::capability::CapabilityProvider;
use crate::error::CapabilityError;
use crate::inputs::Inputs;
use crate::prompt::render_prompt;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Text produced by one task execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskOutput {
    /// Id of the task that produced this output
    pub task_id: String,

    /// Role of the agent that executed the task
    pub agent_role: String,

    /// Raw completion text
    pub raw: String,
}

/// A unit of work assigned to one agent
///
/// Tasks reference their dependencies by id. The result is written once by
/// [`Task::execute`] and never changes afterwards; a second execution is
/// rejected.
#[derive(Debug, Clone)]
pub struct Task {
    id: String,
    description: String,
    expected_output: String,
    agent: Option<Arc<Agent>>,
    tools: Vec<String>,
    dependencies: Vec<String>,
    output: OnceLock<TaskOutput>,
}

impl Task {
    /// Create a builder for a task with the given id
    pub fn builder(id: impl Into<String>) -> TaskBuilder {
        TaskBuilder::new(id)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn expected_output(&self) -> &str {
        &self.expected_output
    }

    /// The agent responsible for this task, if one is bound
    pub fn agent(&self) -> Option<&Arc<Agent>> {
        self.agent.as_ref()
    }

    /// Tools available to this execution
    pub fn tools(&self) -> &[String] {
        &self.tools
    }

    /// Ids of the tasks that must complete first, in declaration order
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// The produced output, absent until execution completes
    pub fn output(&self) -> Option<&TaskOutput> {
        self.output.get()
    }

    /// Check the agent binding and that `tools` is a subset of its capabilities
    pub fn validate(&self) -> Result<&Agent> {
        let agent = self.agent.as_deref().ok_or_else(|| {
            Error::Configuration(format!("Task '{}' has no agent assigned", self.id))
        })?;

        if let Some(tool) = self.tools.iter().find(|tool| !agent.can_use(tool)) {
            return Err(Error::Configuration(format!(
                "Task '{}' uses tool '{}' which agent '{}' is not allowed to invoke",
                self.id,
                tool,
                agent.role()
            )));
        }

        Ok(agent)
    }

    /// Return a fresh copy with `inputs` substituted into the templates
    pub fn interpolate(&self, inputs: &Inputs) -> Result<Task> {
        Ok(Task {
            id: self.id.clone(),
            description: inputs.interpolate(&self.description)?,
            expected_output: inputs.interpolate(&self.expected_output)?,
            agent: self.agent.clone(),
            tools: self.tools.clone(),
            dependencies: self.dependencies.clone(),
            output: OnceLock::new(),
        })
    }

    /// Execute the task once
    ///
    /// `dependency_outputs` must hold the results of every declared
    /// dependency; the crew guarantees this before calling.
    pub async fn execute(
        &self,
        provider: &dyn CapabilityProvider,
        dependency_outputs: &[&TaskOutput],
    ) -> Result<TaskOutput> {
        let agent = self.validate()?;

        if self.output.get().is_some() {
            return Err(Error::Configuration(format!(
                "Task '{}' has already been executed",
                self.id
            )));
        }

        let prompt = render_prompt(agent, self, dependency_outputs);
        debug!(
            task = %self.id,
            agent = %agent.role(),
            provider = %provider.name(),
            context_items = dependency_outputs.len(),
            "Executing task"
        );

        let raw = provider
            .complete(&prompt, agent.parameters(), &self.tools)
            .await?;

        if raw.trim().is_empty() {
            return Err(CapabilityError::MalformedResponse("empty completion".to_string()).into());
        }

        let output = TaskOutput {
            task_id: self.id.clone(),
            agent_role: agent.role().to_string(),
            raw,
        };

        self.output.set(output.clone()).map_err(|_| {
            Error::Configuration(format!("Task '{}' has already been executed", self.id))
        })?;

        Ok(output)
    }
}

/// Builder for [`Task`]
#[derive(Debug, Clone)]
pub struct TaskBuilder {
    id: String,
    description: String,
    expected_output: String,
    agent: Option<Arc<Agent>>,
    tools: Vec<String>,
    dependencies: Vec<String>,
}

impl TaskBuilder {
    /// Create a new builder
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: String::new(),
            expected_output: String::new(),
            agent: None,
            tools: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    /// Set the description template
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the expected output hint
    pub fn expected_output(mut self, expected_output: impl Into<String>) -> Self {
        self.expected_output = expected_output.into();
        self
    }

    /// Bind the responsible agent
    pub fn agent(mut self, agent: Arc<Agent>) -> Self {
        self.agent = Some(agent);
        self
    }

    /// Allow a tool for this execution
    pub fn tool(mut self, tool: impl Into<String>) -> Self {
        let tool = tool.into();
        if !self.tools.contains(&tool) {
            self.tools.push(tool);
        }
        self
    }

    /// Declare a dependency on another task
    pub fn depends_on(mut self, task_id: impl Into<String>) -> Self {
        let task_id = task_id.into();
        if !self.dependencies.contains(&task_id) {
            self.dependencies.push(task_id);
        }
        self
    }

    /// Build the task
    pub fn build(self) -> Task {
        Task {
            id: self.id,
            description: self.description,
            expected_output: self.expected_output,
            agent: self.agent,
            tools: self.tools,
            dependencies: self.dependencies,
            output: OnceLock::new(),
        }
    }
}
