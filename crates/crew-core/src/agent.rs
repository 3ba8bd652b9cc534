//! Agent configuration
//!
//! An [`Agent`] is a named role bound to a goal, a backstory and the set of
//! tools it may use. Agents carry no behavior of their own; a task executed on
//! an agent's behalf reads its persona through [`Agent::render_context`].
//! Agents are immutable once built and are shared read-only between crews.

use crate::capability::CompletionParams;
use serde::Serialize;
use std::collections::BTreeSet;

/// A configured role with a goal, persona context and allowed capabilities
#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    role: String,
    goal: String,
    backstory: String,
    capabilities: BTreeSet<String>,
    parameters: CompletionParams,
}

/// The persona an agent contributes to every prompt issued on its behalf
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AgentContext<'a> {
    pub role: &'a str,
    pub goal: &'a str,
    pub backstory: &'a str,
}

impl Agent {
    /// Create a builder for an agent with the given role
    pub fn builder(role: impl Into<String>) -> AgentBuilder {
        AgentBuilder::new(role)
    }

    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn backstory(&self) -> &str {
        &self.backstory
    }

    /// Tool identifiers this agent is allowed to invoke
    pub fn capabilities(&self) -> &BTreeSet<String> {
        &self.capabilities
    }

    /// Completion parameters used for this agent's model calls
    pub fn parameters(&self) -> &CompletionParams {
        &self.parameters
    }

    /// Check whether the agent may use the named tool
    pub fn can_use(&self, tool: &str) -> bool {
        self.capabilities.contains(tool)
    }

    /// Persona context injected into prompts
    pub fn render_context(&self) -> AgentContext<'_> {
        AgentContext {
            role: &self.role,
            goal: &self.goal,
            backstory: &self.backstory,
        }
    }
}

/// Builder for [`Agent`]
#[derive(Debug, Clone)]
pub struct AgentBuilder {
    role: String,
    goal: String,
    backstory: String,
    capabilities: BTreeSet<String>,
    parameters: CompletionParams,
}

impl AgentBuilder {
    /// Create a new builder
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            goal: String::new(),
            backstory: String::new(),
            capabilities: BTreeSet::new(),
            parameters: CompletionParams::default(),
        }
    }

    /// Set the goal
    pub fn goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = goal.into();
        self
    }

    /// Set the backstory
    pub fn backstory(mut self, backstory: impl Into<String>) -> Self {
        self.backstory = backstory.into();
        self
    }

    /// Allow a single tool
    pub fn capability(mut self, tool: impl Into<String>) -> Self {
        self.capabilities.insert(tool.into());
        self
    }

    /// Allow several tools
    pub fn capabilities<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities.extend(tools.into_iter().map(Into::into));
        self
    }

    /// Set the completion parameters
    pub fn parameters(mut self, parameters: CompletionParams) -> Self {
        self.parameters = parameters;
        self
    }

    /// Build the agent
    pub fn build(self) -> Agent {
        Agent {
            role: self.role,
            goal: self.goal,
            backstory: self.backstory,
            capabilities: self.capabilities,
            parameters: self.parameters,
        }
    }
}
