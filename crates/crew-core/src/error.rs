//! Error types for crew-core

use std::time::Duration;
use thiserror::Error;

/// Result type alias for crew-core
pub type Result<T> = std::result::Result<T, Error>;

/// Failure of an external capability (model completion or tool call)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    /// Network or HTTP failure talking to the provider
    #[error("transport failure: {0}")]
    Transport(String),

    /// Credential rejected by the provider
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Rate limit or quota exhausted
    #[error("quota exceeded: {0}")]
    Quota(String),

    /// Provider answered with something we could not use
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A single provider call exceeded its time budget
    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    /// Requested tool is not registered with the provider
    #[error("tool unavailable: {0}")]
    ToolUnavailable(String),
}

/// Error type for crew construction and execution
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed agent/task wiring
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The dependency graph contains a cycle
    #[error("Cyclic dependency detected: {}", .cycle.join(" -> "))]
    CyclicDependency {
        /// Task ids along the cycle, first id repeated at the end
        cycle: Vec<String>,
    },

    /// A task references a dependency that is not part of the crew
    #[error("Task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency { task: String, dependency: String },

    /// Model or tool call failed
    #[error("Capability error: {0}")]
    Capability(#[from] CapabilityError),

    /// A task failed during kickoff; remaining tasks were cancelled
    #[error("Task '{task}' ({agent}) failed: {source}")]
    CrewExecution {
        task: String,
        agent: String,
        source: Box<Error>,
    },

    /// The kickoff deadline elapsed before the terminal task completed
    #[error("Crew execution timed out after {limit:?}")]
    Timeout {
        limit: Duration,
        /// Tasks that never completed
        cancelled: Vec<String>,
    },

    /// Invalid request input, rejected before any task is built
    #[error("{0}")]
    Validation(String),
}

impl Error {
    /// Wrap a task-level failure with the identity of the failing task
    pub fn in_task(self, task: impl Into<String>, agent: impl Into<String>) -> Self {
        Error::CrewExecution {
            task: task.into(),
            agent: agent.into(),
            source: Box::new(self),
        }
    }

    /// Id of the task that failed, if this error came out of kickoff
    pub fn failed_task(&self) -> Option<&str> {
        match self {
            Error::CrewExecution { task, .. } => Some(task),
            _ => None,
        }
    }

    /// Whether the caller, rather than the system, caused this error
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}
