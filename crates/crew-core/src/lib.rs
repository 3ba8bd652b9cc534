//! Core data model for stock-crew
//!
//! This crate defines the agents, tasks and request inputs that a crew
//! orchestrates, the pure prompt assembly function, and the
//! [`CapabilityProvider`] seam through which tasks reach models and tools.

pub mod agent;
pub mod capability;
pub mod error;
pub mod inputs;
pub mod prompt;
pub mod task;

pub use agent::{Agent, AgentBuilder, AgentContext};
pub use capability::{CapabilityProvider, CompletionParams};
pub use error::{CapabilityError, Error, Result};
pub use inputs::Inputs;
pub use prompt::{Prompt, render_prompt};
pub use task::{Task, TaskBuilder, TaskOutput};
