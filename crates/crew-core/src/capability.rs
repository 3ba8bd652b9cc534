//! Capability provider trait
//!
//! Tasks never talk to a model or a tool directly. They go through a
//! [`CapabilityProvider`] that is constructed once per process and handed to
//! every task execution, which keeps prompt construction free of global state
//! and lets tests substitute a stub.

use crate::error::CapabilityError;
use crate::prompt::Prompt;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Sampling parameters for a completion call
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletionParams {
    /// Sampling temperature
    pub temperature: f32,

    /// Maximum tokens to generate
    pub max_tokens: usize,

    /// Nucleus sampling cutoff
    pub top_p: f32,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            temperature: 0.5,
            max_tokens: 1024,
            top_p: 0.9,
        }
    }
}

/// External operations a task may invoke
///
/// `complete` may run a bounded tool-use loop internally; any tool it offers
/// to the model must come from `tools`, the set the calling task is allowed
/// to use.
#[async_trait]
pub trait CapabilityProvider: Send + Sync {
    /// Produce a text completion for the prompt
    async fn complete(
        &self,
        prompt: &Prompt,
        parameters: &CompletionParams,
        tools: &[String],
    ) -> Result<String, CapabilityError>;

    /// Run a search query and return a text snippet
    async fn search(&self, query: &str) -> Result<String, CapabilityError>;

    /// Provider name, used in logs
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let params = CompletionParams::default();
        assert_eq!(params.temperature, 0.5);
        assert_eq!(params.max_tokens, 1024);
        assert_eq!(params.top_p, 0.9);
    }
}
