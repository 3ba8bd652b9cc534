//! LLM provider abstraction layer for stock-crew
//!
//! This crate provides provider-agnostic types for chat completions with tool
//! calling, the [`LLMProvider`] trait, and an OpenAI-compatible provider that
//! defaults to Gemini's OpenAI endpoint.

pub mod completion;
pub mod error;
pub mod messages;
pub mod provider;
pub mod providers;
pub mod tools;

// Re-export main types
pub use completion::{CompletionRequest, CompletionResponse, StopReason, TokenUsage};
pub use error::{LLMError, Result};
pub use messages::{ContentBlock, Message, Role};
pub use provider::LLMProvider;
pub use tools::ToolDefinition;
