//! Runtime for stock-crew
//!
//! This crate connects the crew's [`crew_core::CapabilityProvider`] seam to a
//! real model: [`LlmCapabilities`] runs a bounded tool-use loop against an
//! [`crew_llm::LLMProvider`] with tools drawn from a [`crew_tools::ToolRegistry`].

pub mod executor;

pub use executor::{CapabilityConfig, LlmCapabilities, LlmCapabilitiesBuilder, capability_error};
