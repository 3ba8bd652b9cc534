//! Tool management and execution framework for stock-crew
//!
//! This crate provides the [`Tool`] trait, a [`ToolRegistry`] for the tools a
//! capability provider may offer to a model, and the web search tool agents
//! use to gather market news.

pub mod registry;
pub mod search;
pub mod tool;

pub use registry::ToolRegistry;
pub use search::{SEARCH_TOOL, SerperSearchTool};
pub use tool::Tool;
