//! Tool trait definition

use async_trait::async_trait;
use crew_core::Result;
use serde_json::Value;

/// Trait for tools that agents can execute
///
/// Each tool has a unique name, a description shown to the model, and a JSON
/// Schema describing its input.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Execute the tool with parameters matching `input_schema`
    async fn execute(&self, params: Value) -> Result<Value>;

    /// Unique tool name within a [`crate::ToolRegistry`]
    fn name(&self) -> &str;

    /// Description that helps the model decide when to call the tool
    fn description(&self) -> &str;

    /// Input schema (JSON Schema format)
    fn input_schema(&self) -> Value;
}
