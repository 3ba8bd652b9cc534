//! LLM-backed capability provider
//!
//! [`LlmCapabilities`] implements the agent loop behind
//! [`CapabilityProvider::complete`]:
//! 1. Call the model with the conversation and the task's allowed tools
//! 2. If the model requested tool calls, execute them and loop back
//! 3. If the model finished, return its text
//! 4. After `max_iterations` rounds, ask once more without tools for a final answer

use async_trait::async_trait;
use crew_core::{CapabilityError, CapabilityProvider, CompletionParams, Error, Prompt, Result};
use crew_llm::{
    CompletionRequest, CompletionResponse, ContentBlock, LLMError, LLMProvider, Message,
    StopReason, ToolDefinition,
};
use crew_tools::{SEARCH_TOOL, ToolRegistry};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const FINAL_ANSWER_PROMPT: &str = "You have used the maximum number of tool calls. \
Do not call any more tools. Give your best complete final answer now.";

/// Configuration for model calls
#[derive(Debug, Clone)]
pub struct CapabilityConfig {
    /// Model identifier sent with every request
    pub model: String,

    /// Maximum model calls with tools before a final answer is forced
    pub max_iterations: usize,

    /// Time budget for a single model call
    pub call_timeout: Duration,
}

impl Default for CapabilityConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash-exp".to_string(),
            max_iterations: 15,
            call_timeout: Duration::from_secs(120),
        }
    }
}

/// Classify a provider error into the capability failure kinds tasks report
pub fn capability_error(err: LLMError) -> CapabilityError {
    match &err {
        LLMError::Authentication(_) => CapabilityError::Authentication(err.to_string()),
        LLMError::RateLimited => CapabilityError::Quota(err.to_string()),
        LLMError::UnexpectedResponse(msg) => CapabilityError::MalformedResponse(msg.clone()),
        LLMError::Http(_)
        | LLMError::Status { .. }
        | LLMError::InvalidRequest(_)
        | LLMError::ModelNotFound(_)
        | LLMError::Configuration(_) => CapabilityError::Transport(err.to_string()),
    }
}

/// Capability provider that talks to an [`LLMProvider`] and a [`ToolRegistry`]
///
/// Constructed once per process and shared by every task execution.
pub struct LlmCapabilities {
    provider: Arc<dyn LLMProvider>,
    tool_registry: Arc<ToolRegistry>,
    config: CapabilityConfig,
}

impl LlmCapabilities {
    /// Create a new capability provider
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        tool_registry: Arc<ToolRegistry>,
        config: CapabilityConfig,
    ) -> Self {
        Self {
            provider,
            tool_registry,
            config,
        }
    }

    /// Create a builder
    pub fn builder() -> LlmCapabilitiesBuilder {
        LlmCapabilitiesBuilder::new()
    }

    pub fn config(&self) -> &CapabilityConfig {
        &self.config
    }

    /// Tool definitions for the registered tools the task may use
    fn tool_definitions(&self, allowed: &[String]) -> Vec<ToolDefinition> {
        for name in allowed {
            if !self.tool_registry.contains(name) {
                warn!(tool = %name, "Allowed tool is not registered, skipping");
            }
        }

        self.tool_registry
            .select(allowed)
            .iter()
            .map(|tool| ToolDefinition::new(tool.name(), tool.description(), tool.input_schema()))
            .collect()
    }

    fn request(
        &self,
        prompt: &Prompt,
        parameters: &CompletionParams,
        conversation: &[Message],
        tools: Vec<ToolDefinition>,
    ) -> CompletionRequest {
        CompletionRequest::builder(&self.config.model)
            .messages(conversation.to_vec())
            .system(prompt.system.clone())
            .max_tokens(parameters.max_tokens)
            .temperature(parameters.temperature)
            .top_p(parameters.top_p)
            .tools(tools)
            .build()
    }

    /// One model call bounded by the configured timeout
    async fn call(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, CapabilityError> {
        let limit = self.config.call_timeout;
        let response = tokio::time::timeout(limit, self.provider.complete(request))
            .await
            .map_err(|_| CapabilityError::Timeout(limit))?
            .map_err(capability_error)?;

        info!(
            stop_reason = ?response.stop_reason,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "LLM response received"
        );

        Ok(response)
    }

    /// Execute the tool calls of an assistant message
    ///
    /// Every call yields a result message; failures are reported back to the
    /// model as error results.
    async fn execute_tools(&self, message: &Message, allowed: &[String]) -> Vec<Message> {
        let mut results = Vec::new();

        for block in message.tool_uses() {
            let ContentBlock::ToolUse { id, name, input } = block else {
                continue;
            };

            if !allowed.contains(name) {
                warn!(tool_name = %name, "Model requested a tool outside the task's allowance");
                results.push(Message::tool_error(
                    id.clone(),
                    format!("Error: tool '{name}' is not available for this task"),
                ));
                continue;
            }

            let Some(tool) = self.tool_registry.get(name) else {
                results.push(Message::tool_error(
                    id.clone(),
                    format!("Error: tool '{name}' is not registered"),
                ));
                continue;
            };

            let input_preview: String = input.to_string().chars().take(500).collect();
            info!(
                tool_name = %name,
                tool_id = %id,
                input_preview = %input_preview,
                "Executing tool"
            );

            let start_time = Instant::now();
            match tool.execute(input.clone()).await {
                Ok(result) => {
                    let result_str = result.to_string();
                    info!(
                        tool_name = %name,
                        elapsed = ?start_time.elapsed(),
                        result_length = result_str.len(),
                        "Tool execution succeeded"
                    );
                    results.push(Message::tool_result(id.clone(), result_str));
                }
                Err(e) => {
                    warn!(
                        tool_name = %name,
                        elapsed = ?start_time.elapsed(),
                        error = %e,
                        "Tool execution failed"
                    );
                    results.push(Message::tool_error(id.clone(), format!("Error: {e}")));
                }
            }
        }

        results
    }
}

fn final_text(response: &CompletionResponse) -> std::result::Result<String, CapabilityError> {
    response
        .message
        .text()
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| {
            CapabilityError::MalformedResponse("completion contained no text".to_string())
        })
}

#[async_trait]
impl CapabilityProvider for LlmCapabilities {
    async fn complete(
        &self,
        prompt: &Prompt,
        parameters: &CompletionParams,
        tools: &[String],
    ) -> std::result::Result<String, CapabilityError> {
        let definitions = self.tool_definitions(tools);
        let mut conversation = vec![Message::user(prompt.user.clone())];

        for iteration in 1..=self.config.max_iterations {
            debug!(
                iteration,
                max_iterations = self.config.max_iterations,
                tool_count = definitions.len(),
                "Agent iteration started"
            );

            let request = self.request(prompt, parameters, &conversation, definitions.clone());
            let response = self.call(request).await?;

            match response.stop_reason {
                StopReason::ToolUse if response.message.has_tool_uses() => {
                    let results = self.execute_tools(&response.message, tools).await;
                    conversation.push(response.message);
                    conversation.extend(results);
                }
                StopReason::MaxTokens => {
                    warn!(
                        max_tokens = parameters.max_tokens,
                        "Completion truncated at token limit"
                    );
                    return final_text(&response);
                }
                _ => {
                    info!(iteration, "Agent completed");
                    return final_text(&response);
                }
            }
        }

        warn!(
            max_iterations = self.config.max_iterations,
            "Max iterations reached, forcing final answer"
        );
        conversation.push(Message::user(FINAL_ANSWER_PROMPT));
        let request = self.request(prompt, parameters, &conversation, Vec::new());
        let response = self.call(request).await?;
        final_text(&response)
    }

    async fn search(&self, query: &str) -> std::result::Result<String, CapabilityError> {
        let tool = self
            .tool_registry
            .get(SEARCH_TOOL)
            .ok_or_else(|| CapabilityError::ToolUnavailable(SEARCH_TOOL.to_string()))?;

        let result = tool
            .execute(serde_json::json!({ "query": query }))
            .await
            .map_err(|e| match e {
                Error::Capability(inner) => inner,
                other => CapabilityError::Transport(other.to_string()),
            })?;

        Ok(match result.get("results") {
            Some(Value::String(text)) => text.clone(),
            _ => result.to_string(),
        })
    }

    fn name(&self) -> &str {
        self.provider.name()
    }
}

/// Builder for [`LlmCapabilities`]
pub struct LlmCapabilitiesBuilder {
    provider: Option<Arc<dyn LLMProvider>>,
    tool_registry: Arc<ToolRegistry>,
    config: CapabilityConfig,
}

impl LlmCapabilitiesBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            provider: None,
            tool_registry: Arc::new(ToolRegistry::new()),
            config: CapabilityConfig::default(),
        }
    }

    /// Set the LLM provider
    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Set the tool registry
    pub fn tool_registry(mut self, registry: Arc<ToolRegistry>) -> Self {
        self.tool_registry = registry;
        self
    }

    /// Set the full configuration
    pub fn config(mut self, config: CapabilityConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set maximum tool rounds
    pub fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    /// Set the per-call timeout
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.config.call_timeout = timeout;
        self
    }

    /// Build the capability provider
    pub fn build(self) -> Result<LlmCapabilities> {
        let provider = self
            .provider
            .ok_or_else(|| Error::Configuration("LLM provider not set".to_string()))?;

        Ok(LlmCapabilities::new(provider, self.tool_registry, self.config))
    }
}

impl Default for LlmCapabilitiesBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crew_llm::{CompletionResponse, Role, TokenUsage};
    use crew_tools::Tool;
    use reqwest::StatusCode;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Provider that replays scripted responses and records requests
    struct ScriptedProvider {
        responses: Mutex<VecDeque<crew_llm::Result<CompletionResponse>>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<crew_llm::Result<CompletionResponse>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> crew_llm::Result<CompletionResponse> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(text_response("default")))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    /// Provider that never answers in time
    struct SlowProvider;

    #[async_trait]
    impl LLMProvider for SlowProvider {
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> crew_llm::Result<CompletionResponse> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(text_response("too late"))
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    struct SearchStub {
        fail: bool,
    }

    #[async_trait]
    impl Tool for SearchStub {
        async fn execute(&self, params: Value) -> Result<Value> {
            if self.fail {
                return Err(CapabilityError::Quota("search quota".into()).into());
            }
            Ok(json!({"query": params["query"], "results": "ACME up 4% on earnings"}))
        }

        fn name(&self) -> &str {
            SEARCH_TOOL
        }

        fn description(&self) -> &str {
            "search stub"
        }

        fn input_schema(&self) -> Value {
            json!({"type": "object"})
        }
    }

    fn text_response(text: &str) -> CompletionResponse {
        CompletionResponse {
            message: Message::assistant(text),
            stop_reason: StopReason::EndTurn,
            usage: TokenUsage::default(),
        }
    }

    fn tool_call_response(id: &str) -> CompletionResponse {
        CompletionResponse {
            message: Message {
                role: Role::Assistant,
                content: vec![ContentBlock::ToolUse {
                    id: id.to_string(),
                    name: SEARCH_TOOL.to_string(),
                    input: json!({"query": "ACME news"}),
                }],
            },
            stop_reason: StopReason::ToolUse,
            usage: TokenUsage::default(),
        }
    }

    fn prompt() -> Prompt {
        Prompt {
            system: "You are Analyst.".to_string(),
            user: "Current Task: analyze ACME".to_string(),
        }
    }

    fn registry(fail: bool) -> Arc<ToolRegistry> {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(SearchStub { fail }));
        Arc::new(registry)
    }

    fn capabilities(
        provider: Arc<dyn LLMProvider>,
        registry: Arc<ToolRegistry>,
    ) -> LlmCapabilities {
        LlmCapabilities::builder()
            .provider(provider)
            .tool_registry(registry)
            .model("test-model")
            .max_iterations(2)
            .build()
            .unwrap()
    }

    fn search_allowed() -> Vec<String> {
        vec![SEARCH_TOOL.to_string()]
    }

    #[tokio::test]
    async fn test_plain_completion_sends_persona_and_params() {
        let provider = ScriptedProvider::new(vec![Ok(text_response("ACME looks healthy"))]);
        let caps = capabilities(provider.clone(), registry(false));

        let text = caps
            .complete(&prompt(), &CompletionParams::default(), &[])
            .await
            .unwrap();
        assert_eq!(text, "ACME looks healthy");

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].model, "test-model");
        assert_eq!(requests[0].system.as_deref(), Some("You are Analyst."));
        assert_eq!(requests[0].temperature, Some(0.5));
        assert_eq!(requests[0].top_p, Some(0.9));
        assert_eq!(requests[0].max_tokens, 1024);
        assert!(requests[0].tools.is_none());
    }

    #[tokio::test]
    async fn test_tool_loop_feeds_results_back() {
        let provider = ScriptedProvider::new(vec![
            Ok(tool_call_response("call_1")),
            Ok(text_response("Summary with news")),
        ]);
        let caps = capabilities(provider.clone(), registry(false));

        let text = caps
            .complete(&prompt(), &CompletionParams::default(), &search_allowed())
            .await
            .unwrap();
        assert_eq!(text, "Summary with news");

        let requests = provider.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].tools.as_ref().map(Vec::len), Some(1));

        let last = requests[1].messages.last().unwrap();
        assert!(matches!(
            &last.content[0],
            ContentBlock::ToolResult { tool_use_id, content, is_error: false }
                if tool_use_id == "call_1" && content.contains("ACME up 4%")
        ));
    }

    #[tokio::test]
    async fn test_tool_failure_is_reported_to_model() {
        let provider = ScriptedProvider::new(vec![
            Ok(tool_call_response("call_1")),
            Ok(text_response("Answer without search")),
        ]);
        let caps = capabilities(provider.clone(), registry(true));

        let text = caps
            .complete(&prompt(), &CompletionParams::default(), &search_allowed())
            .await
            .unwrap();
        assert_eq!(text, "Answer without search");

        let requests = provider.requests();
        let last = requests[1].messages.last().unwrap();
        assert!(matches!(
            &last.content[0],
            ContentBlock::ToolResult { is_error: true, content, .. } if content.contains("quota")
        ));
    }

    #[tokio::test]
    async fn test_disallowed_tool_call_is_refused() {
        let provider = ScriptedProvider::new(vec![
            Ok(tool_call_response("call_1")),
            Ok(text_response("done")),
        ]);
        let caps = capabilities(provider.clone(), registry(false));

        caps.complete(&prompt(), &CompletionParams::default(), &[])
            .await
            .unwrap();

        let requests = provider.requests();
        let last = requests[1].messages.last().unwrap();
        assert!(matches!(
            &last.content[0],
            ContentBlock::ToolResult { is_error: true, content, .. }
                if content.contains("not available")
        ));
    }

    #[tokio::test]
    async fn test_max_iterations_forces_final_answer() {
        let provider = ScriptedProvider::new(vec![
            Ok(tool_call_response("call_1")),
            Ok(tool_call_response("call_2")),
            Ok(text_response("Final answer")),
        ]);
        let caps = capabilities(provider.clone(), registry(false));

        let text = caps
            .complete(&prompt(), &CompletionParams::default(), &search_allowed())
            .await
            .unwrap();
        assert_eq!(text, "Final answer");

        let requests = provider.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests[2].tools.is_none());
        assert_eq!(
            requests[2].messages.last().and_then(Message::text).as_deref(),
            Some(FINAL_ANSWER_PROMPT)
        );
    }

    #[tokio::test]
    async fn test_provider_errors_are_classified() {
        let provider = ScriptedProvider::new(vec![Err(LLMError::RateLimited)]);
        let caps = capabilities(provider, registry(false));

        let err = caps
            .complete(&prompt(), &CompletionParams::default(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::Quota(_)));
    }

    #[test]
    fn test_status_errors_map_to_capability_kinds() {
        let classify = |status: u16| {
            let status = StatusCode::from_u16(status).unwrap();
            capability_error(LLMError::from_status(status, r#"{"error": "nope"}"#, "m"))
        };

        assert!(matches!(classify(401), CapabilityError::Authentication(_)));
        assert!(matches!(classify(403), CapabilityError::Authentication(_)));
        assert!(matches!(classify(429), CapabilityError::Quota(_)));
        assert!(matches!(classify(400), CapabilityError::Transport(msg) if msg.contains("nope")));
        assert!(matches!(
            classify(404),
            CapabilityError::Transport(msg) if msg == "Model not found: m"
        ));
        assert!(matches!(
            classify(500),
            CapabilityError::Transport(msg) if msg == "Provider returned HTTP 500: nope"
        ));
        assert!(matches!(
            capability_error(LLMError::UnexpectedResponse("no choices".into())),
            CapabilityError::MalformedResponse(_)
        ));
    }

    #[tokio::test]
    async fn test_empty_completion_is_malformed() {
        let provider = ScriptedProvider::new(vec![Ok(text_response("   "))]);
        let caps = capabilities(provider, registry(false));

        let err = caps
            .complete(&prompt(), &CompletionParams::default(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::MalformedResponse(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_timeout() {
        let caps = LlmCapabilities::builder()
            .provider(Arc::new(SlowProvider))
            .call_timeout(Duration::from_secs(5))
            .build()
            .unwrap();

        let err = caps
            .complete(&prompt(), &CompletionParams::default(), &[])
            .await
            .unwrap_err();
        assert_eq!(err, CapabilityError::Timeout(Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn test_search_dispatches_to_registered_tool() {
        let provider = ScriptedProvider::new(vec![]);
        let caps = capabilities(provider.clone(), registry(false));

        let snippet = caps.search("ACME news").await.unwrap();
        assert_eq!(snippet, "ACME up 4% on earnings");
        assert!(provider.requests().is_empty());

        let failing = capabilities(ScriptedProvider::new(vec![]), registry(true));
        assert_eq!(
            failing.search("ACME").await.unwrap_err(),
            CapabilityError::Quota("search quota".into())
        );

        let bare = capabilities(ScriptedProvider::new(vec![]), Arc::new(ToolRegistry::new()));
        assert!(matches!(
            bare.search("ACME").await.unwrap_err(),
            CapabilityError::ToolUnavailable(_)
        ));
    }

    #[test]
    fn test_builder_requires_provider() {
        assert!(LlmCapabilities::builder().build().is_err());
    }
}
