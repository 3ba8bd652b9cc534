//! Web search tool backed by the Serper API

use crate::Tool;
use async_trait::async_trait;
use crew_core::{CapabilityError, Error, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, instrument};

/// Name under which the search tool is registered and granted to agents
pub const SEARCH_TOOL: &str = "search";

const SERPER_API_BASE: &str = "https://google.serper.dev";
const DEFAULT_NUM_RESULTS: usize = 5;
const MAX_DETAIL_CHARS: usize = 200;

#[derive(Debug, Deserialize)]
struct SearchParams {
    query: String,
    #[serde(default = "default_num_results")]
    num_results: usize,
}

fn default_num_results() -> usize {
    DEFAULT_NUM_RESULTS
}

#[derive(Debug, Default, Deserialize)]
struct SerperResponse {
    #[serde(default, rename = "answerBox")]
    answer_box: Option<AnswerBox>,
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct AnswerBox {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    title: String,
    link: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    date: Option<String>,
}

/// Google search through Serper (`https://serper.dev`)
///
/// Input: `{"query": "...", "num_results": 5}`. Output: `{"query", "results"}`
/// where `results` is a text block with one entry per organic hit.
pub struct SerperSearchTool {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
}

impl SerperSearchTool {
    /// Create a search tool with the given API key
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            api_base: SERPER_API_BASE.to_string(),
        })
    }

    /// Point the tool at a different endpoint
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    #[instrument(skip(self), fields(api_base = %self.api_base))]
    async fn search(&self, params: SearchParams) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/search", self.api_base))
            .header("X-API-KEY", &self.api_key)
            .json(&json!({ "q": params.query, "num": params.num_results }))
            .send()
            .await
            .map_err(|e| CapabilityError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(%status, body = %body, "Search request rejected");
            return Err(status_error(status, &body).into());
        }

        let parsed: SerperResponse = response
            .json()
            .await
            .map_err(|e| CapabilityError::MalformedResponse(e.to_string()))?;

        debug!(hits = parsed.organic.len(), "Search completed");
        Ok(format_results(&parsed, params.num_results))
    }
}

/// Classify a non-success Serper response
///
/// Serper answers errors with `{"message": "...", "statusCode": N}`; only that
/// message, cut short, is kept. Quota responses carry no detail.
fn status_error(status: StatusCode, body: &str) -> CapabilityError {
    match status.as_u16() {
        401 | 403 => CapabilityError::Authentication(format!(
            "search API key rejected (HTTP {}): {}",
            status.as_u16(),
            error_detail(body)
        )),
        429 => CapabilityError::Quota("search credits or rate limit exhausted".to_string()),
        other => CapabilityError::Transport(format!("HTTP {other}: {}", error_detail(body))),
    }
}

fn error_detail(body: &str) -> String {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());
    message.chars().take(MAX_DETAIL_CHARS).collect()
}

/// Render search hits as a plain-text snippet for the model
fn format_results(response: &SerperResponse, limit: usize) -> String {
    let mut sections = Vec::new();

    if let Some(answer) = response
        .answer_box
        .as_ref()
        .and_then(|b| b.answer.clone().or_else(|| b.snippet.clone()))
    {
        sections.push(format!("Answer: {answer}"));
    }

    for hit in response.organic.iter().take(limit) {
        let mut entry = format!(
            "Title: {}\nLink: {}\nSnippet: {}",
            hit.title, hit.link, hit.snippet
        );
        if let Some(date) = &hit.date {
            entry.push_str(&format!("\nDate: {date}"));
        }
        sections.push(entry);
    }

    if sections.is_empty() {
        "No results found.".to_string()
    } else {
        sections.join("\n---\n")
    }
}

#[async_trait]
impl Tool for SerperSearchTool {
    async fn execute(&self, params: Value) -> Result<Value> {
        let params: SearchParams = serde_json::from_value(params)
            .map_err(|e| Error::Configuration(format!("Invalid parameters: {e}")))?;
        let query = params.query.clone();

        let results = self.search(params).await?;
        Ok(json!({ "query": query, "results": results }))
    }

    fn name(&self) -> &str {
        SEARCH_TOOL
    }

    fn description(&self) -> &str {
        "Search the internet for recent news, press releases, analyst opinions and \
         financial data. Returns titles, links and snippets of the top results."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query"
                },
                "num_results": {
                    "type": "integer",
                    "description": "Maximum number of results",
                    "default": DEFAULT_NUM_RESULTS
                }
            },
            "required": ["query"]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> SerperResponse {
        serde_json::from_value(json!({
            "answerBox": {"snippet": "ACME trades at 12x earnings"},
            "organic": [
                {
                    "title": "ACME beats estimates",
                    "link": "https://news.test/1",
                    "snippet": "Revenue up 8%",
                    "date": "2 days ago"
                },
                {"title": "ACME guidance", "link": "https://news.test/2", "snippet": "Raised"},
                {"title": "Sector roundup", "link": "https://news.test/3", "snippet": "Mixed"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_format_results_respects_limit() {
        let text = format_results(&fixture(), 2);

        assert!(text.starts_with("Answer: ACME trades at 12x earnings"));
        assert!(text.contains("Title: ACME beats estimates"));
        assert!(text.contains("Date: 2 days ago"));
        assert!(text.contains("Title: ACME guidance"));
        assert!(!text.contains("Sector roundup"));
    }

    #[test]
    fn test_format_empty_response() {
        assert_eq!(format_results(&SerperResponse::default(), 5), "No results found.");
    }

    #[test]
    fn test_invalid_params_rejected_before_network() {
        let tool = SerperSearchTool::new("key")
            .unwrap()
            .with_api_base("http://127.0.0.1:9");

        let err = tokio_test::assert_err!(tokio_test::block_on(
            tool.execute(json!({"q": "missing query field"}))
        ));
        assert!(matches!(err, Error::Configuration(msg) if msg.contains("Invalid parameters")));
    }

    #[test]
    fn test_status_errors_are_classified() {
        let classify =
            |status: u16, body: &str| status_error(StatusCode::from_u16(status).unwrap(), body);
        let unauthorized = r#"{"message": "Unauthorized.", "statusCode": 401}"#;

        assert_eq!(
            classify(401, unauthorized),
            CapabilityError::Authentication(
                "search API key rejected (HTTP 401): Unauthorized.".to_string()
            )
        );
        assert!(matches!(classify(403, "Forbidden"), CapabilityError::Authentication(_)));
        assert_eq!(
            classify(429, r#"{"message": "Not enough credits for account 42"}"#),
            CapabilityError::Quota("search credits or rate limit exhausted".to_string())
        );
        assert_eq!(
            classify(400, r#"{"message": "Query is required"}"#),
            CapabilityError::Transport("HTTP 400: Query is required".to_string())
        );
        assert_eq!(
            classify(404, ""),
            CapabilityError::Transport("HTTP 404: ".to_string())
        );

        let long = "e".repeat(1_000);
        match classify(500, &long) {
            CapabilityError::Transport(msg) => {
                assert_eq!(msg.len(), "HTTP 500: ".len() + MAX_DETAIL_CHARS);
            }
            other => panic!("expected transport failure, got {other:?}"),
        }
    }

    #[test]
    fn test_schema_requires_query() {
        let tool = SerperSearchTool::new("key").unwrap();
        assert_eq!(tool.name(), SEARCH_TOOL);
        assert_eq!(tool.input_schema()["required"][0], "query");
    }
}
