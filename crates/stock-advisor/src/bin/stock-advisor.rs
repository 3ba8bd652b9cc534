//! Stock advisor HTTP server
//!
//! # Usage
//!
//! ```bash
//! export GEMINI_API_KEY="your-key"
//! export SERPER_API_KEY="your-serper-key"   # optional, enables web search
//! # or keep them in a .env file: set -a; . ./.env; set +a
//!
//! cargo run --bin stock-advisor -p stock-advisor
//!
//! curl -X POST http://localhost:5050/proxy/analyze \
//!      -H 'Content-Type: application/json' -d '{"company": "AAPL"}'
//! ```

use clap::Parser;
use crew_llm::providers::openai_compat::GEMINI_API_BASE;
use crew_workflow::Process;
use stock_advisor::{AdvisorConfig, AppState, StockAdvisor, serve};
use std::time::Duration;

/// Multi-agent stock analysis served over HTTP
#[derive(Debug, Parser)]
#[command(name = "stock-advisor", version, about)]
struct Args {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 5050)]
    port: u16,

    /// Model provider credential
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: String,

    /// OpenAI-compatible endpoint of the model provider
    #[arg(long, env = "LLM_API_BASE", default_value = GEMINI_API_BASE)]
    api_base: String,

    /// Model identifier
    #[arg(long, env = "LLM_MODEL", default_value = "gemini-2.0-flash-exp")]
    model: String,

    #[arg(long, env = "LLM_TEMPERATURE", default_value_t = 0.5)]
    temperature: f32,

    #[arg(long, env = "LLM_MAX_TOKENS", default_value_t = 1024)]
    max_tokens: usize,

    #[arg(long, env = "LLM_TOP_P", default_value_t = 0.9)]
    top_p: f32,

    /// Maximum tool-use rounds per task
    #[arg(long, env = "MAX_ITERATIONS", default_value_t = 15)]
    max_iterations: usize,

    /// Timeout for one model call, in seconds
    #[arg(long, env = "LLM_TIMEOUT_SECS", default_value_t = 120)]
    llm_timeout_secs: u64,

    /// Timeout for a whole analysis, in seconds
    #[arg(long, env = "KICKOFF_TIMEOUT_SECS", default_value_t = 300)]
    kickoff_timeout_secs: u64,

    /// Task scheduling: sequential or concurrent
    #[arg(long, env = "CREW_PROCESS", default_value = "sequential")]
    process: Process,

    /// Serper API key; web search is disabled without it
    #[arg(long, env = "SERPER_API_KEY", hide_env_values = true)]
    serper_api_key: Option<String>,
}

impl Args {
    fn into_config(self) -> stock_advisor::Result<AdvisorConfig> {
        let mut builder = AdvisorConfig::builder()
            .host(self.host)
            .port(self.port)
            .api_key(self.api_key)
            .api_base(self.api_base)
            .model(self.model)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .top_p(self.top_p)
            .max_iterations(self.max_iterations)
            .llm_timeout(Duration::from_secs(self.llm_timeout_secs))
            .kickoff_timeout(Duration::from_secs(self.kickoff_timeout_secs))
            .process(self.process);

        if let Some(key) = self.serper_api_key {
            builder = builder.serper_api_key(key);
        }

        builder.build()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    crew_utils::init_tracing();

    let config = Args::parse().into_config()?;
    let advisor = StockAdvisor::from_config(&config)?;

    serve(AppState::new(advisor), &config.host, config.port).await?;
    Ok(())
}
