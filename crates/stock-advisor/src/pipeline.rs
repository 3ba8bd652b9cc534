//! The stock analysis pipeline
//!
//! Research and financial analysis run first and independently; the
//! investment advice task synthesizes both into the final recommendation.

use crate::agents::StockAgents;
use crate::config::AdvisorConfig;
use crate::error::Result;
use crew_core::inputs::keys;
use crew_core::{CapabilityProvider, Error, Inputs, Task};
use crew_llm::providers::{OpenAICompatConfig, OpenAICompatProvider};
use crew_runtime::{CapabilityConfig, LlmCapabilities};
use crew_tools::{SEARCH_TOOL, SerperSearchTool, ToolRegistry};
use crew_workflow::{Crew, CrewConfig, CrewOutput};
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub const RESEARCH_TASK: &str = "research";
pub const FINANCIAL_ANALYSIS_TASK: &str = "financial_analysis";
pub const INVESTMENT_ADVICE_TASK: &str = "investment_advice";

/// Message returned when no symbol is supplied
pub const SYMBOL_REQUIRED: &str = "Stock symbol is required";

/// Task templates for one analysis, in declaration order
pub fn stock_tasks(agents: &StockAgents) -> Vec<Task> {
    let research = Task::builder(RESEARCH_TASK)
        .description(
            "Gather and summarize recent news, press releases, and market analyses related to \
             {stock_symbol}. Highlight significant events, trends, and analyst opinions.",
        )
        .expected_output("A comprehensive summary report")
        .agent(Arc::clone(&agents.research_analyst))
        .tool(SEARCH_TOOL)
        .build();

    let financial_analysis = Task::builder(FINANCIAL_ANALYSIS_TASK)
        .description(
            "Conduct a financial health analysis for {stock_symbol}, including metrics like \
             P/E ratio, EPS growth, and revenue trends.",
        )
        .expected_output("A detailed financial analysis")
        .agent(Arc::clone(&agents.financial_analyst))
        .tool(SEARCH_TOOL)
        .build();

    let investment_advice = Task::builder(INVESTMENT_ADVICE_TASK)
        .description(
            "Synthesize financial and research data to provide a strategic investment \
             recommendation for {stock_symbol}.",
        )
        .expected_output("A comprehensive investment strategy")
        .agent(Arc::clone(&agents.investment_advisor))
        .tool(SEARCH_TOOL)
        .depends_on(RESEARCH_TASK)
        .depends_on(FINANCIAL_ANALYSIS_TASK)
        .build();

    vec![research, financial_analysis, investment_advice]
}

/// Runs the stock crew for one symbol at a time
///
/// Holds the process-wide agents and capability provider; a fresh crew is
/// built for every analysis.
pub struct StockAdvisor {
    agents: StockAgents,
    provider: Arc<dyn CapabilityProvider>,
    crew_config: CrewConfig,
}

impl StockAdvisor {
    /// Create an advisor around an existing capability provider
    pub fn new(
        agents: StockAgents,
        provider: Arc<dyn CapabilityProvider>,
        crew_config: CrewConfig,
    ) -> Self {
        Self {
            agents,
            provider,
            crew_config,
        }
    }

    /// Wire the Gemini-backed provider, web search and agents from `config`
    pub fn from_config(config: &AdvisorConfig) -> Result<Self> {
        config.validate()?;

        let llm = OpenAICompatProvider::with_config(
            OpenAICompatConfig::new(config.api_key.clone())
                .with_api_base(config.api_base.clone())
                .with_timeout(config.llm_timeout.as_secs().max(1)),
        )?;

        let registry = ToolRegistry::new();
        match &config.serper_api_key {
            Some(key) => registry.register(Arc::new(SerperSearchTool::new(key.clone())?)),
            None => warn!("SERPER_API_KEY not set, agents will answer without web search"),
        }

        let capabilities = LlmCapabilities::new(
            Arc::new(llm),
            Arc::new(registry),
            CapabilityConfig {
                model: config.model.clone(),
                max_iterations: config.max_iterations,
                call_timeout: config.llm_timeout,
            },
        );

        info!(
            model = %config.model,
            api_base = %config.api_base,
            process = %config.process,
            "Stock advisor initialized"
        );

        Ok(Self::new(
            StockAgents::new(config.completion_params()),
            Arc::new(capabilities),
            CrewConfig {
                process: config.process,
                deadline: Some(config.kickoff_timeout),
            },
        ))
    }

    pub fn agents(&self) -> &StockAgents {
        &self.agents
    }

    /// Build the crew for one request
    pub fn crew(&self) -> Result<Crew> {
        let crew = stock_tasks(&self.agents)
            .into_iter()
            .fold(Crew::builder(), crew_workflow::CrewBuilder::task);

        let crew = self
            .agents
            .all()
            .into_iter()
            .fold(crew, crew_workflow::CrewBuilder::agent)
            .provider(Arc::clone(&self.provider))
            .config(self.crew_config.clone())
            .build()?;

        Ok(crew)
    }

    /// Analyze `symbol` and return the crew output
    ///
    /// The symbol is trimmed; a blank symbol is rejected before any task is built.
    #[instrument(skip(self))]
    pub async fn analyze(&self, symbol: &str) -> Result<CrewOutput> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(Error::Validation(SYMBOL_REQUIRED.to_string()).into());
        }

        let inputs = Inputs::new().with(keys::STOCK_SYMBOL, symbol);
        let output = self.crew()?.kickoff(&inputs).await?;

        info!(symbol, tasks = output.tasks_output.len(), "Analysis completed");
        Ok(output)
    }
}
