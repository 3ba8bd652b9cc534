//! The three analyst personas of the stock crew

use crew_core::{Agent, CompletionParams};
use crew_tools::SEARCH_TOOL;
use std::sync::Arc;

pub const RESEARCH_ANALYST: &str = "Staff Research Analyst";
pub const FINANCIAL_ANALYST: &str = "The Best Financial Analyst";
pub const INVESTMENT_ADVISOR: &str = "Private Investment Advisor";

/// Agents shared read-only by every analysis request
#[derive(Debug, Clone)]
pub struct StockAgents {
    pub research_analyst: Arc<Agent>,
    pub financial_analyst: Arc<Agent>,
    pub investment_advisor: Arc<Agent>,
}

impl StockAgents {
    /// Create the agents, all using `parameters` for their completions
    pub fn new(parameters: CompletionParams) -> Self {
        let research_analyst = Agent::builder(RESEARCH_ANALYST)
            .goal("Gather and interpret market and financial data effectively.")
            .backstory("A highly skilled research analyst specializing in market sentiment.")
            .capability(SEARCH_TOOL)
            .parameters(parameters)
            .build();

        let financial_analyst = Agent::builder(FINANCIAL_ANALYST)
            .goal("Provide deep financial analysis and insights.")
            .backstory("A seasoned financial analyst specializing in stock market trends.")
            .capability(SEARCH_TOOL)
            .parameters(parameters)
            .build();

        let investment_advisor = Agent::builder(INVESTMENT_ADVISOR)
            .goal("Provide clients with expert investment advice based on data-driven insights.")
            .backstory("An experienced investment advisor with a strong track record.")
            .capability(SEARCH_TOOL)
            .parameters(parameters)
            .build();

        Self {
            research_analyst: Arc::new(research_analyst),
            financial_analyst: Arc::new(financial_analyst),
            investment_advisor: Arc::new(investment_advisor),
        }
    }

    /// All agents in declaration order
    pub fn all(&self) -> [Arc<Agent>; 3] {
        [
            Arc::clone(&self.research_analyst),
            Arc::clone(&self.financial_analyst),
            Arc::clone(&self.investment_advisor),
        ]
    }
}

impl Default for StockAgents {
    fn default() -> Self {
        Self::new(CompletionParams::default())
    }
}
