//! Stock analysis crew
//!
//! Three agents collaborate on every request:
//!
//! - `Staff Research Analyst`: gathers recent news and analyst opinions
//! - `The Best Financial Analyst`: assesses financial health
//! - `Private Investment Advisor`: synthesizes both into a recommendation
//!
//! The research and financial tasks are independent; the advice task depends
//! on both and its output is the analysis result. [`server`] exposes the
//! pipeline as `POST /proxy/analyze`.
//!
//! # Example
//!
//! ```rust,ignore
//! use stock_advisor::{AdvisorConfig, StockAdvisor};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AdvisorConfig::builder()
//!         .api_key(std::env::var("GEMINI_API_KEY")?)
//!         .build()?;
//!
//!     let advisor = StockAdvisor::from_config(&config)?;
//!     let output = advisor.analyze("AAPL").await?;
//!     println!("{}", output.raw);
//!
//!     Ok(())
//! }
//! ```

pub mod agents;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod server;

// Re-export main types for convenience
pub use agents::StockAgents;
pub use config::{AdvisorConfig, AdvisorConfigBuilder};
pub use error::{AdvisorError, Result};
pub use pipeline::{StockAdvisor, stock_tasks};
pub use server::{AppState, create_router, serve};
