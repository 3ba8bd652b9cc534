//! Error types for the stock advisor

use thiserror::Error;

/// Stock advisor errors
#[derive(Debug, Error)]
pub enum AdvisorError {
    /// Invalid or incomplete configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Failure while building or running the crew
    #[error(transparent)]
    Crew(#[from] crew_core::Error),

    /// LLM provider could not be constructed
    #[error("LLM provider error: {0}")]
    Llm(#[from] crew_llm::LLMError),

    /// Server I/O failure
    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for stock advisor operations
pub type Result<T> = std::result::Result<T, AdvisorError>;

impl AdvisorError {
    /// Whether the request, not the system, caused this error
    pub fn is_client_error(&self) -> bool {
        matches!(self, AdvisorError::Crew(e) if e.is_validation())
    }
}
