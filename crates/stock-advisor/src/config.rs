//! Configuration for the stock advisor service

use crate::error::{AdvisorError, Result};
use crew_core::CompletionParams;
use crew_llm::providers::openai_compat::GEMINI_API_BASE;
use crew_workflow::Process;
use std::time::Duration;

/// Configuration for the stock advisor service
#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    /// Address the HTTP server binds to
    pub host: String,

    /// Port the HTTP server listens on
    pub port: u16,

    /// Credential for the model provider
    pub api_key: String,

    /// OpenAI-compatible endpoint of the model provider
    pub api_base: String,

    /// Model identifier
    pub model: String,

    /// Sampling temperature for every agent
    pub temperature: f32,

    /// Maximum tokens per completion
    pub max_tokens: usize,

    /// Nucleus sampling cutoff
    pub top_p: f32,

    /// Maximum tool-use rounds per task
    pub max_iterations: usize,

    /// Time budget for one model call
    pub llm_timeout: Duration,

    /// Time budget for a whole analysis
    pub kickoff_timeout: Duration,

    /// Task scheduling mode
    pub process: Process,

    /// Serper API key; web search is disabled without it
    pub serper_api_key: Option<String>,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5050,
            api_key: String::new(),
            api_base: GEMINI_API_BASE.to_string(),
            model: "gemini-2.0-flash-exp".to_string(),
            temperature: 0.5,
            max_tokens: 1024,
            top_p: 0.9,
            max_iterations: 15,
            llm_timeout: Duration::from_secs(120),
            kickoff_timeout: Duration::from_secs(300),
            process: Process::Sequential,
            serper_api_key: None,
        }
    }
}

impl AdvisorConfig {
    /// Create a new configuration builder
    pub fn builder() -> AdvisorConfigBuilder {
        AdvisorConfigBuilder::default()
    }

    /// Completion parameters shared by all agents
    pub fn completion_params(&self) -> CompletionParams {
        CompletionParams {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: self.top_p,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(AdvisorError::ConfigError(
                "GEMINI_API_KEY is required".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(AdvisorError::ConfigError(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }

        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(AdvisorError::ConfigError(format!(
                "top_p must be in (0.0, 1.0], got {}",
                self.top_p
            )));
        }

        if self.max_tokens == 0 {
            return Err(AdvisorError::ConfigError(
                "max_tokens must be greater than 0".to_string(),
            ));
        }

        if self.max_iterations == 0 {
            return Err(AdvisorError::ConfigError(
                "max_iterations must be greater than 0".to_string(),
            ));
        }

        if self.llm_timeout.is_zero() || self.kickoff_timeout.is_zero() {
            return Err(AdvisorError::ConfigError(
                "timeouts must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for AdvisorConfig
#[derive(Debug, Default)]
pub struct AdvisorConfigBuilder {
    host: Option<String>,
    port: Option<u16>,
    api_key: Option<String>,
    api_base: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<usize>,
    top_p: Option<f32>,
    max_iterations: Option<usize>,
    llm_timeout: Option<Duration>,
    kickoff_timeout: Option<Duration>,
    process: Option<Process>,
    serper_api_key: Option<String>,
}

impl AdvisorConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the model provider credential
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the OpenAI-compatible endpoint
    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Set maximum tool-use rounds per task
    pub fn max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = Some(max);
        self
    }

    /// Set the per-call model timeout
    pub fn llm_timeout(mut self, timeout: Duration) -> Self {
        self.llm_timeout = Some(timeout);
        self
    }

    /// Set the overall analysis deadline
    pub fn kickoff_timeout(mut self, timeout: Duration) -> Self {
        self.kickoff_timeout = Some(timeout);
        self
    }

    pub fn process(mut self, process: Process) -> Self {
        self.process = Some(process);
        self
    }

    /// Set the Serper API key, enabling web search
    pub fn serper_api_key(mut self, key: impl Into<String>) -> Self {
        self.serper_api_key = Some(key.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AdvisorConfig> {
        let defaults = AdvisorConfig::default();

        let config = AdvisorConfig {
            host: self.host.unwrap_or(defaults.host),
            port: self.port.unwrap_or(defaults.port),
            api_key: self.api_key.unwrap_or(defaults.api_key),
            api_base: self.api_base.unwrap_or(defaults.api_base),
            model: self.model.unwrap_or(defaults.model),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            top_p: self.top_p.unwrap_or(defaults.top_p),
            max_iterations: self.max_iterations.unwrap_or(defaults.max_iterations),
            llm_timeout: self.llm_timeout.unwrap_or(defaults.llm_timeout),
            kickoff_timeout: self.kickoff_timeout.unwrap_or(defaults.kickoff_timeout),
            process: self.process.unwrap_or(defaults.process),
            serper_api_key: self.serper_api_key.filter(|key| !key.trim().is_empty()),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AdvisorConfig::default();
        assert_eq!(config.port, 5050);
        assert_eq!(config.model, "gemini-2.0-flash-exp");
        assert_eq!(config.completion_params(), CompletionParams::default());
        assert_eq!(config.process, Process::Sequential);
        assert!(config.serper_api_key.is_none());
    }

    #[test]
    fn test_builder() {
        let config = AdvisorConfig::builder()
            .api_key("key")
            .port(8080)
            .max_iterations(3)
            .process(Process::Concurrent)
            .serper_api_key("serper")
            .build()
            .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.process, Process::Concurrent);
        assert_eq!(config.serper_api_key.as_deref(), Some("serper"));
        assert_eq!(config.host, "0.0.0.0");
    }

    #[test]
    fn test_missing_api_key_rejected() {
        let err = AdvisorConfig::builder().build().unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_out_of_range_parameters_rejected() {
        assert!(AdvisorConfig::builder().api_key("k").temperature(3.0).build().is_err());
        assert!(AdvisorConfig::builder().api_key("k").top_p(0.0).build().is_err());
        assert!(AdvisorConfig::builder().api_key("k").max_tokens(0).build().is_err());
        assert!(AdvisorConfig::builder().api_key("k").max_iterations(0).build().is_err());
        assert!(
            AdvisorConfig::builder()
                .api_key("k")
                .kickoff_timeout(Duration::ZERO)
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_blank_serper_key_disables_search() {
        let config = AdvisorConfig::builder()
            .api_key("k")
            .serper_api_key("  ")
            .build()
            .unwrap();
        assert!(config.serper_api_key.is_none());
    }
}
