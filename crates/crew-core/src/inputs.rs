//! Request-scoped inputs
//!
//! `Inputs` holds the parameters of one kickoff (for example the stock
//! symbol) and substitutes them into task templates. Placeholders use the
//! `{name}` form; a placeholder without a matching input is a configuration
//! error so that a half-rendered prompt never reaches a model.

use crate::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap()
});

/// Well-known input keys
pub mod keys {
    /// Ticker symbol under analysis
    pub const STOCK_SYMBOL: &str = "stock_symbol";
}

/// Key-value parameters substituted into task descriptions
///
/// # Example
///
/// ```
/// use crew_core::Inputs;
///
/// let inputs = Inputs::new().with("stock_symbol", "ACME");
/// let text = inputs.interpolate("Research {stock_symbol} news").unwrap();
/// assert_eq!(text, "Research ACME news");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inputs {
    values: BTreeMap<String, String>,
}

impl Inputs {
    /// Create an empty set of inputs
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value (builder style)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert a value, replacing any previous one
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Get a value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Check if a key exists
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over inputs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Replace every `{name}` placeholder in `template` with its input value
    pub fn interpolate(&self, template: &str) -> Result<String> {
        if let Some(missing) = PLACEHOLDER
            .captures_iter(template)
            .map(|caps| caps[1].to_string())
            .find(|name| !self.values.contains_key(name))
        {
            return Err(Error::Configuration(format!(
                "Missing input '{missing}' for template"
            )));
        }

        Ok(PLACEHOLDER
            .replace_all(template, |caps: &regex::Captures<'_>| {
                self.values[&caps[1]].clone()
            })
            .into_owned())
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Inputs
where
    K: Into<String>,
    V: Into<String>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        let mut inputs = Inputs::new();
        for (k, v) in pairs {
            inputs.insert(k, v);
        }
        inputs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_operations() {
        let mut inputs = Inputs::new();
        assert!(inputs.is_empty());

        inputs.insert(keys::STOCK_SYMBOL, "ACME");
        assert_eq!(inputs.len(), 1);
        assert!(inputs.contains_key("stock_symbol"));
        assert_eq!(inputs.get("stock_symbol"), Some("ACME"));

        inputs.insert(keys::STOCK_SYMBOL, "MSFT");
        assert_eq!(inputs.get("stock_symbol"), Some("MSFT"));
    }

    #[test]
    fn test_interpolate_repeated_placeholder() {
        let inputs = Inputs::from([("stock_symbol", "ACME"), ("period", "Q3")]);
        let text = inputs
            .interpolate("{stock_symbol} in {period}; again {stock_symbol}")
            .unwrap();
        assert_eq!(text, "ACME in Q3; again ACME");
    }

    #[test]
    fn test_interpolate_missing_input() {
        let inputs = Inputs::new();
        let err = inputs.interpolate("Analyze {stock_symbol}").unwrap_err();
        assert!(matches!(err, Error::Configuration(msg) if msg.contains("stock_symbol")));
    }

    #[test]
    fn test_non_identifier_braces_untouched() {
        let inputs = Inputs::new();
        let text = inputs.interpolate("json like { \"a\": 1 } stays").unwrap();
        assert_eq!(text, "json like { \"a\": 1 } stays");
    }

    #[test]
    fn test_iter_is_key_ordered() {
        let inputs = Inputs::new().with("b", "2").with("a", "1");
        let keys: Vec<_> = inputs.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
