//! HTTP backend configuration
//!
//! Read from the environment:
//! - `CASEBOOK_API_BASE`: API root (default: "http://localhost:8000/api")
//! - `CASEBOOK_API_TIMEOUT_SECS`: per-request timeout (default: 30)

use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors building an [`HttpBackend`](crate::HttpBackend)
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Configuration failed validation
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result alias for client construction
pub type ClientResult<T> = Result<T, ClientError>;

/// Where and how to reach the investigation API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpBackendConfig {
    /// API root; resource paths are appended to it
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for HttpBackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl HttpBackendConfig {
    /// Default settings against `base_url`
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Defaults overridden by `CASEBOOK_API_*` variables
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            base_url: lookup("CASEBOOK_API_BASE")
                .filter(|value| !value.trim().is_empty())
                .unwrap_or(defaults.base_url),
            timeout_secs: lookup("CASEBOOK_API_TIMEOUT_SECS")
                .and_then(|value| value.trim().parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }

    /// With a request timeout
    #[must_use]
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    /// `ClientError::Config` for a base URL that is not absolute http(s), or
    /// a zero timeout.
    pub fn validate(&self) -> ClientResult<()> {
        let url = reqwest::Url::parse(&self.base_url)
            .map_err(|err| ClientError::Config(format!("base_url '{}': {err}", self.base_url)))?;
        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(ClientError::Config(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ClientError::Config("timeout_secs must be > 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn env_overrides_defaults() {
        let config = HttpBackendConfig::from_lookup(lookup(&[
            ("CASEBOOK_API_BASE", "https://cases.example.org/api"),
            ("CASEBOOK_API_TIMEOUT_SECS", "5"),
        ]));
        assert_eq!(config.base_url, "https://cases.example.org/api");
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn garbage_env_falls_back() {
        let config = HttpBackendConfig::from_lookup(lookup(&[
            ("CASEBOOK_API_BASE", "  "),
            ("CASEBOOK_API_TIMEOUT_SECS", "soon"),
        ]));
        assert_eq!(config, HttpBackendConfig::default());
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert!(HttpBackendConfig::default().validate().is_ok());
        assert!(HttpBackendConfig::new("localhost:8000").validate().is_err());
        assert!(HttpBackendConfig::new("ftp://host/api").validate().is_err());
        assert!(HttpBackendConfig::default().with_timeout_secs(0).validate().is_err());
    }
}
