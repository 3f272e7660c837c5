//! Process-wide tracing setup
//!
//! Library code only emits `tracing` events. Hosts call [`init`] once at
//! startup; `RUST_LOG` overrides the configured default directive.

use serde::{Deserialize, Serialize};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

/// Subscriber settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Filter used when `RUST_LOG` is unset, e.g. `info` or `casebook_core=debug`
    pub default_directive: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl TelemetryConfig {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_default_directive(mut self, directive: impl Into<String>) -> Self {
        self.default_directive = directive.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    fn directive(&self) -> Result<Directive, TelemetryError> {
        self.default_directive
            .parse()
            .map_err(|_| TelemetryError::InvalidDirective(self.default_directive.clone()))
    }

    /// Build the filter without installing anything
    ///
    /// # Errors
    /// `InvalidDirective` if the default directive does not parse.
    pub fn env_filter(&self) -> Result<EnvFilter, TelemetryError> {
        Ok(EnvFilter::builder()
            .with_default_directive(self.directive()?)
            .from_env_lossy())
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_directive: "info".to_string(),
            json: false,
        }
    }
}

/// Tracing could not be installed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid log directive '{0}'")]
    InvalidDirective(String),

    #[error("global subscriber already installed: {0}")]
    AlreadyInitialized(String),
}

/// Install the global `fmt` subscriber
///
/// # Errors
/// `InvalidDirective` for a bad default directive, `AlreadyInitialized` if
/// another subscriber was installed first.
pub fn init(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = config.env_filter()?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|err| TelemetryError::AlreadyInitialized(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directive_is_info() {
        let config = TelemetryConfig::default();
        assert_eq!(config.default_directive, "info");
        assert!(config.env_filter().is_ok());
    }

    #[test]
    fn bad_directive_is_rejected() {
        let config = TelemetryConfig::new().with_default_directive("casebook_core=loudest");
        assert_eq!(
            config.env_filter().unwrap_err(),
            TelemetryError::InvalidDirective("casebook_core=loudest".to_string())
        );
        assert!(init(&config).is_err());
    }

    #[test]
    fn second_init_reports_already_initialized() {
        let config = TelemetryConfig::new().with_default_directive("warn");
        // Another test binary thread may have won the race; either way the
        // second call must fail.
        let _ = init(&config);
        assert!(matches!(init(&config), Err(TelemetryError::AlreadyInitialized(_))));
    }
}
