//! Session configuration

use casebook_model::DuplicateQuery;
use casebook_notebook::MentionLinker;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables of one investigation session
///
/// Every field has a default, so a TOML file only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Quiet period after the last edit before the notebook is saved
    pub autosave_debounce_ms: u64,
    /// Similarity threshold for duplicate scans, within `[0, 1]`
    pub duplicate_threshold: f64,
    /// Maximum candidates returned by a duplicate scan
    pub duplicate_limit: usize,
    /// Page size of a full graph fetch
    pub graph_page_limit: usize,
    /// Horizontal distance of a mention node from its note
    pub mention_offset_x: f64,
    /// Vertical distance of a mention node from its note
    pub mention_offset_y: f64,
}

impl SessionConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML and validate
    ///
    /// # Errors
    /// `ConfigError::Parse` for malformed TOML, `ConfigError::Invalid` for
    /// out-of-range values.
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// With autosave debounce in milliseconds
    #[inline]
    #[must_use]
    pub fn with_autosave_debounce_ms(mut self, millis: u64) -> Self {
        self.autosave_debounce_ms = millis;
        self
    }

    /// With duplicate scan threshold and limit
    #[inline]
    #[must_use]
    pub fn with_duplicate_scan(mut self, threshold: f64, limit: usize) -> Self {
        self.duplicate_threshold = threshold;
        self.duplicate_limit = limit;
        self
    }

    /// With graph page size
    #[inline]
    #[must_use]
    pub fn with_graph_page_limit(mut self, limit: usize) -> Self {
        self.graph_page_limit = limit;
        self
    }

    /// With mention node offset
    #[inline]
    #[must_use]
    pub fn with_mention_offset(mut self, x: f64, y: f64) -> Self {
        self.mention_offset_x = x;
        self.mention_offset_y = y;
        self
    }

    /// Check value ranges
    ///
    /// # Errors
    /// `ConfigError::Invalid` naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.autosave_debounce_ms == 0 {
            return Err(ConfigError::invalid("autosave_debounce_ms must be greater than zero"));
        }
        if !(0.0..=1.0).contains(&self.duplicate_threshold) {
            return Err(ConfigError::invalid(format!(
                "duplicate_threshold must be within [0, 1], got {}",
                self.duplicate_threshold
            )));
        }
        if self.duplicate_limit == 0 {
            return Err(ConfigError::invalid("duplicate_limit must be greater than zero"));
        }
        if self.graph_page_limit == 0 {
            return Err(ConfigError::invalid("graph_page_limit must be greater than zero"));
        }
        if !self.mention_offset_x.is_finite() || !self.mention_offset_y.is_finite() {
            return Err(ConfigError::invalid("mention offsets must be finite"));
        }
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn autosave_debounce(&self) -> Duration {
        Duration::from_millis(self.autosave_debounce_ms)
    }

    /// Duplicate scan over all schemas with the configured threshold and limit
    #[must_use]
    pub fn duplicate_query(&self) -> DuplicateQuery {
        DuplicateQuery::new(self.duplicate_threshold, self.duplicate_limit)
    }

    #[must_use]
    pub fn mention_linker(&self) -> MentionLinker {
        MentionLinker::with_offset(self.mention_offset_x, self.mention_offset_y)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            autosave_debounce_ms: 1300,
            duplicate_threshold: 0.7,
            duplicate_limit: 100,
            graph_page_limit: 500,
            mention_offset_x: 360.0,
            mention_offset_y: 40.0,
        }
    }
}

/// Configuration could not be loaded
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    #[inline]
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_product_behavior() {
        let config = SessionConfig::default();
        assert_eq!(config.autosave_debounce(), Duration::from_millis(1300));
        assert_eq!(config.duplicate_query(), DuplicateQuery::new(0.7, 100));
        assert_eq!(config.graph_page_limit, 500);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = SessionConfig::from_toml_str("autosave_debounce_ms = 500\nduplicate_threshold = 0.9\n").unwrap();
        assert_eq!(config.autosave_debounce_ms, 500);
        assert!((config.duplicate_threshold - 0.9).abs() < f64::EPSILON);
        assert_eq!(config.duplicate_limit, 100);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert!(matches!(
            SessionConfig::from_toml_str("duplicate_threshold = 1.5"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SessionConfig::from_toml_str("autosave_debounce_ms = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(SessionConfig::new().with_duplicate_scan(0.5, 0).validate().is_err());
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        assert!(matches!(
            SessionConfig::from_toml_str("autosave_debounce_ms = \"soon\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
