//! Configuration builder

use crate::types::{Config, FilterConfig, LoggingConfig};
use squeeze_core::{CompressionOptions, Result};

/// Builder for constructing configuration programmatically
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the whole filter configuration
    pub fn filter(mut self, filter: FilterConfig) -> Self {
        self.config.filter = filter;
        self
    }

    /// Enable or disable the filter
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.filter.enabled = enabled;
        self
    }

    /// Set compression stage toggles
    pub fn options(mut self, options: CompressionOptions) -> Self {
        self.config.filter.options = options;
        self
    }

    /// Replace the completion markers
    pub fn markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.filter.markers = markers.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the url patterns
    pub fn url_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.filter.url_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Add an eligible content type
    pub fn add_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.config.filter.content_types.push(content_type.into());
        self
    }

    /// Set logging level and format
    pub fn logging(mut self, level: impl Into<String>, format: impl Into<String>) -> Self {
        self.config.observability.logging = LoggingConfig {
            level: level.into(),
            format: format.into(),
        };
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<Config> {
        crate::validator::validate_config(&self.config)?;
        Ok(self.config)
    }
}
