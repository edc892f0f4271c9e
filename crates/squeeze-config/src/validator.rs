//! Configuration validation

use crate::Config;
use squeeze_core::{Error, Result};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["text", "json"];

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_markers(config)?;
    validate_url_patterns(config)?;
    validate_content_types(config)?;
    validate_logging(config)?;

    Ok(())
}

fn validate_markers(config: &Config) -> Result<()> {
    if config.filter.markers.iter().any(String::is_empty) {
        return Err(Error::Config("completion marker cannot be empty".to_string()));
    }

    if config.filter.markers.is_empty() {
        tracing::warn!("No completion markers configured, output is only compressed on flush");
    }

    Ok(())
}

fn validate_url_patterns(config: &Config) -> Result<()> {
    if config.filter.enabled && config.filter.url_patterns.is_empty() {
        tracing::warn!("Filter is enabled but has no url patterns");
    }

    for pattern in &config.filter.url_patterns {
        let valid = pattern.starts_with('/')
            || pattern
                .strip_prefix("*.")
                .is_some_and(|ext| !ext.is_empty() && !ext.contains('/'));
        if !valid {
            return Err(Error::Config(format!(
                "Invalid url pattern: {pattern:?} (must start with '/' or '*.')"
            )));
        }

        if pattern.starts_with('/') && pattern.trim_end_matches("/*").contains('*') {
            return Err(Error::Config(format!(
                "Invalid url pattern: {pattern:?} ('*' is only allowed as a trailing '/*')"
            )));
        }
    }

    Ok(())
}

fn validate_content_types(config: &Config) -> Result<()> {
    for content_type in &config.filter.content_types {
        let Some((kind, subtype)) = content_type.split_once('/') else {
            return Err(Error::Config(format!(
                "Invalid content type: {content_type:?}"
            )));
        };
        if kind.trim().is_empty() || subtype.trim().is_empty() {
            return Err(Error::Config(format!(
                "Invalid content type: {content_type:?}"
            )));
        }
    }

    Ok(())
}

fn validate_logging(config: &Config) -> Result<()> {
    let logging = &config.observability.logging;

    if !LOG_LEVELS.contains(&logging.level.to_ascii_lowercase().as_str()) {
        return Err(Error::Config(format!(
            "Invalid log level: {} (must be one of {})",
            logging.level,
            LOG_LEVELS.join(", ")
        )));
    }

    if !LOG_FORMATS.contains(&logging.format.as_str()) {
        return Err(Error::Config(format!(
            "Invalid log format: {} (must be text or json)",
            logging.format
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_empty_marker() {
        let mut config = Config::default();
        config.filter.markers.push(String::new());

        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_no_markers_is_allowed() {
        let mut config = Config::default();
        config.filter.markers.clear();

        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_url_patterns() {
        let mut config = Config::default();
        config.filter.url_patterns = vec![
            "/".to_string(),
            "/faces/*".to_string(),
            "*.xhtml".to_string(),
            "/index.html".to_string(),
        ];
        assert!(validate_config(&config).is_ok());

        for bad in ["faces/*", "*.", "/a/*/b", "*.x/y"] {
            config.filter.url_patterns = vec![bad.to_string()];
            assert!(validate_config(&config).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_content_types() {
        let mut config = Config::default();
        config.filter.content_types = vec!["html".to_string()];
        assert!(validate_config(&config).is_err());

        config.filter.content_types = vec!["text/".to_string()];
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_logging() {
        let mut config = Config::default();
        config.observability.logging.level = "WARN".to_string();
        assert!(validate_config(&config).is_ok());

        config.observability.logging.level = "loud".to_string();
        assert!(validate_config(&config).is_err());

        config.observability.logging.level = "info".to_string();
        config.observability.logging.format = "xml".to_string();
        assert!(validate_config(&config).is_err());
    }
}
