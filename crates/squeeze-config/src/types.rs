//! Configuration types

use serde::{Deserialize, Serialize};
use squeeze_core::{CompressionOptions, DEFAULT_MARKERS};
use tracing::debug;

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Response filter configuration
    #[serde(default)]
    pub filter: FilterConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Response filter configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterConfig {
    /// Enable the filter
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Compression stage toggles
    #[serde(flatten)]
    pub options: CompressionOptions,

    /// Literal markers that complete a logical unit of output
    #[serde(default = "default_markers")]
    pub markers: Vec<String>,

    /// Request paths the filter applies to (`/*`, `/prefix/*`, `*.ext` or exact)
    #[serde(default = "default_url_patterns", alias = "urlPatterns")]
    pub url_patterns: Vec<String>,

    /// Response content types eligible for filtering
    #[serde(default = "default_content_types", alias = "contentTypes")]
    pub content_types: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            options: CompressionOptions::default(),
            markers: default_markers(),
            url_patterns: default_url_patterns(),
            content_types: default_content_types(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_markers() -> Vec<String> {
    DEFAULT_MARKERS.iter().map(|m| m.to_string()).collect()
}

fn default_url_patterns() -> Vec<String> {
    vec!["/*".to_string()]
}

fn default_content_types() -> Vec<String> {
    vec![
        "text/html".to_string(),
        "application/xhtml+xml".to_string(),
        "text/xml".to_string(),
        "application/xml".to_string(),
    ]
}

impl FilterConfig {
    /// Build a filter configuration from servlet-style init parameters
    ///
    /// Recognizes `compressCss`, `compressJs` and `removeIntertagSpaces`.
    /// A missing parameter keeps its default; a present one is true only if
    /// it reads `true` ignoring case.
    pub fn from_init_params<I, K, V>(params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();
        for (key, value) in params {
            let flag = value.as_ref().eq_ignore_ascii_case("true");
            match key.as_ref() {
                "compressCss" => config.options.compress_css = flag,
                "compressJs" => config.options.compress_js = flag,
                "removeIntertagSpaces" => config.options.remove_intertag_spaces = flag,
                other => debug!(param = other, "Ignoring unknown init parameter"),
            }
        }
        config
    }

    /// Check if the filter applies to a request path
    pub fn matches_path(&self, path: &str) -> bool {
        self.url_patterns
            .iter()
            .any(|pattern| url_pattern_matches(pattern, path))
    }

    /// Check if a response content type should be filtered
    pub fn is_filtered_content_type(&self, content_type: &str) -> bool {
        let media_type = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim();
        self.content_types
            .iter()
            .any(|ct| ct.eq_ignore_ascii_case(media_type))
    }
}

/// Servlet url-pattern matching
fn url_pattern_matches(pattern: &str, path: &str) -> bool {
    if pattern == "/" || pattern == "/*" {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix("/*") {
        return path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'));
    }
    if let Some(ext) = pattern.strip_prefix("*.") {
        let last = path.rsplit('/').next().unwrap_or_default();
        return last
            .rsplit_once('.')
            .is_some_and(|(_, found)| found == ext);
    }
    pattern == path
}

/// Observability configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ObservabilityConfig {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, text)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}
