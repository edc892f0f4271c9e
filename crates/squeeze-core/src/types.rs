//! Common types used throughout Squeeze

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closing sequence of a full HTML document
pub const HTML_DOCUMENT_END: &str = "</html>";

/// Closing sequence of a partial (AJAX) response envelope
pub const PARTIAL_RESPONSE_END: &str = "</partial-response>";

/// Markers that complete a logical unit when no others are configured
pub const DEFAULT_MARKERS: [&str; 2] = [HTML_DOCUMENT_END, PARTIAL_RESPONSE_END];

/// Toggles for the compression pipeline stages
///
/// Fixed for the lifetime of a filter instance and shared read-only between
/// every response it processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionOptions {
    /// Minify the content of `<style>` blocks
    #[serde(default = "default_true", alias = "compressCss")]
    pub compress_css: bool,

    /// Minify the content of JavaScript `<script>` blocks
    #[serde(default = "default_true", alias = "compressJs")]
    pub compress_js: bool,

    /// Drop whitespace between a closing `>` and the next `<`
    #[serde(default = "default_true", alias = "removeIntertagSpaces")]
    pub remove_intertag_spaces: bool,
}

fn default_true() -> bool {
    true
}

impl Default for CompressionOptions {
    fn default() -> Self {
        Self {
            compress_css: true,
            compress_js: true,
            remove_intertag_spaces: true,
        }
    }
}

impl CompressionOptions {
    /// Options with every stage switched off
    pub fn disabled() -> Self {
        Self {
            compress_css: false,
            compress_js: false,
            remove_intertag_spaces: false,
        }
    }

    /// Returns true when no stage would touch the input
    pub fn is_passthrough(&self) -> bool {
        !(self.compress_css || self.compress_js || self.remove_intertag_spaces)
    }
}

impl fmt::Display for CompressionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "css={} js={} intertag={}",
            self.compress_css, self.compress_js, self.remove_intertag_spaces
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = CompressionOptions::default();
        assert!(options.compress_css);
        assert!(options.compress_js);
        assert!(options.remove_intertag_spaces);
        assert!(!options.is_passthrough());
        assert!(CompressionOptions::disabled().is_passthrough());
    }

    #[test]
    fn test_options_accept_init_param_names() {
        let options: CompressionOptions = serde_json::from_str(
            r#"{"compressCss": false, "removeIntertagSpaces": false}"#,
        )
        .unwrap();
        assert!(!options.compress_css);
        assert!(options.compress_js);
        assert!(!options.remove_intertag_spaces);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            CompressionOptions::disabled().to_string(),
            "css=false js=false intertag=false"
        );
    }
}
