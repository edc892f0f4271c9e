//! CSS stage backed by `lightningcss`
//!
//! A style block is parsed into a style sheet and printed back in minified
//! form. Blocks that do not parse are reported as errors, which makes the
//! pipeline keep them byte for byte.

use crate::compressor::{Compressor, Stage};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use squeeze_core::{Error, Result};
use std::fmt;

/// CSS compressor used for `<style>` blocks
#[derive(Debug, Clone, Copy, Default)]
pub struct CssCompressor;

impl CssCompressor {
    /// Create a CSS compressor
    pub fn new() -> Self {
        Self
    }
}

fn failed(step: &str, error: impl fmt::Display) -> Error {
    Error::minify(Stage::Css.name(), format!("{step} failed: {error}"))
}

impl Compressor for CssCompressor {
    fn compress(&self, source: &str) -> Result<String> {
        let mut sheet =
            StyleSheet::parse(source, ParserOptions::default()).map_err(|e| failed("parse", e))?;
        sheet
            .minify(MinifyOptions::default())
            .map_err(|e| failed("minify", e))?;
        let printed = sheet
            .to_css(PrinterOptions {
                minify: true,
                ..PrinterOptions::default()
            })
            .map_err(|e| failed("print", e))?;
        Ok(printed.code)
    }
}
