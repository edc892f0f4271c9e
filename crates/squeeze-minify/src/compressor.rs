//! Compressor capability shared by the pipeline stages

use squeeze_core::Result;
use std::fmt;
use std::sync::Arc;

/// Pipeline stage a compressor is plugged into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Markup outside of protected blocks
    Html,
    /// Content of `<style>` blocks
    Css,
    /// Content of JavaScript `<script>` blocks
    Js,
}

impl Stage {
    /// Short stage name used in logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Css => "css",
            Self::Js => "js",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A text-to-text minifier for one kind of content
///
/// Implementations must be idempotent: compressing their own output again
/// yields the same text. An `Err` tells the pipeline to keep the original
/// fragment, so implementations should fail rather than guess.
pub trait Compressor: Send + Sync + fmt::Debug {
    /// Compress `source`
    fn compress(&self, source: &str) -> Result<String>;
}

impl<C: Compressor + ?Sized> Compressor for Arc<C> {
    fn compress(&self, source: &str) -> Result<String> {
        (**self).compress(source)
    }
}

impl<C: Compressor + ?Sized> Compressor for Box<C> {
    fn compress(&self, source: &str) -> Result<String> {
        (**self).compress(source)
    }
}
