//! JavaScript stage backed by the `oxc` parser and code generator
//!
//! Scripts are parsed and printed back without comments or redundant
//! whitespace. No mangler or compressor pass runs, so identifiers, string
//! contents and regular expressions come out as written. Scripts that do not
//! parse are reported as errors and left alone by the pipeline.

use crate::compressor::{Compressor, Stage};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;
use squeeze_core::{Error, Result};

/// JavaScript compressor used for `<script>` blocks
#[derive(Debug, Clone, Copy, Default)]
pub struct JsCompressor;

impl JsCompressor {
    /// Create a JavaScript compressor
    pub fn new() -> Self {
        Self
    }
}

impl Compressor for JsCompressor {
    fn compress(&self, source: &str) -> Result<String> {
        let allocator = Allocator::default();
        // Inline page scripts are classic scripts, not modules
        let parsed = Parser::new(&allocator, source, SourceType::cjs()).parse();

        if let Some(error) = parsed.errors.first() {
            return Err(Error::minify(Stage::Js.name(), error.to_string()));
        }
        if parsed.panicked {
            return Err(Error::minify(Stage::Js.name(), "parser gave up"));
        }

        let printed = Codegen::new()
            .with_options(CodegenOptions::minify())
            .build(&parsed.program);
        Ok(printed.code)
    }
}
