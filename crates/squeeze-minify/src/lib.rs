//! # Squeeze Minify
//!
//! Output-side minification for server-rendered markup:
//! - [`BufferedFlushWriter`] buffers rendered text and compresses it once per
//!   logical unit (a full document or a partial-response envelope)
//! - [`MarkerDetector`] decides when a unit is complete
//! - [`CompressorPipeline`] runs the HTML, CSS and JS stages over a unit
//!
//! ```
//! use squeeze_minify::BufferedFlushWriter;
//!
//! let writer = BufferedFlushWriter::new(Vec::new());
//! writer.write_text("<html>\n  <body>\n    <p>hi</p>\n").unwrap();
//! writer.write_text("  </body>\n</html>").unwrap();
//! let out = writer.close().unwrap();
//! assert_eq!(out, b"<html><body><p>hi</p></body></html>");
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod compressor;
pub mod css;
pub mod html;
pub mod js;
pub mod marker;
pub mod pipeline;
mod utf8;
pub mod writer;

pub use compressor::{Compressor, Stage};
pub use css::CssCompressor;
pub use html::IntertagCompressor;
pub use js::JsCompressor;
pub use marker::MarkerDetector;
pub use pipeline::CompressorPipeline;
pub use writer::{BufferedFlushWriter, FlushStats};
