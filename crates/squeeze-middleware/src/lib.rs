//! # Squeeze Middleware
//!
//! [`WhitespaceFilter`] sits between the renderer and the transport. It
//! routes every eligible response body through a
//! [`BufferedFlushWriter`](squeeze_minify::BufferedFlushWriter), so each
//! completed document or partial-response envelope is minified once, and
//! hands back the response with everything else untouched.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod filter;

pub use filter::WhitespaceFilter;

// Re-export core middleware types from squeeze-core
pub use squeeze_core::middleware::{Body, Middleware, Next};
