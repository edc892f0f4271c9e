//! # Squeeze Core
//!
//! Core types, traits, and error handling shared by the Squeeze crates:
//! - Error type and `Result` alias
//! - Compression options and completion markers
//! - Middleware trait the response filter plugs into

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod error;
pub mod middleware;
pub mod types;

pub use error::{Error, Result};
pub use middleware::{Body, Middleware, Next};
pub use types::*;

// Re-export commonly used HTTP types
pub use bytes::Bytes;
pub use http::{Request, Response, StatusCode};

