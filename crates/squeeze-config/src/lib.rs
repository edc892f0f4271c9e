//! # Squeeze Configuration
//!
//! Settings for the whitespace filter come from one of three places:
//! - a YAML, TOML or JSON file, with `${VAR}` / `${VAR:-default}` expansion
//! - servlet-style init parameters (`compressCss`, `compressJs`,
//!   `removeIntertagSpaces`) via [`FilterConfig::from_init_params`]
//! - code, through [`ConfigBuilder`]
//!
//! Every path ends in [`validate_config`], so a [`Config`] handed out by this
//! crate always has usable markers, url patterns and logging settings.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod builder;
pub mod loader;
pub mod types;
pub mod validator;

pub use builder::ConfigBuilder;
pub use loader::{load_config, load_from_file, load_from_str};
pub use types::{Config, FilterConfig, LoggingConfig, ObservabilityConfig};
pub use validator::validate_config;

use squeeze_core::{Error, Result};
use std::fmt;
use std::path::Path;

/// File name looked up when no configuration path is given
pub const DEFAULT_CONFIG_FILE: &str = "squeeze.yaml";

/// Load and validate `path`, or fall back to the defaults when there is none
pub fn load_or_default(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => load_config(path),
        None => Ok(Config::default()),
    }
}

/// Serialization format of a configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.yaml` / `.yml`
    Yaml,
    /// `.toml`
    Toml,
    /// `.json`
    Json,
}

impl ConfigFormat {
    /// Pick the format from the file extension, ignoring case
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                Error::Config(format!(
                    "{} has no extension to tell its format from",
                    path.display()
                ))
            })?;

        match ext.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "toml" => Ok(ConfigFormat::Toml),
            "json" => Ok(ConfigFormat::Json),
            _ => Err(Error::Config(format!(
                "{}: unsupported config format '{ext}'",
                path.display()
            ))),
        }
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConfigFormat::Yaml => "yaml",
            ConfigFormat::Toml => "toml",
            ConfigFormat::Json => "json",
        })
    }
}
