//! Squeeze CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use squeeze_config::{load_config, load_or_default, Config, DEFAULT_CONFIG_FILE};
use squeeze_core::CompressionOptions;
use squeeze_minify::{BufferedFlushWriter, CompressorPipeline, FlushStats, MarkerDetector};
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "squeeze")]
#[command(about = "Whitespace-minifying filter for rendered markup", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Minify a file (or stdin) the way the response filter would
    Minify {
        /// Input file, `-` or nothing for stdin
        input: Option<PathBuf>,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Bytes per write handed to the filter
        #[arg(long, default_value_t = 8192, value_parser = clap::value_parser!(u32).range(1..))]
        chunk_size: u32,

        /// Log level (trace, debug, info, warn, error); overrides the config file
        #[arg(short, long)]
        log_level: Option<String>,
    },

    /// Validate configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
    },

    /// Show version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Minify {
            input,
            output,
            config,
            chunk_size,
            log_level,
        } => {
            let config = load_or_default(config.as_deref()).with_context(|| match &config {
                Some(path) => format!("loading {}", path.display()),
                None => "loading default configuration".to_string(),
            })?;

            let logging = &config.observability.logging;
            init_tracing(log_level.as_deref().unwrap_or(&logging.level), &logging.format)?;

            let reader: Box<dyn Read> = match input.as_deref() {
                Some(path) if path.as_os_str() != "-" => Box::new(
                    File::open(path).with_context(|| format!("opening {}", path.display()))?,
                ),
                _ => Box::new(io::stdin().lock()),
            };
            let sink: Box<dyn Write> = match &output {
                Some(path) => Box::new(BufWriter::new(
                    File::create(path).with_context(|| format!("creating {}", path.display()))?,
                )),
                None => Box::new(io::stdout().lock()),
            };

            let stats = minify(reader, sink, &config, chunk_size as usize)?;
            tracing::info!(
                units = stats.units,
                bytes_in = stats.bytes_in,
                bytes_out = stats.bytes_out,
                saved = stats.saved(),
                "Minification complete"
            );
            Ok(())
        }

        Commands::Validate { config } => {
            tracing_subscriber::fmt()
                .with_target(false)
                .with_writer(io::stderr)
                .init();

            tracing::info!("Validating configuration: {}", config.display());

            match load_config(&config) {
                Ok(cfg) => {
                    tracing::info!("✓ Configuration is valid");
                    tracing::info!("  Enabled: {}", cfg.filter.enabled);
                    tracing::info!("  Stages: {}", cfg.filter.options);
                    tracing::info!("  Markers: {:?}", cfg.filter.markers);
                    tracing::info!("  Url patterns: {:?}", cfg.filter.url_patterns);
                    Ok(())
                }
                Err(e) => {
                    tracing::error!("✗ Configuration validation failed: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Version => {
            println!("Squeeze response filter");
            println!("Version: {}", env!("CARGO_PKG_VERSION"));
            println!("Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
            Ok(())
        }
    }
}

/// Stream `input` through a buffering writer in `chunk_size` pieces
fn minify<R: Read, W: Write>(
    mut input: R,
    sink: W,
    config: &Config,
    chunk_size: usize,
) -> Result<FlushStats> {
    let options = if config.filter.enabled {
        config.filter.options
    } else {
        CompressionOptions::disabled()
    };
    let detector = MarkerDetector::new(config.filter.markers.iter().cloned())?;
    let writer = BufferedFlushWriter::new(sink)
        .with_pipeline(Arc::new(CompressorPipeline::new(options)))
        .with_detector(detector);

    let mut chunk = vec![0u8; chunk_size];
    loop {
        let read = match input.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e).context("reading input"),
        };
        writer.write_bytes(&chunk[..read])?;
    }

    let mut sink = writer.close()?;
    sink.flush()?;
    Ok(writer.stats())
}

fn init_tracing(level: &str, format: &str) -> Result<()> {
    let filter = match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    };
    let env_filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(filter.into());

    // stdout may carry the minified output
    if format == "json" {
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(io::stderr),
            )
            .with(env_filter)
            .init();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    const PAGE: &str = "<html>\n  <body>\n    <p>a</p>\n  </body>\n</html>\n<html>\n  <p>b</p>\n</html>";

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_minify_in_small_chunks() {
        let mut out = Vec::new();
        let stats = minify(PAGE.as_bytes(), &mut out, &Config::default(), 3).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "<html><body><p>a</p></body></html><html><p>b</p></html>"
        );
        assert_eq!(stats.units, 2);
    }

    #[test]
    fn test_disabled_filter_copies_input() {
        let mut config = Config::default();
        config.filter.enabled = false;
        let mut out = Vec::new();
        minify(PAGE.as_bytes(), &mut out, &config, 16).unwrap();
        assert_eq!(out, PAGE.as_bytes());
    }

    #[test]
    fn test_minify_with_config_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(b"[filter]\nremoveIntertagSpaces = false\n").unwrap();
        let config = load_config(file.path()).unwrap();

        let mut out = Vec::new();
        minify(PAGE.as_bytes(), &mut out, &config, 64).unwrap();
        assert_eq!(out, PAGE.as_bytes());
    }

    #[test]
    fn test_invalid_input_fails() {
        let mut out = Vec::new();
        let result = minify(&b"<p>\xff</p>"[..], &mut out, &Config::default(), 8);
        assert!(result.is_err());
    }
}
