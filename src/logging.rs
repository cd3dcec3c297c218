//! Tracing setup for the listener process.
//!
//! Output goes to stdout and an append-only log file. `RUST_LOG` directives
//! take precedence over the configured level.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::Result;

/// Dependencies that log every connection and query at info level.
const QUIET_TARGETS: [&str; 3] = ["sqlx=warn", "hyper=warn", "reqwest=warn"];

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Filter for the configured level with noisy dependencies turned down.
fn build_filter(level: &str) -> EnvFilter {
    let mut filter = EnvFilter::from_default_env().add_directive(parse_level(level).into());
    for target in QUIET_TARGETS {
        if let Ok(directive) = target.parse() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

/// Log to stdout and append to the configured file.
pub fn init(config: &LoggingConfig) -> Result<()> {
    if let Some(parent) = Path::new(&config.file).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.file)?;
    let writer = std::io::stdout.and(Arc::new(log_file));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .with(build_filter(&config.level))
        .init();

    Ok(())
}

/// Log to stdout only. Fallback when the log file cannot be opened.
pub fn init_console_only(level: &str) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(build_filter(level))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level("warning"), Level::WARN);
        assert_eq!(parse_level("Error"), Level::ERROR);
        assert_eq!(parse_level("verbose"), Level::INFO);
    }

    #[test]
    fn test_build_filter_quiets_dependencies() {
        let rendered = build_filter("debug").to_string();
        for target in QUIET_TARGETS {
            assert!(rendered.contains(target), "{rendered} lacks {target}");
        }
    }
}
