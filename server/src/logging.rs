//! Structured logging initialization.
//!
//! Configures the tracing subscriber. The RUST_LOG environment variable
//! takes precedence over configuration file settings.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

/// Initialize the logging subsystem.
///
/// Safe to call more than once; only the first call installs a subscriber,
/// which keeps tests that share a process from panicking.
pub fn init(config: &LoggingConfig) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(config.level.as_str())
    };

    let result = match (config.format, config.timestamps) {
        (LogFormat::Pretty, true) => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(config.target)
                    .with_thread_names(config.thread_names),
            )
            .try_init(),
        (LogFormat::Pretty, false) => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(config.target)
                    .with_thread_names(config.thread_names)
                    .without_time(),
            )
            .try_init(),
        (LogFormat::Json, true) => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(config.target)
                    .with_thread_names(config.thread_names),
            )
            .try_init(),
        (LogFormat::Json, false) => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(config.target)
                    .with_thread_names(config.thread_names)
                    .without_time(),
            )
            .try_init(),
        (LogFormat::Compact, true) => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .compact()
                    .with_ansi(true)
                    .with_target(config.target)
                    .with_thread_names(config.thread_names),
            )
            .try_init(),
        (LogFormat::Compact, false) => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .compact()
                    .with_ansi(true)
                    .with_target(config.target)
                    .with_thread_names(config.thread_names)
                    .without_time(),
            )
            .try_init(),
    };

    if result.is_err() {
        tracing::debug!("logging already initialized");
    }
}
