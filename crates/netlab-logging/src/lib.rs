//! netlab Logging
//!
//! One place to install the global `tracing` subscriber: an [`EnvFilter`]
//! (from `RUST_LOG`, else the configured directive) and a fmt layer.
//!
//! ```ignore
//! use netlab_logging::{init, LogConfig};
//!
//! init(&LogConfig::from_env()?)?;
//! tracing::info!("ready");
//! ```
//!
//! Engine diagnostics go here. The console transcript a user sees travels
//! on the simulator's event bus and is unaffected by the filter.

mod config;

pub use config::{LogConfig, LogFormat, DEFAULT_DIRECTIVE};

use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// Errors from subscriber setup.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid log filter directive: {0}")]
    Filter(#[from] ParseError),

    #[error("unknown log format {0:?} (expected compact, pretty or full)")]
    Format(String),

    /// A global subscriber is already installed.
    #[error("logging already initialized: {0}")]
    AlreadyInitialized(#[from] TryInitError),
}

/// Build the filter: `RUST_LOG` if set and valid, else the config directive.
pub fn env_filter(config: &LogConfig) -> Result<EnvFilter, Error> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(&config.default_directive)?),
    }
}

fn fmt_layer(config: &LogConfig) -> Box<dyn Layer<Registry> + Send + Sync> {
    let layer = fmt::layer()
        .with_target(config.with_target)
        .with_ansi(config.ansi);
    match config.format {
        LogFormat::Compact => layer.compact().boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Full => layer.boxed(),
    }
}

/// Install the global subscriber.
///
/// A second call returns [`Error::AlreadyInitialized`] instead of
/// panicking.
pub fn init(config: &LogConfig) -> Result<(), Error> {
    let filter = env_filter(config)?;
    Registry::default()
        .with(fmt_layer(config))
        .with(filter)
        .try_init()?;
    tracing::debug!(format = %config.format, "logging initialized");
    Ok(())
}

/// Install a test-friendly subscriber, ignoring the error if one is
/// already set. Output goes through the test harness's capture.
pub fn init_for_tests() {
    let config = LogConfig::test();
    let Ok(filter) = env_filter(&config) else {
        return;
    };
    let _ = Registry::default()
        .with(fmt::layer().with_test_writer().with_ansi(false))
        .with(filter)
        .try_init();
}
