//! Tracing subscriber initialization
//!
//! Logs go to stderr so binaries can keep stdout for machine-readable output.

use crate::{Error, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the filter directive used when `RUST_LOG` is unset
///
/// `default_directive("sedq-engine", "debug")` → `"sedq_engine=debug"`
pub fn default_directive(crate_name: &str, level: &str) -> String {
    format!("{}={}", crate_name.replace('-', "_"), level)
}

/// Install the global subscriber
///
/// `RUST_LOG` takes precedence over `default_directive`.
pub fn init_logging(default_directive: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .map_err(|e| Error::Config(format!("Invalid log directive '{}': {}", default_directive, e)))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| Error::Internal(format!("Failed to install tracing subscriber: {}", e)))
}
