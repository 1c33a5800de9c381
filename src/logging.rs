//! Structured logging setup.
//!
//! All output goes to **stderr**; stdout belongs to the host that launched
//! the provider. Secrets never reach the log: key pairs are only ever logged
//! through their redacting `Debug` impls, and request bodies are not logged.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: log filter, e.g. `info` or `hemmer_provider_langfuse=debug`.
//!   Request-level detail (method, URL, status) is logged at `debug`.
//!
//! ```bash
//! RUST_LOG=hemmer_provider_langfuse=debug ./provider
//! ```

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log level used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_LEVEL: &str = "info";

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn subscriber(
    default_level: &str,
) -> impl tracing::Subscriber + Send + Sync + for<'a> tracing_subscriber::registry::LookupSpan<'a> {
    tracing_subscriber::registry().with(filter(default_level)).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false),
    )
}

/// Install the global subscriber at [`DEFAULT_LEVEL`].
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    subscriber(DEFAULT_LEVEL).init();
}

/// Like [`init_logging`] with a different fallback level.
///
/// ```ignore
/// hemmer_provider_langfuse::init_logging_with_default("debug");
/// ```
pub fn init_logging_with_default(default_level: &str) {
    subscriber(default_level).init();
}

/// Install the global subscriber unless one is already set.
///
/// Returns `false` if a subscriber was already installed.
pub fn try_init_logging() -> bool {
    subscriber(DEFAULT_LEVEL).try_init().is_ok()
}
