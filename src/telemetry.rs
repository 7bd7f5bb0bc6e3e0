//! Process-wide logging setup.
//!
//! The log sink itself (where stdout ends up) is an external collaborator;
//! this just installs a `tracing` subscriber that writes structured events
//! to stdout, filtered by `RUST_LOG` (defaulting to `info`).

use tracing_subscriber::EnvFilter;

/// Installs the global `tracing` subscriber. Call once at process startup.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
