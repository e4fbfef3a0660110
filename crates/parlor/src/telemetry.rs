//! Tracing setup for binaries built on Parlor.

use tracing_subscriber::{fmt, EnvFilter};

use crate::ParlorError;

/// Installs a global `fmt` subscriber filtered by `RUST_LOG`, falling back
/// to `default_filter` (e.g. `"info,parlor_room=debug"`).
///
/// Fails if a global subscriber is already set.
pub fn init_tracing(default_filter: &str) -> Result<(), ParlorError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| ParlorError::Telemetry(e.to_string()))
}
