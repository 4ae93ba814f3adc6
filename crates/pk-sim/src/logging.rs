//! Log subscriber setup.
//!
//! The library crates only emit `tracing` events.  Hosts pick one of these
//! initialisers, or install their own subscriber.

use std::io;

use tracing::Level;
use tracing::dispatcher::DefaultGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{Layer, fmt};

use crate::{SimError, SimResult};

/// Install a process-wide stdout subscriber at `level`.  Fails if a global
/// subscriber is already set.
pub fn init_std_out_logging(level: Level) -> SimResult<()> {
    let collector = tracing_subscriber::registry().with(
        fmt::Layer::new()
            .with_writer(io::stdout)
            .with_thread_names(true)
            .with_filter(LevelFilter::from_level(level)),
    );
    tracing::subscriber::set_global_default(collector).map_err(|e| SimError::Logging(e.to_string()))
}

/// Stdout subscriber at INFO for the current thread only, until the guard
/// is dropped.  Events from the checkup worker thread are not captured.
pub fn init_std_out_logging_thread_local() -> DefaultGuard {
    let collector = tracing_subscriber::registry().with(
        fmt::Layer::new()
            .with_writer(io::stdout)
            .with_filter(LevelFilter::INFO),
    );
    tracing::subscriber::set_default(collector)
}
