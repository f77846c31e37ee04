//! Tracing setup for the relay server.
//!
//! Log filtering follows `RUST_LOG`; without it the server logs at `info` and
//! the relay crates at `debug`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;

const DEFAULT_FILTER: &str = "info,relaychat_server=debug,relaychat_core=debug";

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global tracing subscriber.
///
/// Fails if a subscriber is already installed.
pub fn init(format: LogFormat) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let registry = tracing_subscriber::registry().with(filter());

    match format {
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(true)
                    .with_line_number(true)
                    .pretty(),
            )
            .try_init()?,
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init()?,
    }

    tracing::info!(format = %format, "Telemetry initialized");

    Ok(())
}

/// Mark the end of telemetry output.
///
/// The fmt layers write synchronously, so there is nothing left to flush.
pub fn shutdown() {
    tracing::info!("Telemetry shutdown complete");
}
