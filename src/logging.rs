//! Log output for the binary and ad-hoc debugging.
//!
//! Library code only emits `tracing` events; installing a subscriber is left
//! to the host. `RUST_LOG` overrides the default filter.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const DEFAULT_FILTER: &str = "danmaku_launcher=info";

/// Install a stderr fmt subscriber. Calling it again is a no-op.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // stdout carries display commands
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_timer(fmt::time::uptime()),
        )
        .with(filter)
        .try_init();
}
