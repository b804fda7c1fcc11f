//! Log output for the binary.
//!
//! Events go to stderr so stdout carries nothing but IDs. Verbosity follows
//! `RUST_LOG` (default `info`); `RUST_LOG=flakeid=trace` also shows the
//! generator's per-call spans.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()?;

    Ok(())
}
