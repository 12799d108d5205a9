//! # Logging
//!
//! The service logs through `tracing`. [`init_telemetry`] installs a single
//! `fmt` layer behind an [`EnvFilter`], so verbosity follows `RUST_LOG` and
//! defaults to `info`.
//!
//! ## Formats
//!
//! - [`LogFormat::Pretty`]: multi-line output with thread ids, source
//!   locations and RFC 3339 local timestamps. Meant for a terminal.
//! - [`LogFormat::Json`]: one JSON object per event, including the current
//!   span. Meant for log shippers.
//!
//! ## Example usage
//!
//! ```bash
//! RUST_LOG=missive=trace,tower_http=debug cargo run -- --log-format json
//! ```

use crate::server::config::LogFormat;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry(format: LogFormat) -> anyhow::Result<()> {
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()));

    match format {
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_thread_ids(true)
                    .with_line_number(true)
                    .with_target(false)
                    .with_timer(ChronoLocal::rfc_3339())
                    .with_file(true)
                    .pretty(),
            )
            .try_init()?,
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_thread_ids(true)
                    .with_timer(ChronoLocal::rfc_3339()),
            )
            .try_init()?,
    }

    Ok(())
}
