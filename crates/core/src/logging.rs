//! Logging and tracing initialization.
//!
//! Provides [`init_tracing`] to configure structured logging with two modes:
//! - **JSON mode** (`json = true`): machine-readable output with nanosecond
//!   timestamps, suitable for log aggregation.
//! - **Pretty mode** (`json = false`): human-readable colored output for
//!   local development.
//!
//! Both modes respect the `RUST_LOG` environment variable for filtering
//! (e.g., `RUST_LOG=estate_ml=debug,estate_store=trace`).

use std::fmt;

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// # Panics
///
/// Panics if the global subscriber has already been set.
///
/// # Examples
///
/// ```
/// // Development mode
/// estate_core::logging::init_tracing(false);
/// ```
pub fn init_tracing(json: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    if json {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_timer(NanosecondTimer)
            .with_target(true)
            .with_current_span(true)
            .with_span_events(FmtSpan::CLOSE);

        registry.with(json_layer).init();
    } else {
        let pretty_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(false)
            .with_span_events(FmtSpan::CLOSE);

        registry.with(pretty_layer).init();
    }
}

/// Emits RFC 3339 timestamps with nanosecond precision for JSON logs.
#[derive(Debug, Clone)]
struct NanosecondTimer;

impl NanosecondTimer {
    const FORMAT: &'static str = "%Y-%m-%dT%H:%M:%S%.9fZ";
}

impl tracing_subscriber::fmt::time::FormatTime for NanosecondTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> fmt::Result {
        let now = chrono::Utc::now();
        write!(w, "{}", now.format(Self::FORMAT))
    }
}
