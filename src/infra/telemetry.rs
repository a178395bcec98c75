use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRICS_DESCRIBED: Once = Once::new();

/// Install process-wide tracing and register metric descriptions.
///
/// `RUST_LOG` directives stack on top of the configured default level, so
/// verbosity can be raised per target without touching configuration.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(ErrorLayer::default());

    let installed = match logging.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_target(true),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_target(true))
            .try_init(),
    };

    installed.map_err(|err| {
        InfraError::telemetry(format!("could not install the tracing subscriber: {err}"))
    })
}

fn describe_metrics() {
    METRICS_DESCRIBED.call_once(|| {
        describe_counter!(
            "kura_cache_hit_total",
            Unit::Count,
            "Total number of requests served from a fresh cached record."
        );
        describe_counter!(
            "kura_cache_miss_total",
            Unit::Count,
            "Total number of requests that had no cached record."
        );
        describe_counter!(
            "kura_cache_refresh_total",
            Unit::Count,
            "Total number of stale records replaced by an upstream fetch."
        );
        describe_counter!(
            "kura_upstream_error_total",
            Unit::Count,
            "Total number of failed upstream fetches."
        );
        describe_histogram!(
            "kura_upstream_fetch_ms",
            Unit::Milliseconds,
            "Upstream fetch latency in milliseconds."
        );
    });
}
