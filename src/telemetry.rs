use std::sync::Once;

use metrics::{Unit, describe_counter};
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::{SubscriberInitExt, TryInitError},
};

use crate::config::{LogFormat, LoggingSettings};

static METRIC_DESCRIPTIONS: Once = Once::new();

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to install tracing subscriber: {0}")]
    Install(#[from] TryInitError),
}

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), TelemetryError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from(logging.level).into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "riserva_response_cache_hit_total",
            Unit::Count,
            "Total number of fresh response-cache hits."
        );
        describe_counter!(
            "riserva_response_cache_miss_total",
            Unit::Count,
            "Total number of response-cache misses and expiries."
        );
        describe_counter!(
            "riserva_response_cache_evict_total",
            Unit::Count,
            "Total number of response-cache evictions due to capacity."
        );
        describe_counter!(
            "riserva_response_cache_stale_serve_total",
            Unit::Count,
            "Total number of expired payloads served after a failed refetch."
        );
        describe_counter!(
            "riserva_refresh_failure_total",
            Unit::Count,
            "Total number of background refresh failures (never surfaced)."
        );
        describe_counter!(
            "riserva_install_asset_failure_total",
            Unit::Count,
            "Total number of manifest assets skipped during install."
        );
        describe_counter!(
            "riserva_asset_cache_fallback_total",
            Unit::Count,
            "Total number of requests answered from a cache generation after a network failure."
        );
        describe_counter!(
            "riserva_asset_cache_offline_total",
            Unit::Count,
            "Total number of requests answered with the offline document or a synthesized response."
        );
    });
}
