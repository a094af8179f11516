use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::{tracks, warmup};
use crate::cache;
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
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
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Register metric descriptions with whichever recorder is installed.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            tracks::METRIC_CACHE_HIT,
            Unit::Count,
            "Track cache lookups answered from the cache, by operation."
        );
        describe_counter!(
            tracks::METRIC_CACHE_MISS,
            Unit::Count,
            "Track cache lookups that fell through to the store or providers."
        );
        describe_counter!(
            cache::METRIC_EVICT,
            Unit::Count,
            "Track cache entries evicted due to capacity."
        );
        describe_counter!(
            warmup::METRIC_WARM_DROPPED,
            Unit::Count,
            "Cache warm jobs discarded because the queue was full or closed."
        );
        describe_counter!(
            warmup::METRIC_WARM_FAILED,
            Unit::Count,
            "Cache warm writes that failed or timed out."
        );
        describe_histogram!(
            warmup::METRIC_WARM_MS,
            Unit::Milliseconds,
            "Cache warm write latency in milliseconds."
        );
    });
}
