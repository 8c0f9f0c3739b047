//! Tracing subscriber setup.

use crate::config::Config;
use anyhow::Context;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use std::env;
use tracing_stackdriver::CloudTraceConfiguration;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset.
///
/// Production keeps workflow logs at `info`; every other environment also
/// records the per-attempt `debug` events of the onboarding workflow.
pub(crate) fn default_filter(config: &Config) -> &'static str {
    if config.is_prod() {
        "info"
    } else {
        "info,onboarding_services=debug"
    }
}

fn env_filter(config: &Config) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(config)))
}

/// Installs the global subscriber.
///
/// Local runs print human-readable lines. Deployed environments emit
/// Stackdriver JSON linked to Cloud Trace, which needs `GOOGLE_CLOUD_PROJECT`.
pub fn init_tracing(config: &Config) -> anyhow::Result<()> {
    if config.is_local() {
        tracing_subscriber::registry()
            .with(env_filter(config))
            .with(tracing_subscriber::fmt::layer())
            .init();
        return Ok(());
    }

    let project_id = env::var("GOOGLE_CLOUD_PROJECT").with_context(|| {
        format!(
            "GOOGLE_CLOUD_PROJECT must be set for {} environment",
            config.environment()
        )
    })?;

    // Incoming `traceparent` headers become the parent of each request span
    opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());

    tracing_subscriber::registry()
        .with(env_filter(config))
        .with(tracing_opentelemetry::layer())
        .with(tracing_stackdriver::layer().with_cloud_trace(CloudTraceConfiguration { project_id }))
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_is_verbose_outside_prod() {
        assert_eq!(
            default_filter(&Config::new_for_test()),
            "info,onboarding_services=debug"
        );
    }
}
