//! Metrics recorder initialization and configuration.

use {anyhow::Result, tracing::info};

/// Handle to the metrics system, providing access to exported metrics.
#[derive(Clone)]
pub struct MetricsHandle {
    #[cfg(feature = "prometheus")]
    prometheus_handle: metrics_exporter_prometheus::PrometheusHandle,
}

impl MetricsHandle {
    /// Render metrics in Prometheus text format for the `/metrics` endpoint.
    #[must_use]
    pub fn render(&self) -> String {
        #[cfg(feature = "prometheus")]
        {
            self.prometheus_handle.render()
        }
        #[cfg(not(feature = "prometheus"))]
        {
            String::new()
        }
    }
}

/// Configuration for the metrics system.
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorderConfig {
    /// Whether metrics collection is enabled
    pub enabled: bool,
    /// Global labels to add to all metrics
    pub global_labels: Vec<(String, String)>,
}

/// Initialize the metrics system.
///
/// Call once at startup. With the `prometheus` feature this installs the
/// Prometheus recorder globally; otherwise the facade stays a no-op.
///
/// # Errors
///
/// Returns an error if the recorder cannot be installed (for example when
/// another recorder is already registered).
pub fn init_metrics(config: MetricsRecorderConfig) -> Result<MetricsHandle> {
    if !config.enabled {
        info!("metrics collection is disabled");
        #[cfg(feature = "prometheus")]
        {
            // Rendering stays possible, nothing gets recorded globally.
            let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
            return Ok(MetricsHandle {
                prometheus_handle: recorder.handle(),
            });
        }
        #[cfg(not(feature = "prometheus"))]
        return Ok(MetricsHandle {});
    }

    #[cfg(feature = "prometheus")]
    {
        let handle = init_prometheus(config)?;
        info!("prometheus metrics exporter initialized");
        Ok(MetricsHandle {
            prometheus_handle: handle,
        })
    }

    #[cfg(not(feature = "prometheus"))]
    {
        let _ = config;
        info!("metrics feature not enabled at compile time");
        Ok(MetricsHandle {})
    }
}

#[cfg(feature = "prometheus")]
fn init_prometheus(
    config: MetricsRecorderConfig,
) -> Result<metrics_exporter_prometheus::PrometheusHandle> {
    use {
        crate::{bot, buckets},
        metrics_exporter_prometheus::{Matcher, PrometheusBuilder},
    };

    let mut builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("botdeck_http_".to_string()),
            buckets::HTTP_DURATION,
        )?
        .set_buckets_for_metric(
            Matcher::Full(bot::CONNECT_DURATION_SECONDS.to_string()),
            buckets::CONNECT_DURATION,
        )?;

    for (key, value) in config.global_labels {
        builder = builder.add_global_label(key, value);
    }

    // Install globally without spawning the exporter's own HTTP listener;
    // the gateway serves `/metrics` itself.
    Ok(builder.install_recorder()?)
}
