//! Prometheus metrics

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Counter metric types
#[derive(Debug, Clone, Copy)]
pub enum CounterMetric {
    /// Cycle finished with every step succeeding
    CycleSucceeded,
    /// Cycle aborted by a step failure
    CycleFailed,
    /// Successful cycle slower than the slow threshold
    SlowCycle,
    /// Interpolation answered by the nearest sample
    InterpolationFallback,
    /// Downstream notification not delivered
    NotificationFailed,
}

/// Gauge metric types
#[derive(Debug, Clone, Copy)]
pub enum GaugeMetric {
    /// Failed cycles since the last success
    ConsecutiveFailures,
    /// Momentum bucket of the active fingerprint table
    ActiveBucket,
    /// Seconds until the tracked event closes
    TtcSeconds,
}

/// Start the Prometheus HTTP listener on `0.0.0.0:port`
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| anyhow::anyhow!("Failed to start metrics exporter on {}: {}", addr, e))?;

    tracing::info!(%addr, "Metrics server listening");
    Ok(())
}

/// Record the wall time of one pipeline cycle
pub fn record_cycle_duration(duration: Duration) {
    metrics::histogram!("strike_engine_cycle_duration_ms").record(duration.as_secs_f64() * 1000.0);
}

/// Increment a counter by one
pub fn increment_counter(metric: CounterMetric) {
    match metric {
        CounterMetric::CycleSucceeded => {
            metrics::counter!("strike_engine_cycles_total", "outcome" => "success").increment(1)
        }
        CounterMetric::CycleFailed => {
            metrics::counter!("strike_engine_cycles_total", "outcome" => "failure").increment(1)
        }
        CounterMetric::SlowCycle => metrics::counter!("strike_engine_slow_cycles_total").increment(1),
        CounterMetric::InterpolationFallback => {
            metrics::counter!("strike_engine_interpolation_fallback_total").increment(1)
        }
        CounterMetric::NotificationFailed => {
            metrics::counter!("strike_engine_notifications_failed_total").increment(1)
        }
    }
}

/// Count a failure of the named pipeline step
pub fn record_step_failure(step: &'static str) {
    metrics::counter!("strike_engine_step_failures_total", "step" => step).increment(1);
}

/// Set a gauge value
pub fn set_gauge(metric: GaugeMetric, value: f64) {
    let metric_name = match metric {
        GaugeMetric::ConsecutiveFailures => "strike_engine_consecutive_failures",
        GaugeMetric::ActiveBucket => "strike_engine_active_bucket",
        GaugeMetric::TtcSeconds => "strike_engine_ttc_seconds",
    };

    metrics::gauge!(metric_name).set(value);
}
