//! Prometheus metrics for the pool engine

use metrics::{counter, gauge, histogram, Gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Start the Prometheus exporter on `0.0.0.0:port`, served at `/metrics`
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new().with_http_listener(addr).install()?;

    tracing::info!(%addr, "Metrics server listening");
    Ok(())
}

/// Metric handles for one platform instance
///
/// * `volx_operations_total{platform, operation}`
/// * `volx_operation_failures_total{platform, operation, kind}`
/// * `volx_operation_duration_seconds{platform, operation}`
/// * `volx_pool_balance`, `volx_total_position_units`, `volx_turbulence_percent`
/// * `volx_liquidations_total`
///
/// Without an installed recorder every call is a no-op.
#[derive(Clone)]
pub struct PlatformMetrics {
    platform: String,
    pool_balance: Gauge,
    total_units: Gauge,
    turbulence: Gauge,
}

impl PlatformMetrics {
    pub fn new(platform: &str) -> Self {
        let name = platform.to_string();

        Self {
            pool_balance: gauge!("volx_pool_balance", "platform" => name.clone()),
            total_units: gauge!("volx_total_position_units", "platform" => name.clone()),
            turbulence: gauge!("volx_turbulence_percent", "platform" => name.clone()),
            platform: name,
        }
    }

    pub fn record_success(&self, operation: &'static str) {
        counter!(
            "volx_operations_total",
            "platform" => self.platform.clone(),
            "operation" => operation
        )
        .increment(1);
    }

    pub fn record_failure(&self, operation: &'static str, kind: &'static str) {
        counter!(
            "volx_operation_failures_total",
            "platform" => self.platform.clone(),
            "operation" => operation,
            "kind" => kind
        )
        .increment(1);
    }

    pub fn record_liquidations(&self, count: usize) {
        counter!("volx_liquidations_total", "platform" => self.platform.clone())
            .increment(count as u64);
    }

    /// Publish the pool state after a committed operation
    pub fn set_pool_state(&self, pool_balance: u128, total_units: u128, turbulence_percent: u32) {
        self.pool_balance.set(pool_balance as f64);
        self.total_units.set(total_units as f64);
        self.turbulence.set(f64::from(turbulence_percent));
    }

    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// Start timing an operation; the duration is recorded on drop
    pub fn start_timer(&self, operation: &'static str) -> OperationTimer {
        OperationTimer {
            platform: self.platform.clone(),
            operation,
            start: Instant::now(),
        }
    }
}

/// Records `volx_operation_duration_seconds` when dropped
pub struct OperationTimer {
    platform: String,
    operation: &'static str,
    start: Instant,
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        histogram!(
            "volx_operation_duration_seconds",
            "platform" => self.platform.clone(),
            "operation" => self.operation
        )
        .record(self.start.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_without_recorder_are_noops() {
        let metrics = PlatformMetrics::new("test");
        assert_eq!(metrics.platform(), "test");

        metrics.record_success("deposit");
        metrics.record_failure("withdraw", "insufficient_state");
        metrics.record_liquidations(2);
        metrics.set_pool_state(1_000, 500, 100);
        drop(metrics.start_timer("open"));
    }
}
