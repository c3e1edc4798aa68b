//! Pipeline metrics
//!
//! Each concern defines its metrics in a dedicated submodule implementing
//! [`PhaseMetrics`]. Without an installed recorder the `metrics` macros are
//! no-ops, so instrumented code runs unchanged in tests.

pub mod registry;
pub mod snapshots;
pub mod stages;

pub use snapshots::SnapshotMetrics;
pub use stages::StageMetrics;

use std::sync::Once;
use tracing::{info, warn};

use crate::constants::ENV_METRICS_ADDR;

static INIT: Once = Once::new();

/// Install the Prometheus exporter when `LAKEHOUSE_METRICS_ADDR` is set.
///
/// Idempotent. Must be called from within a tokio runtime because the exporter
/// spawns its HTTP listener there.
pub fn init_metrics() {
    INIT.call_once(|| {
        let addr_str = match std::env::var(ENV_METRICS_ADDR) {
            Ok(v) if !v.trim().is_empty() => v,
            _ => return,
        };
        let addr = match addr_str.parse::<std::net::SocketAddr>() {
            Ok(addr) => addr,
            Err(e) => {
                warn!("Invalid metrics addr '{}': {}", addr_str, e);
                return;
            }
        };

        match metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
        {
            Ok(()) => {
                info!("Prometheus exporter listening at http://{}/metrics", addr);
                registry::register_all_metrics();
            }
            Err(e) => warn!("Failed to install Prometheus exporter: {}", e),
        }
    });
}

/// A group of related metrics
pub trait PhaseMetrics {
    /// Touch every metric so it is exported before its first update.
    fn register_metrics();

    fn phase_name() -> &'static str;

    fn metrics_documentation() -> Vec<MetricDoc>;
}

#[derive(Debug, Clone)]
pub struct MetricDoc {
    pub name: &'static str,
    pub metric_type: MetricType,
    pub help: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Counter,
    Histogram,
    Gauge,
}

/// Metric names follow `lakehouse_{phase}_{name}[_total]`
macro_rules! phase_metric {
    (counter, $phase:literal, $name:literal) => {
        concat!("lakehouse_", $phase, "_", $name, "_total")
    };
    (histogram, $phase:literal, $name:literal) => {
        concat!("lakehouse_", $phase, "_", $name)
    };
    (gauge, $phase:literal, $name:literal) => {
        concat!("lakehouse_", $phase, "_", $name)
    };
}

pub(crate) use phase_metric;

#[cfg(test)]
mod tests {
    #[test]
    fn test_metric_naming_convention() {
        assert_eq!(
            phase_metric!(counter, "stage", "runs"),
            "lakehouse_stage_runs_total"
        );
        assert_eq!(
            phase_metric!(histogram, "stage", "duration_seconds"),
            "lakehouse_stage_duration_seconds"
        );
        assert_eq!(
            phase_metric!(gauge, "snapshot", "latest_version"),
            "lakehouse_snapshot_latest_version"
        );
    }
}
