//! Snapshot Metrics

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};
use crate::storage::SnapshotInfo;

pub struct SnapshotMetrics;

impl SnapshotMetrics {
    /// Record a committed snapshot version
    pub fn record_commit(info: &SnapshotInfo) {
        let name = info.name.clone();
        ::metrics::counter!(phase_metric!(counter, "snapshot", "commits"), "snapshot" => name.clone())
            .increment(1);
        ::metrics::gauge!(phase_metric!(gauge, "snapshot", "latest_version"), "snapshot" => name.clone())
            .set(info.version as f64);
        ::metrics::gauge!(phase_metric!(gauge, "snapshot", "rows"), "snapshot" => name)
            .set(info.row_count as f64);
    }
}

impl PhaseMetrics for SnapshotMetrics {
    fn register_metrics() {
        use metrics::{counter, gauge};

        let _ = counter!(phase_metric!(counter, "snapshot", "commits"));
        let _ = gauge!(phase_metric!(gauge, "snapshot", "latest_version"));
        let _ = gauge!(phase_metric!(gauge, "snapshot", "rows"));
    }

    fn phase_name() -> &'static str {
        "snapshot"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "snapshot", "commits"),
                metric_type: MetricType::Counter,
                help: "Snapshot versions committed",
            },
            MetricDoc {
                name: phase_metric!(gauge, "snapshot", "latest_version"),
                metric_type: MetricType::Gauge,
                help: "Most recently committed version per snapshot",
            },
            MetricDoc {
                name: phase_metric!(gauge, "snapshot", "rows"),
                metric_type: MetricType::Gauge,
                help: "Row count of the most recent version per snapshot",
            },
        ]
    }
}
