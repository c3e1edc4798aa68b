//! Stage Metrics
//!
//! Runs, failures, row counts and durations for the ingestion, cleaning and
//! aggregation stages, labelled by stage name.

use crate::metrics::{phase_metric, MetricDoc, MetricType, PhaseMetrics};

pub struct StageMetrics;

impl StageMetrics {
    pub fn record_run(stage: &'static str) {
        ::metrics::counter!(phase_metric!(counter, "stage", "runs"), "stage" => stage).increment(1);
    }

    pub fn record_failure(stage: &'static str) {
        ::metrics::counter!(phase_metric!(counter, "stage", "failures"), "stage" => stage)
            .increment(1);
    }

    pub fn record_rows(stage: &'static str, rows_in: usize, rows_out: usize) {
        ::metrics::counter!(phase_metric!(counter, "stage", "rows_in"), "stage" => stage)
            .increment(rows_in as u64);
        ::metrics::counter!(phase_metric!(counter, "stage", "rows_out"), "stage" => stage)
            .increment(rows_out as u64);
    }

    pub fn record_duration(stage: &'static str, secs: f64) {
        ::metrics::histogram!(phase_metric!(histogram, "stage", "duration_seconds"), "stage" => stage)
            .record(secs);
    }
}

impl PhaseMetrics for StageMetrics {
    fn register_metrics() {
        use metrics::{counter, histogram};

        let _ = counter!(phase_metric!(counter, "stage", "runs"));
        let _ = counter!(phase_metric!(counter, "stage", "failures"));
        let _ = counter!(phase_metric!(counter, "stage", "rows_in"));
        let _ = counter!(phase_metric!(counter, "stage", "rows_out"));
        let _ = histogram!(phase_metric!(histogram, "stage", "duration_seconds"));
    }

    fn phase_name() -> &'static str {
        "stage"
    }

    fn metrics_documentation() -> Vec<MetricDoc> {
        vec![
            MetricDoc {
                name: phase_metric!(counter, "stage", "runs"),
                metric_type: MetricType::Counter,
                help: "Stage executions started",
            },
            MetricDoc {
                name: phase_metric!(counter, "stage", "failures"),
                metric_type: MetricType::Counter,
                help: "Stage executions that returned an error",
            },
            MetricDoc {
                name: phase_metric!(counter, "stage", "rows_in"),
                metric_type: MetricType::Counter,
                help: "Rows read by a stage from its input",
            },
            MetricDoc {
                name: phase_metric!(counter, "stage", "rows_out"),
                metric_type: MetricType::Counter,
                help: "Rows written by a stage to its output snapshot",
            },
            MetricDoc {
                name: phase_metric!(histogram, "stage", "duration_seconds"),
                metric_type: MetricType::Histogram,
                help: "Wall time of a stage from read to committed write",
            },
        ]
    }
}
