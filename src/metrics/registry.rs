//! Registers every metrics group and detects name collisions between them.

use crate::metrics::{MetricDoc, PhaseMetrics};
use std::collections::HashMap;
use tracing::{debug, info, warn};

pub fn register_all_metrics() {
    let mut all_metrics = HashMap::new();

    register_phase_metrics::<super::stages::StageMetrics>(&mut all_metrics);
    register_phase_metrics::<super::snapshots::SnapshotMetrics>(&mut all_metrics);

    info!("Registered {} metrics", all_metrics.len());
}

fn register_phase_metrics<T: PhaseMetrics>(all_metrics: &mut HashMap<&'static str, MetricDoc>) {
    T::register_metrics();
    let phase_name = T::phase_name();

    for doc in T::metrics_documentation() {
        debug!("{} metric {} ({:?}): {}", phase_name, doc.name, doc.metric_type, doc.help);
        if all_metrics.contains_key(doc.name) {
            warn!(
                "Metric name conflict: '{}' registered again by phase '{}'",
                doc.name, phase_name
            );
        } else {
            all_metrics.insert(doc.name, doc);
        }
    }
}
