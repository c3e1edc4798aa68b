use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{error, info, info_span, Instrument};

use super::{PipelineContext, SnapshotKind};
use crate::error::Result;
use crate::metrics::{SnapshotMetrics, StageMetrics};
use crate::storage::SnapshotInfo;
use crate::table::{ExpectedColumn, Table};

pub mod aggregation;
pub mod cleaning;
pub mod ingestion;

pub use aggregation::AggregationStage;
pub use cleaning::CleaningStage;
pub use ingestion::IngestionStage;

/// One pipeline stage: reads one input, commits one output snapshot
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    /// Snapshot read by this stage; `None` when it reads an external source.
    fn input(&self) -> Option<SnapshotKind>;

    fn output(&self) -> SnapshotKind;

    async fn execute(&self, ctx: &PipelineContext) -> Result<StageReport>;
}

/// Outcome of a stage that committed its output
#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage: &'static str,
    pub snapshot: SnapshotInfo,
    pub rows_in: usize,
    pub rows_out: usize,
    pub metadata: BTreeMap<String, String>,
}

impl StageReport {
    pub fn new(stage: &'static str, snapshot: SnapshotInfo, rows_in: usize) -> Self {
        Self {
            stage,
            rows_out: snapshot.row_count,
            snapshot,
            rows_in,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl ToString) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }
}

/// Execute a stage with timing and metrics, attaching stage and snapshot context to failures.
pub async fn run_stage(stage: &dyn Stage, ctx: &PipelineContext) -> Result<StageReport> {
    let name = stage.name();
    let output = ctx.location(stage.output());
    StageMetrics::record_run(name);
    let started = Instant::now();

    let span = info_span!("stage", stage = name, output = %output);
    match stage.execute(ctx).instrument(span).await {
        Ok(report) => {
            let secs = started.elapsed().as_secs_f64();
            StageMetrics::record_duration(name, secs);
            StageMetrics::record_rows(name, report.rows_in, report.rows_out);
            SnapshotMetrics::record_commit(&report.snapshot);
            info!(
                "{} stage committed {} version {} ({} -> {} rows, {:.3}s)",
                name, output, report.snapshot.version, report.rows_in, report.rows_out, secs
            );
            Ok(report)
        }
        Err(e) => {
            StageMetrics::record_failure(name);
            error!("{} stage failed: {}", name, e);
            Err(e.in_stage(name, output))
        }
    }
}

/// Read the latest version of a snapshot and check it carries the expected columns.
pub async fn read_checked(
    ctx: &PipelineContext,
    kind: SnapshotKind,
    expected: &[ExpectedColumn],
) -> Result<Table> {
    let table = ctx.store.read(ctx.snapshot_name(kind)).await?;
    table.require_all(expected)?;
    Ok(table)
}
