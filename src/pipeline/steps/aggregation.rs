use async_trait::async_trait;
use tracing::{info, instrument};

use super::{read_checked, Stage, StageReport};
use crate::constants::AGGREGATION_STAGE;
use crate::error::Result;
use crate::pipeline::processing::aggregate;
use crate::pipeline::{PipelineContext, SnapshotKind};
use crate::storage::WriteMode;

/// Averages fares per pickup/dropoff route
pub struct AggregationStage;

#[async_trait]
impl Stage for AggregationStage {
    fn name(&self) -> &'static str {
        AGGREGATION_STAGE
    }

    fn input(&self) -> Option<SnapshotKind> {
        Some(SnapshotKind::Clean)
    }

    fn output(&self) -> SnapshotKind {
        SnapshotKind::Summary
    }

    #[instrument(skip(self, ctx))]
    async fn execute(&self, ctx: &PipelineContext) -> Result<StageReport> {
        let config = &ctx.config;
        let clean = read_checked(
            ctx,
            SnapshotKind::Clean,
            &aggregate::expected_columns(&config.columns),
        )
        .await?;

        let summary = aggregate::average_fare_by_route(&clean, &config.columns)?;
        info!("Aggregated {} rows into {} routes", clean.len(), summary.len());

        let top = aggregate::top_routes(&summary, config.report.top_routes)?;
        ctx.reporter.ranking(
            &format!("Top {} average fares per route:", config.report.top_routes),
            &top,
        );

        let info = ctx
            .store
            .write(ctx.snapshot_name(SnapshotKind::Summary), &summary, WriteMode::Overwrite)
            .await?;

        Ok(StageReport::new(AGGREGATION_STAGE, info, clean.len()))
    }
}
