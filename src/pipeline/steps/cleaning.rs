use async_trait::async_trait;
use tracing::{info, instrument};

use super::{read_checked, Stage, StageReport};
use crate::constants::CLEANING_STAGE;
use crate::error::Result;
use crate::pipeline::processing::clean;
use crate::pipeline::{PipelineContext, SnapshotKind};
use crate::storage::WriteMode;

/// Filters, deduplicates, trims fare outliers and classifies trips
pub struct CleaningStage;

#[async_trait]
impl Stage for CleaningStage {
    fn name(&self) -> &'static str {
        CLEANING_STAGE
    }

    fn input(&self) -> Option<SnapshotKind> {
        Some(SnapshotKind::Raw)
    }

    fn output(&self) -> SnapshotKind {
        SnapshotKind::Clean
    }

    #[instrument(skip(self, ctx))]
    async fn execute(&self, ctx: &PipelineContext) -> Result<StageReport> {
        let config = &ctx.config;
        let raw = read_checked(ctx, SnapshotKind::Raw, &clean::expected_columns(&config.columns)).await?;

        let out = clean::clean(raw, &config.columns, &config.cleaning)?;
        let stats = &out.stats;
        info!(
            "Cleaned {} rows: {} valid, {} unique, {} within [{}, {}]",
            stats.input_rows,
            stats.after_validity,
            stats.after_dedup,
            stats.after_outliers,
            stats.p_lower,
            stats.p_upper
        );

        ctx.reporter.row_count(SnapshotKind::Clean.label(), out.table.len());
        ctx.reporter.sample(
            SnapshotKind::Clean.label(),
            &out.table.head(config.report.sample_rows),
        );

        let info = ctx
            .store
            .write(ctx.snapshot_name(SnapshotKind::Clean), &out.table, WriteMode::Overwrite)
            .await?;

        Ok(StageReport::new(CLEANING_STAGE, info, stats.input_rows)
            .with_metadata("after_validity", stats.after_validity)
            .with_metadata("after_dedup", stats.after_dedup)
            .with_metadata("after_outliers", stats.after_outliers)
            .with_metadata("p_lower", stats.p_lower)
            .with_metadata("p_upper", stats.p_upper))
    }
}
