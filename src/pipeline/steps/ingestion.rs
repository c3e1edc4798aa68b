use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{info, instrument};

use super::{Stage, StageReport};
use crate::constants::INGESTION_STAGE;
use crate::error::Result;
use crate::pipeline::{PipelineContext, SnapshotKind};
use crate::storage::WriteMode;
use crate::table::csv_source;

/// Loads the delimited source as-is into the raw snapshot
pub struct IngestionStage {
    source: PathBuf,
}

impl IngestionStage {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

#[async_trait]
impl Stage for IngestionStage {
    fn name(&self) -> &'static str {
        INGESTION_STAGE
    }

    fn input(&self) -> Option<SnapshotKind> {
        None
    }

    fn output(&self) -> SnapshotKind {
        SnapshotKind::Raw
    }

    #[instrument(skip(self, ctx), fields(source = %self.source.display()))]
    async fn execute(&self, ctx: &PipelineContext) -> Result<StageReport> {
        let table = csv_source::read_delimited(&self.source, ctx.config.delimiter())?;
        info!(
            "Read {} rows with {} columns from {}",
            table.len(),
            table.schema.len(),
            self.source.display()
        );

        ctx.reporter.row_count(SnapshotKind::Raw.label(), table.len());
        ctx.reporter
            .sample(SnapshotKind::Raw.label(), &table.head(ctx.config.report.sample_rows));

        let info = ctx
            .store
            .write(ctx.snapshot_name(SnapshotKind::Raw), &table, WriteMode::Overwrite)
            .await?;

        Ok(StageReport::new(INGESTION_STAGE, info, table.len())
            .with_metadata("source", self.source.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SnapshotStore;
    use crate::error::LakehouseError;
    use crate::pipeline::testing::memory_context;
    use std::io::Write;

    #[tokio::test]
    async fn ingestion_persists_source_unchanged() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "fare_amount,trip_distance,PULocationID,DOLocationID").unwrap();
        writeln!(file, "-5,2,1,3").unwrap();
        writeln!(file, "10,0.5,1,2").unwrap();

        let (ctx, store, _) = memory_context();
        let report = IngestionStage::new(file.path()).execute(&ctx).await.unwrap();

        assert_eq!(report.rows_out, 2);
        let raw = store.read("nyc_taxi_raw").await.unwrap();
        assert_eq!(raw.len(), 2);
        // negative fare is only dropped later, by cleaning
        assert_eq!(raw.rows[0][0].as_f64(), Some(-5.0));
    }

    #[tokio::test]
    async fn missing_source_does_not_write() {
        let (ctx, store, _) = memory_context();
        let err = IngestionStage::new("/no/such/input.csv")
            .execute(&ctx)
            .await
            .unwrap_err();

        assert!(matches!(err, LakehouseError::SourceNotFound { .. }));
        assert!(store.history("nyc_taxi_raw").await.unwrap().is_empty());
    }
}
