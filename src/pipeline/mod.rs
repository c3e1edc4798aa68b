//! Three-stage snapshot pipeline: ingestion, cleaning, aggregation.
//!
//! Stages share nothing in memory. Each reads the latest committed version of
//! its input snapshot through the [`PipelineContext`] and commits its own output.

pub mod processing;
pub mod steps;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::config::Config;
use crate::error::{LakehouseError, Result};
use crate::report::Reporter;
use crate::storage::SnapshotStore;
use steps::{run_stage, AggregationStage, CleaningStage, IngestionStage, Stage, StageReport};

/// Stage boundaries, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotKind {
    Raw,
    Clean,
    Summary,
}

impl SnapshotKind {
    pub const ALL: [SnapshotKind; 3] = [SnapshotKind::Raw, SnapshotKind::Clean, SnapshotKind::Summary];

    pub fn label(&self) -> &'static str {
        match self {
            SnapshotKind::Raw => "Raw",
            SnapshotKind::Clean => "Cleaned",
            SnapshotKind::Summary => "Summary",
        }
    }
}

impl fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Explicit handles passed to every stage
#[derive(Clone)]
pub struct PipelineContext {
    pub store: Arc<dyn SnapshotStore>,
    pub reporter: Arc<dyn Reporter>,
    pub config: Arc<Config>,
}

impl PipelineContext {
    pub fn new(store: Arc<dyn SnapshotStore>, reporter: Arc<dyn Reporter>, config: Config) -> Self {
        Self {
            store,
            reporter,
            config: Arc::new(config),
        }
    }

    pub fn snapshot_name(&self, kind: SnapshotKind) -> &str {
        let storage = &self.config.storage;
        match kind {
            SnapshotKind::Raw => &storage.raw_snapshot,
            SnapshotKind::Clean => &storage.clean_snapshot,
            SnapshotKind::Summary => &storage.summary_snapshot,
        }
    }

    pub fn location(&self, kind: SnapshotKind) -> String {
        self.store.location(self.snapshot_name(kind))
    }
}

/// Reports from every stage of a completed run, in execution order
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub reports: Vec<StageReport>,
}

impl PipelineResult {
    pub fn stage(&self, name: &str) -> Option<&StageReport> {
        self.reports.iter().find(|r| r.stage == name)
    }
}

/// An ordered sequence of stages
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.stages.iter().map(|s| s.name()))
            .finish()
    }
}

impl Pipeline {
    /// Build a pipeline, rejecting stage orders that cannot run front to back:
    /// two stages writing one snapshot, or a stage reading a snapshot that only
    /// a later stage produces.
    pub fn new(stages: Vec<Box<dyn Stage>>) -> Result<Self> {
        for (i, stage) in stages.iter().enumerate() {
            let later = &stages[i + 1..];
            if later.iter().any(|s| s.output() == stage.output()) {
                return Err(LakehouseError::Config(format!(
                    "more than one stage writes the {} snapshot",
                    stage.output()
                )));
            }
            if let Some(input) = stage.input() {
                if later.iter().any(|s| s.output() == input) {
                    return Err(LakehouseError::Config(format!(
                        "{} stage reads the {} snapshot before it is written",
                        stage.name(),
                        input
                    )));
                }
            }
        }
        Ok(Self { stages })
    }

    /// Ingestion, cleaning and aggregation, in that order.
    pub fn standard(source: impl Into<PathBuf>) -> Self {
        Self {
            stages: vec![
                Box::new(IngestionStage::new(source)),
                Box::new(CleaningStage),
                Box::new(AggregationStage),
            ],
        }
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage to completion in order, stopping at the first failure.
    pub async fn run(&self, ctx: &PipelineContext) -> Result<PipelineResult> {
        info!("Running pipeline: {}", self.stage_names().join(" -> "));
        let mut reports = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            reports.push(run_stage(stage.as_ref(), ctx).await?);
        }

        let locations: Vec<(String, String)> = self
            .stages
            .iter()
            .map(|s| (s.output().label().to_string(), ctx.location(s.output())))
            .collect();
        ctx.reporter.completed(&locations);

        Ok(PipelineResult { reports })
    }
}
