use thiserror::Error;

#[derive(Error, Debug)]
pub enum LakehouseError {
    #[error("Source not found: {path}")]
    SourceNotFound { path: String },

    #[error("Schema inference failed for '{path}': {reason}")]
    SchemaInference { path: String, reason: String },

    #[error("Percentile input for column '{column}' is empty")]
    EmptyPercentileInput { column: String },

    #[error("Missing column '{column}' (available: {available})")]
    MissingColumn { column: String, available: String },

    #[error("Column '{column}' has type {found}, expected {expected}")]
    ColumnType {
        column: String,
        expected: String,
        found: String,
    },

    #[error("Snapshot not found: {name}")]
    SnapshotNotFound { name: String },

    #[error("Snapshot '{name}' has no version {version}")]
    SnapshotVersionNotFound { name: String, version: u64 },

    #[error("Snapshot already exists: {name}")]
    SnapshotExists { name: String },

    #[error("Snapshot '{name}' is corrupt: {reason}")]
    CorruptSnapshot { name: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{stage} stage failed on snapshot '{snapshot}': {source}")]
    Stage {
        stage: String,
        snapshot: String,
        #[source]
        source: Box<LakehouseError>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV read failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),
}

impl LakehouseError {
    /// Wrap an error raised inside a stage with the stage and snapshot it was working on.
    pub fn in_stage(self, stage: impl Into<String>, snapshot: impl Into<String>) -> Self {
        LakehouseError::Stage {
            stage: stage.into(),
            snapshot: snapshot.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through stage wrappers.
    pub fn root(&self) -> &LakehouseError {
        match self {
            LakehouseError::Stage { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, LakehouseError>;
