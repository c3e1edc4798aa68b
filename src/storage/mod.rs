//! Snapshot storage contract between stages.
//!
//! Every stage hands its output to the next one only through a
//! [`SnapshotStore`]. Writes are atomic and versioned: a reader sees either the
//! previous committed version or the new one, never a partial write.

pub mod fs;
pub mod in_memory;

pub use fs::FileSnapshotStore;
pub use in_memory::InMemorySnapshotStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{LakehouseError, Result};
use crate::table::{Row, Schema, Table, Value};

/// Policy applied when a snapshot name already has committed versions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Commit a new version that replaces the visible content
    Overwrite,
    /// Refuse to write if any version exists
    ErrorIfExists,
}

/// Metadata recorded for every committed snapshot version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotInfo {
    pub name: String,
    pub version: u64,
    pub row_count: usize,
    pub schema: Schema,
    /// sha256 of the encoded data file
    pub content_hash: String,
    pub committed_at: DateTime<Utc>,
}

/// Storage trait for persisting stage snapshots
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Atomically commit `table` as the newest version of `name`.
    async fn write(&self, name: &str, table: &Table, mode: WriteMode) -> Result<SnapshotInfo>;

    /// Content of the most recently committed version.
    async fn read(&self, name: &str) -> Result<Table>;

    /// Content of a specific committed version.
    async fn read_version(&self, name: &str, version: u64) -> Result<Table>;

    /// All committed versions, oldest first.
    async fn history(&self, name: &str) -> Result<Vec<SnapshotInfo>>;

    async fn latest(&self, name: &str) -> Result<Option<SnapshotInfo>> {
        Ok(self.history(name).await?.pop())
    }

    /// Human-readable location of a snapshot, for reporting.
    fn location(&self, name: &str) -> String;
}

pub(crate) fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Encode a table as NDJSON: the schema on the first line, then one JSON array per row.
pub(crate) fn encode_table(table: &Table) -> Result<Vec<u8>> {
    let mut out = serde_json::to_vec(&table.schema)?;
    out.push(b'\n');
    for row in &table.rows {
        serde_json::to_writer(&mut out, row)?;
        out.push(b'\n');
    }
    Ok(out)
}

pub(crate) fn decode_table(name: &str, bytes: &[u8]) -> Result<Table> {
    let corrupt = |reason: String| LakehouseError::CorruptSnapshot {
        name: name.to_string(),
        reason,
    };

    let text = std::str::from_utf8(bytes).map_err(|e| corrupt(e.to_string()))?;
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let header = lines
        .next()
        .ok_or_else(|| corrupt("missing schema line".to_string()))?;
    let schema: Schema = serde_json::from_str(header)?;

    let mut rows = Vec::new();
    for (idx, line) in lines.enumerate() {
        let raw: Vec<Value> = serde_json::from_str(line)?;
        if raw.len() != schema.len() {
            return Err(corrupt(format!(
                "row {} has {} values, schema has {}",
                idx,
                raw.len(),
                schema.len()
            )));
        }
        let row: Option<Row> = raw
            .into_iter()
            .zip(schema.columns.iter())
            .map(|(value, column)| value.coerce(column.data_type))
            .collect();
        rows.push(row.ok_or_else(|| corrupt(format!("row {} does not match schema", idx)))?);
    }

    Ok(Table::new(schema, rows))
}
