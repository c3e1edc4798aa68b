use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use super::{content_hash, encode_table, SnapshotInfo, SnapshotStore, WriteMode};
use crate::error::{LakehouseError, Result};
use crate::table::Table;

type Versions = HashMap<String, Vec<(SnapshotInfo, Table)>>;

/// In-memory snapshot store for development/testing
#[derive(Default, Clone)]
pub struct InMemorySnapshotStore {
    snapshots: Arc<Mutex<Versions>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, Versions> {
        // A panicked writer never leaves a half-pushed version behind
        self.snapshots.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn write(&self, name: &str, table: &Table, mode: WriteMode) -> Result<SnapshotInfo> {
        let hash = content_hash(&encode_table(table)?);
        let mut snapshots = self.guard();
        let versions = snapshots.entry(name.to_string()).or_default();
        if mode == WriteMode::ErrorIfExists && !versions.is_empty() {
            return Err(LakehouseError::SnapshotExists {
                name: name.to_string(),
            });
        }

        let info = SnapshotInfo {
            name: name.to_string(),
            version: versions.len() as u64,
            row_count: table.len(),
            schema: table.schema.clone(),
            content_hash: hash,
            committed_at: Utc::now(),
        };
        versions.push((info.clone(), table.clone()));

        debug!("Stored snapshot {} version {}", name, info.version);
        Ok(info)
    }

    async fn read(&self, name: &str) -> Result<Table> {
        self.guard()
            .get(name)
            .and_then(|versions| versions.last())
            .map(|(_, table)| table.clone())
            .ok_or_else(|| LakehouseError::SnapshotNotFound {
                name: name.to_string(),
            })
    }

    async fn read_version(&self, name: &str, version: u64) -> Result<Table> {
        self.guard()
            .get(name)
            .and_then(|versions| versions.get(version as usize))
            .map(|(_, table)| table.clone())
            .ok_or_else(|| LakehouseError::SnapshotVersionNotFound {
                name: name.to_string(),
                version,
            })
    }

    async fn history(&self, name: &str) -> Result<Vec<SnapshotInfo>> {
        Ok(self
            .guard()
            .get(name)
            .map(|versions| versions.iter().map(|(info, _)| info.clone()).collect())
            .unwrap_or_default())
    }

    fn location(&self, name: &str) -> String {
        format!("memory://{}", name)
    }
}
