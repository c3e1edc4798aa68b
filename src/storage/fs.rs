use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

use super::{content_hash, decode_table, encode_table, SnapshotInfo, SnapshotStore, WriteMode};
use crate::error::{LakehouseError, Result};
use crate::table::Table;

const COMMITS_DIR: &str = "_commits";
const DATA_DIR: &str = "data";

/// Filesystem snapshot store.
///
/// Layout per snapshot name, under `root/<name>`:
/// - `data/<sha256>.ndjson`: content-addressed table data, written once
/// - `_commits/<version>.json`: one commit record per version
///
/// Both files are written to a temp name and renamed into place. The commit
/// rename is the publication point, so readers never follow a partial write.
pub struct FileSnapshotStore {
    root: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn snapshot_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn commit_path(&self, name: &str, version: u64) -> PathBuf {
        self.snapshot_dir(name)
            .join(COMMITS_DIR)
            .join(format!("{:020}.json", version))
    }

    fn data_path(&self, name: &str, hash: &str) -> PathBuf {
        self.snapshot_dir(name)
            .join(DATA_DIR)
            .join(format!("{}.ndjson", hash))
    }

    /// Committed version numbers, ascending. Temp files are ignored.
    async fn versions(&self, name: &str) -> Result<Vec<u64>> {
        let dir = self.snapshot_dir(name).join(COMMITS_DIR);
        if !fs::try_exists(&dir).await? {
            return Ok(Vec::new());
        }
        let mut versions = Vec::new();
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            if let Some(stem) = file_name.strip_suffix(".json") {
                if let Ok(version) = stem.parse::<u64>() {
                    versions.push(version);
                }
            }
        }
        versions.sort_unstable();
        Ok(versions)
    }

    async fn load_commit(&self, name: &str, version: u64) -> Result<SnapshotInfo> {
        let path = self.commit_path(name, version);
        let bytes = fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => LakehouseError::SnapshotVersionNotFound {
                name: name.to_string(),
                version,
            },
            _ => LakehouseError::Io(e),
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn load_data(&self, info: &SnapshotInfo) -> Result<Table> {
        let path = self.data_path(&info.name, &info.content_hash);
        let bytes = fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => LakehouseError::CorruptSnapshot {
                name: info.name.clone(),
                reason: format!("data file missing for version {}", info.version),
            },
            _ => LakehouseError::Io(e),
        })?;
        let actual = content_hash(&bytes);
        if actual != info.content_hash {
            return Err(LakehouseError::CorruptSnapshot {
                name: info.name.clone(),
                reason: format!(
                    "data file hash {} does not match commit {}",
                    actual, info.content_hash
                ),
            });
        }
        decode_table(&info.name, &bytes)
    }
}

/// Write `bytes` next to `target` under a unique temp name, then rename over it.
async fn write_atomic(target: &Path, bytes: &[u8]) -> Result<()> {
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).await?;
    let tmp = parent.join(format!(".tmp-{}", Uuid::new_v4()));
    fs::write(&tmp, bytes).await?;
    if let Err(e) = fs::rename(&tmp, target).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn write(&self, name: &str, table: &Table, mode: WriteMode) -> Result<SnapshotInfo> {
        let versions = self.versions(name).await?;
        if mode == WriteMode::ErrorIfExists && !versions.is_empty() {
            return Err(LakehouseError::SnapshotExists {
                name: name.to_string(),
            });
        }

        let bytes = encode_table(table)?;
        let hash = content_hash(&bytes);
        let data_path = self.data_path(name, &hash);
        if !fs::try_exists(&data_path).await? {
            write_atomic(&data_path, &bytes).await?;
            debug!("Wrote data file {}", data_path.display());
        }

        let version = versions.last().map(|v| v + 1).unwrap_or(0);
        let info = SnapshotInfo {
            name: name.to_string(),
            version,
            row_count: table.len(),
            schema: table.schema.clone(),
            content_hash: hash,
            committed_at: Utc::now(),
        };
        let record = serde_json::to_vec_pretty(&info)?;
        write_atomic(&self.commit_path(name, version), &record).await?;

        info!(
            "Committed snapshot {} version {} ({} rows)",
            self.location(name),
            version,
            info.row_count
        );
        Ok(info)
    }

    async fn read(&self, name: &str) -> Result<Table> {
        let version = *self
            .versions(name)
            .await?
            .last()
            .ok_or_else(|| LakehouseError::SnapshotNotFound {
                name: name.to_string(),
            })?;
        self.read_version(name, version).await
    }

    async fn read_version(&self, name: &str, version: u64) -> Result<Table> {
        let info = self.load_commit(name, version).await?;
        debug!("Reading snapshot {} version {}", name, version);
        self.load_data(&info).await
    }

    async fn history(&self, name: &str) -> Result<Vec<SnapshotInfo>> {
        let mut out = Vec::new();
        for version in self.versions(name).await? {
            out.push(self.load_commit(name, version).await?);
        }
        Ok(out)
    }

    fn location(&self, name: &str) -> String {
        self.snapshot_dir(name).display().to_string()
    }
}
