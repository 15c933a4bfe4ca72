// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Archive Store Implementations
//!
//! - **InMemoryArchiveStore** - HashMap-backed storage for development and tests
//! - **FileArchiveStore** - one pretty-printed JSON document per battle
//!
//! Both refuse to overwrite an existing record: an archive entry is created
//! exactly once and is immutable afterwards.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::io::Write;
use tracing::{debug, warn};

use crate::domain::archive::{ArchiveError, ArchiveRecord, ArchiveStore};
use crate::domain::battle::BattleId;

#[derive(Clone, Default)]
pub struct InMemoryArchiveStore {
    records: Arc<RwLock<HashMap<BattleId, ArchiveRecord>>>,
}

impl InMemoryArchiveStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl ArchiveStore for InMemoryArchiveStore {
    async fn save(&self, record: ArchiveRecord) -> Result<(), ArchiveError> {
        let mut records = self.records.write();
        if records.contains_key(&record.id) {
            return Err(ArchiveError::AlreadyArchived(record.id));
        }
        records.insert(record.id, record);
        Ok(())
    }

    async fn find_by_id(&self, id: BattleId) -> Result<Option<ArchiveRecord>, ArchiveError> {
        Ok(self.records.read().get(&id).cloned())
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<ArchiveRecord>, ArchiveError> {
        let mut records: Vec<ArchiveRecord> = self.records.read().values().cloned().collect();
        records.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        records.truncate(limit);
        Ok(records)
    }
}

/// Directory-backed archive: `<root>/<battle-id>.json`.
pub struct FileArchiveStore {
    root: PathBuf,
}

impl FileArchiveStore {
    /// Open (and create if needed) the archive directory.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn record_path(&self, id: BattleId) -> PathBuf {
        self.root.join(format!("{}.json", id))
    }
}

#[async_trait]
impl ArchiveStore for FileArchiveStore {
    async fn save(&self, record: ArchiveRecord) -> Result<(), ArchiveError> {
        let id = record.id;
        let root = self.root.clone();
        let path = self.record_path(id);
        let json = serde_json::to_vec_pretty(&record)?;

        tokio::task::spawn_blocking(move || write_record(&root, &path, &json))
            .await
            .map_err(|e| ArchiveError::Storage(format!("archive writer panicked: {}", e)))?
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => ArchiveError::AlreadyArchived(id),
                _ => e.into(),
            })?;

        debug!(battle_id = %id, path = %self.record_path(id).display(), "Archived battle");
        Ok(())
    }

    async fn find_by_id(&self, id: BattleId) -> Result<Option<ArchiveRecord>, ArchiveError> {
        match tokio::fs::read(self.record_path(id)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<ArchiveRecord>, ArchiveError> {
        let mut records = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let bytes = tokio::fs::read(&path).await?;
            match serde_json::from_slice::<ArchiveRecord>(&bytes) {
                Ok(record) => records.push(record),
                Err(e) => warn!(path = %path.display(), "Skipping unreadable archive record: {}", e),
            }
        }
        records.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        records.truncate(limit);
        Ok(records)
    }
}

/// Write into a temp file beside the record, then move it into place without
/// clobbering. Readers see either no record or the complete one, and a failed
/// write leaves nothing behind under the record name.
fn write_record(root: &Path, path: &Path, json: &[u8]) -> std::io::Result<()> {
    let mut staged = tempfile::Builder::new()
        .prefix(".staging-")
        .suffix(".tmp")
        .tempfile_in(root)?;
    staged.write_all(json)?;
    staged.as_file().sync_all()?;
    staged.persist_noclobber(path).map_err(|e| e.error)?;
    Ok(())
}
