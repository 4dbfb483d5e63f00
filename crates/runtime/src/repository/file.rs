//! File-based RecordStore implementation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rules_core::{ActorId, ActorRecord, ActorUpdate, ItemUpdate, OwnedItem};
use tokio::fs;

use super::error::{Result, StoreError};
use super::traits::{RecordStore, apply_item_batch};

/// File-based implementation of [`RecordStore`].
///
/// Records are stored as `{id}.json`, pretty-printed. Every write goes to a
/// temp file first and is renamed over the record, so readers never observe a
/// half-written file.
pub struct FileRecordStore {
    base_dir: PathBuf,
}

impl FileRecordStore {
    /// Create a store rooted at `base_dir`, creating the directory if needed.
    pub async fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir).await?;
        Ok(Self { base_dir })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn record_path(&self, id: &ActorId) -> Result<PathBuf> {
        let valid = !id.is_empty()
            && id
                .as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(StoreError::InvalidId(id.clone()));
        }
        Ok(self.base_dir.join(format!("{}.json", id)))
    }

    /// Write a record, replacing any existing file.
    pub async fn save(&self, record: &ActorRecord) -> Result<()> {
        let path = self.record_path(&record.id)?;
        let temp_path = path.with_extension("json.tmp");

        let bytes =
            serde_json::to_vec_pretty(record).map_err(|e| StoreError::Json(e.to_string()))?;
        fs::write(&temp_path, bytes).await?;
        fs::rename(&temp_path, &path).await?;

        tracing::debug!("Saved record[{}] to {}", record.id, path.display());
        Ok(())
    }

    async fn read(&self, id: &ActorId) -> Result<ActorRecord> {
        let path = self.record_path(id)?;
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        let record: ActorRecord =
            serde_json::from_slice(&bytes).map_err(|e| StoreError::Json(e.to_string()))?;

        tracing::debug!("Loaded record[{}] from {}", id, path.display());
        Ok(record)
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn load(&self, id: &ActorId) -> Result<ActorRecord> {
        self.read(id).await
    }

    async fn update_record(&self, id: &ActorId, update: &ActorUpdate) -> Result<ActorRecord> {
        let mut record = self.read(id).await?;
        record.apply_update(update);
        self.save(&record).await?;
        Ok(record)
    }

    async fn update_items(&self, id: &ActorId, updates: &[ItemUpdate]) -> Result<Vec<OwnedItem>> {
        let mut record = self.read(id).await?;
        let items = apply_item_batch(&mut record, updates)?;
        self.save(&record).await?;
        Ok(items)
    }
}
