use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use scopeguard::ScopeGuard;
use tokio::io::AsyncRead;
use tokio::sync::RwLock;

use crate::models::FileRecord;
use crate::storage::{generate_id, BlobDir, IndexFile, IndexReadError, StoreError, StoreResult};

/// Default lifetime of an upload in hours
pub const DEFAULT_TTL_HOURS: u32 = 24;

/// Longest accepted lifetime, one year
pub const MAX_TTL_HOURS: u32 = 24 * 366;

/// Lifetimes outside `1..=MAX_TTL_HOURS` fall back to the default
pub fn normalize_ttl_hours(ttl_hours: u32) -> u32 {
    if ttl_hours == 0 || ttl_hours > MAX_TTL_HOURS {
        DEFAULT_TTL_HOURS
    } else {
        ttl_hours
    }
}

/// Owns the blob directory and the metadata index.
///
/// Mutations (save, delete, clear, sweep) hold the write lock for their whole
/// duration, blob I/O and index persist included. Reads share the lock.
/// The in-memory index is the only source of truth for list and lookup.
pub struct FileStore {
    blobs: BlobDir,
    index_file: IndexFile,
    records: RwLock<Vec<FileRecord>>,
}

impl FileStore {
    /// Open a store rooted at `dir`, creating the directory if needed and
    /// loading any existing metadata index.
    pub async fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| StoreError::DirectoryInit {
                path: dir.clone(),
                source,
            })?;

        let index_file = IndexFile::new(&dir);
        let records = index_file.load().await.map_err(|e| {
            let path = index_file.path().to_path_buf();
            match e {
                IndexReadError::Io(source) => StoreError::DirectoryInit { path, source },
                IndexReadError::Parse(source) => StoreError::IndexCorrupt { path, source },
            }
        })?;

        tracing::info!(dir = ?dir, records = records.len(), "File store opened");

        Ok(Self {
            blobs: BlobDir::new(dir),
            index_file,
            records: RwLock::new(records),
        })
    }

    pub fn dir(&self) -> &Path {
        self.blobs.base_path()
    }

    /// Stream `reader` into a new blob and record it with the given lifetime.
    ///
    /// Nothing is left behind on failure: a partial blob is removed if the
    /// write fails or this future is dropped, and the blob is removed again if
    /// the index cannot be persisted.
    pub async fn save<R>(&self, name: &str, reader: &mut R, ttl_hours: u32) -> StoreResult<FileRecord>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let ttl_hours = normalize_ttl_hours(ttl_hours);

        let mut records = self.records.write().await;

        let id = generate_id();
        let blob_guard = scopeguard::guard(id.clone(), |id| self.blobs.remove_blocking(&id));

        let size = self
            .blobs
            .write(&id, reader)
            .await
            .map_err(|source| StoreError::BlobWrite {
                id: id.clone(),
                source,
            })?;

        let record = FileRecord::new(id, name.to_string(), size, Utc::now(), ttl_hours);

        // Persist before committing so a failed write leaves memory untouched
        let mut updated = records.clone();
        updated.push(record.clone());
        if let Err(e) = self.index_file.persist(&updated).await {
            tracing::error!(id = %record.id, error = %e, "Failed to persist index, rolling back upload");
            return Err(StoreError::IndexPersist(e));
        }
        *records = updated;
        ScopeGuard::into_inner(blob_guard);

        tracing::info!(id = %record.id, name = %record.name, size = record.size, "File saved");
        Ok(record)
    }

    /// Snapshot of all records, most recent upload first
    pub async fn list(&self) -> Vec<FileRecord> {
        let records = self.records.read().await;
        // Reversed so equal timestamps still list the later insert first
        let mut result: Vec<FileRecord> = records.iter().rev().cloned().collect();
        result.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        result
    }

    /// Look up a record and the path of its blob.
    ///
    /// A record whose blob is missing from disk is reported as not found.
    pub async fn get(&self, id: &str) -> StoreResult<(FileRecord, PathBuf)> {
        let records = self.records.read().await;

        let record = records
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if !self.blobs.exists(id).await {
            tracing::warn!(id = %id, "Indexed file is missing its blob");
            return Err(StoreError::NotFound(id.to_string()));
        }

        Ok((record, self.blobs.path_for(id)))
    }

    /// Remove a record and its blob.
    ///
    /// If the index cannot be persisted the record stays removed in memory
    /// and the error is returned.
    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        let mut records = self.records.write().await;

        let idx = records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        self.blobs.remove_best_effort(id).await;
        records.remove(idx);

        self.persist(&records).await?;

        tracing::info!(id = %id, "File deleted");
        Ok(())
    }

    /// Remove every record and blob, returning how many records were dropped
    pub async fn clear_all(&self) -> StoreResult<usize> {
        let mut records = self.records.write().await;

        for record in records.iter() {
            self.blobs.remove_best_effort(&record.id).await;
        }
        let count = records.len();
        records.clear();

        self.persist(&records).await?;

        tracing::info!(count, "Cleared all files");
        Ok(count)
    }

    /// Remove every record whose expiry time has passed
    pub async fn delete_expired(&self) -> StoreResult<usize> {
        self.delete_expired_at(Utc::now()).await
    }

    pub(crate) async fn delete_expired_at(&self, now: DateTime<Utc>) -> StoreResult<usize> {
        let mut records = self.records.write().await;

        let (expired, active): (Vec<FileRecord>, Vec<FileRecord>) =
            records.drain(..).partition(|r| r.is_expired_at(now));
        *records = active;

        for record in &expired {
            self.blobs.remove_best_effort(&record.id).await;
        }

        self.persist(&records).await?;

        if expired.is_empty() {
            tracing::debug!("Expiry sweep found nothing to remove");
        } else {
            tracing::info!(count = expired.len(), "Removed expired files");
        }
        Ok(expired.len())
    }

    async fn persist(&self, records: &[FileRecord]) -> StoreResult<()> {
        self.index_file.persist(records).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to persist index, metadata file is stale");
            StoreError::IndexPersist(e)
        })
    }
}
