use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use rand::rngs::OsRng;
use rand::RngCore;
use tokio::fs;

use crate::models::FileRecord;
use crate::storage::IndexReadError;

pub const METADATA_FILE: &str = "metadata.json";

/// Persisted metadata index file
#[derive(Debug, Clone)]
pub struct IndexFile {
    path: PathBuf,
}

impl IndexFile {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(METADATA_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all records. A missing file is an empty index.
    pub async fn load(&self) -> Result<Vec<FileRecord>, IndexReadError> {
        let data = match fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&data)?)
    }

    /// Replace the index file with `records`.
    ///
    /// Written to a sibling temp file first and renamed into place.
    pub async fn persist(&self, records: &[FileRecord]) -> std::io::Result<()> {
        let data = serde_json::to_vec_pretty(records)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, &data).await?;
        if let Err(e) = fs::rename(&tmp_path, &self.path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e);
        }
        Ok(())
    }
}

/// 16 bytes from the OS RNG, lowercase hex encoded
pub fn generate_id() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
