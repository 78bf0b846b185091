//! Upload helpers used by the HTTP layer before handing content to the store.

use std::io::ErrorKind;
use std::path::PathBuf;
#[cfg(test)]
use std::path::Path;

use tokio::fs;
use uuid::Uuid;

use crate::storage::MAX_TTL_HOURS;

/// Parse the `expirationHours` form value.
///
/// Missing, empty, non-numeric, non-positive and over-long values fall back
/// to `default`.
pub fn parse_expiration_hours(value: Option<&str>, default: u32) -> u32 {
    value
        .map(str::trim)
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|hours| (1..=i64::from(MAX_TTL_HOURS)).contains(hours))
        .and_then(|hours| u32::try_from(hours).ok())
        .unwrap_or(default)
}

/// Temporary file holding an upload until it is saved into the store.
///
/// The file is removed when this value is dropped, including when the
/// request is aborted halfway through.
#[derive(Debug)]
pub struct StagedUpload {
    path: PathBuf,
}

impl StagedUpload {
    pub async fn create() -> std::io::Result<(Self, fs::File)> {
        let path = std::env::temp_dir().join(format!("filedrop_upload_{}", Uuid::new_v4()));
        let file = fs::File::create(&path).await?;
        Ok((Self { path }, file))
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn open(&self) -> std::io::Result<fs::File> {
        fs::File::open(&self.path).await
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != ErrorKind::NotFound {
                tracing::error!("Failed to remove temp file {:?}: {}", self.path, e);
            }
        }
    }
}
