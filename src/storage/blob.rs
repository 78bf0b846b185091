use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};

/// On-disk blob directory, one file per record named by its id
#[derive(Debug, Clone)]
pub struct BlobDir {
    base_path: PathBuf,
}

impl BlobDir {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.base_path.join(id)
    }

    /// Stream `reader` into a new blob, returning the number of bytes written.
    ///
    /// Leaves cleanup of a partial blob to the caller.
    pub async fn write<R>(&self, id: &str, reader: &mut R) -> std::io::Result<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let full_path = self.path_for(id);
        let mut file = fs::File::create(&full_path).await?;
        let size = tokio::io::copy(reader, &mut file).await?;
        file.flush().await?;
        file.sync_all().await?;

        tracing::debug!("Wrote {} bytes to {:?}", size, full_path);
        Ok(size)
    }

    pub async fn exists(&self, id: &str) -> bool {
        fs::try_exists(self.path_for(id)).await.unwrap_or(false)
    }

    /// Remove a blob, treating an already missing file as success.
    ///
    /// Other failures are logged and swallowed.
    pub async fn remove_best_effort(&self, id: &str) {
        let full_path = self.path_for(id);
        match fs::remove_file(&full_path).await {
            Ok(()) => tracing::debug!("Deleted blob {:?}", full_path),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(blob = ?full_path, error = %e, "Failed to remove blob"),
        }
    }

    /// Synchronous removal for drop guards, where no runtime await is possible
    pub fn remove_blocking(&self, id: &str) {
        let full_path = self.path_for(id);
        if let Err(e) = std::fs::remove_file(&full_path) {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!(blob = ?full_path, error = %e, "Failed to remove partial blob");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_and_remove() {
        let dir = TempDir::new().unwrap();
        let blobs = BlobDir::new(dir.path().to_path_buf());

        let mut data: &[u8] = b"hello";
        let size = blobs.write("abc", &mut data).await.unwrap();
        assert_eq!(size, 5);
        assert!(blobs.exists("abc").await);
        assert_eq!(std::fs::read(blobs.path_for("abc")).unwrap(), b"hello");

        blobs.remove_best_effort("abc").await;
        assert!(!blobs.exists("abc").await);

        // Removing again is not an error
        blobs.remove_best_effort("abc").await;
        blobs.remove_blocking("abc");
    }
}
