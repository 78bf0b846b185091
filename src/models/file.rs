use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for one stored upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    /// Random hex identifier, also the blob filename
    pub id: String,
    /// Client supplied filename, stored verbatim
    pub name: String,
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl FileRecord {
    pub fn new(id: String, name: String, size: u64, uploaded_at: DateTime<Utc>, ttl_hours: u32) -> Self {
        Self {
            id,
            name,
            size,
            uploaded_at,
            expires_at: uploaded_at
                .checked_add_signed(Duration::hours(i64::from(ttl_hours)))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// A record is expired once `now` reaches its expiry time
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// File list response
#[derive(Debug, Serialize)]
pub struct FileListResponse {
    pub files: Vec<FileRecord>,
}

/// Static server info echoed to the web UI
#[derive(Debug, Clone, Serialize)]
pub struct InfoResponse {
    pub ip: String,
    pub port: u16,
}
