use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub upload: UploadConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_dir")]
    pub dir: String,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    #[serde(default = "default_true")]
    pub clear_on_startup: bool,
    #[serde(default = "default_true")]
    pub clear_on_shutdown: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_expiration_hours")]
    pub default_expiration_hours: u32,
    #[serde(default = "default_max_size_mb")]
    pub max_size_mb: u64,
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    80
}

fn default_static_dir() -> String {
    "./static".to_string()
}

fn default_storage_dir() -> String {
    "./uploads".to_string()
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

fn default_expiration_hours() -> u32 {
    crate::storage::DEFAULT_TTL_HOURS
}

fn default_max_size_mb() -> u64 {
    1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
            sweep_interval_secs: default_sweep_interval(),
            clear_on_startup: true,
            clear_on_shutdown: true,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            default_expiration_hours: default_expiration_hours(),
            max_size_mb: default_max_size_mb(),
        }
    }
}

impl StorageConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl UploadConfig {
    pub fn max_size_bytes(&self) -> usize {
        usize::try_from(self.max_size_mb.saturating_mul(1024 * 1024)).unwrap_or(usize::MAX)
    }
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from_file()?;
        config.apply_env_overrides(|key| env::var(key).ok());
        config.ensure_sane_values();
        Ok(config)
    }

    /// Load configuration from the first TOML file found
    fn load_from_file() -> anyhow::Result<Self> {
        let config_paths = ["filedrop.toml", "config.toml", "data/filedrop.toml"];

        for path in config_paths {
            if Path::new(path).exists() {
                let content = fs::read_to_string(path)?;
                let config: Config = toml::from_str(&content)?;
                tracing::info!("Loaded configuration from {}", path);
                return Ok(config);
            }
        }

        tracing::info!("No configuration file found, using defaults");
        Ok(Config::default())
    }

    /// Apply environment variable overrides
    /// Format: FD_CONF_<SECTION>_<KEY>
    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // Server overrides
        if let Some(val) = var("FD_CONF_SERVER_HOST") {
            self.server.host = val;
        }
        if let Some(port) = var("FD_CONF_SERVER_PORT").and_then(|v| v.parse().ok()) {
            self.server.port = port;
        }
        if let Some(val) = var("FD_CONF_SERVER_STATIC_DIR") {
            self.server.static_dir = val;
        }

        // Storage overrides
        if let Some(val) = var("FD_CONF_STORAGE_DIR") {
            self.storage.dir = val;
        }
        if let Some(secs) = var("FD_CONF_STORAGE_SWEEP_INTERVAL_SECS").and_then(|v| v.parse().ok()) {
            self.storage.sweep_interval_secs = secs;
        }
        if let Some(v) = var("FD_CONF_STORAGE_CLEAR_ON_STARTUP").and_then(|v| v.parse().ok()) {
            self.storage.clear_on_startup = v;
        }
        if let Some(v) = var("FD_CONF_STORAGE_CLEAR_ON_SHUTDOWN").and_then(|v| v.parse().ok()) {
            self.storage.clear_on_shutdown = v;
        }

        // Upload overrides
        if let Some(hours) = var("FD_CONF_UPLOAD_DEFAULT_EXPIRATION_HOURS").and_then(|v| v.parse().ok()) {
            self.upload.default_expiration_hours = hours;
        }
        if let Some(mb) = var("FD_CONF_UPLOAD_MAX_SIZE_MB").and_then(|v| v.parse().ok()) {
            self.upload.max_size_mb = mb;
        }
    }

    fn ensure_sane_values(&mut self) {
        if self.storage.sweep_interval_secs == 0 {
            self.storage.sweep_interval_secs = default_sweep_interval();
        }
        self.upload.default_expiration_hours =
            crate::storage::normalize_ttl_hours(self.upload.default_expiration_hours);
    }
}
