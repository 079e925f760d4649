//! Engine configuration: defaults, optional JSON file, CLI overrides.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub rpc: RpcConfig,
    pub transfer: TransferConfig,
    pub fs: FsConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// How long an outgoing request waits for its response
    pub request_timeout_ms: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 30_000,
        }
    }
}

impl RpcConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Bytes moved between pause/cancel checkpoints
    pub chunk_size: usize,
    /// EMA weight of the newest speed sample
    pub speed_smoothing: f64,
    /// Start jobs as soon as they are added
    pub auto_start: bool,
    /// Shared bandwidth cap across jobs, 0 = unlimited
    pub max_bytes_per_second: u64,
    /// Compare SHA-256 of both ends after each transfer
    pub verify_checksum: bool,
    /// How often progress is pushed to the UI
    pub progress_interval_ms: u64,
    /// Capacity of the job event channel
    pub event_capacity: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: 256 * 1024,
            speed_smoothing: 0.3,
            auto_start: true,
            max_bytes_per_second: 0,
            verify_checksum: false,
            progress_interval_ms: 500,
            event_capacity: 1024,
        }
    }
}

impl TransferConfig {
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FsConfig {
    pub max_search_results: usize,
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            max_search_results: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Separate Prometheus listener; `/metrics` on the API is always served
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            metrics_addr: None,
        }
    }
}

impl EngineConfig {
    /// Read a JSON config file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let label = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: label.clone(),
            source,
        })?;
        let config: Self =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse { path: label, source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.rpc.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid("rpc.request_timeout_ms must be > 0".into()));
        }
        if self.transfer.chunk_size == 0 {
            return Err(ConfigError::Invalid("transfer.chunk_size must be > 0".into()));
        }
        if !(self.transfer.speed_smoothing > 0.0 && self.transfer.speed_smoothing <= 1.0) {
            return Err(ConfigError::Invalid(
                "transfer.speed_smoothing must be in (0, 1]".into(),
            ));
        }
        if self.transfer.event_capacity == 0 {
            return Err(ConfigError::Invalid("transfer.event_capacity must be > 0".into()));
        }
        if self.fs.max_search_results == 0 {
            return Err(ConfigError::Invalid("fs.max_search_results must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.rpc.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.transfer.chunk_size, 256 * 1024);
        assert!((config.transfer.speed_smoothing - 0.3).abs() < f64::EPSILON);
        assert_eq!(config.server.bind_addr.port(), 3000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("engine.json");
        std::fs::write(
            &path,
            r#"{ "transfer": { "chunkSize": 1 , "auto_start": false }, "rpc": { "request_timeout_ms": 500 } }"#,
        )
        .unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.rpc.request_timeout_ms, 500);
        assert!(!config.transfer.auto_start);
        // Unknown keys are ignored.
        assert_eq!(config.transfer.chunk_size, 256 * 1024);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = EngineConfig::default();
        config.transfer.speed_smoothing = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = EngineConfig::load(Path::new("/definitely/not/here.json"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
