//! Configuration for the chaincode

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Chaincode configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// RocksDB configuration
    pub rocksdb: RocksDbConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/chaincode"),
            service_name: "chaincode-core".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            rocksdb: RocksDbConfig::default(),
        }
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocksDbConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

    /// Target file size (MB)
    pub target_file_size_mb: u64,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,

    /// Enable statistics
    pub enable_statistics: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 64,
            max_write_buffer_number: 4,
            target_file_size_mb: 64,
            max_background_jobs: 2,
            enable_statistics: false,
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("CHAINCODE_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(name) = std::env::var("CHAINCODE_SERVICE_NAME") {
            config.service_name = name;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service_name, "chaincode-core");
        assert_eq!(config.rocksdb.max_write_buffer_number, 4);
    }

    #[test]
    fn test_from_toml() {
        let toml_src = r#"
            data_dir = "/tmp/cc"
            service_name = "cc-test"
            service_version = "0.0.0"

            [rocksdb]
            write_buffer_size_mb = 8
            max_write_buffer_number = 2
            target_file_size_mb = 8
            max_background_jobs = 1
            enable_statistics = false
        "#;
        let config: Config = toml::from_str(toml_src).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/cc"));
        assert_eq!(config.rocksdb.write_buffer_size_mb, 8);
    }
}
