//! Runtime configuration for the ledger

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Actor mailbox capacity (bounded channel, backpressure beyond this)
    pub mailbox_capacity: usize,

    /// RocksDB configuration
    pub rocksdb: RocksDbConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/pawn-ledger"),
            service_name: "pawn-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            mailbox_capacity: 1000,
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
            max_background_jobs: 4,
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

        if let Ok(data_dir) = std::env::var("PAWN_LEDGER_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(capacity) = std::env::var("PAWN_LEDGER_MAILBOX_CAPACITY") {
            config.mailbox_capacity = capacity
                .parse()
                .map_err(|e| crate::Error::Config(format!("Invalid mailbox capacity: {}", e)))?;
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
        assert_eq!(config.service_name, "pawn-ledger");
        assert_eq!(config.mailbox_capacity, 1000);
        assert!(!config.rocksdb.enable_statistics);
    }

    #[test]
    fn test_from_env_overrides() {
        // One test owns both variables so parallel tests cannot interleave.
        std::env::set_var("PAWN_LEDGER_DATA_DIR", "/tmp/pawn-env");
        std::env::set_var("PAWN_LEDGER_MAILBOX_CAPACITY", "32");

        let config = Config::from_env().unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/pawn-env"));
        assert_eq!(config.mailbox_capacity, 32);

        std::env::set_var("PAWN_LEDGER_MAILBOX_CAPACITY", "not-a-number");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, crate::Error::Config(_)));

        std::env::remove_var("PAWN_LEDGER_DATA_DIR");
        std::env::remove_var("PAWN_LEDGER_MAILBOX_CAPACITY");
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
            data_dir = "/tmp/pawn"
            service_name = "pawn-ledger"
            service_version = "0.1.0"
            mailbox_capacity = 16

            [rocksdb]
            write_buffer_size_mb = 8
            max_write_buffer_number = 2
            max_background_jobs = 1
            enable_statistics = true
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/pawn"));
        assert_eq!(config.mailbox_capacity, 16);
        assert_eq!(config.rocksdb.write_buffer_size_mb, 8);
        assert!(config.rocksdb.enable_statistics);
    }
}
