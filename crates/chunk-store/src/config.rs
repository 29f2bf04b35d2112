//! Configuration for the chunk store.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Hard upper bound on rolling previous-run snapshots.
pub const MAX_PREVIOUS_RUNS: usize = 8;

/// Configuration for the chunk store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Decode buffer budget per update batch, in bytes.
    pub write_buffer_bytes: usize,

    /// Snapshots kept per chunk, including the current run.
    pub max_previous_runs: usize,

    /// Deflate level (0-9).
    pub compression_level: u32,

    /// Open file handles kept in the handle cache.
    pub handle_cache_entries: usize,

    /// Seconds before a cached handle is checked against the filesystem again.
    pub revalidate_after_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            write_buffer_bytes: 8 * 1024 * 1024,
            max_previous_runs: MAX_PREVIOUS_RUNS,
            compression_level: 6,
            handle_cache_entries: 1024,
            revalidate_after_secs: 10,
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("SERIES_WRITE_BUFFER_BYTES") {
            if let Ok(bytes) = val.parse() {
                config.write_buffer_bytes = bytes;
            }
        }

        if let Ok(val) = std::env::var("SERIES_MAX_PREVIOUS_RUNS") {
            if let Ok(runs) = val.parse() {
                config.max_previous_runs = runs;
            }
        }

        if let Ok(val) = std::env::var("SERIES_COMPRESSION_LEVEL") {
            if let Ok(level) = val.parse() {
                config.compression_level = level;
            }
        }

        if let Ok(val) = std::env::var("SERIES_HANDLE_CACHE_ENTRIES") {
            if let Ok(entries) = val.parse() {
                config.handle_cache_entries = entries;
            }
        }

        if let Ok(val) = std::env::var("SERIES_REVALIDATE_SECS") {
            if let Ok(secs) = val.parse() {
                config.revalidate_after_secs = secs;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.write_buffer_bytes == 0 {
            return Err("write_buffer_bytes must be > 0".to_string());
        }

        if self.max_previous_runs == 0 || self.max_previous_runs > MAX_PREVIOUS_RUNS {
            return Err(format!("max_previous_runs must be 1-{MAX_PREVIOUS_RUNS}"));
        }

        if self.compression_level > 9 {
            return Err("compression_level must be 0-9".to_string());
        }

        if self.handle_cache_entries == 0 {
            return Err("handle_cache_entries must be > 0".to_string());
        }

        Ok(())
    }

    pub fn revalidate_after(&self) -> Duration {
        Duration::from_secs(self.revalidate_after_secs)
    }
}
