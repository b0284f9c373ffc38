//! Configuration for CacheTable
//!
//! Centralized configuration with sensible defaults.

use crate::error::{CacheError, Result};

/// Main configuration for a CacheTable instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Table Configuration
    // -------------------------------------------------------------------------
    /// Number of independently locked shards in the shared table
    pub shard_count: usize,

    /// Capacity reserved up front in each shard
    pub initial_capacity: usize,

    // -------------------------------------------------------------------------
    // Namespace Configuration
    // -------------------------------------------------------------------------
    /// Longest accepted namespace identifier (in bytes)
    pub max_namespace_len: usize,

    // -------------------------------------------------------------------------
    // Snapshot Configuration
    // -------------------------------------------------------------------------
    /// Whether snapshot files are fsynced before being renamed into place
    pub snapshot_sync: SnapshotSync,
}

/// Snapshot sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSync {
    /// fsync the snapshot before the rename (safest)
    Always,

    /// Leave flushing to the OS (faster, a crash may lose the latest snapshot)
    Never,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            shard_count: 16,
            initial_capacity: 0,
            max_namespace_len: 255,
            snapshot_sync: SnapshotSync::Always,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the table cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.shard_count == 0 {
            return Err(CacheError::Config(
                "shard_count must be at least 1".to_string(),
            ));
        }
        if self.max_namespace_len == 0 {
            return Err(CacheError::Config(
                "max_namespace_len must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the number of table shards
    pub fn shard_count(mut self, count: usize) -> Self {
        self.config.shard_count = count;
        self
    }

    /// Set the per-shard initial capacity
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.config.initial_capacity = capacity;
        self
    }

    /// Set the maximum namespace identifier length
    pub fn max_namespace_len(mut self, len: usize) -> Self {
        self.config.max_namespace_len = len;
        self
    }

    /// Set the snapshot sync strategy
    pub fn snapshot_sync(mut self, sync: SnapshotSync) -> Self {
        self.config.snapshot_sync = sync;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
