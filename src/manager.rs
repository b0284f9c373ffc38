//! Table Manager
//!
//! Owns the lifecycle of the shared table.
//!
//! ## Responsibilities
//! - Validate configuration up front
//! - Create the table exactly once, on first use
//! - Hand the same table to every store built from this manager
//!
//! The manager is an explicit object rather than a global: construct it
//! once at startup and share it (`Arc<TableManager>`) with each
//! [`CacheStore`](crate::store::CacheStore). Stores can be dropped and
//! rebuilt without losing the table.

use std::sync::OnceLock;

use tracing::debug;

use crate::config::Config;
use crate::error::Result;
use crate::table::SharedTable;

/// Lazily creates and owns the shared table
pub struct TableManager {
    config: Config,

    /// Set exactly once; concurrent first callers block until it is ready
    table: OnceLock<SharedTable>,
}

impl TableManager {
    /// Create a manager; the table itself is not built until first use
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            table: OnceLock::new(),
        })
    }

    /// Get the shared table, creating it if this is the first call
    pub fn table(&self) -> &SharedTable {
        self.table.get_or_init(|| {
            debug!(
                shards = self.config.shard_count,
                capacity = self.config.initial_capacity,
                "creating shared table"
            );
            SharedTable::new(self.config.shard_count, self.config.initial_capacity)
        })
    }

    /// Whether the table has been created yet
    pub fn is_initialized(&self) -> bool {
        self.table.get().is_some()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Default for TableManager {
    fn default() -> Self {
        Self {
            config: Config::default(),
            table: OnceLock::new(),
        }
    }
}
