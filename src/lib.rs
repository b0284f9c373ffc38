//! # CacheTable
//!
//! An in-process key-value store with:
//! - One shared concurrent table partitioned into namespaces ("caches")
//! - get/set/delete/take/increment/enumerate operations per namespace
//! - Atomic counters and atomic namespace clears
//! - Snapshot persistence of a namespace or of the whole table
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       CacheStore                            │
//! │          (namespace validation, one op = one primitive)     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │TableManager │          │  Snapshot   │
//!   │ (create 1x) │          │   Codec     │
//!   └──────┬──────┘          └──────┬──────┘
//!          │                        │
//!          ▼                        │
//!   ┌─────────────────────┐         │
//!   │    SharedTable      │◄────────┘
//!   │ (sharded, RwLock)   │
//!   └─────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use cachetable::{CacheStore, Result};
//!
//! fn main() -> Result<()> {
//!     let store = CacheStore::default();
//!
//!     store.set("users", "alice", "admin")?;
//!     assert_eq!(store.get("users", "alice")?, Some("admin".into()));
//!
//!     assert_eq!(store.increment("hits", "/index")?, 1.into());
//!     Ok(())
//! }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod value;
pub mod namespace;
pub mod table;
pub mod manager;
pub mod snapshot;
pub mod command;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{CacheError, Result};
pub use config::{Config, SnapshotSync};
pub use manager::TableManager;
pub use namespace::{IntoNamespace, Namespace};
pub use store::CacheStore;
pub use value::Value;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of CacheTable
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
