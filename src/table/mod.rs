//! Table Module
//!
//! The single shared table holding entries for every namespace.
//!
//! ## Responsibilities
//! - One flat collection of entries keyed by `(namespace, key)`
//! - Concurrent readers never block each other
//! - Writers to different shards never contend
//! - Atomic read-modify-write for counters
//! - Atomic bulk delete/insert across the whole table
//!
//! ## Data Structure Choice
//! A fixed array of `HashMap` shards, each behind its own `RwLock`:
//! - Point operations lock exactly one shard
//! - Bulk operations lock every shard in index order
//! - Namespace scans walk all shards (cost follows total table size)

mod shared;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::namespace::Namespace;
use crate::value::Value;

pub use shared::SharedTable;

/// Identity of a stored entry: the namespace tag plus the user key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryKey {
    pub namespace: Namespace,
    pub key: Value,
}

impl EntryKey {
    pub fn new(namespace: Namespace, key: Value) -> Self {
        Self { namespace, key }
    }
}

impl fmt::Display for EntryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.key)
    }
}

/// Uniqueness mode of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TableKind {
    /// At most one entry per identity, no ordering
    Set = 0x00,

    /// At most one entry per identity, iterated in key order
    OrderedSet = 0x01,
}

impl TableKind {
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(TableKind::Set),
            0x01 => Some(TableKind::OrderedSet),
            _ => None,
        }
    }
}

/// Structural metadata recorded in snapshot files
///
/// A snapshot can only be reopened with the same metadata it was written
/// with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableMeta {
    pub kind: TableKind,

    /// 1-based position of the identity field in a stored record
    pub key_position: u8,
}

impl TableMeta {
    /// Metadata of the shared table: set semantics, identity first
    pub const SHARED: TableMeta = TableMeta {
        kind: TableKind::Set,
        key_position: 1,
    };
}

impl Default for TableMeta {
    fn default() -> Self {
        Self::SHARED
    }
}
