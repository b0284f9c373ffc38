//! Snapshot Module
//!
//! Durable copies of table contents on disk.
//!
//! ## File Format
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │ Header (17 bytes)                                             │
//! │   Magic: "CTAB" (4) | Version: u16 (2) | Kind: u8 (1)         │
//! │   KeyPos: u8 (1) | Scope: u8 (1) | Count: u64 (8)             │
//! ├───────────────────────────────────────────────────────────────┤
//! │ Data Block (variable)                                         │
//! │   [RecordLen: u32][bincode record]                            │
//! │   ... repeated for each entry ...                             │
//! ├───────────────────────────────────────────────────────────────┤
//! │ Footer (8 bytes)                                              │
//! │   DataCRC: u32 (4) | Padding (4)                              │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Records are `(key, value)` for namespace snapshots and
//! `(EntryKey, value)` for raw whole-table snapshots. All integers are
//! little-endian.
//!
//! ## Consistency
//! Writers stream into a uniquely named temporary file beside `path` and
//! rename it over `path` only after the file is complete, so a crash never
//! leaves a half-written snapshot behind. Concurrent writers to the same
//! path each finish independently; the last rename wins.
//! A snapshot is not a transactional checkpoint: entries are copied while
//! other callers may keep mutating the table.

mod reader;
mod writer;

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::SnapshotSync;
use crate::error::Result;
use crate::table::TableMeta;

pub use reader::SnapshotReader;
pub use writer::{SnapshotInfo, SnapshotWriter};

// =============================================================================
// Shared Constants (used by writer and reader)
// =============================================================================

/// Magic bytes identifying a CacheTable snapshot file
pub(crate) const MAGIC: &[u8; 4] = b"CTAB";

/// Current snapshot format version
pub(crate) const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + Kind (1) + KeyPos (1) + Scope (1) + Count (8)
pub(crate) const HEADER_SIZE: usize = 17;

/// Offset of the entry count within the header
pub(crate) const COUNT_OFFSET: u64 = 9;

/// Footer size: DataCRC (4) + Padding (4)
pub(crate) const FOOTER_SIZE: usize = 8;

/// What the records in a snapshot are keyed by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SnapshotScope {
    /// Keys of one namespace, without the namespace tag
    Namespace = 0x00,

    /// Full entry keys, namespace tag included
    Raw = 0x01,
}

impl SnapshotScope {
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(SnapshotScope::Namespace),
            0x01 => Some(SnapshotScope::Raw),
            _ => None,
        }
    }
}

/// Write `records` to a new snapshot at `path`
///
/// On failure the temporary file is dropped (and deleted) and any previous
/// snapshot at `path` is left as it was.
pub fn write_snapshot<R, I>(
    path: &Path,
    meta: TableMeta,
    scope: SnapshotScope,
    sync: SnapshotSync,
    records: I,
) -> Result<SnapshotInfo>
where
    R: Serialize,
    I: IntoIterator<Item = R>,
{
    let result = write_records(path, meta, scope, sync, records);

    if let Err(ref e) = result {
        debug!(path = %path.display(), error = %e, "snapshot write failed");
    }
    result
}

fn write_records<R, I>(
    path: &Path,
    meta: TableMeta,
    scope: SnapshotScope,
    sync: SnapshotSync,
    records: I,
) -> Result<SnapshotInfo>
where
    R: Serialize,
    I: IntoIterator<Item = R>,
{
    let mut writer = SnapshotWriter::create(path, meta, scope, sync)?;
    for record in records {
        writer.append(&record)?;
    }
    writer.finish()
}

/// Read every record of the snapshot at `path`
///
/// The file must have been written with the same table metadata and scope.
/// Nothing is returned unless the whole file decodes cleanly.
pub fn read_snapshot<R>(path: &Path, meta: TableMeta, scope: SnapshotScope) -> Result<Vec<R>>
where
    R: DeserializeOwned,
{
    let reader = SnapshotReader::open(path)?;
    if let Err(e) = reader.check(meta, scope) {
        warn!(path = %path.display(), error = %e, "rejected snapshot");
        return Err(e);
    }

    reader.records()
}
