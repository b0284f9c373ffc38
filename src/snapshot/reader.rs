//! Snapshot Reader
//!
//! Loads a snapshot file, validates it, and decodes its records.

use std::fs;
use std::path::Path;

use bytes::{Buf, Bytes};
use serde::de::DeserializeOwned;

use crate::error::{CacheError, Result};
use crate::table::{TableKind, TableMeta};

use super::{SnapshotScope, FOOTER_SIZE, HEADER_SIZE, MAGIC, VERSION};

/// Reader for snapshot files
///
/// `open` reads the whole file and verifies the header and the data CRC, so
/// a reader that opened successfully holds an intact data block.
#[derive(Debug)]
pub struct SnapshotReader {
    /// Data block (header and footer stripped)
    data: Bytes,
    meta: TableMeta,
    scope: SnapshotScope,
    entry_count: u64,
}

impl SnapshotReader {
    /// Open and validate a snapshot
    pub fn open(path: &Path) -> Result<Self> {
        let mut buf = Bytes::from(fs::read(path)?);

        if buf.len() < HEADER_SIZE + FOOTER_SIZE {
            return Err(CacheError::SnapshotCorruption(format!(
                "file is {} bytes, shorter than header and footer",
                buf.len()
            )));
        }

        // Read and validate header
        let mut header = buf.split_to(HEADER_SIZE);

        if &header[0..4] != MAGIC {
            return Err(CacheError::SnapshotCorruption(format!(
                "invalid magic: expected CTAB, got {:?}",
                &header[0..4]
            )));
        }
        header.advance(4);

        let version = header.get_u16_le();
        if version != VERSION {
            return Err(CacheError::SnapshotMismatch(format!(
                "unsupported snapshot version: {}",
                version
            )));
        }

        let kind_byte = header.get_u8();
        let kind = TableKind::from_u8(kind_byte).ok_or_else(|| {
            CacheError::SnapshotCorruption(format!("unknown table kind: {:#04x}", kind_byte))
        })?;
        let key_position = header.get_u8();

        let scope_byte = header.get_u8();
        let scope = SnapshotScope::from_u8(scope_byte).ok_or_else(|| {
            CacheError::SnapshotCorruption(format!("unknown scope: {:#04x}", scope_byte))
        })?;

        let entry_count = header.get_u64_le();

        // Footer: verify the data block before handing anything out
        let mut footer = buf.split_off(buf.len() - FOOTER_SIZE);
        let expected_crc = footer.get_u32_le();
        let actual_crc = crc32fast::hash(&buf);
        if actual_crc != expected_crc {
            return Err(CacheError::SnapshotCorruption(format!(
                "data CRC mismatch: expected {:#010x}, got {:#010x}",
                expected_crc, actual_crc
            )));
        }

        Ok(Self {
            data: buf,
            meta: TableMeta { kind, key_position },
            scope,
            entry_count,
        })
    }

    /// Reject snapshots written with different metadata or scope
    pub fn check(&self, meta: TableMeta, scope: SnapshotScope) -> Result<()> {
        if self.meta != meta {
            return Err(CacheError::SnapshotMismatch(format!(
                "table metadata {:?} does not match expected {:?}",
                self.meta, meta
            )));
        }
        if self.scope != scope {
            return Err(CacheError::SnapshotMismatch(format!(
                "snapshot scope {:?} does not match expected {:?}",
                self.scope, scope
            )));
        }
        Ok(())
    }

    /// Decode all records
    pub fn records<R: DeserializeOwned>(&self) -> Result<Vec<R>> {
        let mut data = self.data.clone();
        let mut records = Vec::with_capacity(self.entry_count.min(4096) as usize);

        while data.has_remaining() {
            if data.remaining() < 4 {
                return Err(CacheError::SnapshotCorruption(
                    "truncated record header".to_string(),
                ));
            }
            let len = data.get_u32_le() as usize;

            if data.remaining() < len {
                return Err(CacheError::SnapshotCorruption(format!(
                    "record of {} bytes runs past end of data block",
                    len
                )));
            }
            let payload = data.split_to(len);
            records.push(bincode::deserialize(&payload)?);
        }

        if records.len() as u64 != self.entry_count {
            return Err(CacheError::SnapshotCorruption(format!(
                "header promises {} records, found {}",
                self.entry_count,
                records.len()
            )));
        }

        Ok(records)
    }

    pub fn meta(&self) -> TableMeta {
        self.meta
    }

    pub fn scope(&self) -> SnapshotScope {
        self.scope
    }

    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }
}
