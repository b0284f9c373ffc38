//! Snapshot Writer
//!
//! Streams records into a temporary file and renames it into place.
//!
//! Every writer gets its own uniquely named temporary file next to the
//! destination, so concurrent writers to one path never share a file.

use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::{BufMut, BytesMut};
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::config::SnapshotSync;
use crate::error::{CacheError, Result};
use crate::table::TableMeta;

use super::{SnapshotScope, COUNT_OFFSET, HEADER_SIZE, MAGIC, VERSION};

/// Summary of a finished snapshot
#[derive(Debug, Clone)]
pub struct SnapshotInfo {
    /// Final location of the snapshot
    pub path: PathBuf,
    /// Number of records written
    pub entry_count: u64,
    /// File size in bytes
    pub file_size: u64,
}

/// Writes a snapshot file
pub struct SnapshotWriter {
    /// Destination path (only written by the final rename)
    path: PathBuf,
    /// Buffered writer over the temporary file; removed on drop unless persisted
    writer: BufWriter<NamedTempFile>,
    /// Number of records written
    entry_count: u64,
    /// Running CRC hasher for data section
    data_hasher: crc32fast::Hasher,
    sync: SnapshotSync,
}

impl SnapshotWriter {
    /// Create a writer for a snapshot at `path`
    ///
    /// Writes the header immediately; call `append()` for each record, then
    /// `finish()` to write the footer and move the file into place.
    pub fn create(
        path: &Path,
        meta: TableMeta,
        scope: SnapshotScope,
        sync: SnapshotSync,
    ) -> Result<Self> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let file = NamedTempFile::new_in(dir)?;

        let mut writer = BufWriter::new(file);

        // Entry count is a placeholder, patched in finish()
        let mut header = BytesMut::with_capacity(HEADER_SIZE);
        header.put_slice(MAGIC);
        header.put_u16_le(VERSION);
        header.put_u8(meta.kind as u8);
        header.put_u8(meta.key_position);
        header.put_u8(scope as u8);
        header.put_u64_le(0);
        writer.write_all(&header)?;

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            entry_count: 0,
            data_hasher: crc32fast::Hasher::new(),
            sync,
        })
    }

    /// Append one record: [len(4)][bincode payload]
    pub fn append<R: Serialize>(&mut self, record: &R) -> Result<()> {
        let payload = bincode::serialize(record)?;
        let len = u32::try_from(payload.len()).map_err(|_| {
            CacheError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("record of {} bytes is too large", payload.len()),
            ))
        })?;
        let len_bytes = len.to_le_bytes();

        self.writer.write_all(&len_bytes)?;
        self.writer.write_all(&payload)?;

        self.data_hasher.update(&len_bytes);
        self.data_hasher.update(&payload);

        self.entry_count += 1;
        Ok(())
    }

    /// Finish: write footer, patch the count, sync and rename into place
    pub fn finish(mut self) -> Result<SnapshotInfo> {
        let data_crc = self.data_hasher.finalize();

        // Footer: data_crc (4) + padding (4)
        self.writer.write_all(&data_crc.to_le_bytes())?;
        self.writer.write_all(&[0u8; 4])?;
        self.writer.flush()?;

        let mut file = self
            .writer
            .into_inner()
            .map_err(|e| CacheError::Io(e.into_error()))?;
        file.seek(SeekFrom::Start(COUNT_OFFSET))?;
        file.write_all(&self.entry_count.to_le_bytes())?;

        if self.sync == SnapshotSync::Always {
            file.as_file().sync_all()?;
        }

        let file_size = file.as_file().metadata()?.len();

        file.persist(&self.path).map_err(|e| CacheError::Io(e.error))?;

        debug!(
            path = %self.path.display(),
            entries = self.entry_count,
            bytes = file_size,
            "snapshot written"
        );

        Ok(SnapshotInfo {
            path: self.path,
            entry_count: self.entry_count,
            file_size,
        })
    }
}
