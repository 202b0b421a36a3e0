//! Archive handle: entry data in a backing store, directory in memory

mod delete;
mod relocate;

use crate::directory::DirectoryIndex;
use crate::error::{Result, ZipError};
use crate::store::BackingStore;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::{Compression, Crc};
use std::io::{Read, SeekFrom, Write};
use tracing::{debug, trace};
use zip_format::{
    CentralRecord, CompressionMethod, DosDateTime, EndOfCentralDirectory, FormatError, LocalHeader,
};

/// Version fields written into headers and records.
const FORMAT_VERSION: u16 = 20;

/// Per-entry options for [`Archive::add_entry_with`].
#[derive(Debug, Clone)]
pub struct EntryOptions {
    pub method: CompressionMethod,
    pub modified: DosDateTime,
    pub external_attrs: u32,
}

impl Default for EntryOptions {
    fn default() -> Self {
        Self {
            method: CompressionMethod::Deflate,
            modified: DosDateTime::default(),
            external_attrs: 0,
        }
    }
}

/// An open archive over a backing store.
///
/// The store holds entry data only: one local header plus payload per entry
/// in `0..size`. The central directory lives in memory as a
/// [`DirectoryIndex`] and is written back out by [`finalize`], after which
/// the handle is closed and the store holds a complete container.
///
/// [`finalize`]: Archive::finalize
pub struct Archive<S: BackingStore> {
    store: S,
    /// Logical end of entry data; authoritative between operations, not
    /// during one.
    size: u64,
    directory: DirectoryIndex,
    comment: Vec<u8>,
    finalized: bool,
}

impl<S: BackingStore> Archive<S> {
    /// Start an empty archive, truncating whatever the store held.
    pub fn create(mut store: S) -> Result<Self> {
        store.truncate(0).map_err(ZipError::Write)?;
        Ok(Self {
            store,
            size: 0,
            directory: DirectoryIndex::new(),
            comment: Vec::new(),
            finalized: false,
        })
    }

    /// Open an existing container from the store.
    ///
    /// Locates the end-of-central-directory record, reads the directory
    /// into memory, and treats everything before the directory as entry
    /// data. Multi-disk and 64-bit containers are rejected.
    pub fn open(mut store: S) -> Result<Self> {
        let (eocd_offset, eocd) = EndOfCentralDirectory::find(&mut store)?;
        eocd.validate()?;

        let cd_offset = u64::from(eocd.cd_offset);
        let cd_size = u64::from(eocd.cd_size);
        if cd_offset + cd_size > eocd_offset {
            return Err(ZipError::InvalidArchive(format!(
                "central directory ({cd_size}B at {cd_offset:x}) overlaps the \
                 end-of-directory record at {eocd_offset:x}"
            )));
        }

        store
            .seek(SeekFrom::Start(cd_offset))
            .map_err(ZipError::Seek)?;
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(cd_size as usize)?;
        buffer.resize(cd_size as usize, 0);
        store.read_exact(&mut buffer).map_err(ZipError::Read)?;

        let directory = DirectoryIndex::from_buffer(buffer, usize::from(eocd.total_entries))?;
        debug!(
            "opened archive: {} entries, {cd_offset}B of entry data",
            directory.len()
        );

        Ok(Self {
            store,
            size: cd_offset,
            directory,
            comment: eocd.comment,
            finalized: false,
        })
    }

    /// Append an entry with default options (deflate, DOS epoch timestamp).
    pub fn add_entry(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.add_entry_with(name, data, &EntryOptions::default())
    }

    /// Append an entry: local header plus payload at the current end of
    /// entry data, and a directory record for it.
    pub fn add_entry_with(&mut self, name: &str, data: &[u8], options: &EntryOptions) -> Result<()> {
        if self.finalized {
            return Err(ZipError::NotInitialized);
        }
        if data.len() as u64 > u64::from(u32::MAX) || self.size > u64::from(u32::MAX) {
            return Err(FormatError::Needs64Bit.into());
        }

        let name = delete::normalize_name(name);
        let mut crc = Crc::new();
        crc.update(data);

        let compressed = match options.method {
            CompressionMethod::Stored => data.to_vec(),
            CompressionMethod::Deflate => {
                let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(data).map_err(ZipError::Write)?;
                encoder.finish().map_err(ZipError::Write)?
            }
        };
        if compressed.len() as u64 > u64::from(u32::MAX) {
            return Err(FormatError::Needs64Bit.into());
        }

        let offset = self.size;
        let record = CentralRecord {
            made_by: FORMAT_VERSION,
            version_needed: FORMAT_VERSION,
            flags: 0,
            method: options.method.code(),
            modified: options.modified,
            crc32: crc.sum(),
            compressed_size: compressed.len() as u32,
            uncompressed_size: data.len() as u32,
            disk_start: 0,
            internal_attrs: 0,
            external_attrs: options.external_attrs,
            local_header_offset: offset as u32,
            name,
            extra: Vec::new(),
            comment: Vec::new(),
        };

        // Local header carries the same per-entry fields as the record.
        let mut encoded = Vec::new();
        record.to_local_header().write_to(&mut encoded)?;

        self.store
            .seek(SeekFrom::Start(offset))
            .map_err(ZipError::Seek)?;
        self.store.write_all(&encoded).map_err(ZipError::Write)?;
        self.store.write_all(&compressed).map_err(ZipError::Write)?;
        self.size = offset + encoded.len() as u64 + compressed.len() as u64;
        self.directory.push(&record)?;

        trace!(
            "added entry {}: {}B -> {}B at offset {offset:x}",
            self.directory.len() - 1,
            data.len(),
            record.compressed_size
        );
        Ok(())
    }

    /// Read and decompress the entry at logical index `index`, verifying
    /// its CRC and that the local header at the recorded offset belongs to
    /// the same entry.
    pub fn read_entry(&mut self, index: usize) -> Result<Vec<u8>> {
        let record = self.directory.record_at(index)?;
        let method = CompressionMethod::from_code(record.method)?;

        self.store
            .seek(SeekFrom::Start(u64::from(record.local_header_offset)))
            .map_err(ZipError::Seek)?;
        let header = LocalHeader::read_from(&mut self.store)?;
        if header.name != record.name {
            return Err(ZipError::InvalidArchive(format!(
                "local header at {:x} names {:?}, directory says {:?}",
                record.local_header_offset, header.name, record.name
            )));
        }

        let mut compressed = vec![0u8; record.compressed_size as usize];
        self.store
            .read_exact(&mut compressed)
            .map_err(ZipError::Read)?;

        let data = match method {
            CompressionMethod::Stored => compressed,
            CompressionMethod::Deflate => {
                let mut out = Vec::with_capacity(record.uncompressed_size as usize);
                DeflateDecoder::new(&compressed[..])
                    .read_to_end(&mut out)
                    .map_err(ZipError::Read)?;
                out
            }
        };

        let mut crc = Crc::new();
        crc.update(&data);
        if crc.sum() != record.crc32 {
            return Err(ZipError::ChecksumMismatch {
                name: record.name,
                expected: record.crc32,
                actual: crc.sum(),
            });
        }
        Ok(data)
    }

    /// Read an entry by name.
    pub fn read_entry_by_name(&mut self, name: &str) -> Result<Vec<u8>> {
        let index = self.entry_index(name)?;
        self.read_entry(index)
    }

    /// Logical index of the entry named `name` (normalized comparison).
    pub fn entry_index(&self, name: &str) -> Result<usize> {
        let wanted = delete::normalize_name(name);
        for index in 0..self.directory.len() {
            if delete::normalize_name(&self.directory.record_at(index)?.name) == wanted {
                return Ok(index);
            }
        }
        Err(ZipError::NotFound(name.to_string()))
    }

    /// Entry names in logical order.
    pub fn entry_names(&self) -> Result<Vec<String>> {
        (0..self.directory.len())
            .map(|i| Ok(self.directory.record_at(i)?.name))
            .collect()
    }

    /// Number of entries.
    pub fn entry_count(&self) -> usize {
        self.directory.len()
    }

    /// Logical size of the entry data region.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// The in-memory directory.
    pub fn directory(&self) -> &DirectoryIndex {
        &self.directory
    }

    /// Write the directory and end-of-central-directory record after the
    /// entry data, making the store a complete container, and close the
    /// handle. Further mutation requires re-opening from the store.
    ///
    /// Returns the total container length.
    pub fn finalize(&mut self) -> Result<u64> {
        if self.finalized {
            return Err(ZipError::NotInitialized);
        }

        let entries = self.directory.len();
        let cd_len = self.directory.buffer().len() as u64;
        if entries >= usize::from(u16::MAX)
            || self.size > u64::from(u32::MAX)
            || cd_len > u64::from(u32::MAX)
        {
            return Err(FormatError::Needs64Bit.into());
        }

        self.store
            .seek(SeekFrom::Start(self.size))
            .map_err(ZipError::Seek)?;
        self.store
            .write_all(self.directory.buffer())
            .map_err(ZipError::Write)?;

        let eocd = EndOfCentralDirectory {
            disk_number: 0,
            cd_disk: 0,
            disk_entries: entries as u16,
            total_entries: entries as u16,
            cd_size: cd_len as u32,
            cd_offset: self.size as u32,
            comment: self.comment.clone(),
        };
        let mut tail = Vec::new();
        eocd.write_to(&mut tail)?;
        self.store.write_all(&tail).map_err(ZipError::Write)?;

        let end = self.size + cd_len + tail.len() as u64;
        self.store.truncate(end).map_err(ZipError::Write)?;
        self.store.flush().map_err(ZipError::Write)?;
        self.finalized = true;

        debug!("finalized archive: {entries} entries, {end}B total");
        Ok(end)
    }

    /// Give the backing store back, dropping the handle.
    pub fn into_store(self) -> S {
        self.store
    }
}
