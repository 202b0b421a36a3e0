//! In-memory central directory: encoded record bytes plus a parallel slot
//! index mapping logical entry positions to byte ranges

use crate::error::{Result, ZipError};
use tracing::trace;
use zip_format::record::{self, CentralRecord};

/// Byte range of one encoded record inside the directory buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DirSlot {
    start: usize,
    len: usize,
}

/// The archive's central directory held in memory.
///
/// `slots[i]` locates logical entry `i`'s encoded record inside `buffer`.
/// Outside of mid-compaction, slots are contiguous and in logical order:
/// slot 0 starts at 0 and each slot begins where the previous one ends.
#[derive(Debug, Default)]
pub struct DirectoryIndex {
    buffer: Vec<u8>,
    slots: Vec<DirSlot>,
}

impl DirectoryIndex {
    /// Empty directory for a freshly created archive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Split a directory buffer read from the store into `entry_count` slots.
    pub fn from_buffer(buffer: Vec<u8>, entry_count: usize) -> Result<Self> {
        let mut slots = Vec::new();
        slots.try_reserve(entry_count)?;

        let mut pos = 0;
        for index in 0..entry_count {
            let len = CentralRecord::encoded_len_at(&buffer, pos)?;
            trace!("directory slot {index}: {len}B at {pos}");
            slots.push(DirSlot { start: pos, len });
            pos += len;
        }
        if pos != buffer.len() {
            return Err(ZipError::InvalidArchive(format!(
                "directory buffer has {} trailing bytes after {entry_count} records",
                buffer.len() - pos
            )));
        }

        Ok(Self { buffer, slots })
    }

    /// Number of records in the directory.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if the directory has no records.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The encoded directory bytes, ready to be written to the store.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// Decode the record at logical index `index`.
    pub fn record_at(&self, index: usize) -> Result<CentralRecord> {
        let slot = self.slot(index)?;
        Ok(CentralRecord::decode(&self.buffer, slot.start)?)
    }

    /// Byte range `(start, len)` of record `index` inside the buffer.
    pub fn byte_range_at(&self, index: usize) -> Result<(usize, usize)> {
        let slot = self.slot(index)?;
        Ok((slot.start, slot.len))
    }

    /// Append an encoded record for a newly written entry.
    pub fn push(&mut self, record: &CentralRecord) -> Result<()> {
        let len = record.encoded_len();
        self.buffer.try_reserve(len)?;
        self.slots.try_reserve(1)?;

        let start = self.buffer.len();
        record.encode_into(&mut self.buffer)?;
        self.slots.push(DirSlot { start, len });
        Ok(())
    }

    /// Rewrite record `index`'s local-header-offset field in place.
    pub fn patch_local_offset(&mut self, index: usize, new_offset: u32) -> Result<()> {
        let slot = self.slot(index)?;
        record::patch_local_header_offset(&mut self.buffer, slot.start, new_offset)?;
        Ok(())
    }

    /// Excise the records flagged in `deleted` from the buffer and the slot
    /// index. Returns the number of records removed.
    ///
    /// Two passes over the flag array, each walking maximal deleted runs:
    /// pass 1 shifts the buffer bytes after each run down over it, pass 2
    /// compacts the slot vector and rebases survivor start offsets. Keep
    /// records' bytes are moved but never modified.
    pub fn compact(&mut self, deleted: &[bool]) -> usize {
        debug_assert_eq!(deleted.len(), self.slots.len());

        // Pass 1: buffer compaction, one drain per deleted run.
        let mut removed_bytes = 0usize;
        let mut i = 0;
        while i < deleted.len() {
            if !deleted[i] {
                i += 1;
                continue;
            }
            let begin = i;
            while i < deleted.len() && deleted[i] {
                i += 1;
            }
            let run_bytes: usize = self.slots[begin..i].iter().map(|s| s.len).sum();
            let start = self.slots[begin].start - removed_bytes;
            self.buffer.drain(start..start + run_bytes);
            removed_bytes += run_bytes;
            trace!("directory compaction: dropped records {begin}..{i} ({run_bytes}B)");
        }

        // Pass 2: slot compaction, shifting survivors left past removed runs.
        let mut removed_bytes = 0usize;
        let mut write = 0usize;
        for (i, &flag) in deleted.iter().enumerate() {
            if flag {
                removed_bytes += self.slots[i].len;
                continue;
            }
            let mut slot = self.slots[i];
            slot.start -= removed_bytes;
            self.slots[write] = slot;
            write += 1;
        }
        let removed = self.slots.len() - write;
        self.slots.truncate(write);
        removed
    }

    fn slot(&self, index: usize) -> Result<DirSlot> {
        self.slots
            .get(index)
            .copied()
            .ok_or(ZipError::IndexOutOfRange {
                index,
                count: self.slots.len(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use zip_format::DosDateTime;

    fn record(name: &str, offset: u32) -> CentralRecord {
        CentralRecord {
            made_by: 20,
            version_needed: 20,
            flags: 0,
            method: 0,
            modified: DosDateTime::default(),
            crc32: offset ^ 0x5A5A_5A5A,
            compressed_size: 4,
            uncompressed_size: 4,
            disk_start: 0,
            internal_attrs: 0,
            external_attrs: 0,
            local_header_offset: offset,
            name: name.to_string(),
            extra: vec![],
            comment: vec![],
        }
    }

    fn directory(names: &[&str]) -> DirectoryIndex {
        let mut dir = DirectoryIndex::new();
        for (i, name) in names.iter().enumerate() {
            dir.push(&record(name, i as u32 * 100)).unwrap();
        }
        dir
    }

    fn names(dir: &DirectoryIndex) -> Vec<String> {
        (0..dir.len())
            .map(|i| dir.record_at(i).unwrap().name)
            .collect()
    }

    #[test]
    fn from_buffer_round_trips_push() {
        let dir = directory(&["a", "bb", "ccc"]);
        let rebuilt = DirectoryIndex::from_buffer(dir.buffer().to_vec(), 3).unwrap();
        assert_eq!(names(&rebuilt), vec!["a", "bb", "ccc"]);
        assert_eq!(rebuilt.byte_range_at(1).unwrap(), dir.byte_range_at(1).unwrap());
    }

    #[test]
    fn from_buffer_rejects_trailing_bytes() {
        let dir = directory(&["a"]);
        let mut buffer = dir.buffer().to_vec();
        buffer.push(0);
        assert!(matches!(
            DirectoryIndex::from_buffer(buffer, 1),
            Err(ZipError::InvalidArchive(_))
        ));
    }

    #[test]
    fn record_at_out_of_range() {
        let dir = directory(&["a"]);
        assert!(matches!(
            dir.record_at(1),
            Err(ZipError::IndexOutOfRange { index: 1, count: 1 })
        ));
    }

    #[test]
    fn compact_middle_run() {
        let mut dir = directory(&["a", "b", "c", "d"]);
        let removed = dir.compact(&[false, true, true, false]);
        assert_eq!(removed, 2);
        assert_eq!(names(&dir), vec!["a", "d"]);

        // Slots are contiguous again.
        let (s0, l0) = dir.byte_range_at(0).unwrap();
        let (s1, _) = dir.byte_range_at(1).unwrap();
        assert_eq!(s0, 0);
        assert_eq!(s1, l0);
        assert_eq!(dir.buffer().len(), l0 + dir.byte_range_at(1).unwrap().1);
    }

    #[test]
    fn compact_leading_and_trailing_runs() {
        let mut dir = directory(&["a", "b", "c", "d", "e"]);
        let removed = dir.compact(&[true, false, true, false, true]);
        assert_eq!(removed, 3);
        assert_eq!(names(&dir), vec!["b", "d"]);
        assert_eq!(dir.byte_range_at(0).unwrap().0, 0);
    }

    #[test]
    fn compact_everything() {
        let mut dir = directory(&["a", "b"]);
        assert_eq!(dir.compact(&[true, true]), 2);
        assert!(dir.is_empty());
        assert!(dir.buffer().is_empty());
    }

    #[test]
    fn compact_nothing_is_a_no_op() {
        let mut dir = directory(&["a", "b"]);
        let before = dir.buffer().to_vec();
        assert_eq!(dir.compact(&[false, false]), 0);
        assert_eq!(dir.buffer(), &before[..]);
        assert_eq!(dir.len(), 2);
    }

    #[test]
    fn patch_local_offset_survives_compaction() {
        let mut dir = directory(&["a", "b", "c"]);
        dir.patch_local_offset(2, 77).unwrap();
        dir.compact(&[false, true, false]);
        assert_eq!(dir.record_at(1).unwrap().local_header_offset, 77);
    }
}
