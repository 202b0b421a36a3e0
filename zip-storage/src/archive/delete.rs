//! Entry deletion: classification of records and the compacting cursor walk

use crate::archive::relocate;
use crate::archive::Archive;
use crate::directory::DirectoryIndex;
use crate::error::{Result, ZipError};
use crate::store::BackingStore;
use std::collections::HashSet;
use tracing::{debug, trace};

/// Fate of one record during a deletion pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MarkTag {
    /// Survives where it is; its bytes sit before the first deletion point.
    Keep,
    /// Excised from store and directory.
    Delete,
    /// Survives but its bytes sit after the first deletion point and must
    /// shift left.
    Move,
}

/// Per-record scratch state for one deletion call.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EntryMark {
    pub tag: MarkTag,
    /// Local header offset in the backing store.
    pub local_offset: u64,
    /// Bytes this record occupies on disk: header + name + payload, up to
    /// the next record in on-disk order (or archive end for the last).
    pub span: u64,
}

/// Normalized comparison form of an entry name.
pub(crate) fn normalize_name(name: &str) -> String {
    name.replace('\\', "/")
}

/// Tag every record Keep/Delete/Move, compute its on-disk span, and return
/// the logical indices sorted by on-disk offset.
///
/// Logical index order and on-disk offset order are different orderings of
/// the same records: a well-formed directory may list them in any order.
/// Spans come from offset-order deltas and are mapped back onto logical
/// indices; the offset ordering itself is computed once here and handed to
/// the caller so the compaction walk can follow the bytes as they sit on
/// disk.
pub(crate) fn classify(
    directory: &DirectoryIndex,
    archive_size: u64,
    targets: &HashSet<String>,
) -> Result<(Vec<EntryMark>, Vec<usize>)> {
    let count = directory.len();
    let mut marks = Vec::new();
    marks.try_reserve(count)?;

    for index in 0..count {
        let record = directory.record_at(index)?;
        let tag = if targets.contains(&normalize_name(&record.name)) {
            MarkTag::Delete
        } else {
            MarkTag::Keep
        };
        marks.push(EntryMark {
            tag,
            local_offset: u64::from(record.local_header_offset),
            span: 0,
        });
    }

    // Everything at or after the earliest deleted offset has to shift;
    // re-tag surviving records past that point as Move.
    let first_deleted = marks
        .iter()
        .filter(|m| m.tag == MarkTag::Delete)
        .map(|m| m.local_offset)
        .min();
    if let Some(d_pos) = first_deleted {
        for mark in &mut marks {
            if mark.tag == MarkTag::Keep && mark.local_offset > d_pos {
                mark.tag = MarkTag::Move;
            }
        }
    }

    // Spans from offset-order deltas: each record runs to the next one's
    // local header, the last to the end of the archive.
    let mut by_offset: Vec<usize> = (0..count).collect();
    by_offset.sort_by_key(|&i| marks[i].local_offset);
    for pos in 0..by_offset.len() {
        let index = by_offset[pos];
        let next = match by_offset.get(pos + 1) {
            Some(&n) => marks[n].local_offset,
            None => archive_size,
        };
        marks[index].span = next - marks[index].local_offset;
    }

    Ok((marks, by_offset))
}

impl<S: BackingStore> Archive<S> {
    /// Delete every entry whose name matches one of `names`, physically
    /// compacting the backing store.
    ///
    /// Names are compared exactly after normalizing `\` to `/` on both
    /// sides. Matching records are removed from the store and the
    /// directory; surviving bytes shift left over the holes using a small
    /// fixed scratch buffer, and each survivor's directory record is
    /// patched to its new local header offset. The store is truncated to
    /// the new size at the end.
    ///
    /// Returns the number of entries deleted; an empty `names` list or a
    /// list matching nothing returns 0 with the archive untouched.
    ///
    /// On error the archive and its store are left in an unspecified,
    /// partially compacted state and must not be reused; re-open from the
    /// backing store. All validation and classification runs before the
    /// first store write, so lookup and decode failures leave everything
    /// intact.
    pub fn delete_entries(&mut self, names: &[impl AsRef<str>]) -> Result<usize> {
        if self.finalized {
            return Err(ZipError::NotInitialized);
        }
        if names.is_empty() {
            return Ok(0);
        }

        let targets: HashSet<String> = names
            .iter()
            .map(|name| normalize_name(name.as_ref()))
            .collect();
        let (marks, by_offset) = classify(&self.directory, self.size, &targets)?;

        let deleted_count = marks.iter().filter(|m| m.tag == MarkTag::Delete).count();
        if deleted_count == 0 {
            debug!("delete_entries: no matches among {} targets", targets.len());
            return Ok(0);
        }
        debug!(
            "delete_entries: removing {deleted_count} of {} entries",
            marks.len()
        );

        // Cursor walk in on-disk offset order, one relocation per Move run.
        // The directory may list records in any order, so the walk follows
        // `by_offset` and patches go to each record's logical index. The
        // cursors coincide until the first Delete run and stay exactly
        // `deleted_length` apart from then on.
        let mut write_cursor = 0u64;
        let mut read_cursor = 0u64;
        let mut deleted_length = 0u64;
        let mut i = 0;
        while i < by_offset.len() {
            let tag = marks[by_offset[i]].tag;
            let begin = i;
            while i < by_offset.len() && marks[by_offset[i]].tag == tag {
                i += 1;
            }
            let run = &by_offset[begin..i];
            let run_span: u64 = run.iter().map(|&k| marks[k].span).sum();
            trace!("run {begin}..{i} {tag:?}: {run_span}B");

            match tag {
                MarkTag::Keep => {
                    write_cursor += run_span;
                    read_cursor = write_cursor;
                }
                MarkTag::Delete => {
                    read_cursor += run_span;
                    deleted_length += run_span;
                }
                MarkTag::Move => {
                    for &index in run {
                        let new_offset = marks[index].local_offset - deleted_length;
                        self.directory
                            .patch_local_offset(index, new_offset as u32)?;
                    }
                    relocate::shift_down(&mut self.store, write_cursor, read_cursor, run_span)?;
                    write_cursor += run_span;
                    read_cursor += run_span;
                }
            }
        }

        self.size -= deleted_length;
        self.directory
            .compact(&marks.iter().map(|m| m.tag == MarkTag::Delete).collect::<Vec<_>>());

        self.store.truncate(self.size).map_err(ZipError::Write)?;
        debug!(
            "delete_entries: done, {deleted_length}B reclaimed, new size {}",
            self.size
        );
        Ok(deleted_count)
    }
}
