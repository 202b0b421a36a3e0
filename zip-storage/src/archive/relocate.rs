//! Chunked byte-range relocation within the backing store

use crate::error::{Result, ZipError};
use crate::store::BackingStore;
use std::io::SeekFrom;
use tracing::trace;

/// Scratch buffer size for one copy step.
pub(crate) const MOVE_CHUNK: usize = 4096;

/// Sanity ceiling for a single relocation. The container's size fields are
/// 32-bit, so a longer span can only come from a corrupt directory.
pub(crate) const SPAN_CEILING: u64 = u32::MAX as u64 + 1;

/// Copy `length` bytes from `src_offset` down to `dst_offset`.
///
/// Caller contract: `dst_offset <= src_offset`. Chunks are copied strictly
/// left to right, each chunk read before it is written, so a destination
/// range overlapping the tail of the source range reads the original bytes:
/// the gap `src_offset - dst_offset` is constant, and a write never advances
/// past the next chunk's read position.
///
/// Returns the number of bytes moved.
pub(crate) fn shift_down<S: BackingStore>(
    store: &mut S,
    dst_offset: u64,
    src_offset: u64,
    length: u64,
) -> Result<u64> {
    debug_assert!(dst_offset <= src_offset);

    if length > SPAN_CEILING {
        return Err(ZipError::CapacityExceeded {
            requested: length,
            ceiling: SPAN_CEILING,
        });
    }

    let mut scratch = [0u8; MOVE_CHUNK];
    let mut moved = 0u64;
    while moved < length {
        let chunk = (length - moved).min(MOVE_CHUNK as u64) as usize;

        store
            .seek(SeekFrom::Start(src_offset + moved))
            .map_err(ZipError::Seek)?;
        store
            .read_exact(&mut scratch[..chunk])
            .map_err(ZipError::Read)?;
        store
            .seek(SeekFrom::Start(dst_offset + moved))
            .map_err(ZipError::Seek)?;
        store
            .write_all(&scratch[..chunk])
            .map_err(ZipError::Write)?;

        moved += chunk as u64;
    }

    trace!("relocated {moved}B from {src_offset:x} to {dst_offset:x}");
    Ok(moved)
}
