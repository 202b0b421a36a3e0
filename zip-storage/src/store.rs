//! Backing store abstraction: one seekable handle the engine reads,
//! rewrites, and truncates in place

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, Write};

/// A seekable byte store an [`Archive`](crate::Archive) lives in.
///
/// The engine only ever needs ordinary blocking primitives: seek,
/// `read_exact`, `write_all`, and truncation. Files and in-memory buffers
/// both qualify; truncation is what separates this from plain
/// `Read + Write + Seek`.
pub trait BackingStore: Read + Write + Seek {
    /// Cut the store down to `len` bytes.
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl BackingStore for File {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

/// In-memory store, used by tests and for building small archives without
/// touching disk.
impl BackingStore for Cursor<Vec<u8>> {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.get_mut().truncate(len as usize);
        if self.position() > len {
            self.set_position(len);
        }
        Ok(())
    }
}
