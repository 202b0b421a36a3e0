//! Offset-indexed archive store with in-place entry deletion.
//!
//! An [`Archive`] wraps a seekable backing store holding entry data (local
//! header + payload per entry) and keeps the container's central directory
//! in memory. Entries can be appended, read back, and physically deleted:
//! [`Archive::delete_entries`] compacts the store by shifting surviving byte
//! spans left over the deleted ones with bounded scratch memory, then shrinks
//! the in-memory directory to match.

pub mod archive;
pub mod directory;
pub mod error;
pub mod store;

pub use archive::{Archive, EntryOptions};
pub use directory::DirectoryIndex;
pub use error::{Result, ZipError};
pub use store::BackingStore;
