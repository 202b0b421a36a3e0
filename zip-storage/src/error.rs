//! Error types for archive storage operations

use std::collections::TryReserveError;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ZipError {
    #[error("Archive handle is closed")]
    NotInitialized,

    #[error("Out of memory: {0}")]
    OutOfMemory(#[from] TryReserveError),

    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("Entry index {index} is out of range, archive has {count} entries")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("Seek failed: {0}")]
    Seek(#[source] io::Error),

    #[error("Read failed: {0}")]
    Read(#[source] io::Error),

    #[error("Write failed: {0}")]
    Write(#[source] io::Error),

    #[error("Span of {requested} bytes exceeds relocation ceiling of {ceiling}")]
    CapacityExceeded { requested: u64, ceiling: u64 },

    #[error("Checksum mismatch for {name}: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        name: String,
        expected: u32,
        actual: u32,
    },

    #[error("Invalid archive: {0}")]
    InvalidArchive(String),

    #[error("Container format error: {0}")]
    Format(#[from] zip_format::FormatError),
}

pub type Result<T> = std::result::Result<T, ZipError>;
