//! Error types for container format parsing and encoding

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Bad signature: expected {expected:08x}, found {found:08x}")]
    BadSignature { expected: u32, found: u32 },

    #[error("Structure truncated: need {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("End-of-central-directory record not found")]
    EocdNotFound,

    #[error("Multi-disk archives are not supported")]
    MultiDisk,

    #[error("Archive requires 64-bit offset fields")]
    Needs64Bit,

    #[error("Unsupported compression method: {0}")]
    UnsupportedMethod(u16),

    #[error("Variable-length field too long: {0} bytes")]
    FieldTooLong(usize),
}

pub type Result<T> = std::result::Result<T, FormatError>;
