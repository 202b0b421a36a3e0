//! Compression method identifiers

use crate::error::{FormatError, Result};

/// Compression methods this container subset stores and reads back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    /// Method 0: payload bytes as-is.
    Stored,
    /// Method 8: raw deflate stream.
    Deflate,
}

impl CompressionMethod {
    /// Wire value of the method field.
    pub fn code(self) -> u16 {
        match self {
            Self::Stored => 0,
            Self::Deflate => 8,
        }
    }

    /// Decode a method field, rejecting everything outside the subset.
    pub fn from_code(code: u16) -> Result<Self> {
        match code {
            0 => Ok(Self::Stored),
            8 => Ok(Self::Deflate),
            other => Err(FormatError::UnsupportedMethod(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_known_codes() {
        assert_eq!(CompressionMethod::from_code(0).unwrap(), CompressionMethod::Stored);
        assert_eq!(CompressionMethod::from_code(8).unwrap(), CompressionMethod::Deflate);
        assert_eq!(CompressionMethod::Deflate.code(), 8);
    }

    #[test]
    fn rejects_unknown_codes() {
        assert!(matches!(
            CompressionMethod::from_code(12),
            Err(FormatError::UnsupportedMethod(12))
        ));
    }
}
