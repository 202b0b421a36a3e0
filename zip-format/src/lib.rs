//! Wire format for the ZIP-subset container used by `zip-storage`.
//!
//! Covers the three on-disk structures: per-entry local headers, central
//! directory records, and the end-of-central-directory locator. Only the
//! classic 32-bit format is handled; archives needing 64-bit offset fields
//! are rejected at parse time.

pub mod eocd;
pub mod error;
pub mod header;
pub mod method;
pub mod record;
pub mod timestamp;

pub use eocd::EndOfCentralDirectory;
pub use error::{FormatError, Result};
pub use header::LocalHeader;
pub use method::CompressionMethod;
pub use record::CentralRecord;
pub use timestamp::DosDateTime;
