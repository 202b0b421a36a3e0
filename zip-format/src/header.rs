//! Per-entry local header, stored immediately before each payload

use crate::error::{FormatError, Result};
use crate::timestamp::DosDateTime;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Signature of a local header ("PK\x03\x04").
pub const LOCAL_HEADER_SIGNATURE: u32 = 0x0403_4B50;

/// Fixed-size prefix of a local header, before the name and extra bytes.
pub const LOCAL_HEADER_FIXED_LEN: usize = 30;

/// Local header preceding one entry's payload in the backing store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalHeader {
    pub version_needed: u16,
    pub flags: u16,
    pub method: u16,
    pub modified: DosDateTime,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub name: String,
    pub extra: Vec<u8>,
}

impl LocalHeader {
    /// Parse a local header from the reader, signature first.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let signature = reader.read_u32::<LittleEndian>()?;
        if signature != LOCAL_HEADER_SIGNATURE {
            return Err(FormatError::BadSignature {
                expected: LOCAL_HEADER_SIGNATURE,
                found: signature,
            });
        }

        let version_needed = reader.read_u16::<LittleEndian>()?;
        let flags = reader.read_u16::<LittleEndian>()?;
        let method = reader.read_u16::<LittleEndian>()?;
        let time = reader.read_u16::<LittleEndian>()?;
        let date = reader.read_u16::<LittleEndian>()?;
        let crc32 = reader.read_u32::<LittleEndian>()?;
        let compressed_size = reader.read_u32::<LittleEndian>()?;
        let uncompressed_size = reader.read_u32::<LittleEndian>()?;
        let name_len = reader.read_u16::<LittleEndian>()? as usize;
        let extra_len = reader.read_u16::<LittleEndian>()? as usize;

        let mut name = vec![0u8; name_len];
        reader.read_exact(&mut name)?;
        let mut extra = vec![0u8; extra_len];
        reader.read_exact(&mut extra)?;

        Ok(Self {
            version_needed,
            flags,
            method,
            modified: DosDateTime { date, time },
            crc32,
            compressed_size,
            uncompressed_size,
            name: String::from_utf8_lossy(&name).into_owned(),
            extra,
        })
    }

    /// Encode the header into the writer. Returns the number of bytes written.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<u64> {
        if self.name.len() > u16::MAX as usize {
            return Err(FormatError::FieldTooLong(self.name.len()));
        }
        if self.extra.len() > u16::MAX as usize {
            return Err(FormatError::FieldTooLong(self.extra.len()));
        }

        writer.write_u32::<LittleEndian>(LOCAL_HEADER_SIGNATURE)?;
        writer.write_u16::<LittleEndian>(self.version_needed)?;
        writer.write_u16::<LittleEndian>(self.flags)?;
        writer.write_u16::<LittleEndian>(self.method)?;
        writer.write_u16::<LittleEndian>(self.modified.time)?;
        writer.write_u16::<LittleEndian>(self.modified.date)?;
        writer.write_u32::<LittleEndian>(self.crc32)?;
        writer.write_u32::<LittleEndian>(self.compressed_size)?;
        writer.write_u32::<LittleEndian>(self.uncompressed_size)?;
        writer.write_u16::<LittleEndian>(self.name.len() as u16)?;
        writer.write_u16::<LittleEndian>(self.extra.len() as u16)?;
        writer.write_all(self.name.as_bytes())?;
        writer.write_all(&self.extra)?;

        Ok(self.encoded_len())
    }

    /// Total encoded size: fixed prefix plus name and extra bytes.
    pub fn encoded_len(&self) -> u64 {
        (LOCAL_HEADER_FIXED_LEN + self.name.len() + self.extra.len()) as u64
    }
}
