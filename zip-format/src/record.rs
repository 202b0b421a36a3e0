//! Central directory records: one per entry, held in the directory buffer

use crate::error::{FormatError, Result};
use crate::timestamp::DosDateTime;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::Cursor;

/// Signature of a central directory record ("PK\x01\x02").
pub const CENTRAL_RECORD_SIGNATURE: u32 = 0x0201_4B50;

/// Fixed-size prefix of a record, before name/extra/comment bytes.
pub const CENTRAL_RECORD_FIXED_LEN: usize = 46;

/// Byte position of the local-header-offset field within an encoded record.
const LOCAL_OFFSET_FIELD: usize = 42;

/// One entry's central directory record.
///
/// Decoded on demand from the directory buffer; the engine never mutates a
/// decoded record. The single in-place mutation the format allows is
/// [`patch_local_header_offset`], which rewrites the offset field inside the
/// still-encoded bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CentralRecord {
    pub made_by: u16,
    pub version_needed: u16,
    pub flags: u16,
    pub method: u16,
    pub modified: DosDateTime,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub disk_start: u16,
    pub internal_attrs: u16,
    pub external_attrs: u32,
    pub local_header_offset: u32,
    pub name: String,
    pub extra: Vec<u8>,
    pub comment: Vec<u8>,
}

impl CentralRecord {
    /// Decode the record starting at `start` in the directory buffer.
    pub fn decode(buffer: &[u8], start: usize) -> Result<Self> {
        let available = buffer.len().saturating_sub(start);
        if available < CENTRAL_RECORD_FIXED_LEN {
            return Err(FormatError::Truncated {
                needed: CENTRAL_RECORD_FIXED_LEN,
                available,
            });
        }

        let mut reader = Cursor::new(&buffer[start..]);
        let signature = reader.read_u32::<LittleEndian>()?;
        if signature != CENTRAL_RECORD_SIGNATURE {
            return Err(FormatError::BadSignature {
                expected: CENTRAL_RECORD_SIGNATURE,
                found: signature,
            });
        }

        let made_by = reader.read_u16::<LittleEndian>()?;
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
        let comment_len = reader.read_u16::<LittleEndian>()? as usize;
        let disk_start = reader.read_u16::<LittleEndian>()?;
        let internal_attrs = reader.read_u16::<LittleEndian>()?;
        let external_attrs = reader.read_u32::<LittleEndian>()?;
        let local_header_offset = reader.read_u32::<LittleEndian>()?;

        let total = CENTRAL_RECORD_FIXED_LEN + name_len + extra_len + comment_len;
        if available < total {
            return Err(FormatError::Truncated {
                needed: total,
                available,
            });
        }

        let variable = &buffer[start + CENTRAL_RECORD_FIXED_LEN..start + total];
        let (name, rest) = variable.split_at(name_len);
        let (extra, comment) = rest.split_at(extra_len);

        Ok(Self {
            made_by,
            version_needed,
            flags,
            method,
            modified: DosDateTime { date, time },
            crc32,
            compressed_size,
            uncompressed_size,
            disk_start,
            internal_attrs,
            external_attrs,
            local_header_offset,
            name: String::from_utf8_lossy(name).into_owned(),
            extra: extra.to_vec(),
            comment: comment.to_vec(),
        })
    }

    /// Encoded size of the record starting at `start`, without a full decode.
    ///
    /// Used to split a freshly read directory buffer into per-record slots.
    pub fn encoded_len_at(buffer: &[u8], start: usize) -> Result<usize> {
        let available = buffer.len().saturating_sub(start);
        if available < CENTRAL_RECORD_FIXED_LEN {
            return Err(FormatError::Truncated {
                needed: CENTRAL_RECORD_FIXED_LEN,
                available,
            });
        }

        let mut reader = Cursor::new(&buffer[start..]);
        let signature = reader.read_u32::<LittleEndian>()?;
        if signature != CENTRAL_RECORD_SIGNATURE {
            return Err(FormatError::BadSignature {
                expected: CENTRAL_RECORD_SIGNATURE,
                found: signature,
            });
        }

        let name_len = u16::from_le_bytes([buffer[start + 28], buffer[start + 29]]) as usize;
        let extra_len = u16::from_le_bytes([buffer[start + 30], buffer[start + 31]]) as usize;
        let comment_len = u16::from_le_bytes([buffer[start + 32], buffer[start + 33]]) as usize;

        let total = CENTRAL_RECORD_FIXED_LEN + name_len + extra_len + comment_len;
        if available < total {
            return Err(FormatError::Truncated {
                needed: total,
                available,
            });
        }
        Ok(total)
    }

    /// Append the encoded record to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) -> Result<()> {
        if self.name.len() > u16::MAX as usize {
            return Err(FormatError::FieldTooLong(self.name.len()));
        }

        out.write_u32::<LittleEndian>(CENTRAL_RECORD_SIGNATURE)?;
        out.write_u16::<LittleEndian>(self.made_by)?;
        out.write_u16::<LittleEndian>(self.version_needed)?;
        out.write_u16::<LittleEndian>(self.flags)?;
        out.write_u16::<LittleEndian>(self.method)?;
        out.write_u16::<LittleEndian>(self.modified.time)?;
        out.write_u16::<LittleEndian>(self.modified.date)?;
        out.write_u32::<LittleEndian>(self.crc32)?;
        out.write_u32::<LittleEndian>(self.compressed_size)?;
        out.write_u32::<LittleEndian>(self.uncompressed_size)?;
        out.write_u16::<LittleEndian>(self.name.len() as u16)?;
        out.write_u16::<LittleEndian>(self.extra.len() as u16)?;
        out.write_u16::<LittleEndian>(self.comment.len() as u16)?;
        out.write_u16::<LittleEndian>(self.disk_start)?;
        out.write_u16::<LittleEndian>(self.internal_attrs)?;
        out.write_u32::<LittleEndian>(self.external_attrs)?;
        out.write_u32::<LittleEndian>(self.local_header_offset)?;
        out.extend_from_slice(self.name.as_bytes());
        out.extend_from_slice(&self.extra);
        out.extend_from_slice(&self.comment);
        Ok(())
    }

    /// Total encoded size of this record.
    pub fn encoded_len(&self) -> usize {
        CENTRAL_RECORD_FIXED_LEN + self.name.len() + self.extra.len() + self.comment.len()
    }

    /// Local header carrying the same per-entry fields as this record.
    pub fn to_local_header(&self) -> crate::header::LocalHeader {
        crate::header::LocalHeader {
            version_needed: self.version_needed,
            flags: self.flags,
            method: self.method,
            modified: self.modified,
            crc32: self.crc32,
            compressed_size: self.compressed_size,
            uncompressed_size: self.uncompressed_size,
            name: self.name.clone(),
            extra: self.extra.clone(),
        }
    }
}

/// Overwrite the local-header-offset field of the record encoded at `start`.
///
/// The field is fixed-width, so nothing else in the record moves. The
/// signature is re-checked so a misaligned `start` cannot silently corrupt
/// an unrelated byte range.
pub fn patch_local_header_offset(buffer: &mut [u8], start: usize, new_offset: u32) -> Result<()> {
    let available = buffer.len().saturating_sub(start);
    if available < CENTRAL_RECORD_FIXED_LEN {
        return Err(FormatError::Truncated {
            needed: CENTRAL_RECORD_FIXED_LEN,
            available,
        });
    }

    let signature = u32::from_le_bytes([
        buffer[start],
        buffer[start + 1],
        buffer[start + 2],
        buffer[start + 3],
    ]);
    if signature != CENTRAL_RECORD_SIGNATURE {
        return Err(FormatError::BadSignature {
            expected: CENTRAL_RECORD_SIGNATURE,
            found: signature,
        });
    }

    let field = start + LOCAL_OFFSET_FIELD;
    buffer[field..field + 4].copy_from_slice(&new_offset.to_le_bytes());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample(name: &str, offset: u32) -> CentralRecord {
        CentralRecord {
            made_by: 20,
            version_needed: 20,
            flags: 0,
            method: 0,
            modified: DosDateTime::from_parts(2022, 3, 1, 12, 0, 0),
            crc32: 0x1234_5678,
            compressed_size: 10,
            uncompressed_size: 10,
            disk_start: 0,
            internal_attrs: 0,
            external_attrs: 0o644 << 16,
            local_header_offset: offset,
            name: name.to_string(),
            extra: vec![],
            comment: vec![],
        }
    }

    #[test]
    fn record_round_trip() {
        let record = sample("a/b.txt", 100);
        let mut buf = vec![0xAA; 7]; // leading garbage, record not at 0
        let start = buf.len();
        record.encode_into(&mut buf).unwrap();

        assert_eq!(
            CentralRecord::encoded_len_at(&buf, start).unwrap(),
            record.encoded_len()
        );
        let parsed = CentralRecord::decode(&buf, start).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn decode_rejects_truncated_buffer() {
        let record = sample("x", 0);
        let mut buf = Vec::new();
        record.encode_into(&mut buf).unwrap();
        buf.truncate(buf.len() - 1);

        assert!(matches!(
            CentralRecord::decode(&buf, 0),
            Err(FormatError::Truncated { .. })
        ));
    }

    #[test]
    fn patch_rewrites_only_the_offset_field() {
        let record = sample("entry", 0xAABB);
        let mut buf = Vec::new();
        record.encode_into(&mut buf).unwrap();
        let before = buf.clone();

        patch_local_header_offset(&mut buf, 0, 0x42).unwrap();

        let parsed = CentralRecord::decode(&buf, 0).unwrap();
        assert_eq!(parsed.local_header_offset, 0x42);
        assert_eq!(parsed.name, record.name);
        assert_eq!(parsed.crc32, record.crc32);

        // Everything outside the four offset bytes is untouched.
        for (i, (a, b)) in before.iter().zip(buf.iter()).enumerate() {
            if !(42..46).contains(&i) {
                assert_eq!(a, b, "byte {i} changed");
            }
        }
    }

    #[test]
    fn patch_rejects_misaligned_start() {
        let record = sample("entry", 1);
        let mut buf = Vec::new();
        record.encode_into(&mut buf).unwrap();

        assert!(matches!(
            patch_local_header_offset(&mut buf, 2, 0),
            Err(FormatError::BadSignature { .. })
        ));
    }
}
