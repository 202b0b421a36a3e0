//! End-of-central-directory record: the archive's trailing locator

use crate::error::{FormatError, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read, Seek, SeekFrom, Write};
use tracing::{debug, trace};

/// Signature of the end-of-central-directory record ("PK\x05\x06").
pub const EOCD_SIGNATURE: u32 = 0x0605_4B50;

/// Fixed-size prefix of the record, before the comment bytes.
pub const EOCD_FIXED_LEN: usize = 22;

/// Furthest the locator can sit from EOF: fixed part plus a maximal comment.
const MAX_SEARCH_WINDOW: u64 = (EOCD_FIXED_LEN + u16::MAX as usize) as u64;

/// Trailing record locating the central directory inside the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub cd_disk: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment: Vec<u8>,
}

impl EndOfCentralDirectory {
    /// Parse the record starting at `start` in `buffer`.
    pub fn parse(buffer: &[u8], start: usize) -> Result<Self> {
        let available = buffer.len().saturating_sub(start);
        if available < EOCD_FIXED_LEN {
            return Err(FormatError::Truncated {
                needed: EOCD_FIXED_LEN,
                available,
            });
        }

        let mut reader = Cursor::new(&buffer[start..]);
        let signature = reader.read_u32::<LittleEndian>()?;
        if signature != EOCD_SIGNATURE {
            return Err(FormatError::BadSignature {
                expected: EOCD_SIGNATURE,
                found: signature,
            });
        }

        let disk_number = reader.read_u16::<LittleEndian>()?;
        let cd_disk = reader.read_u16::<LittleEndian>()?;
        let disk_entries = reader.read_u16::<LittleEndian>()?;
        let total_entries = reader.read_u16::<LittleEndian>()?;
        let cd_size = reader.read_u32::<LittleEndian>()?;
        let cd_offset = reader.read_u32::<LittleEndian>()?;
        let comment_len = reader.read_u16::<LittleEndian>()? as usize;

        let total = EOCD_FIXED_LEN + comment_len;
        if available < total {
            return Err(FormatError::Truncated {
                needed: total,
                available,
            });
        }
        let comment = buffer[start + EOCD_FIXED_LEN..start + total].to_vec();

        Ok(Self {
            disk_number,
            cd_disk,
            disk_entries,
            total_entries,
            cd_size,
            cd_offset,
            comment,
        })
    }

    /// Locate and parse the record by scanning backwards from EOF.
    ///
    /// The record is the last structure in a well-formed archive, but a
    /// trailing comment can push it up to 64 KiB away from the end, so the
    /// scan hunts for the signature through a bounded tail window; the first
    /// candidate (from the end) whose comment length runs exactly to EOF
    /// wins.
    ///
    /// Returns the record and its absolute offset in the stream.
    pub fn find<R: Read + Seek>(reader: &mut R) -> Result<(u64, Self)> {
        let stream_len = reader.seek(SeekFrom::End(0))?;
        if stream_len < EOCD_FIXED_LEN as u64 {
            return Err(FormatError::EocdNotFound);
        }

        let window_len = stream_len.min(MAX_SEARCH_WINDOW);
        let window_start = stream_len - window_len;
        reader.seek(SeekFrom::Start(window_start))?;
        let mut window = vec![0u8; window_len as usize];
        reader.read_exact(&mut window)?;

        let signature = EOCD_SIGNATURE.to_le_bytes();
        for start in (0..=window.len() - EOCD_FIXED_LEN).rev() {
            if window[start..start + 4] != signature {
                continue;
            }
            trace!("EOCD signature candidate at tail offset {start}");
            let Ok(eocd) = Self::parse(&window, start) else {
                continue;
            };
            // The comment must run exactly to EOF, otherwise the signature
            // bytes were payload coincidence.
            if start + eocd.encoded_len() == window.len() {
                let offset = window_start + start as u64;
                debug!(
                    "Found EOCD at offset {offset}: {} entries, directory {}B at {:x}",
                    eocd.total_entries, eocd.cd_size, eocd.cd_offset
                );
                return Ok((offset, eocd));
            }
        }

        Err(FormatError::EocdNotFound)
    }

    /// Reject archives outside the 32-bit single-disk subset.
    pub fn validate(&self) -> Result<()> {
        if self.disk_number != 0 || self.cd_disk != 0 || self.disk_entries != self.total_entries {
            return Err(FormatError::MultiDisk);
        }
        if self.total_entries == u16::MAX
            || self.cd_size == u32::MAX
            || self.cd_offset == u32::MAX
        {
            return Err(FormatError::Needs64Bit);
        }
        Ok(())
    }

    /// Encode the record into the writer.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<u64> {
        writer.write_u32::<LittleEndian>(EOCD_SIGNATURE)?;
        writer.write_u16::<LittleEndian>(self.disk_number)?;
        writer.write_u16::<LittleEndian>(self.cd_disk)?;
        writer.write_u16::<LittleEndian>(self.disk_entries)?;
        writer.write_u16::<LittleEndian>(self.total_entries)?;
        writer.write_u32::<LittleEndian>(self.cd_size)?;
        writer.write_u32::<LittleEndian>(self.cd_offset)?;
        writer.write_u16::<LittleEndian>(self.comment.len() as u16)?;
        writer.write_all(&self.comment)?;
        Ok(self.encoded_len() as u64)
    }

    /// Total encoded size of this record.
    pub fn encoded_len(&self) -> usize {
        EOCD_FIXED_LEN + self.comment.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample(entries: u16) -> EndOfCentralDirectory {
        EndOfCentralDirectory {
            disk_number: 0,
            cd_disk: 0,
            disk_entries: entries,
            total_entries: entries,
            cd_size: 138,
            cd_offset: 4096,
            comment: b"demo".to_vec(),
        }
    }

    #[test]
    fn eocd_round_trip() {
        let eocd = sample(3);
        let mut buf = Vec::new();
        eocd.write_to(&mut buf).unwrap();
        assert_eq!(EndOfCentralDirectory::parse(&buf, 0).unwrap(), eocd);
    }

    #[test]
    fn find_skips_signature_bytes_in_payload() {
        let eocd = sample(2);
        let mut stream = Vec::new();
        // A payload that happens to contain the signature.
        stream.extend_from_slice(&EOCD_SIGNATURE.to_le_bytes());
        stream.extend_from_slice(&[0u8; 64]);
        let expected_offset = stream.len() as u64;
        eocd.write_to(&mut stream).unwrap();

        let (offset, found) = EndOfCentralDirectory::find(&mut Cursor::new(stream)).unwrap();
        assert_eq!(offset, expected_offset);
        assert_eq!(found, eocd);
    }

    #[test]
    fn find_fails_on_garbage() {
        let stream = vec![0x11u8; 256];
        assert!(matches!(
            EndOfCentralDirectory::find(&mut Cursor::new(stream)),
            Err(FormatError::EocdNotFound)
        ));
    }

    #[test]
    fn validate_rejects_multi_disk_and_sentinels() {
        let mut eocd = sample(1);
        eocd.disk_number = 1;
        assert!(matches!(eocd.validate(), Err(FormatError::MultiDisk)));

        let mut eocd = sample(1);
        eocd.cd_offset = u32::MAX;
        assert!(matches!(eocd.validate(), Err(FormatError::Needs64Bit)));

        assert!(sample(1).validate().is_ok());
    }
}
