//! MS-DOS date/time words carried by local headers and directory records

/// An MS-DOS timestamp: two 16-bit words with 2-second resolution.
///
/// Date word: bits 15-9 year since 1980, 8-5 month, 4-0 day.
/// Time word: bits 15-11 hour, 10-5 minute, 4-0 seconds/2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DosDateTime {
    pub date: u16,
    pub time: u16,
}

impl DosDateTime {
    /// Build from calendar fields, clamping to the representable range
    /// (1980-2107, seconds truncated to even).
    pub fn from_parts(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        let year = year.clamp(1980, 2107) - 1980;
        let month = u16::from(month.clamp(1, 12));
        let day = u16::from(day.clamp(1, 31));
        let hour = u16::from(hour.min(23));
        let minute = u16::from(minute.min(59));
        let second = u16::from(second.min(59)) / 2;
        Self {
            date: (year << 9) | (month << 5) | day,
            time: (hour << 11) | (minute << 5) | second,
        }
    }

    pub fn year(self) -> u16 {
        1980 + (self.date >> 9)
    }

    pub fn month(self) -> u8 {
        ((self.date >> 5) & 0x0F) as u8
    }

    pub fn day(self) -> u8 {
        (self.date & 0x1F) as u8
    }

    pub fn hour(self) -> u8 {
        (self.time >> 11) as u8
    }

    pub fn minute(self) -> u8 {
        ((self.time >> 5) & 0x3F) as u8
    }

    pub fn second(self) -> u8 {
        ((self.time & 0x1F) * 2) as u8
    }
}

impl Default for DosDateTime {
    /// The DOS epoch, 1980-01-01 00:00:00.
    fn default() -> Self {
        Self::from_parts(1980, 1, 1, 0, 0, 0)
    }
}
