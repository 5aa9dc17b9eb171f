//! Packed FAT directory-entry timestamps
//!
//! ```text
//! date: bits 15-9 year - 1980 | bits 8-5 month | bits 4-0 day
//! time: bits 15-11 hour       | bits 10-5 minute | bits 4-0 second / 2
//! ```

use chrono::{Datelike, NaiveDateTime, Timelike};
use std::fmt;

const FAT_EPOCH_YEAR: u16 = 1980;
const FAT_MAX_YEAR: u16 = FAT_EPOCH_YEAR + 0x7F;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatTimestamp {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl FatTimestamp {
    /// Decode a packed date/time pair. Returns `None` when any field is out
    /// of range (e.g. month 0 on an entry that was never stamped).
    pub fn decode(date: u16, time: u16) -> Option<Self> {
        let ts = Self {
            year: FAT_EPOCH_YEAR + (date >> 9),
            month: ((date >> 5) & 0x0F) as u8,
            day: (date & 0x1F) as u8,
            hour: (time >> 11) as u8,
            minute: ((time >> 5) & 0x3F) as u8,
            second: ((time & 0x1F) * 2) as u8,
        };

        let valid = (1..=12).contains(&ts.month)
            && (1..=31).contains(&ts.day)
            && ts.hour < 24
            && ts.minute < 60
            && ts.second < 60;
        valid.then_some(ts)
    }

    /// Pack into `(date, time)`. Seconds lose their lowest bit. Years are
    /// clamped to 1980..=2107 and every field is masked to its bit width.
    pub fn encode(&self) -> (u16, u16) {
        let year = self.year.clamp(FAT_EPOCH_YEAR, FAT_MAX_YEAR) - FAT_EPOCH_YEAR;
        let date = (year << 9) | ((self.month as u16 & 0x0F) << 5) | (self.day as u16 & 0x1F);
        let time = ((self.hour as u16 & 0x1F) << 11)
            | ((self.minute as u16 & 0x3F) << 5)
            | ((self.second as u16 / 2) & 0x1F);
        (date, time)
    }

    /// Convert a wall-clock time. Years the 7-bit field cannot hold yield `None`.
    pub fn from_datetime(dt: &NaiveDateTime) -> Option<Self> {
        let year = u16::try_from(dt.year()).ok()?;
        if !(FAT_EPOCH_YEAR..=FAT_MAX_YEAR).contains(&year) {
            return None;
        }
        Some(Self {
            year,
            month: dt.month() as u8,
            day: dt.day() as u8,
            hour: dt.hour() as u8,
            minute: dt.minute() as u8,
            second: (dt.second() as u8) & !1,
        })
    }
}

impl fmt::Display for FatTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}
