//! MS-DOS packed timestamps
//!
//! Date: bits 15-9 year since 1980, 8-5 month, 4-0 day.
//! Time: bits 15-11 hour, 10-5 minute, 4-0 seconds / 2.

use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time};

/// 1980-01-01 00:00:00, the earliest representable DOS timestamp
pub const DOS_EPOCH: DosDateTime = DosDateTime {
    date: (1 << 5) | 1,
    time: 0,
};

/// Packed DOS date and time, as stored in local and central headers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DosDateTime {
    pub date: u16,
    pub time: u16,
}

impl Default for DosDateTime {
    fn default() -> Self {
        DOS_EPOCH
    }
}

impl DosDateTime {
    pub fn new(date: u16, time: u16) -> Self {
        Self { date, time }
    }

    /// Build from the 32-bit header field (time in the low half)
    pub fn from_raw(raw: u32) -> Self {
        Self {
            date: (raw >> 16) as u16,
            time: raw as u16,
        }
    }

    pub fn to_raw(self) -> u32 {
        ((self.date as u32) << 16) | self.time as u32
    }

    /// Current time (UTC)
    pub fn now() -> Self {
        let now = OffsetDateTime::now_utc();
        Self::from_datetime(PrimitiveDateTime::new(now.date(), now.time()))
    }

    /// Pack a calendar time, clamped to 1980..=2107 and truncated to 2 seconds
    pub fn from_datetime(dt: PrimitiveDateTime) -> Self {
        let year = dt.year();
        if year < 1980 {
            return DOS_EPOCH;
        }
        if year > 2107 {
            return Self {
                date: (127 << 9) | (12 << 5) | 31,
                time: (23 << 11) | (59 << 5) | 29,
            };
        }

        let date = (((year - 1980) as u16) << 9) | ((dt.month() as u16) << 5) | dt.day() as u16;
        let time = ((dt.hour() as u16) << 11) | ((dt.minute() as u16) << 5) | (dt.second() as u16 / 2);
        Self { date, time }
    }

    /// Unpack into a calendar time. `None` for out-of-range fields.
    pub fn to_datetime(self) -> Option<PrimitiveDateTime> {
        let year = ((self.date >> 9) & 0x7f) as i32 + 1980;
        let month = Month::try_from(((self.date >> 5) & 0x0f) as u8).ok()?;
        let day = (self.date & 0x1f) as u8;
        let hour = ((self.time >> 11) & 0x1f) as u8;
        let minute = ((self.time >> 5) & 0x3f) as u8;
        let second = ((self.time & 0x1f) * 2) as u8;

        Some(PrimitiveDateTime::new(
            Date::from_calendar_date(year, month, day).ok()?,
            Time::from_hms(hour, minute, second).ok()?,
        ))
    }

    /// Seconds since the Unix epoch, treating the stamp as UTC
    pub fn to_unix_seconds(self) -> Option<i64> {
        self.to_datetime().map(|dt| dt.assume_utc().unix_timestamp())
    }
}
