//! Wall-clock time derived from unix seconds

use core::fmt::{self, Write as FmtWrite};

use heapless::String;
use jiff::Timestamp;
use jiff::civil::DateTime;
use jiff::tz::Offset;

/// Anything earlier than 2024-01-01 means the clock was never set
pub const MIN_PLAUSIBLE_UNIX: u64 = 1_704_067_200;

const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockError {
    /// Timestamp or offset outside the representable range
    OutOfRange,
    /// Clock was never synchronized
    Unset,
}

impl fmt::Display for ClockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockError::OutOfRange => write!(f, "time out of range"),
            ClockError::Unset => write!(f, "clock not set"),
        }
    }
}

impl From<jiff::Error> for ClockError {
    fn from(_: jiff::Error) -> Self {
        ClockError::OutOfRange
    }
}

/// Local civil time at a fixed UTC offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallClock {
    unix: u64,
    local: DateTime,
}

impl WallClock {
    pub fn from_unix(unix: u64, utc_offset_secs: i32) -> Result<Self, ClockError> {
        if unix < MIN_PLAUSIBLE_UNIX {
            return Err(ClockError::Unset);
        }
        let seconds = i64::try_from(unix).map_err(|_| ClockError::OutOfRange)?;
        let ts = Timestamp::from_second(seconds)?;
        let offset = Offset::from_seconds(utc_offset_secs)?;
        Ok(Self {
            unix,
            local: offset.to_datetime(ts),
        })
    }

    pub fn unix(&self) -> u64 {
        self.unix
    }

    pub fn hour(&self) -> u8 {
        self.local.hour() as u8
    }

    pub fn minute(&self) -> u8 {
        self.local.minute() as u8
    }

    /// Minutes since local midnight, 0..1440
    pub fn minute_of_day(&self) -> u16 {
        self.hour() as u16 * 60 + self.minute() as u16
    }

    /// Zero-based day of the year
    pub fn day_of_year(&self) -> u16 {
        (self.local.day_of_year() - 1) as u16
    }

    /// Between 06:00 and noon
    pub fn is_morning(&self) -> bool {
        (6..12).contains(&self.hour())
    }

    /// "HH:MM"
    pub fn time_text(&self) -> String<8> {
        let mut s = String::new();
        let _ = write!(s, "{:02}:{:02}", self.hour(), self.minute());
        s
    }

    /// "Sat, 17 Oct 2026"
    pub fn date_text(&self) -> String<24> {
        let mut s = String::new();
        let weekday = self.local.weekday().to_sunday_zero_offset() as usize;
        let month = (self.local.month() - 1) as usize;
        let _ = write!(
            s,
            "{}, {:02} {} {}",
            WEEKDAYS[weekday % 7],
            self.local.day(),
            MONTHS[month % 12],
            self.local.year()
        );
        s
    }
}
