//! Validated value types carried inside request and reply payloads.
//!
//! Days and clock times travel as ASCII digits, not small integers. These
//! types own the conversion so callers never handle raw digit bytes.

use std::fmt;
use std::str::FromStr;

use super::constants::{LAST_MINUTE, MINUTES_PER_DAY};
use super::error::CodecError;

/// Day of the week, encoded on the wire as a single ASCII digit.
///
/// `'0'` is Monday and `'6'` is Sunday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Day {
    /// `'0'`
    Monday = b'0',
    /// `'1'`
    Tuesday = b'1',
    /// `'2'`
    Wednesday = b'2',
    /// `'3'`
    Thursday = b'3',
    /// `'4'`
    Friday = b'4',
    /// `'5'`
    Saturday = b'5',
    /// `'6'`
    Sunday = b'6',
}

impl Day {
    /// Every day of the week, Monday first.
    pub const ALL: [Day; 7] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
        Day::Sunday,
    ];

    /// Convert an ordinal (0 = Monday) into a day.
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(usize::from(index)).copied()
    }

    /// Parse the wire byte.
    pub fn from_ascii(byte: u8) -> Result<Self, CodecError> {
        match byte {
            b'0'..=b'6' => Ok(Self::ALL[usize::from(byte - b'0')]),
            other => Err(CodecError::InvalidDay(other)),
        }
    }

    /// The wire byte for this day.
    pub fn to_ascii(self) -> u8 {
        self as u8
    }

    /// Ordinal index (0 = Monday).
    pub fn index(self) -> u8 {
        self as u8 - b'0'
    }

    /// English name of the day.
    pub fn name(self) -> &'static str {
        match self {
            Day::Monday => "Monday",
            Day::Tuesday => "Tuesday",
            Day::Wednesday => "Wednesday",
            Day::Thursday => "Thursday",
            Day::Friday => "Friday",
            Day::Saturday => "Saturday",
            Day::Sunday => "Sunday",
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Clock time as four ASCII digits, `"HHMM"`.
///
/// Valid values are `"0000"` through `"2359"`, plus `"2400"` which servers
/// use to mark the end of the day in availability replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HourMinutes([u8; 4]);

impl HourMinutes {
    /// Midnight, `"0000"`.
    pub const MIDNIGHT: Self = Self(*b"0000");

    /// End-of-day marker, `"2400"`.
    pub const END_OF_DAY: Self = Self(*b"2400");

    /// Convert a minute count since midnight.
    ///
    /// Accepts `0..=1440`; 1440 maps to [`HourMinutes::END_OF_DAY`].
    pub fn from_minutes(minutes: u32) -> Result<Self, CodecError> {
        if minutes > MINUTES_PER_DAY {
            return Err(CodecError::InvalidTime(minutes));
        }
        let hours = minutes / 60;
        let mins = minutes % 60;
        Ok(Self([
            ascii_digit(hours / 10),
            ascii_digit(hours % 10),
            ascii_digit(mins / 10),
            ascii_digit(mins % 10),
        ]))
    }

    /// Build from raw ASCII digits, validating the clock range.
    pub fn from_ascii(bytes: [u8; 4]) -> Result<Self, CodecError> {
        let invalid = || CodecError::InvalidClock(String::from_utf8_lossy(&bytes).into_owned());
        if !bytes.iter().all(u8::is_ascii_digit) {
            return Err(invalid());
        }
        let hm = Self(bytes);
        let (hours, mins) = (hm.hours(), hm.minutes());
        let in_day = hours < 24 && mins < 60;
        if in_day || hm == Self::END_OF_DAY {
            Ok(hm)
        } else {
            Err(invalid())
        }
    }

    /// Minutes since midnight.
    pub fn to_minutes(self) -> u32 {
        self.hours() * 60 + self.minutes()
    }

    /// Hour component.
    pub fn hours(self) -> u32 {
        digit_value(self.0[0]) * 10 + digit_value(self.0[1])
    }

    /// Minute component.
    pub fn minutes(self) -> u32 {
        digit_value(self.0[2]) * 10 + digit_value(self.0[3])
    }

    /// The raw wire bytes.
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// True for times inside the day (not the end-of-day marker).
    pub fn is_within_day(self) -> bool {
        self.to_minutes() <= LAST_MINUTE
    }
}

impl FromStr for HourMinutes {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes: [u8; 4] = s
            .as_bytes()
            .try_into()
            .map_err(|_| CodecError::InvalidClock(s.to_owned()))?;
        Self::from_ascii(bytes)
    }
}

impl fmt::Display for HourMinutes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Always ASCII digits once constructed.
        for &b in &self.0 {
            fmt::Write::write_char(f, char::from(b))?;
        }
        Ok(())
    }
}

fn ascii_digit(value: u32) -> u8 {
    // value is always a single decimal digit here
    b'0' + (value % 10) as u8
}

fn digit_value(byte: u8) -> u32 {
    u32::from(byte - b'0')
}

/// A free (or booked) interval within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeSlot {
    /// Start of the interval.
    pub start: HourMinutes,
    /// End of the interval.
    pub end: HourMinutes,
}

impl TimeSlot {
    /// Create a new time slot.
    pub fn new(start: HourMinutes, end: HourMinutes) -> Self {
        Self { start, end }
    }

    /// Length of the slot in minutes (zero if the slot is inverted).
    pub fn duration_minutes(&self) -> u32 {
        self.end.to_minutes().saturating_sub(self.start.to_minutes())
    }
}

/// Time slots reported for a single day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Availability {
    /// The day these slots belong to.
    pub day: Day,
    /// Slots in server order.
    pub time_slots: Vec<TimeSlot>,
}
