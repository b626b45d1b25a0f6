//! COSEM date-time recognition
//!
//! DLMS transports date-times either as the dedicated `date-time` data type
//! or, far more often, as a plain 12-byte octet string. [`CosemDateTime::recognize`]
//! decides whether 12 bytes plausibly are a date-time: every field must lie
//! in its natural range or carry its "not specified" sentinel.

use serde::Serialize;
use std::fmt;

/// Deviation value meaning "not specified"
pub const DEVIATION_NOT_SPECIFIED: i16 = i16::MIN;

/// Clock status flags for COSEM DateTime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClockStatus {
    InvalidValue = 0x01,
    DoubtfulValue = 0x02,
    DifferentClockBase = 0x04,
    InvalidClockStatus = 0x08,
    DaylightSavingActive = 0x80,
}

impl ClockStatus {
    const ALL: [ClockStatus; 5] = [
        ClockStatus::InvalidValue,
        ClockStatus::DoubtfulValue,
        ClockStatus::DifferentClockBase,
        ClockStatus::InvalidClockStatus,
        ClockStatus::DaylightSavingActive,
    ];

    /// Parse clock status from a byte
    pub fn from_byte(byte: u8) -> Vec<ClockStatus> {
        Self::ALL
            .into_iter()
            .filter(|status| byte & *status as u8 != 0)
            .collect()
    }

    pub fn name(self) -> &'static str {
        match self {
            ClockStatus::InvalidValue => "invalid value",
            ClockStatus::DoubtfulValue => "doubtful value",
            ClockStatus::DifferentClockBase => "different clock base",
            ClockStatus::InvalidClockStatus => "invalid clock status",
            ClockStatus::DaylightSavingActive => "daylight saving active",
        }
    }
}

/// A recognized COSEM date-time
///
/// Fields keep their raw wire values so that sentinels (0xFF "not
/// specified", 0xFD/0xFE "last/second last day") survive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CosemDateTime {
    pub year: u16,
    pub month: u8,
    pub day_of_month: u8,
    pub day_of_week: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub hundredths: u8,
    pub deviation: i16,
    pub clock_status: u8,
}

impl CosemDateTime {
    pub const LENGTH: usize = 12;

    /// Interpret `bytes` as a date-time if every field is in range
    ///
    /// Returns `None` when the length is not 12 or any field is neither a
    /// valid value nor a sentinel. Never fails otherwise.
    pub fn recognize(bytes: &[u8]) -> Option<Self> {
        let b: &[u8; Self::LENGTH] = bytes.try_into().ok()?;

        let month = b[2];
        if month < 1 || (month > 12 && month < 0xFD) {
            return None;
        }
        let day_of_month = b[3];
        if day_of_month < 1 || (day_of_month > 31 && day_of_month < 0xFD) {
            return None;
        }
        let day_of_week = b[4];
        if day_of_week < 1 || (day_of_week > 7 && day_of_week < 0xFF) {
            return None;
        }
        let (hour, minute, second, hundredths) = (b[5], b[6], b[7], b[8]);
        if !in_range_or_unspecified(hour, 23)
            || !in_range_or_unspecified(minute, 59)
            || !in_range_or_unspecified(second, 59)
            || !in_range_or_unspecified(hundredths, 99)
        {
            return None;
        }

        Some(Self {
            year: u16::from_be_bytes([b[0], b[1]]),
            month,
            day_of_month,
            day_of_week,
            hour,
            minute,
            second,
            hundredths,
            deviation: i16::from_be_bytes([b[9], b[10]]),
            clock_status: b[11],
        })
    }

    pub fn deviation_specified(&self) -> bool {
        self.deviation != DEVIATION_NOT_SPECIFIED
    }

    /// Clock status flags; empty when the status byte is 0xFF (not specified)
    pub fn clock_status_flags(&self) -> Vec<ClockStatus> {
        if self.clock_status == 0xFF {
            Vec::new()
        } else {
            ClockStatus::from_byte(self.clock_status)
        }
    }
}

fn in_range_or_unspecified(value: u8, max: u8) -> bool {
    value <= max || value == 0xFF
}

/// `2021/06/15 12:30:00.00`; out-of-range (sentinel) fields print as hex
impl fmt::Display for CosemDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.year < 0xFFFF {
            write!(f, "{}", self.year)?;
        } else {
            write!(f, "{:X}", self.year)?;
        }
        write_part(f, "/", self.month, 13)?;
        write_part(f, "/", self.day_of_month, 32)?;
        write_part(f, " ", self.hour, 24)?;
        write_part(f, ":", self.minute, 60)?;
        write_part(f, ":", self.second, 60)?;
        write_part(f, ".", self.hundredths, 100)
    }
}

fn write_part(f: &mut fmt::Formatter<'_>, sep: &str, value: u8, limit: u8) -> fmt::Result {
    if value < limit {
        write!(f, "{}{:02}", sep, value)
    } else {
        write!(f, "{}{:02X}", sep, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JUNE_15: [u8; 12] = [
        0x07, 0xE5, 0x06, 0x0F, 0x03, 0x0C, 0x1E, 0x00, 0x00, 0xFF, 0xFF, 0x80,
    ];

    #[test]
    fn test_recognize_valid() {
        let dt = CosemDateTime::recognize(&JUNE_15).unwrap();
        assert_eq!(dt.year, 2021);
        assert_eq!(dt.month, 6);
        assert_eq!(dt.day_of_month, 15);
        assert_eq!(dt.day_of_week, 3);
        assert_eq!(dt.hour, 12);
        assert_eq!(dt.minute, 30);
        assert_eq!(dt.deviation, -1);
        assert_eq!(dt.clock_status_flags(), vec![ClockStatus::DaylightSavingActive]);
        assert_eq!(dt.to_string(), "2021/06/15 12:30:00.00");
    }

    #[test]
    fn test_reject_month_13() {
        let mut bytes = JUNE_15;
        bytes[2] = 0x0D;
        assert!(CosemDateTime::recognize(&bytes).is_none());
    }

    #[test]
    fn test_sentinels_accepted_and_hex_printed() {
        let bytes = [
            0xFF, 0xFF, 0xFF, 0xFE, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x80, 0x00, 0xFF,
        ];
        let dt = CosemDateTime::recognize(&bytes).unwrap();
        assert!(!dt.deviation_specified());
        assert!(dt.clock_status_flags().is_empty());
        assert_eq!(dt.to_string(), "FFFF/FF/FE FF:FF:FF.FF");
    }

    #[test]
    fn test_reject_wrong_length_and_ranges() {
        assert!(CosemDateTime::recognize(&JUNE_15[..11]).is_none());

        let mut bytes = JUNE_15;
        bytes[4] = 0; // day of week
        assert!(CosemDateTime::recognize(&bytes).is_none());

        let mut bytes = JUNE_15;
        bytes[5] = 24; // hour
        assert!(CosemDateTime::recognize(&bytes).is_none());

        let mut bytes = JUNE_15;
        bytes[8] = 100; // hundredths
        assert!(CosemDateTime::recognize(&bytes).is_none());
    }
}
