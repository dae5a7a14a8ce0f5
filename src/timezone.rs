/// UTC offsets in the device's native quarter-hour units
use log::warn;
use std::fmt;
use std::str::FromStr;

use crate::error::TimezoneParseError;

pub const MINUTES_PER_QUARTER_HOUR: i32 = 15;

/// Signed count of 15-minute units east of UTC, as stored by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimezoneOffset(i8);

impl TimezoneOffset {
    pub const UTC: TimezoneOffset = TimezoneOffset(0);

    pub const fn from_quarter_hours(quarter_hours: i8) -> Self {
        TimezoneOffset(quarter_hours)
    }

    pub const fn quarter_hours(self) -> i8 {
        self.0
    }

    pub fn total_minutes(self) -> i32 {
        i32::from(self.0) * MINUTES_PER_QUARTER_HOUR
    }

    pub fn total_seconds(self) -> i64 {
        i64::from(self.total_minutes()) * 60
    }

    /// Quantize a host UTC offset in seconds, rounding toward negative infinity
    pub fn from_utc_offset_seconds(seconds: i32) -> Result<Self, TimezoneParseError> {
        let quarter_hours = seconds.div_euclid(MINUTES_PER_QUARTER_HOUR * 60);
        i8::try_from(quarter_hours)
            .map(TimezoneOffset)
            .map_err(|_| TimezoneParseError::OutOfRange(quarter_hours))
    }

    /// Parse `±H`, `±H:MM` or the same prefixed with `UTC`.
    ///
    /// Returns the offset together with the minutes dropped to reach a
    /// quarter-hour boundary. A negative hour component drags the minutes
    /// negative with it, so `-4:30` is four and a half hours west of UTC.
    /// Leftover minutes truncate toward zero.
    pub fn parse_with_remainder(s: &str) -> Result<(Self, i32), TimezoneParseError> {
        let s = s.trim();
        let s = s.strip_prefix("UTC").unwrap_or(s).trim();
        if s.is_empty() {
            return Err(TimezoneParseError::Empty);
        }

        let malformed = || TimezoneParseError::Malformed(s.to_string());
        let negative = s.starts_with('-');

        let total_minutes = match s.split_once(':') {
            Some((hours, minutes)) => {
                let hours: i32 = hours.parse().map_err(|_| malformed())?;
                if !minutes.chars().all(|c| c.is_ascii_digit()) || minutes.is_empty() {
                    return Err(malformed());
                }
                let minutes: i32 = minutes.parse().map_err(|_| malformed())?;
                if minutes >= 60 {
                    return Err(TimezoneParseError::MinutesOutOfRange(minutes));
                }
                let minutes = if negative { -minutes } else { minutes };
                hours
                    .checked_mul(60)
                    .and_then(|total| total.checked_add(minutes))
                    .ok_or_else(malformed)?
            }
            None => {
                let hours: i32 = s.parse().map_err(|_| malformed())?;
                hours.checked_mul(60).ok_or_else(malformed)?
            }
        };

        let quarter_hours = total_minutes / MINUTES_PER_QUARTER_HOUR;
        let remainder = total_minutes % MINUTES_PER_QUARTER_HOUR;
        let quarter_hours = i8::try_from(quarter_hours)
            .map_err(|_| TimezoneParseError::OutOfRange(quarter_hours))?;

        Ok((TimezoneOffset(quarter_hours), remainder))
    }
}

impl FromStr for TimezoneOffset {
    type Err = TimezoneParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (offset, remainder) = Self::parse_with_remainder(s)?;
        if remainder != 0 {
            warn!(
                "{} is not a multiple of 15 minutes, rounding to {}",
                s.trim(),
                offset
            );
        }
        Ok(offset)
    }
}

impl fmt::Display for TimezoneOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_minutes = self.total_minutes();
        let sign = if total_minutes >= 0 { '+' } else { '-' };
        let hours = total_minutes.abs() / 60;
        let minutes = total_minutes.abs() % 60;
        if minutes == 0 {
            write!(f, "UTC{}{}", sign, hours)
        } else {
            write!(f, "UTC{}{}:{:02}", sign, hours, minutes)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> i8 {
        s.parse::<TimezoneOffset>().unwrap().quarter_hours()
    }

    #[test]
    fn test_format() {
        assert_eq!(TimezoneOffset::from_quarter_hours(0).to_string(), "UTC+0");
        assert_eq!(TimezoneOffset::from_quarter_hours(20).to_string(), "UTC+5");
        assert_eq!(TimezoneOffset::from_quarter_hours(23).to_string(), "UTC+5:45");
        assert_eq!(TimezoneOffset::from_quarter_hours(-18).to_string(), "UTC-4:30");
        assert_eq!(TimezoneOffset::from_quarter_hours(-2).to_string(), "UTC-0:30");
        assert_eq!(TimezoneOffset::from_quarter_hours(-128).to_string(), "UTC-32");
        assert_eq!(TimezoneOffset::from_quarter_hours(127).to_string(), "UTC+31:45");
    }

    #[test]
    fn test_parse_whole_hours() {
        assert_eq!(parse("+5"), 20);
        assert_eq!(parse("5"), 20);
        assert_eq!(parse("-8"), -32);
        assert_eq!(parse(" +0 "), 0);
    }

    #[test]
    fn test_negative_hours_carry_sign_to_minutes() {
        assert_eq!(parse("-4:30"), -18);
        assert_eq!(parse("+5:45"), 23);
        assert_eq!(parse("-0:30"), -2);
    }

    #[test]
    fn test_uneven_minutes_truncate_toward_zero() {
        assert_eq!(
            TimezoneOffset::parse_with_remainder("+5:07").unwrap(),
            (TimezoneOffset::from_quarter_hours(20), 7)
        );
        assert_eq!(parse("+5:07"), 20);
        assert_eq!(
            TimezoneOffset::parse_with_remainder("-4:07").unwrap(),
            (TimezoneOffset::from_quarter_hours(-16), -7)
        );
    }

    #[test]
    fn test_round_trip_full_range() {
        for q in i8::MIN..=i8::MAX {
            let offset = TimezoneOffset::from_quarter_hours(q);
            assert_eq!(offset.to_string().parse::<TimezoneOffset>(), Ok(offset), "q={}", q);
        }
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!("".parse::<TimezoneOffset>(), Err(TimezoneParseError::Empty));
        assert_eq!("UTC".parse::<TimezoneOffset>(), Err(TimezoneParseError::Empty));
        assert!(matches!(
            "five".parse::<TimezoneOffset>(),
            Err(TimezoneParseError::Malformed(_))
        ));
        assert!(matches!(
            "+5:-30".parse::<TimezoneOffset>(),
            Err(TimezoneParseError::Malformed(_))
        ));
        assert_eq!(
            "+5:75".parse::<TimezoneOffset>(),
            Err(TimezoneParseError::MinutesOutOfRange(75))
        );
        assert_eq!(
            "+40".parse::<TimezoneOffset>(),
            Err(TimezoneParseError::OutOfRange(160))
        );
    }

    #[test]
    fn test_parse_rejects_hour_overflow() {
        for s in ["+71582789:00", "-71582789:30", "+71582789", "2147483647:59"] {
            assert!(
                matches!(s.parse::<TimezoneOffset>(), Err(TimezoneParseError::Malformed(_))),
                "{} should be rejected",
                s
            );
        }
    }

    #[test]
    fn test_from_host_offset_floors() {
        assert_eq!(
            TimezoneOffset::from_utc_offset_seconds(19_800),
            Ok(TimezoneOffset::from_quarter_hours(22))
        );
        assert_eq!(
            TimezoneOffset::from_utc_offset_seconds(-12_600),
            Ok(TimezoneOffset::from_quarter_hours(-14))
        );
        assert_eq!(
            TimezoneOffset::from_utc_offset_seconds(-60),
            Ok(TimezoneOffset::from_quarter_hours(-1))
        );
    }
}
