/// Utility functions for timestamps and formatting
use chrono::{DateTime, Offset, TimeZone};
use log::warn;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

/// Source of host wall-clock time for log rows
pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

/// The host clock in whatever UTC offset is in effect at each call,
/// so a run that spans a DST change follows it
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> OffsetDateTime {
        local_now()
    }
}

/// Current host local time
pub fn local_now() -> OffsetDateTime {
    from_chrono(&chrono::Local::now())
}

/// The host's current UTC offset
pub fn host_offset() -> UtcOffset {
    local_now().offset()
}

/// Convert a chrono timestamp to whole seconds, keeping its UTC offset
pub fn from_chrono<Tz: TimeZone>(dt: &DateTime<Tz>) -> OffsetDateTime {
    let offset_secs = dt.offset().fix().local_minus_utc();
    let offset = UtcOffset::from_whole_seconds(offset_secs).unwrap_or_else(|e| {
        warn!("Host UTC offset {}s is unusable ({}), using UTC", offset_secs, e);
        UtcOffset::UTC
    });
    let utc = OffsetDateTime::from_unix_timestamp(dt.timestamp())
        .unwrap_or_else(|_| OffsetDateTime::now_utc());
    utc.to_offset(offset)
}

/// Current UNIX time in whole seconds
pub fn unix_now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

/// Format a timestamp as YYYY-MM-DD HH:MM:SS
///
/// Falls back to the default string representation if formatting fails.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    dt.format(&format).unwrap_or_else(|_| dt.to_string())
}

/// Format the time of day as HH:MM:SS
pub fn format_time_of_day(dt: &OffsetDateTime) -> String {
    let format = format_description!("[hour]:[minute]:[second]");
    dt.format(&format).unwrap_or_else(|_| dt.to_string())
}

/// Format a date like "Mon 19 Oct 2026"
pub fn format_date(dt: &OffsetDateTime) -> String {
    let format = format_description!("[weekday repr:short] [day] [month repr:short] [year]");
    dt.format(&format).unwrap_or_else(|_| dt.to_string())
}

/// Render a UNIX timestamp in the host's offset, or the raw number if it is
/// outside the representable range
pub fn format_unix(unix_seconds: i64, offset: UtcOffset) -> String {
    match OffsetDateTime::from_unix_timestamp(unix_seconds) {
        Ok(dt) => format_datetime(&dt.to_offset(offset)),
        Err(_) => unix_seconds.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_formats() {
        let dt = datetime!(2026-10-19 07:05:09 UTC);
        assert_eq!(format_datetime(&dt), "2026-10-19 07:05:09");
        assert_eq!(format_time_of_day(&dt), "07:05:09");
        assert_eq!(format_date(&dt), "Mon 19 Oct 2026");
    }

    #[test]
    fn test_from_chrono_keeps_offset() {
        let summer = chrono::FixedOffset::east_opt(3 * 3600).unwrap();
        let winter = chrono::FixedOffset::east_opt(2 * 3600).unwrap();
        let instant = 1_792_368_000; // 2026-10-19 00:00:00 UTC

        let before = from_chrono(&summer.timestamp_opt(instant, 0).unwrap());
        let after = from_chrono(&winter.timestamp_opt(instant, 0).unwrap());

        assert_eq!(before.unix_timestamp(), instant);
        assert_eq!(after.unix_timestamp(), instant);
        assert_eq!(format_datetime(&before), "2026-10-19 03:00:00");
        assert_eq!(format_datetime(&after), "2026-10-19 02:00:00");
        assert_eq!(before.offset().whole_seconds(), 3 * 3600);
    }

    #[test]
    fn test_local_clock_matches_host() {
        let now = LocalClock.now();
        assert!((now.unix_timestamp() - unix_now()).abs() <= 1);
        assert_eq!(now.offset(), from_chrono(&chrono::Local::now()).offset());
    }

    #[test]
    fn test_format_unix_in_offset() {
        let offset = UtcOffset::from_hms(2, 0, 0).unwrap();
        assert_eq!(format_unix(0, offset), "1970-01-01 02:00:00");
        assert_eq!(format_unix(i64::MAX, offset), i64::MAX.to_string());
    }
}
