//! Wide-time handling for GTFS schedules.
//!
//! GTFS expresses stop times as "HH:MM:SS" offsets from the start of a
//! service day, and hours may run past 23 for trips that continue after
//! midnight. This module provides a value type for those offsets and the
//! conversion from (service date, offset) into an absolute instant.

use std::fmt;

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Seconds in one service day.
pub const SECONDS_PER_DAY: i32 = 24 * 60 * 60;

/// Error returned when parsing an invalid time string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// Seconds since the midnight of a service date.
///
/// Unlike a clock time this never wraps: a trip that leaves at 00:30 the
/// morning after its service date is `24:30:00`.
///
/// # Examples
///
/// ```
/// use transit_gateway::domain::WideTime;
///
/// let t = WideTime::parse("25:10:00").unwrap();
/// assert_eq!(t.seconds(), 25 * 3600 + 600);
/// assert_eq!(t.to_string(), "25:10:00");
/// ```
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WideTime {
    seconds: i32,
}

impl WideTime {
    /// Create a wide-time from a non-negative second count.
    pub fn from_seconds(seconds: i32) -> Result<Self, TimeError> {
        if seconds < 0 {
            return Err(TimeError::new("seconds must not be negative"));
        }
        Ok(Self { seconds })
    }

    /// Parse "HH:MM:SS" (or "H:MM:SS"). Hours may exceed 23.
    ///
    /// # Examples
    ///
    /// ```
    /// use transit_gateway::domain::WideTime;
    ///
    /// assert!(WideTime::parse("08:00:00").is_ok());
    /// assert!(WideTime::parse("8:00:00").is_ok());
    /// assert!(WideTime::parse("47:59:59").is_ok());
    ///
    /// assert!(WideTime::parse("08:00").is_err());
    /// assert!(WideTime::parse("08:60:00").is_err());
    /// assert!(WideTime::parse("-1:00:00").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self, TimeError> {
        let mut parts = s.split(':');
        let (Some(h), Some(m), Some(sec), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TimeError::new("expected HH:MM:SS format"));
        };

        let hour = parse_digits(h, 1, 3).ok_or_else(|| TimeError::new("invalid hour digits"))?;
        let minute =
            parse_digits(m, 2, 2).ok_or_else(|| TimeError::new("invalid minute digits"))?;
        let second =
            parse_digits(sec, 2, 2).ok_or_else(|| TimeError::new("invalid second digits"))?;
        if minute > 59 {
            return Err(TimeError::new("minute must be 0-59"));
        }
        if second > 59 {
            return Err(TimeError::new("second must be 0-59"));
        }

        Ok(Self {
            seconds: hour * 3600 + minute * 60 + second,
        })
    }

    /// Returns the second count.
    pub fn seconds(&self) -> i32 {
        self.seconds
    }

    /// Returns (hours, minutes, seconds); hours may be 24 or more.
    pub fn hms(&self) -> (i32, i32, i32) {
        (
            self.seconds / 3600,
            (self.seconds % 3600) / 60,
            self.seconds % 60,
        )
    }

    /// True when the time falls on the following calendar day.
    pub fn is_after_midnight(&self) -> bool {
        self.seconds >= SECONDS_PER_DAY
    }

    /// Shift by a signed number of seconds. Returns `None` if the result
    /// would be negative.
    pub fn checked_add_seconds(&self, delta: i32) -> Option<Self> {
        let seconds = self.seconds.checked_add(delta)?;
        (seconds >= 0).then_some(Self { seconds })
    }

    /// Resolve this offset on a service date into an instant.
    ///
    /// The offset is counted from local midnight of `date` in `tz`.
    pub fn on_service_date(&self, date: NaiveDate, tz: Tz) -> Option<DateTime<Tz>> {
        service_midnight(date, tz)
            .map(|midnight| midnight + Duration::seconds(i64::from(self.seconds)))
    }
}

/// The instant at which a service date begins in the given timezone.
///
/// When midnight itself is skipped by a DST transition the GTFS rule
/// ("noon minus twelve hours") is used instead.
pub fn service_midnight(date: NaiveDate, tz: Tz) -> Option<DateTime<Tz>> {
    let midnight = NaiveTime::from_hms_opt(0, 0, 0)?;
    match tz.from_local_datetime(&date.and_time(midnight)) {
        LocalResult::Single(t) => Some(t),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => {
            let noon = NaiveTime::from_hms_opt(12, 0, 0)?;
            tz.from_local_datetime(&date.and_time(noon))
                .earliest()
                .map(|t| t - Duration::hours(12))
        }
    }
}

fn parse_digits(s: &str, min_len: usize, max_len: usize) -> Option<i32> {
    if s.len() < min_len || s.len() > max_len || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl fmt::Display for WideTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (h, m, s) = self.hms();
        write!(f, "{:02}:{:02}:{:02}", h, m, s)
    }
}

impl fmt::Debug for WideTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WideTime({})", self)
    }
}

impl Serialize for WideTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WideTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        WideTime::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parse_valid_times() {
        assert_eq!(WideTime::parse("00:00:00").unwrap().seconds(), 0);
        assert_eq!(WideTime::parse("16:00:00").unwrap().seconds(), 57600);
        assert_eq!(WideTime::parse("24:14:00").unwrap().seconds(), 87240);
        assert_eq!(WideTime::parse("7:05:09").unwrap().seconds(), 25509);
        assert_eq!(WideTime::parse("100:00:00").unwrap().seconds(), 360000);
    }

    #[test]
    fn parse_invalid_times() {
        assert!(WideTime::parse("").is_err());
        assert!(WideTime::parse("12:00").is_err());
        assert!(WideTime::parse("12:00:00:00").is_err());
        assert!(WideTime::parse("ab:00:00").is_err());
        assert!(WideTime::parse("12:5:00").is_err());
        assert!(WideTime::parse("12:00:60").is_err());
        assert!(WideTime::parse("1000:00:00").is_err());
    }

    #[test]
    fn display_pads_and_keeps_wide_hours() {
        assert_eq!(WideTime::from_seconds(0).unwrap().to_string(), "00:00:00");
        assert_eq!(WideTime::from_seconds(3661).unwrap().to_string(), "01:01:01");
        assert_eq!(
            WideTime::from_seconds(24 * 3600 + 47 * 60).unwrap().to_string(),
            "24:47:00"
        );
    }

    #[test]
    fn negative_seconds_rejected() {
        assert!(WideTime::from_seconds(-1).is_err());
        let t = WideTime::from_seconds(10).unwrap();
        assert_eq!(t.checked_add_seconds(-10).map(|t| t.seconds()), Some(0));
        assert_eq!(t.checked_add_seconds(-11), None);
    }

    #[test]
    fn ordering_follows_seconds() {
        let a = WideTime::parse("23:59:59").unwrap();
        let b = WideTime::parse("24:00:00").unwrap();
        assert!(a < b);
        assert!(!a.is_after_midnight());
        assert!(b.is_after_midnight());
    }

    #[test]
    fn serde_uses_clock_format() {
        let t = WideTime::parse("25:00:01").unwrap();
        let json = serde_json::to_string(&t).unwrap();
        assert_eq!(json, "\"25:00:01\"");
        let back: WideTime = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn on_service_date_in_pacific_time() {
        let tz: Tz = "America/Los_Angeles".parse().unwrap();
        // 2018-05-30 is PDT (UTC-7)
        let t = WideTime::parse("16:00:00").unwrap();
        let local = t.on_service_date(date(2018, 5, 30), tz).unwrap();
        assert_eq!(
            local.with_timezone(&chrono::Utc).to_rfc3339(),
            "2018-05-30T23:00:00+00:00"
        );
    }

    #[test]
    fn on_service_date_past_midnight() {
        let tz: Tz = "America/Los_Angeles".parse().unwrap();
        let t = WideTime::parse("24:14:00").unwrap();
        let local = t.on_service_date(date(2018, 5, 30), tz).unwrap();
        assert_eq!(local.date_naive(), date(2018, 5, 31));
        assert_eq!(local.format("%H:%M").to_string(), "00:14");
    }

    #[test]
    fn service_midnight_on_dst_change() {
        let tz: Tz = "America/New_York".parse().unwrap();
        // Spring forward happens at 02:00, midnight still exists.
        let m = service_midnight(date(2024, 3, 10), tz).unwrap();
        assert_eq!(m.format("%H:%M").to_string(), "00:00");
        // Five hours later the local clock reads 06:00, not 05:00.
        let t = WideTime::parse("05:00:00").unwrap();
        let local = t.on_service_date(date(2024, 3, 10), tz).unwrap();
        assert_eq!(local.format("%H:%M").to_string(), "06:00");
    }
}
