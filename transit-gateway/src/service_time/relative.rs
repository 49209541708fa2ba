//! Resolving relative dates against a local "today".

use chrono::{Datelike, Days, NaiveDate, Weekday};

use crate::domain::{DomainError, RelativeDate};

/// The calendar date a relative date names, counted from `today`.
///
/// A bare weekday is the next such day on or after `today`; the `next-`
/// forms are strictly after it.
pub fn resolve_relative_date(today: NaiveDate, relative: RelativeDate) -> NaiveDate {
    use RelativeDate::*;
    let (weekday, strictly_after) = match relative {
        Today => return today,
        Tomorrow => return today + Days::new(1),
        Monday => (Weekday::Mon, false),
        Tuesday => (Weekday::Tue, false),
        Wednesday => (Weekday::Wed, false),
        Thursday => (Weekday::Thu, false),
        Friday => (Weekday::Fri, false),
        Saturday => (Weekday::Sat, false),
        Sunday => (Weekday::Sun, false),
        NextMonday => (Weekday::Mon, true),
        NextTuesday => (Weekday::Tue, true),
        NextWednesday => (Weekday::Wed, true),
        NextThursday => (Weekday::Thu, true),
        NextFriday => (Weekday::Fri, true),
        NextSaturday => (Weekday::Sat, true),
        NextSunday => (Weekday::Sun, true),
    };
    let from = u64::from(today.weekday().num_days_from_monday());
    let to = u64::from(weekday.num_days_from_monday());
    let mut ahead = (to + 7 - from) % 7;
    if ahead == 0 && strictly_after {
        ahead = 7;
    }
    today + Days::new(ahead)
}

/// Parse the kebab-case form (`today`, `next-friday`, ...).
pub fn parse_relative_date(s: &str) -> Result<RelativeDate, DomainError> {
    let upper = s.trim().to_ascii_uppercase().replace('-', "_");
    serde_json::from_value(serde_json::Value::String(upper))
        .map_err(|_| DomainError::UnknownRelativeDate(s.to_string()))
}
