//! Timezone names and local views of an instant.

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;

use crate::domain::DomainError;

/// Parse an IANA timezone name.
pub fn parse_timezone(name: &str) -> Result<Tz, DomainError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| DomainError::UnknownTimezone(name.to_string()))
}

/// `now` as seen in `tz`: the local calendar date and seconds since local
/// midnight.
pub fn local_now(now: DateTime<Utc>, tz: Tz) -> (NaiveDate, i32) {
    let local = now.with_timezone(&tz);
    (local.date_naive(), local.num_seconds_from_midnight() as i32)
}
