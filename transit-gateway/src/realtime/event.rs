//! Arrival and departure events for a stop time.

use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use gtfs_realtime::trip_update::StopTimeEvent as GtfsEvent;

use crate::domain::{StopTimeEvent, WideTime, service_midnight};

/// Build one side (arrival or departure) of a stop time.
///
/// The scheduled time is always reported, in the stop's zone on the
/// service date when one is known. The estimate comes from the realtime
/// event's absolute time if it has one, else from its delay, else from a
/// delay propagated from an earlier stop.
pub fn build_stop_time_event(
    tz: Tz,
    service_date: Option<NaiveDate>,
    scheduled: Option<WideTime>,
    rt: Option<&GtfsEvent>,
    last_delay: Option<i32>,
) -> StopTimeEvent {
    let mut event = StopTimeEvent {
        stop_timezone: tz.name().to_string(),
        scheduled,
        ..Default::default()
    };

    let scheduled_at = match (scheduled, service_date) {
        (Some(t), Some(date)) => t.on_service_date(date, tz),
        _ => None,
    };
    if let Some(at) = scheduled_at {
        event.scheduled_utc = Some(at.with_timezone(&Utc));
        event.scheduled_unix = Some(at.timestamp());
        event.scheduled_local = Some(at.fixed_offset());
    }

    let absolute = rt
        .and_then(|e| e.time)
        .and_then(|t| DateTime::from_timestamp(t, 0));
    let delay = rt.and_then(|e| e.delay);

    if let Some(at) = absolute {
        event.estimated_utc = Some(at);
        event.estimated_unix = Some(at.timestamp());
        event.estimated_local = Some(at.with_timezone(&tz).fixed_offset());
        event.time_utc = Some(at);
        event.estimated = wide_time_of(at, service_date, tz);
    } else if let Some(shift) = delay.or(last_delay) {
        event.estimated = scheduled.and_then(|t| t.checked_add_seconds(shift));
        if let Some(at) = scheduled_at {
            let shifted = at + Duration::seconds(i64::from(shift));
            event.estimated_utc = Some(shifted.with_timezone(&Utc));
            event.estimated_unix = Some(shifted.timestamp());
            event.estimated_local = Some(shifted.fixed_offset());
        }
    }

    event.delay = delay;
    event.uncertainty = rt.and_then(|e| e.uncertainty);
    event
}

/// Seconds since service-date midnight for an instant, or local time of
/// day when the service date is unknown.
pub fn wide_time_of(at: DateTime<Utc>, service_date: Option<NaiveDate>, tz: Tz) -> Option<WideTime> {
    let seconds = match service_date.and_then(|d| service_midnight(d, tz)) {
        Some(midnight) => i32::try_from(at.timestamp() - midnight.timestamp()).ok()?,
        None => at.with_timezone(&tz).num_seconds_from_midnight() as i32,
    };
    WideTime::from_seconds(seconds).ok()
}
