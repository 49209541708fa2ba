//! Overlaying realtime updates onto a stop's scheduled stop times.

use chrono::{DateTime, NaiveDate};
use chrono_tz::Tz;

use super::event::wide_time_of;
use super::snapshot::RtSnapshot;
use crate::domain::{ADDED_TRIP_ID, RtStopTimeUpdate, Stop, StopTime, service_midnight};
use crate::finder::{FinderError, RtFinder};

/// Attach realtime updates to scheduled rows served at `stop`, append rows
/// for ADDED trips that call there, and order the result.
///
/// Scheduled rows are never altered beyond gaining an update. Rows keep
/// their schedule-based order; added rows, which have no schedule, sort
/// by their realtime estimate.
pub async fn merge_stop_times(
    rt: &dyn RtFinder,
    snapshot: &RtSnapshot,
    stop: &Stop,
    tz: Tz,
    mut rows: Vec<StopTime>,
    added_service_date: Option<NaiveDate>,
) -> Result<Vec<StopTime>, FinderError> {
    if !snapshot.is_empty() {
        for row in rows.iter_mut().filter(|r| r.trip_id != ADDED_TRIP_ID) {
            let Some(trip_id) = rt.get_gtfs_trip_id(row.trip_id).await? else {
                continue;
            };
            row.rt_stop_time_update =
                snapshot.find_stop_time_update(&trip_id, row.stop_sequence, Some(&stop.stop_id));
        }
        rows.extend(added_stop_times(snapshot, stop, added_service_date));
    }
    rows.sort_by_cached_key(|r| sort_instant(r, tz));
    Ok(rows)
}

/// Synthetic rows for ADDED trips that call at `stop`.
pub fn added_stop_times(
    snapshot: &RtSnapshot,
    stop: &Stop,
    service_date: Option<NaiveDate>,
) -> Vec<StopTime> {
    let mut out = Vec::new();
    for tu in snapshot.added_trips_for_stop(&stop.stop_id) {
        let updates = tu
            .stop_time_update
            .iter()
            .filter(|u| u.stop_id.as_deref() == Some(stop.stop_id.as_str()));
        for update in updates {
            let mut row = StopTime {
                feed_version_id: stop.feed_version_id,
                trip_id: ADDED_TRIP_ID,
                stop_id: stop.id,
                stop_sequence: update.stop_sequence.map_or(0, |s| s as i32),
                rt_trip_id: tu.trip.trip_id.clone(),
                rt_stop_time_update: Some(RtStopTimeUpdate {
                    stop_time_update: Some(update.clone()),
                    last_delay: None,
                }),
                ..Default::default()
            };
            if let Some(date) = service_date {
                row.service_date = Some(date);
                row.date = Some(date);
            }
            out.push(row);
        }
    }
    out
}

/// Unix seconds at which the row departs: its service-date midnight plus
/// the sort seconds. Rows without a service date fall back to the seconds
/// alone.
fn sort_instant(row: &StopTime, tz: Tz) -> i64 {
    let seconds = i64::from(sort_seconds(row, tz));
    row.service_date
        .and_then(|d| service_midnight(d, tz))
        .map_or(seconds, |midnight| midnight.timestamp() + seconds)
}

fn sort_seconds(row: &StopTime, tz: Tz) -> i32 {
    if let Some(t) = row.departure_time.or(row.arrival_time) {
        return t.seconds();
    }
    row.rt_stop_time_update
        .as_ref()
        .and_then(|u| u.stop_time_update.as_ref())
        .and_then(|u| u.departure.as_ref().or(u.arrival.as_ref()))
        .and_then(|e| e.time)
        .and_then(|t| DateTime::from_timestamp(t, 0))
        .and_then(|at| wide_time_of(at, row.service_date, tz))
        .map_or(i32::MAX, |t| t.seconds())
}
