//! Stop-time filter normalization and cross-midnight expansion.

use chrono::{Days, NaiveDate};

use super::relative::resolve_relative_date;
use super::window::ServiceWindow;
use crate::domain::{SECONDS_PER_DAY, StopTimeFilter};

/// Upper bound on the wide-time of any stop time.
pub const MAX_WIDE_TIME: i32 = 100 * 3600;

/// Default lookbehind into the previous service day.
pub const DEFAULT_LOOKBEHIND: i32 = 6 * 3600;

/// "Now" at the stop: its local date and seconds since local midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalNow {
    pub date: NaiveDate,
    pub seconds: i32,
}

/// Rewrite a stop-time filter into plain service-day terms.
///
/// Wide-time bounds become second counts, a relative date becomes a
/// calendar date, `next` becomes a window starting now, and with
/// `use_service_window` any date outside `window` is swapped for the
/// matching weekday of the window's best week. Without a window the dates
/// are left alone.
pub fn normalize_stop_time_filter(
    mut filter: StopTimeFilter,
    now: LocalNow,
    window: Option<&ServiceWindow>,
) -> StopTimeFilter {
    if let Some(start) = filter.start.take() {
        filter.start_time = Some(start.seconds());
    }
    if let Some(end) = filter.end.take() {
        filter.end_time = Some(end.seconds());
    }
    if let Some(relative) = filter.relative_date {
        filter.date = Some(resolve_relative_date(now.date, relative));
    }
    if let Some(next) = filter.next {
        if filter.date.is_none() {
            filter.date = Some(now.date);
        }
        filter.start_time = Some(now.seconds);
        filter.end_time = Some(now.seconds.saturating_add(next));
    }
    if filter.use_service_window.unwrap_or(false) {
        if let Some(window) = window {
            filter.date = filter.date.map(|d| window.map_date(d));
            filter.service_date = filter.service_date.map(|d| window.map_date(d));
        }
    }
    filter
}

/// Split a filter on a calendar `date` into per-service-day queries.
///
/// Trips from the previous service day may still be running in the
/// early hours, and a window that runs past midnight reaches into the
/// next service day. Each returned filter has `service_date` set and
/// `date` cleared, with its window expressed on that service day. A
/// filter without `date` is returned unchanged.
pub fn split_service_days(filter: &StopTimeFilter, lookbehind: i32) -> Vec<StopTimeFilter> {
    let Some(date) = filter.date else {
        return vec![filter.clone()];
    };
    let start = filter.start_time.unwrap_or(0);
    let end = filter.end_time.unwrap_or(SECONDS_PER_DAY);

    let on = |service_date: Option<NaiveDate>, start_time: i32, end_time: i32| StopTimeFilter {
        service_date,
        date: None,
        start_time: Some(start_time),
        end_time: Some(end_time),
        ..filter.clone()
    };

    let mut days = Vec::with_capacity(3);
    if start < lookbehind {
        days.push(on(
            date.checked_sub_days(Days::new(1)),
            SECONDS_PER_DAY + start,
            MAX_WIDE_TIME,
        ));
    }
    days.push(on(Some(date), start.max(0), end.min(SECONDS_PER_DAY)));
    if end > SECONDS_PER_DAY {
        days.push(on(
            date.checked_add_days(Days::new(1)),
            0,
            end - SECONDS_PER_DAY,
        ));
    }
    days
}
