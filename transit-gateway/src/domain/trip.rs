//! Trips, stop times and the calendars that activate them.

use chrono::NaiveDate;
use geo::LineString;
use serde::{Deserialize, Serialize};

use super::realtime::RtStopTimeUpdate;
use super::time::WideTime;

/// Trip id carried by stop times synthesized from realtime-only trips.
pub const ADDED_TRIP_ID: i64 = 0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Trip {
    pub id: i64,
    pub feed_version_id: i64,
    pub trip_id: String,
    /// Internal route id.
    pub route_id: i64,
    /// Internal calendar id.
    pub service_id: i64,
    pub trip_headsign: Option<String>,
    pub trip_short_name: Option<String>,
    pub direction_id: i32,
    pub block_id: Option<String>,
    pub shape_id: Option<i64>,
    pub wheelchair_accessible: Option<i32>,
    pub bikes_allowed: Option<i32>,
    pub stop_pattern_id: i32,
}

impl Trip {
    /// True for a trip shell built from a realtime ADDED trip update.
    pub fn is_realtime_added(&self) -> bool {
        self.id == ADDED_TRIP_ID
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StopTime {
    pub feed_version_id: i64,
    /// Internal trip id, or [`ADDED_TRIP_ID`] for realtime-only rows.
    pub trip_id: i64,
    /// Internal stop id.
    pub stop_id: i64,
    pub stop_sequence: i32,
    pub arrival_time: Option<WideTime>,
    pub departure_time: Option<WideTime>,
    pub stop_headsign: Option<String>,
    pub pickup_type: Option<i32>,
    pub drop_off_type: Option<i32>,
    pub timepoint: Option<i32>,
    pub shape_dist_traveled: Option<f64>,
    /// The day the trip belongs to.
    pub service_date: Option<NaiveDate>,
    /// The calendar day on which this stop is actually served.
    pub date: Option<NaiveDate>,
    /// GTFS trip id of a realtime-only trip.
    pub rt_trip_id: Option<String>,
    #[serde(skip)]
    pub rt_stop_time_update: Option<RtStopTimeUpdate>,
}

impl StopTime {
    pub fn is_realtime_added(&self) -> bool {
        self.trip_id == ADDED_TRIP_ID && self.rt_trip_id.is_some()
    }

    /// Stamp the service date, and the calendar date on which the stop is
    /// served: the next day when the arrival is at or after 24:00:00.
    pub fn stamp_service_date(&mut self, service_date: NaiveDate) {
        self.service_date = Some(service_date);
        let after_midnight = self
            .arrival_time
            .or(self.departure_time)
            .is_some_and(|t| t.is_after_midnight());
        self.date = if after_midnight {
            service_date.succ_opt()
        } else {
            Some(service_date)
        };
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calendar {
    pub id: i64,
    pub feed_version_id: i64,
    pub service_id: String,
    pub monday: bool,
    pub tuesday: bool,
    pub wednesday: bool,
    pub thursday: bool,
    pub friday: bool,
    pub saturday: bool,
    pub sunday: bool,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub generated: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarDate {
    pub id: i64,
    /// Internal calendar id.
    pub service_id: i64,
    pub date: NaiveDate,
    /// 1 adds service, 2 removes it.
    pub exception_type: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Frequency {
    pub id: i64,
    pub trip_id: i64,
    pub start_time: WideTime,
    pub end_time: WideTime,
    pub headway_secs: i32,
    pub exact_times: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub id: i64,
    pub feed_version_id: i64,
    pub shape_id: String,
    pub generated: bool,
    pub geometry: LineString<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn stamp_before_midnight_keeps_date() {
        let mut st = StopTime {
            arrival_time: Some(WideTime::parse("23:59:59").unwrap()),
            ..Default::default()
        };
        st.stamp_service_date(date(2018, 5, 30));
        assert_eq!(st.service_date, Some(date(2018, 5, 30)));
        assert_eq!(st.date, Some(date(2018, 5, 30)));
    }

    #[test]
    fn stamp_after_midnight_moves_date() {
        let mut st = StopTime {
            arrival_time: Some(WideTime::parse("24:14:00").unwrap()),
            ..Default::default()
        };
        st.stamp_service_date(date(2018, 5, 30));
        assert_eq!(st.service_date, Some(date(2018, 5, 30)));
        assert_eq!(st.date, Some(date(2018, 5, 31)));
    }

    #[test]
    fn added_rows_are_recognized() {
        let st = StopTime {
            trip_id: ADDED_TRIP_ID,
            rt_trip_id: Some("-123".into()),
            ..Default::default()
        };
        assert!(st.is_realtime_added());
        let st = StopTime {
            trip_id: 42,
            ..Default::default()
        };
        assert!(!st.is_realtime_added());
    }
}
