//! Realtime overlay records exposed to clients.
//!
//! Raw GTFS-RT messages stay inside the realtime layer; these are the
//! shapes resolvers hand back.

use chrono::{DateTime, FixedOffset, Utc};
use geo::Point;
use gtfs_realtime::trip_update::StopTimeUpdate;
use serde::{Deserialize, Serialize};

use super::time::WideTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleRelationship {
    Scheduled,
    Added,
    Canceled,
    Unscheduled,
}

impl ScheduleRelationship {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Added => "added",
            Self::Canceled => "canceled",
            Self::Unscheduled => "unscheduled",
        }
    }
}

/// A StopTimeUpdate matched to a scheduled stop time, together with the
/// delay propagated from earlier stops of the same trip.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RtStopTimeUpdate {
    pub stop_time_update: Option<StopTimeUpdate>,
    pub last_delay: Option<i32>,
}

/// Arrival or departure at a stop: the schedule plus any realtime estimate.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StopTimeEvent {
    pub stop_timezone: String,
    pub scheduled: Option<WideTime>,
    pub scheduled_utc: Option<DateTime<Utc>>,
    pub scheduled_unix: Option<i64>,
    pub scheduled_local: Option<DateTime<FixedOffset>>,
    pub estimated: Option<WideTime>,
    pub estimated_utc: Option<DateTime<Utc>>,
    pub estimated_unix: Option<i64>,
    pub estimated_local: Option<DateTime<FixedOffset>>,
    /// The raw realtime timestamp, when the feed supplied one.
    pub time_utc: Option<DateTime<Utc>>,
    pub delay: Option<i32>,
    pub uncertainty: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RtTranslation {
    pub text: String,
    pub language: Option<String>,
}

/// Unix seconds; either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RtTimeRange {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl RtTimeRange {
    pub fn contains(&self, unix: i64) -> bool {
        self.start.is_none_or(|s| s <= unix) && self.end.is_none_or(|e| unix <= e)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Alert {
    pub cause: Option<String>,
    pub effect: Option<String>,
    pub severity_level: Option<String>,
    pub active_period: Vec<RtTimeRange>,
    pub header_text: Vec<RtTranslation>,
    pub description_text: Vec<RtTranslation>,
    pub tts_header_text: Vec<RtTranslation>,
    pub tts_description_text: Vec<RtTranslation>,
    pub url: Vec<RtTranslation>,
}

impl Alert {
    /// An alert with no active periods is always active.
    pub fn is_active_at(&self, unix: i64) -> bool {
        self.active_period.is_empty() || self.active_period.iter().any(|p| p.contains(unix))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RtVehicleDescriptor {
    pub id: Option<String>,
    pub label: Option<String>,
    pub license_plate: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VehiclePosition {
    pub feed_onestop_id: String,
    pub vehicle: Option<RtVehicleDescriptor>,
    pub position: Option<Point<f64>>,
    pub bearing: Option<f32>,
    pub speed: Option<f32>,
    pub current_stop_sequence: Option<u32>,
    pub stop_id: Option<String>,
    pub current_status: Option<String>,
    pub congestion_level: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub trip_id: Option<String>,
    pub route_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_range_bounds_are_inclusive_and_open() {
        let r = RtTimeRange {
            start: Some(100),
            end: Some(200),
        };
        assert!(r.contains(100));
        assert!(r.contains(200));
        assert!(!r.contains(99));
        assert!(!r.contains(201));

        let open = RtTimeRange {
            start: None,
            end: Some(10),
        };
        assert!(open.contains(i64::MIN));
        assert!(!open.contains(11));
    }

    #[test]
    fn alert_without_periods_is_active() {
        let a = Alert::default();
        assert!(a.is_active_at(0));

        let a = Alert {
            active_period: vec![
                RtTimeRange {
                    start: Some(0),
                    end: Some(10),
                },
                RtTimeRange {
                    start: Some(100),
                    end: None,
                },
            ],
            ..Default::default()
        };
        assert!(a.is_active_at(5));
        assert!(!a.is_active_at(50));
        assert!(a.is_active_at(5000));
    }

    #[test]
    fn relationship_names() {
        assert_eq!(ScheduleRelationship::Canceled.as_str(), "canceled");
        assert_eq!(
            serde_json::to_string(&ScheduleRelationship::Added).unwrap(),
            "\"added\""
        );
    }
}
