//! Client-facing `where` filters.
//!
//! Filters are plain data. They travel inside loader parameter records,
//! which group and hash them through their JSON encoding, so every filter
//! must serialize deterministically (no hash maps).

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::feed::FeedSpec;
use super::geom::{BoundingBox, PointRadius};
use super::time::WideTime;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgencyFilter {
    pub onestop_id: Option<String>,
    pub feed_version_sha1: Option<String>,
    pub feed_onestop_id: Option<String>,
    pub agency_id: Option<String>,
    pub agency_name: Option<String>,
    pub search: Option<String>,
    pub near: Option<PointRadius>,
    pub bbox: Option<BoundingBox>,
    /// Country the agency serves, as ISO 3166-1.
    pub adm0_iso: Option<String>,
    /// First-level subdivision the agency serves, as ISO 3166-2.
    pub adm1_iso: Option<String>,
    pub adm0_name: Option<String>,
    pub adm1_name: Option<String>,
    pub city_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteFilter {
    pub onestop_id: Option<String>,
    #[serde(default)]
    pub onestop_ids: Vec<String>,
    pub feed_version_sha1: Option<String>,
    pub feed_onestop_id: Option<String>,
    pub route_id: Option<String>,
    pub route_type: Option<i32>,
    pub search: Option<String>,
    #[serde(default)]
    pub agency_ids: Vec<i64>,
    pub near: Option<PointRadius>,
    pub bbox: Option<BoundingBox>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StopFilter {
    pub onestop_id: Option<String>,
    #[serde(default)]
    pub onestop_ids: Vec<String>,
    pub feed_version_sha1: Option<String>,
    pub feed_onestop_id: Option<String>,
    pub stop_id: Option<String>,
    pub stop_code: Option<String>,
    pub location_type: Option<i32>,
    pub search: Option<String>,
    pub near: Option<PointRadius>,
    pub bbox: Option<BoundingBox>,
    #[serde(default)]
    pub agency_ids: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripFilter {
    /// Only trips whose calendar is active on this date.
    pub service_date: Option<NaiveDate>,
    pub trip_id: Option<String>,
    pub stop_pattern_id: Option<i32>,
    #[serde(default)]
    pub route_ids: Vec<i64>,
    #[serde(default)]
    pub route_onestop_ids: Vec<String>,
    pub feed_version_sha1: Option<String>,
    pub feed_onestop_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedFilter {
    pub onestop_id: Option<String>,
    #[serde(default)]
    pub spec: Vec<FeedSpec>,
    pub search: Option<String>,
    pub fetch_error: Option<bool>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedVersionFilter {
    pub sha1: Option<String>,
    pub feed_onestop_id: Option<String>,
    #[serde(default)]
    pub feed_ids: Vec<i64>,
    pub file: Option<String>,
    /// Only versions whose calendar covers this date.
    pub covers: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedVersionServiceLevelFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedFetchFilter {
    pub success: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperatorFilter {
    pub onestop_id: Option<String>,
    pub feed_onestop_id: Option<String>,
    pub agency_id: Option<String>,
    pub search: Option<String>,
    pub merged: Option<bool>,
    pub adm0_iso: Option<String>,
    pub adm1_iso: Option<String>,
    pub adm0_name: Option<String>,
    pub adm1_name: Option<String>,
    pub city_name: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaceFilter {
    pub min_rank: Option<f64>,
    pub adm0_name: Option<String>,
    pub adm1_name: Option<String>,
    pub city_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgencyPlaceFilter {
    pub min_rank: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalendarDateFilter {
    pub date: Option<NaiveDate>,
    pub exception_type: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathwayFilter {
    pub pathway_mode: Option<i32>,
}

/// Dates relative to the local "today" of the stop being queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelativeDate {
    Today,
    Tomorrow,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
    NextMonday,
    NextTuesday,
    NextWednesday,
    NextThursday,
    NextFriday,
    NextSaturday,
    NextSunday,
}

impl RelativeDate {
    /// The kebab-case name, e.g. `next-monday`.
    pub fn kebab(&self) -> String {
        let upper = match serde_json::to_value(self) {
            Ok(serde_json::Value::String(s)) => s,
            _ => String::new(),
        };
        upper.to_ascii_lowercase().replace('_', "-")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StopTimeFilter {
    /// Strict GTFS service date.
    pub service_date: Option<NaiveDate>,
    /// Calendar date; queries on it expand across midnight.
    pub date: Option<NaiveDate>,
    /// Seconds since service-date midnight.
    pub start_time: Option<i32>,
    pub end_time: Option<i32>,
    pub start: Option<WideTime>,
    pub end: Option<WideTime>,
    /// Seconds from "now" to include.
    pub next: Option<i32>,
    pub relative_date: Option<RelativeDate>,
    pub use_service_window: Option<bool>,
    pub exclude_first: Option<bool>,
    pub exclude_last: Option<bool>,
    #[serde(default)]
    pub route_onestop_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripStopTimeFilter {
    pub start: Option<WideTime>,
    pub end: Option<WideTime>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VehiclePositionFilter {
    #[serde(default)]
    pub feed_onestop_ids: Vec<String>,
    pub route_id: Option<String>,
    pub trip_id: Option<String>,
    pub bbox: Option<BoundingBox>,
    pub near: Option<PointRadius>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CensusDatasetFilter {
    pub name: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CensusGeographyFilter {
    pub layer: Option<String>,
    /// Search distance around the entity, in metres.
    pub radius: Option<f64>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CensusSourceFilter {
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_date_kebab() {
        assert_eq!(RelativeDate::Today.kebab(), "today");
        assert_eq!(RelativeDate::NextMonday.kebab(), "next-monday");
        assert_eq!(RelativeDate::Sunday.kebab(), "sunday");
    }

    #[test]
    fn stop_time_filter_from_json() {
        let f: StopTimeFilter = serde_json::from_str(
            r#"{"service_date":"2018-05-30","start_time":57600,"end_time":57900,"relative_date":"NEXT_FRIDAY"}"#,
        )
        .unwrap();
        assert_eq!(f.service_date, NaiveDate::from_ymd_opt(2018, 5, 30));
        assert_eq!(f.start_time, Some(57600));
        assert_eq!(f.relative_date, Some(RelativeDate::NextFriday));
        assert!(f.route_onestop_ids.is_empty());
    }
}
