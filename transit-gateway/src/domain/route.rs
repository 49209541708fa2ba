//! Routes and their precomputed projections.

use geo::{LineString, MultiPoint, Polygon};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Route {
    pub id: i64,
    pub feed_version_id: i64,
    pub feed_version_sha1: String,
    pub feed_onestop_id: String,
    pub onestop_id: String,
    pub route_id: String,
    /// Internal id of the owning agency.
    pub agency_id: i64,
    pub route_short_name: String,
    pub route_long_name: String,
    pub route_desc: Option<String>,
    pub route_type: i32,
    pub route_url: Option<String>,
    pub route_color: Option<String>,
    pub route_text_color: Option<String>,
    pub route_sort_order: Option<i32>,
    pub continuous_pickup: Option<i32>,
    pub continuous_drop_off: Option<i32>,
}

/// A stop served by a route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteStop {
    pub id: i64,
    pub feed_version_id: i64,
    pub route_id: i64,
    pub stop_id: i64,
    pub agency_id: i64,
}

/// Typical headway at a representative stop of a route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteHeadway {
    pub id: i64,
    pub route_id: i64,
    pub selected_stop_id: i64,
    pub direction_id: Option<i32>,
    pub headway_secs: Option<i32>,
    pub dow_category: Option<i32>,
    pub service_date: Option<chrono::NaiveDate>,
    pub stop_trip_count: Option<i32>,
    pub departures: Vec<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteStopPattern {
    pub route_id: i64,
    pub stop_pattern_id: i32,
    pub direction_id: i32,
    pub count: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteGeometry {
    pub route_id: i64,
    pub direction_id: Option<i32>,
    pub generated: bool,
    pub length: Option<f64>,
    pub geometry: Option<LineString<f64>>,
}

/// Stops of a route, with a buffer and hull around them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteStopBuffer {
    pub stop_points: Option<MultiPoint<f64>>,
    pub stop_buffer: Option<Polygon<f64>>,
    pub stop_convexhull: Option<Polygon<f64>>,
}
