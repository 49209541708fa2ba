//! Stops, stations and in-station navigation.

use geo::Point;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stop {
    pub id: i64,
    pub feed_version_id: i64,
    pub feed_version_sha1: String,
    pub feed_onestop_id: String,
    pub onestop_id: String,
    pub stop_id: String,
    pub stop_name: String,
    pub stop_code: Option<String>,
    pub stop_desc: Option<String>,
    pub stop_url: Option<String>,
    pub zone_id: Option<String>,
    pub location_type: i32,
    /// Internal id of the parent station.
    pub parent_station: Option<i64>,
    pub level_id: Option<i64>,
    /// IANA name; empty when the stop inherits from its station or agency.
    pub stop_timezone: String,
    pub wheelchair_boarding: Option<i32>,
    pub platform_code: Option<String>,
    pub tts_stop_name: Option<String>,
    pub geometry: Point<f64>,
}

impl Default for Stop {
    fn default() -> Self {
        Self {
            id: 0,
            feed_version_id: 0,
            feed_version_sha1: String::new(),
            feed_onestop_id: String::new(),
            onestop_id: String::new(),
            stop_id: String::new(),
            stop_name: String::new(),
            stop_code: None,
            stop_desc: None,
            stop_url: None,
            zone_id: None,
            location_type: 0,
            parent_station: None,
            level_id: None,
            stop_timezone: String::new(),
            wheelchair_boarding: None,
            platform_code: None,
            tts_stop_name: None,
            geometry: Point::new(0.0, 0.0),
        }
    }
}

/// "This stop is that stop in another feed".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StopExternalReference {
    pub id: i64,
    pub stop_id: i64,
    pub target_feed_onestop_id: String,
    pub target_stop_id: String,
    pub inactive: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Level {
    pub id: i64,
    pub feed_version_id: i64,
    pub level_id: String,
    pub level_index: f64,
    pub level_name: Option<String>,
    pub parent_station: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pathway {
    pub id: i64,
    pub feed_version_id: i64,
    pub pathway_id: String,
    pub from_stop_id: i64,
    pub to_stop_id: i64,
    pub pathway_mode: i32,
    pub is_bidirectional: bool,
    pub length: Option<f64>,
    pub traversal_time: Option<i32>,
    pub stair_count: Option<i32>,
    pub max_slope: Option<f64>,
    pub min_width: Option<f64>,
    pub signposted_as: Option<String>,
    pub reverse_signposted_as: Option<String>,
}
