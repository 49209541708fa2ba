//! Mutation inputs and the results of feed-version lifecycle commands.

use geo::Point;
use serde::{Deserialize, Serialize};

use super::feed::FeedVersion;

/// Values for creating or updating a stop. Unset fields are left alone on
/// update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StopSetInput {
    pub id: Option<i64>,
    pub feed_version_id: Option<i64>,
    pub stop_id: Option<String>,
    pub stop_name: Option<String>,
    pub stop_code: Option<String>,
    pub stop_desc: Option<String>,
    pub location_type: Option<i32>,
    pub parent_station: Option<i64>,
    pub level_id: Option<i64>,
    pub stop_timezone: Option<String>,
    pub wheelchair_boarding: Option<i32>,
    pub platform_code: Option<String>,
    pub geometry: Option<Point<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelSetInput {
    pub id: Option<i64>,
    pub feed_version_id: Option<i64>,
    pub level_id: Option<String>,
    pub level_name: Option<String>,
    pub level_index: Option<f64>,
    pub parent_station: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathwaySetInput {
    pub id: Option<i64>,
    pub feed_version_id: Option<i64>,
    pub pathway_id: Option<String>,
    pub from_stop_id: Option<i64>,
    pub to_stop_id: Option<i64>,
    pub pathway_mode: Option<i32>,
    pub is_bidirectional: Option<bool>,
    pub length: Option<f64>,
    pub traversal_time: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeleteResult {
    pub id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedVersionFetchResult {
    pub feed_version: Option<FeedVersion>,
    pub fetch_error: Option<String>,
    pub found_sha1: bool,
    pub found_dir_sha1: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedVersionImportResult {
    pub success: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedVersionUnimportResult {
    pub success: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedVersionDeleteResult {
    pub success: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub success: bool,
    pub failure_reason: Option<String>,
    pub sha1: Option<String>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}
