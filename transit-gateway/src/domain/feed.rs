//! Feeds and their immutable versions.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use geo::Polygon;
use serde::{Deserialize, Serialize};

/// What kind of data a feed publishes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedSpec {
    #[default]
    Gtfs,
    GtfsRt,
    Gbfs,
    Mds,
}

/// Where a feed's data can be fetched, by role.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedUrls {
    pub static_current: Option<String>,
    pub static_historic: Vec<String>,
    pub realtime_trip_updates: Option<String>,
    pub realtime_alerts: Option<String>,
    pub realtime_vehicle_positions: Option<String>,
    pub gbfs_auto_discovery: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedLicense {
    pub spdx_identifier: Option<String>,
    pub url: Option<String>,
    pub use_without_attribution: Option<String>,
    pub create_derived_product: Option<String>,
    pub redistribution_allowed: Option<String>,
    pub commercial_use_allowed: Option<String>,
    pub share_alike_optional: Option<String>,
    pub attribution_text: Option<String>,
}

/// How clients must authenticate against the feed's source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedAuthorization {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub param_name: Option<String>,
    pub info_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Feed {
    pub id: i64,
    pub onestop_id: String,
    pub name: Option<String>,
    pub spec: FeedSpec,
    pub urls: FeedUrls,
    pub license: FeedLicense,
    pub authorization: FeedAuthorization,
    pub languages: Vec<String>,
    pub tags: BTreeMap<String, String>,
    /// Onestop IDs of static feeds this realtime feed supplements.
    pub associated_feeds: Vec<String>,
}

/// Mutable per-feed bookkeeping: which version is active.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedState {
    pub id: i64,
    pub feed_id: i64,
    pub feed_version_id: Option<i64>,
    pub public: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedFetch {
    pub id: i64,
    pub feed_id: i64,
    pub url_type: String,
    pub url: String,
    pub fetched_at: DateTime<Utc>,
    pub success: bool,
    pub fetch_error: Option<String>,
    pub response_code: Option<i32>,
    pub response_sha1: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedVersion {
    pub id: i64,
    pub feed_id: i64,
    pub sha1: String,
    pub sha1_dir: Option<String>,
    pub fetched_at: DateTime<Utc>,
    pub earliest_calendar_date: Option<NaiveDate>,
    pub latest_calendar_date: Option<NaiveDate>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub url: String,
    pub file: Option<String>,
    pub geometry: Option<Polygon<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedVersionGtfsImport {
    pub id: i64,
    pub feed_version_id: i64,
    pub success: bool,
    pub in_progress: bool,
    pub exception_log: Option<String>,
    pub entity_count: BTreeMap<String, i64>,
    pub warning_count: BTreeMap<String, i64>,
}

/// Scheduled service, in seconds, for each weekday of one week.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedVersionServiceLevel {
    pub id: i64,
    pub feed_version_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub monday: i64,
    pub tuesday: i64,
    pub wednesday: i64,
    pub thursday: i64,
    pub friday: i64,
    pub saturday: i64,
    pub sunday: i64,
}

impl FeedVersionServiceLevel {
    pub fn total_service(&self) -> i64 {
        self.monday
            + self.tuesday
            + self.wednesday
            + self.thursday
            + self.friday
            + self.saturday
            + self.sunday
    }
}

/// Effective coverage of a feed version, with the week used for
/// substitution outside that range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedVersionServiceWindow {
    pub id: i64,
    pub feed_version_id: i64,
    pub feed_start_date: Option<NaiveDate>,
    pub feed_end_date: Option<NaiveDate>,
    pub earliest_calendar_date: Option<NaiveDate>,
    pub latest_calendar_date: Option<NaiveDate>,
    pub fallback_week: Option<NaiveDate>,
    pub default_timezone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedInfo {
    pub id: i64,
    pub feed_version_id: i64,
    pub feed_publisher_name: String,
    pub feed_publisher_url: String,
    pub feed_lang: String,
    pub default_lang: Option<String>,
    pub feed_version: Option<String>,
    pub feed_start_date: Option<NaiveDate>,
    pub feed_end_date: Option<NaiveDate>,
    pub feed_contact_email: Option<String>,
    pub feed_contact_url: Option<String>,
}
