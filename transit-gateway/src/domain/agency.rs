//! Agencies, operators and place aggregation.

use std::collections::BTreeMap;

use geo::Polygon;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Agency {
    pub id: i64,
    pub feed_version_id: i64,
    pub feed_version_sha1: String,
    pub feed_onestop_id: String,
    pub onestop_id: String,
    pub agency_id: String,
    pub agency_name: String,
    pub agency_url: String,
    pub agency_timezone: String,
    pub agency_lang: Option<String>,
    pub agency_phone: Option<String>,
    pub agency_fare_url: Option<String>,
    pub agency_email: Option<String>,
    pub geometry: Option<Polygon<f64>>,
}

/// A place an agency serves, ranked by share of the agency's stops.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgencyPlace {
    pub agency_id: i64,
    pub city_name: Option<String>,
    pub adm0_name: Option<String>,
    pub adm1_name: Option<String>,
    pub adm0_iso: Option<String>,
    pub adm1_iso: Option<String>,
    pub rank: f64,
}

/// Cross-feed grouping keyed by onestop id.
///
/// An operator is either declared explicitly (and may list several feeds
/// and agencies) or generated from a single agency that has no declared
/// operator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Operator {
    pub id: i64,
    pub onestop_id: String,
    pub name: Option<String>,
    pub short_name: Option<String>,
    pub website: Option<String>,
    pub generated: bool,
    pub feed_id: Option<i64>,
    pub agency_id: Option<i64>,
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlaceAggregationLevel {
    Adm0,
    #[default]
    Adm0Adm1,
    Adm0Adm1City,
    Adm0City,
    Adm1City,
    City,
}

/// A count of operators at some geographic granularity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Place {
    pub adm0_name: Option<String>,
    pub adm1_name: Option<String>,
    pub city_name: Option<String>,
    pub count: i64,
    pub operator_onestop_ids: Vec<String>,
}
