//! Bike-share records served by the GBFS collaborator.

use serde::{Deserialize, Serialize};

use super::geom::PointRadius;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GbfsFreeBikeStatus {
    pub feed_onestop_id: String,
    pub bike_id: String,
    pub lon: f64,
    pub lat: f64,
    pub is_reserved: bool,
    pub is_disabled: bool,
    pub vehicle_type_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GbfsStationInformation {
    pub feed_onestop_id: String,
    pub station_id: String,
    pub name: String,
    pub lon: f64,
    pub lat: f64,
    pub capacity: Option<i32>,
    pub num_bikes_available: Option<i32>,
    pub num_docks_available: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GbfsBikeRequest {
    pub near: Option<PointRadius>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GbfsDockRequest {
    pub near: Option<PointRadius>,
}
