//! Data transfer objects for web requests and responses.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{
    AgencyFilter, RelativeDate, RouteFilter, ScheduleRelationship, StopTime, StopTimeEvent,
    StopTimeFilter, VehiclePositionFilter,
};
use crate::resolvers::RootArgs;

/// Query for the `/agencies` listing.
#[derive(Debug, Default, Deserialize)]
pub struct AgenciesQuery {
    pub limit: Option<i32>,

    /// Opaque cursor of the last row already seen
    pub after: Option<String>,

    pub onestop_id: Option<String>,

    /// Case-insensitive match on name or GTFS id
    pub search: Option<String>,

    /// Country served, as ISO 3166-1
    pub adm0_iso: Option<String>,

    /// Subdivision served, as ISO 3166-2
    pub adm1_iso: Option<String>,
}

impl AgenciesQuery {
    pub fn into_args(self) -> RootArgs<AgencyFilter> {
        RootArgs {
            limit: self.limit,
            after: self.after,
            ids: Vec::new(),
            filter: Some(AgencyFilter {
                onestop_id: self.onestop_id,
                search: self.search,
                adm0_iso: self.adm0_iso,
                adm1_iso: self.adm1_iso,
                ..Default::default()
            }),
        }
    }
}

/// Query for the `/routes` listing.
#[derive(Debug, Default, Deserialize)]
pub struct RoutesQuery {
    pub limit: Option<i32>,
    pub after: Option<String>,
    pub onestop_id: Option<String>,
    pub feed_onestop_id: Option<String>,

    /// GTFS route type, e.g. 1 for metro
    pub route_type: Option<i32>,

    pub search: Option<String>,
}

impl RoutesQuery {
    pub fn into_args(self) -> RootArgs<RouteFilter> {
        RootArgs {
            limit: self.limit,
            after: self.after,
            ids: Vec::new(),
            filter: Some(RouteFilter {
                onestop_id: self.onestop_id,
                feed_onestop_id: self.feed_onestop_id,
                route_type: self.route_type,
                search: self.search,
                ..Default::default()
            }),
        }
    }
}

/// Query for stop times and departures at one stop.
#[derive(Debug, Default, Deserialize)]
pub struct StopTimesQuery {
    pub limit: Option<i32>,

    /// Strict GTFS service date
    pub service_date: Option<NaiveDate>,

    /// Calendar date; includes trips from the previous service day
    pub date: Option<NaiveDate>,

    /// Seconds since midnight
    pub start_time: Option<i32>,
    pub end_time: Option<i32>,

    /// Seconds from now
    pub next: Option<i32>,

    pub relative_date: Option<RelativeDate>,

    /// Map dates outside the feed's service onto a representative week
    pub use_service_window: Option<bool>,
}

impl StopTimesQuery {
    pub fn filter(&self) -> StopTimeFilter {
        StopTimeFilter {
            service_date: self.service_date,
            date: self.date,
            start_time: self.start_time,
            end_time: self.end_time,
            next: self.next,
            relative_date: self.relative_date,
            use_service_window: self.use_service_window,
            ..Default::default()
        }
    }
}

/// Query for the `/vehicles` listing.
#[derive(Debug, Default, Deserialize)]
pub struct VehiclesQuery {
    pub limit: Option<i32>,

    /// Only vehicles from this realtime feed
    pub feed_onestop_id: Option<String>,

    /// GTFS route id
    pub route_id: Option<String>,

    /// GTFS trip id
    pub trip_id: Option<String>,
}

impl VehiclesQuery {
    pub fn filter(&self) -> VehiclePositionFilter {
        VehiclePositionFilter {
            feed_onestop_ids: self.feed_onestop_id.iter().cloned().collect(),
            route_id: self.route_id.clone(),
            trip_id: self.trip_id.clone(),
            ..Default::default()
        }
    }
}

/// Query for alert listings.
#[derive(Debug, Default, Deserialize)]
pub struct AlertsQuery {
    /// Only alerts active now
    pub active: Option<bool>,
    pub limit: Option<i32>,
}

/// A stop time with its resolved events.
#[derive(Debug, Serialize)]
pub struct StopTimeView {
    #[serde(flatten)]
    pub stop_time: StopTime,

    /// GTFS id of the trip, including realtime-only trips
    pub gtfs_trip_id: Option<String>,

    pub arrival: StopTimeEvent,
    pub departure: StopTimeEvent,
    /// `None` when realtime carries a value this gateway does not know
    pub schedule_relationship: Option<ScheduleRelationship>,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
