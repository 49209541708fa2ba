//! Collaborators the gateway consumes.
//!
//! The warehouse, realtime cache, bike-share backend, authorization
//! backend and ingestion actions all sit behind these traits. Resolvers
//! only ever see `Arc<dyn Trait>` handles carried by the request context.

mod error;
mod local;
mod matching;
mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use gtfs_realtime::TripUpdate;

use crate::domain::*;
use crate::loader::{BatchResult, Param};
use crate::realtime::RtSnapshot;
use crate::service_time::ServiceWindow;

pub use error::FinderError;
pub use local::{MemoryActions, MemoryJobQueue, StaticChecker};
pub use memory::{FinderData, MemoryFinder, SNAPSHOT_FILE};

/// Arguments shared by every root selection.
#[derive(Debug, Clone, Default)]
pub struct FindArgs<W> {
    pub limit: usize,
    pub after: Option<Cursor>,
    pub ids: Vec<i64>,
    pub filter: Option<W>,
}

/// Relational access to the warehouse.
///
/// By-id methods return one `Option` per id, in id order. By-parameter
/// methods return one row list per record, in record order.
#[async_trait]
pub trait Finder: Send + Sync {
    // Root selections, ordered by (feed_version_id, id).
    async fn find_agencies(&self, args: FindArgs<AgencyFilter>) -> Result<Vec<Agency>, FinderError>;
    async fn find_routes(&self, args: FindArgs<RouteFilter>) -> Result<Vec<Route>, FinderError>;
    async fn find_stops(&self, args: FindArgs<StopFilter>) -> Result<Vec<Stop>, FinderError>;
    async fn find_trips(&self, args: FindArgs<TripFilter>) -> Result<Vec<Trip>, FinderError>;
    async fn find_feeds(&self, args: FindArgs<FeedFilter>) -> Result<Vec<Feed>, FinderError>;
    async fn find_feed_versions(
        &self,
        args: FindArgs<FeedVersionFilter>,
    ) -> Result<Vec<FeedVersion>, FinderError>;
    async fn find_operators(
        &self,
        args: FindArgs<OperatorFilter>,
    ) -> Result<Vec<Operator>, FinderError>;
    async fn find_places(
        &self,
        limit: usize,
        level: PlaceAggregationLevel,
        filter: Option<PlaceFilter>,
    ) -> Result<Vec<Place>, FinderError>;
    async fn find_census_datasets(
        &self,
        args: FindArgs<CensusDatasetFilter>,
    ) -> Result<Vec<CensusDataset>, FinderError>;
    async fn route_stop_buffer(
        &self,
        route_id: i64,
        radius: f64,
    ) -> Result<Option<RouteStopBuffer>, FinderError>;
    async fn find_feed_version_service_window(
        &self,
        feed_version_id: i64,
    ) -> Result<Option<ServiceWindow>, FinderError>;

    // Realtime lookup support.
    /// Onestop ids whose realtime topics apply to a feed version: its own
    /// feed plus any realtime feed associated with it.
    async fn feed_version_rt_topics(&self, feed_version_id: i64)
    -> Result<Vec<String>, FinderError>;
    async fn route_internal_id(
        &self,
        feed_version_id: i64,
        route_id: &str,
    ) -> Result<Option<i64>, FinderError>;

    // By id.
    async fn agencies_by_ids(&self, ids: Vec<i64>) -> BatchResult<Option<Agency>>;
    async fn routes_by_ids(&self, ids: Vec<i64>) -> BatchResult<Option<Route>>;
    async fn stops_by_ids(&self, ids: Vec<i64>) -> BatchResult<Option<Stop>>;
    async fn trips_by_ids(&self, ids: Vec<i64>) -> BatchResult<Option<Trip>>;
    async fn feeds_by_ids(&self, ids: Vec<i64>) -> BatchResult<Option<Feed>>;
    async fn feed_versions_by_ids(&self, ids: Vec<i64>) -> BatchResult<Option<FeedVersion>>;
    async fn feed_states_by_feed_ids(&self, ids: Vec<i64>) -> BatchResult<Option<FeedState>>;
    async fn feed_version_gtfs_imports_by_feed_version_ids(
        &self,
        ids: Vec<i64>,
    ) -> BatchResult<Option<FeedVersionGtfsImport>>;
    async fn feed_version_service_windows_by_feed_version_ids(
        &self,
        ids: Vec<i64>,
    ) -> BatchResult<Option<FeedVersionServiceWindow>>;
    async fn calendars_by_ids(&self, ids: Vec<i64>) -> BatchResult<Option<Calendar>>;
    async fn shapes_by_ids(&self, ids: Vec<i64>) -> BatchResult<Option<Shape>>;
    async fn levels_by_ids(&self, ids: Vec<i64>) -> BatchResult<Option<Level>>;
    async fn pathways_by_ids(&self, ids: Vec<i64>) -> BatchResult<Option<Pathway>>;
    async fn census_tables_by_ids(&self, ids: Vec<i64>) -> BatchResult<Option<CensusTable>>;
    async fn operators_by_agency_ids(&self, ids: Vec<i64>) -> BatchResult<Option<Operator>>;
    async fn stop_external_references_by_stop_ids(
        &self,
        ids: Vec<i64>,
    ) -> BatchResult<Option<StopExternalReference>>;
    async fn target_stops_by_stop_ids(&self, ids: Vec<i64>) -> BatchResult<Option<Stop>>;

    // By parameter record.
    async fn agencies_by_feed_version_ids(
        &self,
        params: Vec<Param<i64, AgencyFilter>>,
    ) -> BatchResult<Vec<Agency>>;
    async fn agencies_by_onestop_ids(
        &self,
        params: Vec<Param<String, AgencyFilter>>,
    ) -> BatchResult<Vec<Agency>>;
    async fn agency_places_by_agency_ids(
        &self,
        params: Vec<Param<i64, AgencyPlaceFilter>>,
    ) -> BatchResult<Vec<AgencyPlace>>;
    async fn calendar_dates_by_service_ids(
        &self,
        params: Vec<Param<i64, CalendarDateFilter>>,
    ) -> BatchResult<Vec<CalendarDate>>;
    async fn census_geographies_by_entity_ids(
        &self,
        params: Vec<Param<(CensusEntityKind, i64), CensusGeographyFilter>>,
    ) -> BatchResult<Vec<CensusGeography>>;
    /// Keys are (geoid, comma-joined table names).
    async fn census_values_by_geography_ids(
        &self,
        params: Vec<Param<(String, String)>>,
    ) -> BatchResult<Vec<CensusValue>>;
    async fn census_fields_by_table_ids(
        &self,
        params: Vec<Param<i64>>,
    ) -> BatchResult<Vec<CensusField>>;
    async fn census_sources_by_dataset_ids(
        &self,
        params: Vec<Param<i64, CensusSourceFilter>>,
    ) -> BatchResult<Vec<CensusSource>>;
    async fn feed_fetches_by_feed_ids(
        &self,
        params: Vec<Param<i64, FeedFetchFilter>>,
    ) -> BatchResult<Vec<FeedFetch>>;
    async fn feed_infos_by_feed_version_ids(
        &self,
        params: Vec<Param<i64>>,
    ) -> BatchResult<Vec<FeedInfo>>;
    async fn feed_versions_by_feed_ids(
        &self,
        params: Vec<Param<i64, FeedVersionFilter>>,
    ) -> BatchResult<Vec<FeedVersion>>;
    async fn feeds_by_operator_onestop_ids(
        &self,
        params: Vec<Param<String, FeedFilter>>,
    ) -> BatchResult<Vec<Feed>>;
    async fn feed_version_service_levels_by_feed_version_ids(
        &self,
        params: Vec<Param<i64, FeedVersionServiceLevelFilter>>,
    ) -> BatchResult<Vec<FeedVersionServiceLevel>>;
    async fn frequencies_by_trip_ids(
        &self,
        params: Vec<Param<i64>>,
    ) -> BatchResult<Vec<Frequency>>;
    async fn levels_by_parent_station_ids(
        &self,
        params: Vec<Param<i64>>,
    ) -> BatchResult<Vec<Level>>;
    async fn operators_by_feed_ids(
        &self,
        params: Vec<Param<i64, OperatorFilter>>,
    ) -> BatchResult<Vec<Operator>>;
    async fn pathways_by_from_stop_ids(
        &self,
        params: Vec<Param<i64, PathwayFilter>>,
    ) -> BatchResult<Vec<Pathway>>;
    async fn pathways_by_to_stop_ids(
        &self,
        params: Vec<Param<i64, PathwayFilter>>,
    ) -> BatchResult<Vec<Pathway>>;
    async fn route_geometries_by_route_ids(
        &self,
        params: Vec<Param<i64>>,
    ) -> BatchResult<Vec<RouteGeometry>>;
    async fn route_headways_by_route_ids(
        &self,
        params: Vec<Param<i64>>,
    ) -> BatchResult<Vec<RouteHeadway>>;
    async fn route_stop_patterns_by_route_ids(
        &self,
        params: Vec<Param<i64>>,
    ) -> BatchResult<Vec<RouteStopPattern>>;
    async fn route_stops_by_route_ids(
        &self,
        params: Vec<Param<i64>>,
    ) -> BatchResult<Vec<RouteStop>>;
    async fn route_stops_by_stop_ids(
        &self,
        params: Vec<Param<i64>>,
    ) -> BatchResult<Vec<RouteStop>>;
    async fn routes_by_agency_ids(
        &self,
        params: Vec<Param<i64, RouteFilter>>,
    ) -> BatchResult<Vec<Route>>;
    async fn routes_by_feed_version_ids(
        &self,
        params: Vec<Param<i64, RouteFilter>>,
    ) -> BatchResult<Vec<Route>>;
    async fn stops_by_feed_version_ids(
        &self,
        params: Vec<Param<i64, StopFilter>>,
    ) -> BatchResult<Vec<Stop>>;
    async fn stops_by_level_ids(
        &self,
        params: Vec<Param<i64, StopFilter>>,
    ) -> BatchResult<Vec<Stop>>;
    async fn stops_by_parent_stop_ids(
        &self,
        params: Vec<Param<i64, StopFilter>>,
    ) -> BatchResult<Vec<Stop>>;
    async fn stops_by_route_ids(
        &self,
        params: Vec<Param<i64, StopFilter>>,
    ) -> BatchResult<Vec<Stop>>;
    /// Keys are (feed version id, stop id).
    async fn stop_times_by_stop_ids(
        &self,
        params: Vec<Param<(i64, i64), StopTimeFilter>>,
    ) -> BatchResult<Vec<StopTime>>;
    /// Keys are (feed version id, trip id).
    async fn stop_times_by_trip_ids(
        &self,
        params: Vec<Param<(i64, i64), TripStopTimeFilter>>,
    ) -> BatchResult<Vec<StopTime>>;
    async fn trips_by_feed_version_ids(
        &self,
        params: Vec<Param<i64, TripFilter>>,
    ) -> BatchResult<Vec<Trip>>;
    async fn trips_by_route_ids(
        &self,
        params: Vec<Param<i64, TripFilter>>,
    ) -> BatchResult<Vec<Trip>>;

    // Entity edits. Each returns the id of the affected row.
    async fn stop_create(&self, input: StopSetInput) -> Result<i64, FinderError>;
    async fn stop_update(&self, input: StopSetInput) -> Result<i64, FinderError>;
    async fn stop_delete(&self, id: i64) -> Result<(), FinderError>;
    async fn level_create(&self, input: LevelSetInput) -> Result<i64, FinderError>;
    async fn level_update(&self, input: LevelSetInput) -> Result<i64, FinderError>;
    async fn level_delete(&self, id: i64) -> Result<(), FinderError>;
    async fn pathway_create(&self, input: PathwaySetInput) -> Result<i64, FinderError>;
    async fn pathway_update(&self, input: PathwaySetInput) -> Result<i64, FinderError>;
    async fn pathway_delete(&self, id: i64) -> Result<(), FinderError>;
}

/// Options for an alert lookup.
#[derive(Debug, Clone, Copy)]
pub struct AlertQuery {
    pub limit: usize,
    /// Keep only alerts active at `now`.
    pub active: bool,
    pub now: DateTime<Utc>,
}

/// Realtime overlay lookups.
///
/// Every method reads one consistent snapshot. Callers that make several
/// related lookups should take a [`RtSnapshot`] once and query it.
#[async_trait]
pub trait RtFinder: Send + Sync {
    /// Decode and install a protobuf message under a topic key.
    async fn add_data(&self, topic_key: &str, data: &[u8]) -> Result<(), FinderError>;

    /// The realtime state that applies to a feed version, as of now.
    async fn snapshot(&self, feed_version_id: i64) -> Result<RtSnapshot, FinderError>;

    /// The TripUpdate for a scheduled trip (matched by GTFS trip id).
    async fn find_trip(&self, trip: &Trip) -> Result<Option<TripUpdate>, FinderError>;

    /// Build a trip shell for a realtime-only trip id.
    async fn make_trip(&self, feed_version_id: i64, rt_trip_id: &str)
    -> Result<Trip, FinderError>;

    async fn get_gtfs_trip_id(&self, trip_id: i64) -> Result<Option<String>, FinderError>;

    async fn find_stop_time_update(
        &self,
        trip: &Trip,
        stop_time: &StopTime,
    ) -> Result<Option<RtStopTimeUpdate>, FinderError>;

    async fn get_added_trips_for_stop(&self, stop: &Stop) -> Result<Vec<TripUpdate>, FinderError>;

    async fn find_alerts_for_agency(
        &self,
        agency: &Agency,
        query: AlertQuery,
    ) -> Result<Vec<Alert>, FinderError>;
    async fn find_alerts_for_route(
        &self,
        route: &Route,
        query: AlertQuery,
    ) -> Result<Vec<Alert>, FinderError>;
    async fn find_alerts_for_trip(
        &self,
        trip: &Trip,
        query: AlertQuery,
    ) -> Result<Vec<Alert>, FinderError>;
    async fn find_alerts_for_stop(
        &self,
        stop: &Stop,
        query: AlertQuery,
    ) -> Result<Vec<Alert>, FinderError>;

    /// Alerts carried by one realtime feed, regardless of target.
    async fn find_alerts_for_feed(
        &self,
        feed_onestop_id: &str,
        query: AlertQuery,
    ) -> Result<Vec<Alert>, FinderError>;

    async fn find_vehicle_positions(
        &self,
        limit: usize,
        filter: Option<&VehiclePositionFilter>,
    ) -> Result<Vec<VehiclePosition>, FinderError>;

    /// Timezone of a stop: `known` if it names a zone, else the parent
    /// station's, else the feed version's agency zone.
    async fn stop_timezone(&self, stop_id: i64, known: &str) -> Result<Option<Tz>, FinderError>;
}

/// Bike-share lookups.
#[async_trait]
pub trait GbfsFinder: Send + Sync {
    async fn find_bikes(
        &self,
        limit: usize,
        request: &GbfsBikeRequest,
    ) -> Result<Vec<GbfsFreeBikeStatus>, FinderError>;
    async fn find_docks(
        &self,
        limit: usize,
        request: &GbfsDockRequest,
    ) -> Result<Vec<GbfsStationInformation>, FinderError>;
}

/// Authorization backend: extra roles granted to a named caller.
#[async_trait]
pub trait Checker: Send + Sync {
    async fn roles_for(&self, user_name: &str) -> Result<Vec<String>, FinderError>;
}

/// Feed ingestion commands invoked by mutations.
#[async_trait]
pub trait Actions: Send + Sync {
    async fn static_fetch(
        &self,
        feed_onestop_id: &str,
        url: Option<&str>,
        body: Option<Vec<u8>>,
    ) -> Result<FeedVersionFetchResult, FinderError>;
    async fn rt_fetch(
        &self,
        target_feed: &str,
        url: &str,
        url_type: &str,
    ) -> Result<(), FinderError>;
    async fn gbfs_fetch(&self, feed_onestop_id: &str, url: &str) -> Result<(), FinderError>;
    async fn validate_upload(
        &self,
        url: Option<&str>,
        body: Option<Vec<u8>>,
        rt_urls: &[String],
    ) -> Result<ValidationResult, FinderError>;
    async fn feed_version_import(
        &self,
        feed_version_id: i64,
    ) -> Result<FeedVersionImportResult, FinderError>;
    async fn feed_version_unimport(
        &self,
        feed_version_id: i64,
    ) -> Result<FeedVersionUnimportResult, FinderError>;
    async fn feed_version_delete(
        &self,
        feed_version_id: i64,
    ) -> Result<FeedVersionDeleteResult, FinderError>;
}

/// A queued background job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub kind: String,
    pub args: Vec<String>,
}

/// Where mutations hand off work that runs outside the request.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, job: Job) -> Result<(), FinderError>;
}
