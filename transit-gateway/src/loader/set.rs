//! The per-request loader set.

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use super::batch::{BatchResult, Loader, LoaderOptions};
use super::cancel::CancelSignal;
use super::params::Param;
use crate::domain::*;
use crate::finder::Finder;

/// Every loader a request may use, all backed by the same finder.
///
/// Built fresh for each request and dropped with it, so nothing cached
/// here outlives the request that fetched it.
pub struct Loaders {
    // By id.
    pub agencies_by_id: Loader<i64, Option<Agency>>,
    pub routes_by_id: Loader<i64, Option<Route>>,
    pub stops_by_id: Loader<i64, Option<Stop>>,
    pub trips_by_id: Loader<i64, Option<Trip>>,
    pub feeds_by_id: Loader<i64, Option<Feed>>,
    pub feed_versions_by_id: Loader<i64, Option<FeedVersion>>,
    pub feed_states_by_feed_id: Loader<i64, Option<FeedState>>,
    pub feed_version_gtfs_imports_by_feed_version_id: Loader<i64, Option<FeedVersionGtfsImport>>,
    pub feed_version_service_windows_by_feed_version_id:
        Loader<i64, Option<FeedVersionServiceWindow>>,
    pub calendars_by_id: Loader<i64, Option<Calendar>>,
    pub shapes_by_id: Loader<i64, Option<Shape>>,
    pub levels_by_id: Loader<i64, Option<Level>>,
    pub pathways_by_id: Loader<i64, Option<Pathway>>,
    pub census_tables_by_id: Loader<i64, Option<CensusTable>>,
    pub operators_by_agency_id: Loader<i64, Option<Operator>>,
    pub stop_external_references_by_stop_id: Loader<i64, Option<StopExternalReference>>,
    pub target_stops_by_stop_id: Loader<i64, Option<Stop>>,

    // By parameter record.
    pub agencies_by_feed_version_id: Loader<Param<i64, AgencyFilter>, Vec<Agency>>,
    pub agencies_by_onestop_id: Loader<Param<String, AgencyFilter>, Vec<Agency>>,
    pub agency_places_by_agency_id: Loader<Param<i64, AgencyPlaceFilter>, Vec<AgencyPlace>>,
    pub calendar_dates_by_service_id: Loader<Param<i64, CalendarDateFilter>, Vec<CalendarDate>>,
    pub census_geographies_by_entity_id:
        Loader<Param<(CensusEntityKind, i64), CensusGeographyFilter>, Vec<CensusGeography>>,
    pub census_values_by_geography_id: Loader<Param<(String, String)>, Vec<CensusValue>>,
    pub census_fields_by_table_id: Loader<Param<i64>, Vec<CensusField>>,
    pub census_sources_by_dataset_id: Loader<Param<i64, CensusSourceFilter>, Vec<CensusSource>>,
    pub feed_fetches_by_feed_id: Loader<Param<i64, FeedFetchFilter>, Vec<FeedFetch>>,
    pub feed_infos_by_feed_version_id: Loader<Param<i64>, Vec<FeedInfo>>,
    pub feed_versions_by_feed_id: Loader<Param<i64, FeedVersionFilter>, Vec<FeedVersion>>,
    pub feeds_by_operator_onestop_id: Loader<Param<String, FeedFilter>, Vec<Feed>>,
    pub feed_version_service_levels_by_feed_version_id:
        Loader<Param<i64, FeedVersionServiceLevelFilter>, Vec<FeedVersionServiceLevel>>,
    pub frequencies_by_trip_id: Loader<Param<i64>, Vec<Frequency>>,
    pub levels_by_parent_station_id: Loader<Param<i64>, Vec<Level>>,
    pub operators_by_feed_id: Loader<Param<i64, OperatorFilter>, Vec<Operator>>,
    pub pathways_by_from_stop_id: Loader<Param<i64, PathwayFilter>, Vec<Pathway>>,
    pub pathways_by_to_stop_id: Loader<Param<i64, PathwayFilter>, Vec<Pathway>>,
    pub route_geometries_by_route_id: Loader<Param<i64>, Vec<RouteGeometry>>,
    pub route_headways_by_route_id: Loader<Param<i64>, Vec<RouteHeadway>>,
    pub route_stop_patterns_by_route_id: Loader<Param<i64>, Vec<RouteStopPattern>>,
    pub route_stops_by_route_id: Loader<Param<i64>, Vec<RouteStop>>,
    pub route_stops_by_stop_id: Loader<Param<i64>, Vec<RouteStop>>,
    pub routes_by_agency_id: Loader<Param<i64, RouteFilter>, Vec<Route>>,
    pub routes_by_feed_version_id: Loader<Param<i64, RouteFilter>, Vec<Route>>,
    pub stops_by_feed_version_id: Loader<Param<i64, StopFilter>, Vec<Stop>>,
    pub stops_by_level_id: Loader<Param<i64, StopFilter>, Vec<Stop>>,
    pub stops_by_parent_stop_id: Loader<Param<i64, StopFilter>, Vec<Stop>>,
    pub stops_by_route_id: Loader<Param<i64, StopFilter>, Vec<Stop>>,
    pub stop_times_by_stop_id: Loader<Param<(i64, i64), StopTimeFilter>, Vec<StopTime>>,
    pub stop_times_by_trip_id: Loader<Param<(i64, i64), TripStopTimeFilter>, Vec<StopTime>>,
    pub trips_by_feed_version_id: Loader<Param<i64, TripFilter>, Vec<Trip>>,
    pub trips_by_route_id: Loader<Param<i64, TripFilter>, Vec<Trip>>,
}

/// Batch thresholds for a loader set.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoaderSettings {
    pub default: LoaderOptions,
    /// Stop-time lookups fan out far wider than anything else.
    pub stop_times: LoaderOptions,
}

/// Wire one loader to a finder method.
fn with_finder<K, V, F>(
    name: &'static str,
    finder: &Arc<dyn Finder>,
    options: LoaderOptions,
    cancel: &CancelSignal,
    fetch: F,
) -> Loader<K, V>
where
    K: Clone + Eq + std::hash::Hash + Send + Sync + 'static,
    V: Clone + Default + Send + Sync + 'static,
    F: Fn(Arc<dyn Finder>, Vec<K>) -> BoxFuture<'static, BatchResult<V>> + Send + Sync + 'static,
{
    let finder = Arc::clone(finder);
    Loader::new(name, options, cancel.clone(), move |keys| {
        fetch(Arc::clone(&finder), keys)
    })
}

impl Loaders {
    pub fn new(finder: &Arc<dyn Finder>, settings: LoaderSettings, cancel: &CancelSignal) -> Self {
        let o = settings.default;
        let st = settings.stop_times;
        Self {
            agencies_by_id: with_finder("agencies_by_id", finder, o, cancel, |f, k| {
                async move { f.agencies_by_ids(k).await }.boxed()
            }),
            routes_by_id: with_finder("routes_by_id", finder, o, cancel, |f, k| {
                async move { f.routes_by_ids(k).await }.boxed()
            }),
            stops_by_id: with_finder("stops_by_id", finder, o, cancel, |f, k| {
                async move { f.stops_by_ids(k).await }.boxed()
            }),
            trips_by_id: with_finder("trips_by_id", finder, o, cancel, |f, k| {
                async move { f.trips_by_ids(k).await }.boxed()
            }),
            feeds_by_id: with_finder("feeds_by_id", finder, o, cancel, |f, k| {
                async move { f.feeds_by_ids(k).await }.boxed()
            }),
            feed_versions_by_id: with_finder("feed_versions_by_id", finder, o, cancel, |f, k| {
                async move { f.feed_versions_by_ids(k).await }.boxed()
            }),
            feed_states_by_feed_id: with_finder(
                "feed_states_by_feed_id",
                finder,
                o,
                cancel,
                |f, k| async move { f.feed_states_by_feed_ids(k).await }.boxed(),
            ),
            feed_version_gtfs_imports_by_feed_version_id: with_finder(
                "feed_version_gtfs_imports_by_feed_version_id",
                finder,
                o,
                cancel,
                |f, k| async move { f.feed_version_gtfs_imports_by_feed_version_ids(k).await }.boxed(),
            ),
            feed_version_service_windows_by_feed_version_id: with_finder(
                "feed_version_service_windows_by_feed_version_id",
                finder,
                o,
                cancel,
                |f, k| {
                    async move { f.feed_version_service_windows_by_feed_version_ids(k).await }
                        .boxed()
                },
            ),
            calendars_by_id: with_finder("calendars_by_id", finder, o, cancel, |f, k| {
                async move { f.calendars_by_ids(k).await }.boxed()
            }),
            shapes_by_id: with_finder("shapes_by_id", finder, o, cancel, |f, k| {
                async move { f.shapes_by_ids(k).await }.boxed()
            }),
            levels_by_id: with_finder("levels_by_id", finder, o, cancel, |f, k| {
                async move { f.levels_by_ids(k).await }.boxed()
            }),
            pathways_by_id: with_finder("pathways_by_id", finder, o, cancel, |f, k| {
                async move { f.pathways_by_ids(k).await }.boxed()
            }),
            census_tables_by_id: with_finder("census_tables_by_id", finder, o, cancel, |f, k| {
                async move { f.census_tables_by_ids(k).await }.boxed()
            }),
            operators_by_agency_id: with_finder(
                "operators_by_agency_id",
                finder,
                o,
                cancel,
                |f, k| async move { f.operators_by_agency_ids(k).await }.boxed(),
            ),
            stop_external_references_by_stop_id: with_finder(
                "stop_external_references_by_stop_id",
                finder,
                o,
                cancel,
                |f, k| async move { f.stop_external_references_by_stop_ids(k).await }.boxed(),
            ),
            target_stops_by_stop_id: with_finder(
                "target_stops_by_stop_id",
                finder,
                o,
                cancel,
                |f, k| async move { f.target_stops_by_stop_ids(k).await }.boxed(),
            ),

            agencies_by_feed_version_id: with_finder(
                "agencies_by_feed_version_id",
                finder,
                o,
                cancel,
                |f, p| async move { f.agencies_by_feed_version_ids(p).await }.boxed(),
            ),
            agencies_by_onestop_id: with_finder(
                "agencies_by_onestop_id",
                finder,
                o,
                cancel,
                |f, p| async move { f.agencies_by_onestop_ids(p).await }.boxed(),
            ),
            agency_places_by_agency_id: with_finder(
                "agency_places_by_agency_id",
                finder,
                o,
                cancel,
                |f, p| async move { f.agency_places_by_agency_ids(p).await }.boxed(),
            ),
            calendar_dates_by_service_id: with_finder(
                "calendar_dates_by_service_id",
                finder,
                o,
                cancel,
                |f, p| async move { f.calendar_dates_by_service_ids(p).await }.boxed(),
            ),
            census_geographies_by_entity_id: with_finder(
                "census_geographies_by_entity_id",
                finder,
                o,
                cancel,
                |f, p| async move { f.census_geographies_by_entity_ids(p).await }.boxed(),
            ),
            census_values_by_geography_id: with_finder(
                "census_values_by_geography_id",
                finder,
                o,
                cancel,
                |f, p| async move { f.census_values_by_geography_ids(p).await }.boxed(),
            ),
            census_fields_by_table_id: with_finder(
                "census_fields_by_table_id",
                finder,
                o,
                cancel,
                |f, p| async move { f.census_fields_by_table_ids(p).await }.boxed(),
            ),
            census_sources_by_dataset_id: with_finder(
                "census_sources_by_dataset_id",
                finder,
                o,
                cancel,
                |f, p| async move { f.census_sources_by_dataset_ids(p).await }.boxed(),
            ),
            feed_fetches_by_feed_id: with_finder(
                "feed_fetches_by_feed_id",
                finder,
                o,
                cancel,
                |f, p| async move { f.feed_fetches_by_feed_ids(p).await }.boxed(),
            ),
            feed_infos_by_feed_version_id: with_finder(
                "feed_infos_by_feed_version_id",
                finder,
                o,
                cancel,
                |f, p| async move { f.feed_infos_by_feed_version_ids(p).await }.boxed(),
            ),
            feed_versions_by_feed_id: with_finder(
                "feed_versions_by_feed_id",
                finder,
                o,
                cancel,
                |f, p| async move { f.feed_versions_by_feed_ids(p).await }.boxed(),
            ),
            feeds_by_operator_onestop_id: with_finder(
                "feeds_by_operator_onestop_id",
                finder,
                o,
                cancel,
                |f, p| async move { f.feeds_by_operator_onestop_ids(p).await }.boxed(),
            ),
            feed_version_service_levels_by_feed_version_id: with_finder(
                "feed_version_service_levels_by_feed_version_id",
                finder,
                o,
                cancel,
                |f, p| {
                    async move { f.feed_version_service_levels_by_feed_version_ids(p).await }
                        .boxed()
                },
            ),
            frequencies_by_trip_id: with_finder(
                "frequencies_by_trip_id",
                finder,
                o,
                cancel,
                |f, p| async move { f.frequencies_by_trip_ids(p).await }.boxed(),
            ),
            levels_by_parent_station_id: with_finder(
                "levels_by_parent_station_id",
                finder,
                o,
                cancel,
                |f, p| async move { f.levels_by_parent_station_ids(p).await }.boxed(),
            ),
            operators_by_feed_id: with_finder(
                "operators_by_feed_id",
                finder,
                o,
                cancel,
                |f, p| async move { f.operators_by_feed_ids(p).await }.boxed(),
            ),
            pathways_by_from_stop_id: with_finder(
                "pathways_by_from_stop_id",
                finder,
                o,
                cancel,
                |f, p| async move { f.pathways_by_from_stop_ids(p).await }.boxed(),
            ),
            pathways_by_to_stop_id: with_finder(
                "pathways_by_to_stop_id",
                finder,
                o,
                cancel,
                |f, p| async move { f.pathways_by_to_stop_ids(p).await }.boxed(),
            ),
            route_geometries_by_route_id: with_finder(
                "route_geometries_by_route_id",
                finder,
                o,
                cancel,
                |f, p| async move { f.route_geometries_by_route_ids(p).await }.boxed(),
            ),
            route_headways_by_route_id: with_finder(
                "route_headways_by_route_id",
                finder,
                o,
                cancel,
                |f, p| async move { f.route_headways_by_route_ids(p).await }.boxed(),
            ),
            route_stop_patterns_by_route_id: with_finder(
                "route_stop_patterns_by_route_id",
                finder,
                o,
                cancel,
                |f, p| async move { f.route_stop_patterns_by_route_ids(p).await }.boxed(),
            ),
            route_stops_by_route_id: with_finder(
                "route_stops_by_route_id",
                finder,
                o,
                cancel,
                |f, p| async move { f.route_stops_by_route_ids(p).await }.boxed(),
            ),
            route_stops_by_stop_id: with_finder(
                "route_stops_by_stop_id",
                finder,
                o,
                cancel,
                |f, p| async move { f.route_stops_by_stop_ids(p).await }.boxed(),
            ),
            routes_by_agency_id: with_finder(
                "routes_by_agency_id",
                finder,
                o,
                cancel,
                |f, p| async move { f.routes_by_agency_ids(p).await }.boxed(),
            ),
            routes_by_feed_version_id: with_finder(
                "routes_by_feed_version_id",
                finder,
                o,
                cancel,
                |f, p| async move { f.routes_by_feed_version_ids(p).await }.boxed(),
            ),
            stops_by_feed_version_id: with_finder(
                "stops_by_feed_version_id",
                finder,
                o,
                cancel,
                |f, p| async move { f.stops_by_feed_version_ids(p).await }.boxed(),
            ),
            stops_by_level_id: with_finder("stops_by_level_id", finder, o, cancel, |f, p| {
                async move { f.stops_by_level_ids(p).await }.boxed()
            }),
            stops_by_parent_stop_id: with_finder(
                "stops_by_parent_stop_id",
                finder,
                o,
                cancel,
                |f, p| async move { f.stops_by_parent_stop_ids(p).await }.boxed(),
            ),
            stops_by_route_id: with_finder("stops_by_route_id", finder, o, cancel, |f, p| {
                async move { f.stops_by_route_ids(p).await }.boxed()
            }),
            stop_times_by_stop_id: with_finder(
                "stop_times_by_stop_id",
                finder,
                st,
                cancel,
                |f, p| async move { f.stop_times_by_stop_ids(p).await }.boxed(),
            ),
            stop_times_by_trip_id: with_finder(
                "stop_times_by_trip_id",
                finder,
                st,
                cancel,
                |f, p| async move { f.stop_times_by_trip_ids(p).await }.boxed(),
            ),
            trips_by_feed_version_id: with_finder(
                "trips_by_feed_version_id",
                finder,
                o,
                cancel,
                |f, p| async move { f.trips_by_feed_version_ids(p).await }.boxed(),
            ),
            trips_by_route_id: with_finder("trips_by_route_id", finder, o, cancel, |f, p| {
                async move { f.trips_by_route_ids(p).await }.boxed()
            }),
        }
    }
}
