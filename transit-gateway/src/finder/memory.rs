//! In-memory warehouse.
//!
//! Serves every [`Finder`] and [`GbfsFinder`] method from a JSON snapshot
//! held in memory. The binary uses it when pointed at a data directory, and
//! tests build one directly. Each call is counted per method so batching
//! behavior can be observed.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::f64::consts::PI;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use geo::{ConvexHull, Coord, MultiPoint, Point};
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, info};

use super::{FindArgs, Finder, FinderError, GbfsFinder};
use crate::domain::*;
use crate::loader::{BatchResult, Param, param_group_query};
use crate::service_time::{ServiceWindow, derive_service_window};

/// File name of the snapshot inside a data directory.
pub const SNAPSHOT_FILE: &str = "warehouse.json";

/// Every table the in-memory warehouse holds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FinderData {
    pub feeds: Vec<Feed>,
    pub feed_states: Vec<FeedState>,
    pub feed_fetches: Vec<FeedFetch>,
    pub feed_versions: Vec<FeedVersion>,
    pub feed_version_gtfs_imports: Vec<FeedVersionGtfsImport>,
    pub feed_version_service_windows: Vec<FeedVersionServiceWindow>,
    pub feed_version_service_levels: Vec<FeedVersionServiceLevel>,
    pub feed_infos: Vec<FeedInfo>,
    pub agencies: Vec<Agency>,
    pub agency_places: Vec<AgencyPlace>,
    pub operators: Vec<Operator>,
    pub routes: Vec<Route>,
    pub route_stops: Vec<RouteStop>,
    pub route_headways: Vec<RouteHeadway>,
    pub route_stop_patterns: Vec<RouteStopPattern>,
    pub route_geometries: Vec<RouteGeometry>,
    pub stops: Vec<Stop>,
    pub stop_external_references: Vec<StopExternalReference>,
    pub levels: Vec<Level>,
    pub pathways: Vec<Pathway>,
    pub trips: Vec<Trip>,
    pub stop_times: Vec<StopTime>,
    pub calendars: Vec<Calendar>,
    pub calendar_dates: Vec<CalendarDate>,
    pub frequencies: Vec<Frequency>,
    pub shapes: Vec<Shape>,
    pub census_datasets: Vec<CensusDataset>,
    pub census_sources: Vec<CensusSource>,
    pub census_geographies: Vec<CensusGeography>,
    pub census_tables: Vec<CensusTable>,
    pub census_fields: Vec<CensusField>,
    pub census_values: Vec<CensusValue>,
    pub gbfs_bikes: Vec<GbfsFreeBikeStatus>,
    pub gbfs_docks: Vec<GbfsStationInformation>,
}

impl FinderData {
    /// Read `warehouse.json` from a data directory.
    pub fn load(data_dir: impl AsRef<Path>) -> Result<Self, FinderError> {
        let path = data_dir.as_ref().join(SNAPSHOT_FILE);
        let json = std::fs::read_to_string(&path)
            .map_err(|e| FinderError::Backend(format!("failed to read {:?}: {}", path, e)))?;
        let data: FinderData = serde_json::from_str(&json)
            .map_err(|e| FinderError::Backend(format!("failed to parse {:?}: {}", path, e)))?;
        info!(
            path = %path.display(),
            feeds = data.feeds.len(),
            feed_versions = data.feed_versions.len(),
            stops = data.stops.len(),
            stop_times = data.stop_times.len(),
            "loaded warehouse snapshot"
        );
        Ok(data)
    }
}

/// A [`Finder`] over a [`FinderData`] snapshot.
pub struct MemoryFinder {
    data: RwLock<FinderData>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

impl MemoryFinder {
    pub fn new(data: FinderData) -> Self {
        Self {
            data: RwLock::new(data),
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn load(data_dir: impl AsRef<Path>) -> Result<Self, FinderError> {
        FinderData::load(data_dir).map(Self::new)
    }

    /// How many times the named method has been called.
    pub fn calls(&self, method: &str) -> usize {
        let calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
        calls.get(method).copied().unwrap_or(0)
    }

    fn record(&self, method: &'static str) {
        let mut calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
        *calls.entry(method).or_default() += 1;
    }

    async fn read(&self, method: &'static str) -> RwLockReadGuard<'_, FinderData> {
        self.record(method);
        self.data.read().await
    }

    /// Run a change against the tables under the write lock.
    pub(crate) async fn edit<R>(
        &self,
        method: &'static str,
        change: impl FnOnce(&mut FinderData) -> R,
    ) -> R {
        self.record(method);
        let mut data = self.data.write().await;
        change(&mut data)
    }
}

/// Apply id, cursor, filter and limit to a root selection.
fn select<T: Clone, W>(
    rows: &[T],
    args: &FindArgs<W>,
    key: impl Fn(&T) -> (i64, i64),
    keep: impl Fn(&T, &W) -> bool,
) -> Vec<T> {
    let mut hits: Vec<&T> = rows
        .iter()
        .filter(|&r| {
            let (fvid, id) = key(r);
            (args.ids.is_empty() || args.ids.contains(&id))
                && args.after.is_none_or(|c| c.admits(fvid, id))
                && args.filter.as_ref().is_none_or(|f| keep(r, f))
        })
        .collect();
    hits.sort_by_key(|&r| key(r));
    hits.into_iter().take(args.limit).cloned().collect()
}

fn by_ids<T: Clone>(rows: &[T], ids: &[i64], key: impl Fn(&T) -> i64) -> BatchResult<Option<T>> {
    Ok(ids
        .iter()
        .map(|id| Ok(rows.iter().find(|r| key(r) == *id).cloned()))
        .collect())
}

/// Serve a by-parameter batch: rows of `rows` belonging to each key and
/// passing the record's filter.
fn children<K: Clone, W, T: Clone>(
    params: &[Param<K, W>],
    rows: &[T],
    belongs: impl Fn(&T, &K) -> bool,
    keep: impl Fn(&T, &W) -> bool,
) -> BatchResult<Vec<T>> {
    param_group_query(params, |keys, filter, _| {
        Ok(keys
            .iter()
            .map(|k| {
                rows.iter()
                    .filter(|&r| belongs(r, k) && filter.is_none_or(|f| keep(r, f)))
                    .cloned()
                    .collect()
            })
            .collect())
    })
}

fn any<T, W>(_: &T, _: &W) -> bool {
    true
}

fn next_id(ids: impl Iterator<Item = i64>) -> i64 {
    ids.max().unwrap_or(0) + 1
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, FinderError> {
    value.ok_or_else(|| FinderError::InvalidQuery(format!("{} is required", field)))
}

/// A polygon approximating a circle of `radius` meters around `p`.
fn circle(p: Point<f64>, radius: f64) -> Vec<Coord<f64>> {
    const SIDES: usize = 16;
    const METERS_PER_DEGREE: f64 = 111_320.0;
    let dlat = radius / METERS_PER_DEGREE;
    let dlon = dlat / p.y().to_radians().cos().max(0.01);
    (0..SIDES)
        .map(|i| {
            let a = 2.0 * PI * i as f64 / SIDES as f64;
            Coord {
                x: p.x() + dlon * a.cos(),
                y: p.y() + dlat * a.sin(),
            }
        })
        .collect()
}

fn place_key(
    level: PlaceAggregationLevel,
    p: &AgencyPlace,
) -> (Option<String>, Option<String>, Option<String>) {
    use PlaceAggregationLevel::*;
    let adm0 = matches!(level, Adm0 | Adm0Adm1 | Adm0Adm1City | Adm0City);
    let adm1 = matches!(level, Adm0Adm1 | Adm0Adm1City | Adm1City);
    let city = matches!(level, Adm0Adm1City | Adm0City | Adm1City | City);
    (
        p.adm0_name.clone().filter(|_| adm0),
        p.adm1_name.clone().filter(|_| adm1),
        p.city_name.clone().filter(|_| city),
    )
}

#[async_trait]
impl Finder for MemoryFinder {
    async fn find_agencies(&self, args: FindArgs<AgencyFilter>) -> Result<Vec<Agency>, FinderError> {
        let d = self.read("find_agencies").await;
        Ok(select(
            &d.agencies,
            &args,
            |a| (a.feed_version_id, a.id),
            |a, f| d.agency_matches(a, f),
        ))
    }

    async fn find_routes(&self, args: FindArgs<RouteFilter>) -> Result<Vec<Route>, FinderError> {
        let d = self.read("find_routes").await;
        Ok(select(
            &d.routes,
            &args,
            |r| (r.feed_version_id, r.id),
            |r, f| d.route_matches(r, f),
        ))
    }

    async fn find_stops(&self, args: FindArgs<StopFilter>) -> Result<Vec<Stop>, FinderError> {
        let d = self.read("find_stops").await;
        Ok(select(
            &d.stops,
            &args,
            |s| (s.feed_version_id, s.id),
            |s, f| d.stop_matches(s, f),
        ))
    }

    async fn find_trips(&self, args: FindArgs<TripFilter>) -> Result<Vec<Trip>, FinderError> {
        let d = self.read("find_trips").await;
        Ok(select(
            &d.trips,
            &args,
            |t| (t.feed_version_id, t.id),
            |t, f| d.trip_matches(t, f),
        ))
    }

    async fn find_feeds(&self, args: FindArgs<FeedFilter>) -> Result<Vec<Feed>, FinderError> {
        let d = self.read("find_feeds").await;
        Ok(select(&d.feeds, &args, |f| (0, f.id), |feed, f| d.feed_matches(feed, f)))
    }

    async fn find_feed_versions(
        &self,
        args: FindArgs<FeedVersionFilter>,
    ) -> Result<Vec<FeedVersion>, FinderError> {
        let d = self.read("find_feed_versions").await;
        Ok(select(
            &d.feed_versions,
            &args,
            |fv| (0, fv.id),
            |fv, f| d.feed_version_matches(fv, f),
        ))
    }

    async fn find_operators(
        &self,
        args: FindArgs<OperatorFilter>,
    ) -> Result<Vec<Operator>, FinderError> {
        let d = self.read("find_operators").await;
        let mut rows = select(
            &d.operators,
            &FindArgs {
                limit: usize::MAX,
                after: args.after,
                ids: args.ids.clone(),
                filter: args.filter.clone(),
            },
            |o| (0, o.id),
            |o, f| d.operator_matches(o, f),
        );
        if args.filter.as_ref().and_then(|f| f.merged) == Some(true) {
            let mut seen = BTreeSet::new();
            rows.retain(|o| seen.insert(o.onestop_id.clone()));
        }
        rows.truncate(args.limit);
        Ok(rows)
    }

    async fn find_places(
        &self,
        limit: usize,
        level: PlaceAggregationLevel,
        filter: Option<PlaceFilter>,
    ) -> Result<Vec<Place>, FinderError> {
        let d = self.read("find_places").await;
        let min_rank = filter.as_ref().and_then(|f| f.min_rank);
        let mut groups: BTreeMap<_, BTreeSet<i64>> = BTreeMap::new();
        for p in &d.agency_places {
            if min_rank.is_some_and(|r| p.rank < r) {
                continue;
            }
            groups.entry(place_key(level, p)).or_default().insert(p.agency_id);
        }
        let wanted = |want: Option<&String>, have: &Option<String>| {
            want.is_none_or(|w| have.as_ref() == Some(w))
        };
        let places = groups
            .into_iter()
            .filter(|((adm0, adm1, city), _)| {
                filter.as_ref().is_none_or(|f| {
                    wanted(f.adm0_name.as_ref(), adm0)
                        && wanted(f.adm1_name.as_ref(), adm1)
                        && wanted(f.city_name.as_ref(), city)
                })
            })
            .take(limit)
            .map(|((adm0_name, adm1_name, city_name), agencies)| {
                let mut operator_onestop_ids: BTreeSet<String> = BTreeSet::new();
                for agency_id in &agencies {
                    let ops: Vec<&Operator> = d
                        .operators
                        .iter()
                        .filter(|o| o.agency_id == Some(*agency_id))
                        .collect();
                    if ops.is_empty() {
                        if let Some(a) = d.agencies.iter().find(|a| a.id == *agency_id) {
                            operator_onestop_ids.insert(a.onestop_id.clone());
                        }
                    }
                    operator_onestop_ids.extend(ops.into_iter().map(|o| o.onestop_id.clone()));
                }
                Place {
                    adm0_name,
                    adm1_name,
                    city_name,
                    count: agencies.len() as i64,
                    operator_onestop_ids: operator_onestop_ids.into_iter().collect(),
                }
            })
            .collect();
        Ok(places)
    }

    async fn find_census_datasets(
        &self,
        args: FindArgs<CensusDatasetFilter>,
    ) -> Result<Vec<CensusDataset>, FinderError> {
        let d = self.read("find_census_datasets").await;
        Ok(select(
            &d.census_datasets,
            &args,
            |ds| (0, ds.id),
            |ds, f| {
                f.name.as_ref().is_none_or(|n| &ds.name == n)
                    && f.search.as_deref().is_none_or(|s| {
                        ds.name.to_lowercase().contains(&s.to_lowercase())
                    })
            },
        ))
    }

    async fn route_stop_buffer(
        &self,
        route_id: i64,
        radius: f64,
    ) -> Result<Option<RouteStopBuffer>, FinderError> {
        let d = self.read("route_stop_buffer").await;
        if d.route(route_id).is_none() {
            return Ok(None);
        }
        let points = d.route_stop_points(route_id);
        if points.is_empty() {
            return Ok(Some(RouteStopBuffer::default()));
        }
        let stop_points = MultiPoint::new(points.clone());
        let stop_convexhull = stop_points.convex_hull();
        let ring: Vec<Point<f64>> = points
            .iter()
            .flat_map(|p| circle(*p, radius))
            .map(Point::from)
            .collect();
        let stop_buffer = MultiPoint::new(ring).convex_hull();
        Ok(Some(RouteStopBuffer {
            stop_points: Some(stop_points),
            stop_buffer: Some(stop_buffer),
            stop_convexhull: Some(stop_convexhull),
        }))
    }

    async fn find_feed_version_service_window(
        &self,
        feed_version_id: i64,
    ) -> Result<Option<ServiceWindow>, FinderError> {
        let d = self.read("find_feed_version_service_window").await;
        let stored = d
            .feed_version_service_windows
            .iter()
            .find(|w| w.feed_version_id == feed_version_id)
            .and_then(ServiceWindow::from_record);
        if stored.is_some() {
            return Ok(stored);
        }
        let Some(fv) = d.feed_version(feed_version_id) else {
            return Ok(None);
        };
        let feed_info = d
            .feed_infos
            .iter()
            .find(|fi| fi.feed_version_id == feed_version_id);
        let levels: Vec<FeedVersionServiceLevel> = d
            .feed_version_service_levels
            .iter()
            .filter(|l| l.feed_version_id == feed_version_id)
            .cloned()
            .collect();
        Ok(derive_service_window(
            fv.fetched_at.date_naive(),
            feed_info,
            &levels,
        ))
    }

    async fn feed_version_rt_topics(
        &self,
        feed_version_id: i64,
    ) -> Result<Vec<String>, FinderError> {
        let d = self.read("feed_version_rt_topics").await;
        let Some(fv) = d.feed_version(feed_version_id) else {
            return Err(FinderError::not_found("feed version", feed_version_id));
        };
        let Some(feed) = d.feed(fv.feed_id) else {
            return Ok(Vec::new());
        };
        let mut topics = vec![feed.onestop_id.clone()];
        topics.extend(feed.associated_feeds.iter().cloned());
        topics.extend(
            d.feeds
                .iter()
                .filter(|f| f.spec == FeedSpec::GtfsRt && f.associated_feeds.contains(&feed.onestop_id))
                .map(|f| f.onestop_id.clone()),
        );
        let mut seen = BTreeSet::new();
        topics.retain(|t| seen.insert(t.clone()));
        Ok(topics)
    }

    async fn route_internal_id(
        &self,
        feed_version_id: i64,
        route_id: &str,
    ) -> Result<Option<i64>, FinderError> {
        let d = self.read("route_internal_id").await;
        Ok(d
            .routes
            .iter()
            .find(|r| r.feed_version_id == feed_version_id && r.route_id == route_id)
            .map(|r| r.id))
    }

    async fn agencies_by_ids(&self, ids: Vec<i64>) -> BatchResult<Option<Agency>> {
        let d = self.read("agencies_by_ids").await;
        by_ids(&d.agencies, &ids, |a| a.id)
    }

    async fn routes_by_ids(&self, ids: Vec<i64>) -> BatchResult<Option<Route>> {
        let d = self.read("routes_by_ids").await;
        by_ids(&d.routes, &ids, |r| r.id)
    }

    async fn stops_by_ids(&self, ids: Vec<i64>) -> BatchResult<Option<Stop>> {
        let d = self.read("stops_by_ids").await;
        by_ids(&d.stops, &ids, |s| s.id)
    }

    async fn trips_by_ids(&self, ids: Vec<i64>) -> BatchResult<Option<Trip>> {
        let d = self.read("trips_by_ids").await;
        by_ids(&d.trips, &ids, |t| t.id)
    }

    async fn feeds_by_ids(&self, ids: Vec<i64>) -> BatchResult<Option<Feed>> {
        let d = self.read("feeds_by_ids").await;
        by_ids(&d.feeds, &ids, |f| f.id)
    }

    async fn feed_versions_by_ids(&self, ids: Vec<i64>) -> BatchResult<Option<FeedVersion>> {
        let d = self.read("feed_versions_by_ids").await;
        by_ids(&d.feed_versions, &ids, |fv| fv.id)
    }

    async fn feed_states_by_feed_ids(&self, ids: Vec<i64>) -> BatchResult<Option<FeedState>> {
        let d = self.read("feed_states_by_feed_ids").await;
        by_ids(&d.feed_states, &ids, |s| s.feed_id)
    }

    async fn feed_version_gtfs_imports_by_feed_version_ids(
        &self,
        ids: Vec<i64>,
    ) -> BatchResult<Option<FeedVersionGtfsImport>> {
        let d = self
            .read("feed_version_gtfs_imports_by_feed_version_ids")
            .await;
        by_ids(&d.feed_version_gtfs_imports, &ids, |i| i.feed_version_id)
    }

    async fn feed_version_service_windows_by_feed_version_ids(
        &self,
        ids: Vec<i64>,
    ) -> BatchResult<Option<FeedVersionServiceWindow>> {
        let d = self
            .read("feed_version_service_windows_by_feed_version_ids")
            .await;
        by_ids(&d.feed_version_service_windows, &ids, |w| w.feed_version_id)
    }

    async fn calendars_by_ids(&self, ids: Vec<i64>) -> BatchResult<Option<Calendar>> {
        let d = self.read("calendars_by_ids").await;
        by_ids(&d.calendars, &ids, |c| c.id)
    }

    async fn shapes_by_ids(&self, ids: Vec<i64>) -> BatchResult<Option<Shape>> {
        let d = self.read("shapes_by_ids").await;
        by_ids(&d.shapes, &ids, |s| s.id)
    }

    async fn levels_by_ids(&self, ids: Vec<i64>) -> BatchResult<Option<Level>> {
        let d = self.read("levels_by_ids").await;
        by_ids(&d.levels, &ids, |l| l.id)
    }

    async fn pathways_by_ids(&self, ids: Vec<i64>) -> BatchResult<Option<Pathway>> {
        let d = self.read("pathways_by_ids").await;
        by_ids(&d.pathways, &ids, |p| p.id)
    }

    async fn census_tables_by_ids(&self, ids: Vec<i64>) -> BatchResult<Option<CensusTable>> {
        let d = self.read("census_tables_by_ids").await;
        by_ids(&d.census_tables, &ids, |t| t.id)
    }

    async fn operators_by_agency_ids(&self, ids: Vec<i64>) -> BatchResult<Option<Operator>> {
        let d = self.read("operators_by_agency_ids").await;
        Ok(ids
            .iter()
            .map(|id| {
                Ok(d.operators
                    .iter()
                    .find(|o| o.agency_id == Some(*id))
                    .cloned())
            })
            .collect())
    }

    async fn stop_external_references_by_stop_ids(
        &self,
        ids: Vec<i64>,
    ) -> BatchResult<Option<StopExternalReference>> {
        let d = self.read("stop_external_references_by_stop_ids").await;
        by_ids(&d.stop_external_references, &ids, |r| r.stop_id)
    }

    async fn target_stops_by_stop_ids(&self, ids: Vec<i64>) -> BatchResult<Option<Stop>> {
        let d = self.read("target_stops_by_stop_ids").await;
        Ok(ids
            .iter()
            .map(|id| {
                let target = d
                    .stop_external_references
                    .iter()
                    .find(|r| r.stop_id == *id && !r.inactive)
                    .and_then(|r| {
                        let feed = d.feed_by_onestop_id(&r.target_feed_onestop_id)?;
                        let fvid = d.active_feed_version(feed.id)?;
                        d.stops
                            .iter()
                            .find(|s| s.feed_version_id == fvid && s.stop_id == r.target_stop_id)
                    });
                Ok(target.cloned())
            })
            .collect())
    }

    async fn agencies_by_feed_version_ids(
        &self,
        params: Vec<Param<i64, AgencyFilter>>,
    ) -> BatchResult<Vec<Agency>> {
        let d = self.read("agencies_by_feed_version_ids").await;
        children(
            &params,
            &d.agencies,
            |a, k| a.feed_version_id == *k,
            |a, f| d.agency_matches(a, f),
        )
    }

    async fn agencies_by_onestop_ids(
        &self,
        params: Vec<Param<String, AgencyFilter>>,
    ) -> BatchResult<Vec<Agency>> {
        let d = self.read("agencies_by_onestop_ids").await;
        children(
            &params,
            &d.agencies,
            |a, k| &a.onestop_id == k,
            |a, f| d.agency_matches(a, f),
        )
    }

    async fn agency_places_by_agency_ids(
        &self,
        params: Vec<Param<i64, AgencyPlaceFilter>>,
    ) -> BatchResult<Vec<AgencyPlace>> {
        let d = self.read("agency_places_by_agency_ids").await;
        children(
            &params,
            &d.agency_places,
            |p, k| p.agency_id == *k,
            |p, f| f.min_rank.is_none_or(|r| p.rank >= r),
        )
    }

    async fn calendar_dates_by_service_ids(
        &self,
        params: Vec<Param<i64, CalendarDateFilter>>,
    ) -> BatchResult<Vec<CalendarDate>> {
        let d = self.read("calendar_dates_by_service_ids").await;
        children(
            &params,
            &d.calendar_dates,
            |cd, k| cd.service_id == *k,
            |cd, f| {
                f.date.is_none_or(|date| cd.date == date)
                    && f.exception_type.is_none_or(|t| cd.exception_type == t)
            },
        )
    }

    async fn census_geographies_by_entity_ids(
        &self,
        params: Vec<Param<(CensusEntityKind, i64), CensusGeographyFilter>>,
    ) -> BatchResult<Vec<CensusGeography>> {
        let d = self.read("census_geographies_by_entity_ids").await;
        param_group_query(&params, |keys, filter, _| {
            Ok(keys
                .iter()
                .map(|(kind, id)| {
                    let points = d.census_entity_points(*kind, *id);
                    d.census_geographies
                        .iter()
                        .filter(|g| d.census_geography_matches(g, &points, filter))
                        .cloned()
                        .collect()
                })
                .collect())
        })
    }

    async fn census_values_by_geography_ids(
        &self,
        params: Vec<Param<(String, String)>>,
    ) -> BatchResult<Vec<CensusValue>> {
        let d = self.read("census_values_by_geography_ids").await;
        children(
            &params,
            &d.census_values,
            |v, (geoid, tables)| {
                &v.geoid == geoid
                    && d.census_tables.iter().any(|t| {
                        t.id == v.table_id && tables.split(',').any(|n| n.trim() == t.table_name)
                    })
            },
            any,
        )
    }

    async fn census_fields_by_table_ids(
        &self,
        params: Vec<Param<i64>>,
    ) -> BatchResult<Vec<CensusField>> {
        let d = self.read("census_fields_by_table_ids").await;
        children(&params, &d.census_fields, |f, k| f.table_id == *k, any)
    }

    async fn census_sources_by_dataset_ids(
        &self,
        params: Vec<Param<i64, CensusSourceFilter>>,
    ) -> BatchResult<Vec<CensusSource>> {
        let d = self.read("census_sources_by_dataset_ids").await;
        children(
            &params,
            &d.census_sources,
            |s, k| s.dataset_id == *k,
            |s, f| f.name.as_ref().is_none_or(|n| &s.name == n),
        )
    }

    async fn feed_fetches_by_feed_ids(
        &self,
        params: Vec<Param<i64, FeedFetchFilter>>,
    ) -> BatchResult<Vec<FeedFetch>> {
        let d = self.read("feed_fetches_by_feed_ids").await;
        let mut fetches = d.feed_fetches.clone();
        fetches.sort_by(|a, b| b.fetched_at.cmp(&a.fetched_at));
        children(
            &params,
            &fetches,
            |ff, k| ff.feed_id == *k,
            |ff, f| f.success.is_none_or(|s| ff.success == s),
        )
    }

    async fn feed_infos_by_feed_version_ids(
        &self,
        params: Vec<Param<i64>>,
    ) -> BatchResult<Vec<FeedInfo>> {
        let d = self.read("feed_infos_by_feed_version_ids").await;
        children(&params, &d.feed_infos, |fi, k| fi.feed_version_id == *k, any)
    }

    async fn feed_versions_by_feed_ids(
        &self,
        params: Vec<Param<i64, FeedVersionFilter>>,
    ) -> BatchResult<Vec<FeedVersion>> {
        let d = self.read("feed_versions_by_feed_ids").await;
        let mut versions = d.feed_versions.clone();
        versions.sort_by(|a, b| b.fetched_at.cmp(&a.fetched_at));
        children(
            &params,
            &versions,
            |fv, k| fv.feed_id == *k,
            |fv, f| d.feed_version_matches(fv, f),
        )
    }

    async fn feeds_by_operator_onestop_ids(
        &self,
        params: Vec<Param<String, FeedFilter>>,
    ) -> BatchResult<Vec<Feed>> {
        let d = self.read("feeds_by_operator_onestop_ids").await;
        children(
            &params,
            &d.feeds,
            |feed, k| {
                d.operators
                    .iter()
                    .any(|o| &o.onestop_id == k && o.feed_id == Some(feed.id))
            },
            |feed, f| d.feed_matches(feed, f),
        )
    }

    async fn feed_version_service_levels_by_feed_version_ids(
        &self,
        params: Vec<Param<i64, FeedVersionServiceLevelFilter>>,
    ) -> BatchResult<Vec<FeedVersionServiceLevel>> {
        let d = self
            .read("feed_version_service_levels_by_feed_version_ids")
            .await;
        let mut levels = d.feed_version_service_levels.clone();
        levels.sort_by_key(|l| l.start_date);
        children(
            &params,
            &levels,
            |l, k| l.feed_version_id == *k,
            |l, f| {
                f.start_date.is_none_or(|s| l.end_date >= s)
                    && f.end_date.is_none_or(|e| l.start_date <= e)
            },
        )
    }

    async fn frequencies_by_trip_ids(
        &self,
        params: Vec<Param<i64>>,
    ) -> BatchResult<Vec<Frequency>> {
        let d = self.read("frequencies_by_trip_ids").await;
        children(&params, &d.frequencies, |fr, k| fr.trip_id == *k, any)
    }

    async fn levels_by_parent_station_ids(
        &self,
        params: Vec<Param<i64>>,
    ) -> BatchResult<Vec<Level>> {
        let d = self.read("levels_by_parent_station_ids").await;
        children(&params, &d.levels, |l, k| l.parent_station == Some(*k), any)
    }

    async fn operators_by_feed_ids(
        &self,
        params: Vec<Param<i64, OperatorFilter>>,
    ) -> BatchResult<Vec<Operator>> {
        let d = self.read("operators_by_feed_ids").await;
        children(
            &params,
            &d.operators,
            |o, k| o.feed_id == Some(*k),
            |o, f| d.operator_matches(o, f),
        )
    }

    async fn pathways_by_from_stop_ids(
        &self,
        params: Vec<Param<i64, PathwayFilter>>,
    ) -> BatchResult<Vec<Pathway>> {
        let d = self.read("pathways_by_from_stop_ids").await;
        children(
            &params,
            &d.pathways,
            |p, k| p.from_stop_id == *k,
            |p, f| f.pathway_mode.is_none_or(|m| p.pathway_mode == m),
        )
    }

    async fn pathways_by_to_stop_ids(
        &self,
        params: Vec<Param<i64, PathwayFilter>>,
    ) -> BatchResult<Vec<Pathway>> {
        let d = self.read("pathways_by_to_stop_ids").await;
        children(
            &params,
            &d.pathways,
            |p, k| p.to_stop_id == *k,
            |p, f| f.pathway_mode.is_none_or(|m| p.pathway_mode == m),
        )
    }

    async fn route_geometries_by_route_ids(
        &self,
        params: Vec<Param<i64>>,
    ) -> BatchResult<Vec<RouteGeometry>> {
        let d = self.read("route_geometries_by_route_ids").await;
        children(&params, &d.route_geometries, |g, k| g.route_id == *k, any)
    }

    async fn route_headways_by_route_ids(
        &self,
        params: Vec<Param<i64>>,
    ) -> BatchResult<Vec<RouteHeadway>> {
        let d = self.read("route_headways_by_route_ids").await;
        children(&params, &d.route_headways, |h, k| h.route_id == *k, any)
    }

    async fn route_stop_patterns_by_route_ids(
        &self,
        params: Vec<Param<i64>>,
    ) -> BatchResult<Vec<RouteStopPattern>> {
        let d = self.read("route_stop_patterns_by_route_ids").await;
        children(&params, &d.route_stop_patterns, |p, k| p.route_id == *k, any)
    }

    async fn route_stops_by_route_ids(
        &self,
        params: Vec<Param<i64>>,
    ) -> BatchResult<Vec<RouteStop>> {
        let d = self.read("route_stops_by_route_ids").await;
        children(&params, &d.route_stops, |rs, k| rs.route_id == *k, any)
    }

    async fn route_stops_by_stop_ids(
        &self,
        params: Vec<Param<i64>>,
    ) -> BatchResult<Vec<RouteStop>> {
        let d = self.read("route_stops_by_stop_ids").await;
        children(&params, &d.route_stops, |rs, k| rs.stop_id == *k, any)
    }

    async fn routes_by_agency_ids(
        &self,
        params: Vec<Param<i64, RouteFilter>>,
    ) -> BatchResult<Vec<Route>> {
        let d = self.read("routes_by_agency_ids").await;
        children(
            &params,
            &d.routes,
            |r, k| r.agency_id == *k,
            |r, f| d.route_matches(r, f),
        )
    }

    async fn routes_by_feed_version_ids(
        &self,
        params: Vec<Param<i64, RouteFilter>>,
    ) -> BatchResult<Vec<Route>> {
        let d = self.read("routes_by_feed_version_ids").await;
        children(
            &params,
            &d.routes,
            |r, k| r.feed_version_id == *k,
            |r, f| d.route_matches(r, f),
        )
    }

    async fn stops_by_feed_version_ids(
        &self,
        params: Vec<Param<i64, StopFilter>>,
    ) -> BatchResult<Vec<Stop>> {
        let d = self.read("stops_by_feed_version_ids").await;
        children(
            &params,
            &d.stops,
            |s, k| s.feed_version_id == *k,
            |s, f| d.stop_matches(s, f),
        )
    }

    async fn stops_by_level_ids(
        &self,
        params: Vec<Param<i64, StopFilter>>,
    ) -> BatchResult<Vec<Stop>> {
        let d = self.read("stops_by_level_ids").await;
        children(
            &params,
            &d.stops,
            |s, k| s.level_id == Some(*k),
            |s, f| d.stop_matches(s, f),
        )
    }

    async fn stops_by_parent_stop_ids(
        &self,
        params: Vec<Param<i64, StopFilter>>,
    ) -> BatchResult<Vec<Stop>> {
        let d = self.read("stops_by_parent_stop_ids").await;
        children(
            &params,
            &d.stops,
            |s, k| s.parent_station == Some(*k),
            |s, f| d.stop_matches(s, f),
        )
    }

    async fn stops_by_route_ids(
        &self,
        params: Vec<Param<i64, StopFilter>>,
    ) -> BatchResult<Vec<Stop>> {
        let d = self.read("stops_by_route_ids").await;
        children(
            &params,
            &d.stops,
            |s, k| {
                d.route_stops
                    .iter()
                    .any(|rs| rs.route_id == *k && rs.stop_id == s.id)
            },
            |s, f| d.stop_matches(s, f),
        )
    }

    async fn stop_times_by_stop_ids(
        &self,
        params: Vec<Param<(i64, i64), StopTimeFilter>>,
    ) -> BatchResult<Vec<StopTime>> {
        let d = self.read("stop_times_by_stop_ids").await;
        let mut rows = d.stop_times.clone();
        rows.sort_by_key(|st| {
            (
                st.departure_time.or(st.arrival_time).map(|t| t.seconds()),
                st.trip_id,
            )
        });
        debug!(records = params.len(), "stop times by stop");
        children(
            &params,
            &rows,
            |st, (fvid, stop_id)| st.feed_version_id == *fvid && st.stop_id == *stop_id,
            |st, f| d.stop_time_matches(st, f),
        )
    }

    async fn stop_times_by_trip_ids(
        &self,
        params: Vec<Param<(i64, i64), TripStopTimeFilter>>,
    ) -> BatchResult<Vec<StopTime>> {
        let d = self.read("stop_times_by_trip_ids").await;
        let mut rows = d.stop_times.clone();
        rows.sort_by_key(|st| (st.trip_id, st.stop_sequence));
        children(
            &params,
            &rows,
            |st, (fvid, trip_id)| st.feed_version_id == *fvid && st.trip_id == *trip_id,
            |st, f| FinderData::trip_stop_time_matches(st, f),
        )
    }

    async fn trips_by_feed_version_ids(
        &self,
        params: Vec<Param<i64, TripFilter>>,
    ) -> BatchResult<Vec<Trip>> {
        let d = self.read("trips_by_feed_version_ids").await;
        children(
            &params,
            &d.trips,
            |t, k| t.feed_version_id == *k,
            |t, f| d.trip_matches(t, f),
        )
    }

    async fn trips_by_route_ids(
        &self,
        params: Vec<Param<i64, TripFilter>>,
    ) -> BatchResult<Vec<Trip>> {
        let d = self.read("trips_by_route_ids").await;
        children(
            &params,
            &d.trips,
            |t, k| t.route_id == *k,
            |t, f| d.trip_matches(t, f),
        )
    }

    async fn stop_create(&self, input: StopSetInput) -> Result<i64, FinderError> {
        self.record("stop_create");
        let mut d = self.data.write().await;
        let feed_version_id = required(input.feed_version_id, "feed_version_id")?;
        let stop_id = required(input.stop_id.clone(), "stop_id")?;
        let fv = d
            .feed_version(feed_version_id)
            .ok_or_else(|| FinderError::not_found("feed version", feed_version_id))?;
        let feed_version_sha1 = fv.sha1.clone();
        let feed_onestop_id = d
            .feed_onestop_id_of_version(feed_version_id)
            .unwrap_or_default()
            .to_string();
        let id = next_id(d.stops.iter().map(|s| s.id));
        let mut stop = Stop {
            id,
            feed_version_id,
            feed_version_sha1,
            feed_onestop_id,
            stop_id,
            ..Default::default()
        };
        apply_stop(&mut stop, input);
        d.stops.push(stop);
        debug!(id, "stop created");
        Ok(id)
    }

    async fn stop_update(&self, input: StopSetInput) -> Result<i64, FinderError> {
        self.record("stop_update");
        let mut d = self.data.write().await;
        let id = required(input.id, "id")?;
        let stop = d
            .stops
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| FinderError::not_found("stop", id))?;
        apply_stop(stop, input);
        Ok(id)
    }

    async fn stop_delete(&self, id: i64) -> Result<(), FinderError> {
        self.record("stop_delete");
        let mut d = self.data.write().await;
        let before = d.stops.len();
        d.stops.retain(|s| s.id != id);
        if d.stops.len() == before {
            return Err(FinderError::not_found("stop", id));
        }
        Ok(())
    }

    async fn level_create(&self, input: LevelSetInput) -> Result<i64, FinderError> {
        self.record("level_create");
        let mut d = self.data.write().await;
        let feed_version_id = required(input.feed_version_id, "feed_version_id")?;
        let level_id = required(input.level_id.clone(), "level_id")?;
        if d.feed_version(feed_version_id).is_none() {
            return Err(FinderError::not_found("feed version", feed_version_id));
        }
        let id = next_id(d.levels.iter().map(|l| l.id));
        let mut level = Level {
            id,
            feed_version_id,
            level_id,
            ..Default::default()
        };
        apply_level(&mut level, input);
        d.levels.push(level);
        Ok(id)
    }

    async fn level_update(&self, input: LevelSetInput) -> Result<i64, FinderError> {
        self.record("level_update");
        let mut d = self.data.write().await;
        let id = required(input.id, "id")?;
        let level = d
            .levels
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| FinderError::not_found("level", id))?;
        apply_level(level, input);
        Ok(id)
    }

    async fn level_delete(&self, id: i64) -> Result<(), FinderError> {
        self.record("level_delete");
        let mut d = self.data.write().await;
        let before = d.levels.len();
        d.levels.retain(|l| l.id != id);
        if d.levels.len() == before {
            return Err(FinderError::not_found("level", id));
        }
        Ok(())
    }

    async fn pathway_create(&self, input: PathwaySetInput) -> Result<i64, FinderError> {
        self.record("pathway_create");
        let mut d = self.data.write().await;
        let feed_version_id = required(input.feed_version_id, "feed_version_id")?;
        let pathway_id = required(input.pathway_id.clone(), "pathway_id")?;
        let from_stop_id = required(input.from_stop_id, "from_stop_id")?;
        let to_stop_id = required(input.to_stop_id, "to_stop_id")?;
        for stop_id in [from_stop_id, to_stop_id] {
            if d.stop(stop_id).is_none() {
                return Err(FinderError::not_found("stop", stop_id));
            }
        }
        let id = next_id(d.pathways.iter().map(|p| p.id));
        let mut pathway = Pathway {
            id,
            feed_version_id,
            pathway_id,
            from_stop_id,
            to_stop_id,
            ..Default::default()
        };
        apply_pathway(&mut pathway, input);
        d.pathways.push(pathway);
        Ok(id)
    }

    async fn pathway_update(&self, input: PathwaySetInput) -> Result<i64, FinderError> {
        self.record("pathway_update");
        let mut d = self.data.write().await;
        let id = required(input.id, "id")?;
        let pathway = d
            .pathways
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| FinderError::not_found("pathway", id))?;
        apply_pathway(pathway, input);
        Ok(id)
    }

    async fn pathway_delete(&self, id: i64) -> Result<(), FinderError> {
        self.record("pathway_delete");
        let mut d = self.data.write().await;
        let before = d.pathways.len();
        d.pathways.retain(|p| p.id != id);
        if d.pathways.len() == before {
            return Err(FinderError::not_found("pathway", id));
        }
        Ok(())
    }
}

fn apply_stop(stop: &mut Stop, input: StopSetInput) {
    if let Some(v) = input.stop_id {
        stop.stop_id = v;
    }
    if let Some(v) = input.stop_name {
        stop.stop_name = v;
    }
    if let Some(v) = input.stop_code {
        stop.stop_code = Some(v);
    }
    if let Some(v) = input.stop_desc {
        stop.stop_desc = Some(v);
    }
    if let Some(v) = input.location_type {
        stop.location_type = v;
    }
    if let Some(v) = input.parent_station {
        stop.parent_station = Some(v);
    }
    if let Some(v) = input.level_id {
        stop.level_id = Some(v);
    }
    if let Some(v) = input.stop_timezone {
        stop.stop_timezone = v;
    }
    if let Some(v) = input.wheelchair_boarding {
        stop.wheelchair_boarding = Some(v);
    }
    if let Some(v) = input.platform_code {
        stop.platform_code = Some(v);
    }
    if let Some(v) = input.geometry {
        stop.geometry = v;
    }
}

fn apply_level(level: &mut Level, input: LevelSetInput) {
    if let Some(v) = input.level_id {
        level.level_id = v;
    }
    if let Some(v) = input.level_name {
        level.level_name = Some(v);
    }
    if let Some(v) = input.level_index {
        level.level_index = v;
    }
    if let Some(v) = input.parent_station {
        level.parent_station = Some(v);
    }
}

fn apply_pathway(pathway: &mut Pathway, input: PathwaySetInput) {
    if let Some(v) = input.pathway_id {
        pathway.pathway_id = v;
    }
    if let Some(v) = input.from_stop_id {
        pathway.from_stop_id = v;
    }
    if let Some(v) = input.to_stop_id {
        pathway.to_stop_id = v;
    }
    if let Some(v) = input.pathway_mode {
        pathway.pathway_mode = v;
    }
    if let Some(v) = input.is_bidirectional {
        pathway.is_bidirectional = v;
    }
    if let Some(v) = input.length {
        pathway.length = Some(v);
    }
    if let Some(v) = input.traversal_time {
        pathway.traversal_time = Some(v);
    }
}

#[async_trait]
impl GbfsFinder for MemoryFinder {
    async fn find_bikes(
        &self,
        limit: usize,
        request: &GbfsBikeRequest,
    ) -> Result<Vec<GbfsFreeBikeStatus>, FinderError> {
        let d = self.read("find_bikes").await;
        Ok(d.gbfs_bikes
            .iter()
            .filter(|b| {
                request
                    .near
                    .is_none_or(|n| n.contains(&Point::new(b.lon, b.lat)))
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn find_docks(
        &self,
        limit: usize,
        request: &GbfsDockRequest,
    ) -> Result<Vec<GbfsStationInformation>, FinderError> {
        let d = self.read("find_docks").await;
        Ok(d.gbfs_docks
            .iter()
            .filter(|s| {
                request
                    .near
                    .is_none_or(|n| n.contains(&Point::new(s.lon, s.lat)))
            })
            .take(limit)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn stop(id: i64, fvid: i64, name: &str, lon: f64, lat: f64) -> Stop {
        Stop {
            id,
            feed_version_id: fvid,
            stop_id: format!("S{}", id),
            stop_name: name.into(),
            geometry: Point::new(lon, lat),
            ..Default::default()
        }
    }

    fn data() -> FinderData {
        FinderData {
            feeds: vec![Feed {
                id: 1,
                onestop_id: "BA".into(),
                ..Default::default()
            }],
            feed_versions: vec![FeedVersion {
                id: 10,
                feed_id: 1,
                sha1: "abc".into(),
                ..Default::default()
            }],
            stops: vec![
                stop(3, 10, "Ashby", -122.27, 37.85),
                stop(1, 10, "Fruitvale", -122.22, 37.77),
                stop(2, 10, "Lake Merritt", -122.26, 37.80),
            ],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn root_selection_orders_and_pages() {
        let finder = MemoryFinder::new(data());
        let page = finder
            .find_stops(FindArgs {
                limit: 2,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.iter().map(|s| s.id).collect::<Vec<_>>(), vec![1, 2]);

        let rest = finder
            .find_stops(FindArgs {
                limit: 10,
                after: Some(Cursor::new(0, 2)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(rest.iter().map(|s| s.id).collect::<Vec<_>>(), vec![3]);
        assert_eq!(finder.calls("find_stops"), 2);
    }

    #[tokio::test]
    async fn stop_filter_near_and_search() {
        let finder = MemoryFinder::new(data());
        let near = finder
            .find_stops(FindArgs {
                limit: 10,
                filter: Some(StopFilter {
                    near: Some(PointRadius {
                        lon: -122.27,
                        lat: 37.85,
                        radius: 500.0,
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(near.len(), 1);
        assert_eq!(near[0].stop_name, "Ashby");

        let search = finder
            .find_stops(FindArgs {
                limit: 10,
                filter: Some(StopFilter {
                    search: Some("merritt".into()),
                    ..Default::default()
                }),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(search.len(), 1);
        assert_eq!(search[0].id, 2);
    }

    #[tokio::test]
    async fn by_ids_keep_request_order() {
        let finder = MemoryFinder::new(data());
        let rows = finder.stops_by_ids(vec![2, 99, 1]).await.unwrap();
        let ids: Vec<Option<i64>> = rows
            .into_iter()
            .map(|r| r.unwrap().map(|s| s.id))
            .collect();
        assert_eq!(ids, vec![Some(2), None, Some(1)]);
    }

    #[tokio::test]
    async fn stop_edits_assign_ids_and_apply_fields() {
        let finder = MemoryFinder::new(data());
        let id = finder
            .stop_create(StopSetInput {
                feed_version_id: Some(10),
                stop_id: Some("NEW".into()),
                stop_name: Some("New stop".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(id, 4);

        finder
            .stop_update(StopSetInput {
                id: Some(id),
                stop_name: Some("Renamed".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        let row = finder.stops_by_ids(vec![id]).await.unwrap().remove(0).unwrap().unwrap();
        assert_eq!(row.stop_name, "Renamed");
        assert_eq!(row.stop_id, "NEW");
        assert_eq!(row.feed_version_sha1, "abc");
        assert_eq!(row.feed_onestop_id, "BA");

        finder.stop_delete(id).await.unwrap();
        assert!(matches!(
            finder.stop_delete(id).await,
            Err(FinderError::NotFound { .. })
        ));
        assert!(matches!(
            finder.stop_create(StopSetInput::default()).await,
            Err(FinderError::InvalidQuery(_))
        ));
    }

    #[tokio::test]
    async fn rt_topics_include_associated_realtime_feeds() {
        let mut d = data();
        d.feeds.push(Feed {
            id: 2,
            onestop_id: "BA~rt".into(),
            spec: FeedSpec::GtfsRt,
            associated_feeds: vec!["BA".into()],
            ..Default::default()
        });
        let finder = MemoryFinder::new(d);
        assert_eq!(
            finder.feed_version_rt_topics(10).await.unwrap(),
            vec!["BA".to_string(), "BA~rt".to_string()]
        );
        assert!(finder.feed_version_rt_topics(99).await.is_err());
    }

    #[tokio::test]
    async fn stored_service_window_wins() {
        let d0 = |m, day| NaiveDate::from_ymd_opt(2018, m, day).unwrap();
        let mut d = data();
        d.feed_version_service_windows.push(FeedVersionServiceWindow {
            feed_version_id: 10,
            feed_start_date: Some(d0(1, 1)),
            feed_end_date: Some(d0(12, 31)),
            fallback_week: Some(d0(6, 4)),
            ..Default::default()
        });
        let finder = MemoryFinder::new(d);
        let w = finder
            .find_feed_version_service_window(10)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(w.best_week, d0(6, 4));
        assert_eq!(finder.find_feed_version_service_window(99).await.unwrap(), None);
    }

    #[test]
    fn load_reads_snapshot_from_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(SNAPSHOT_FILE),
            r#"{"feeds": [{"id": 7, "onestop_id": "f-test"}]}"#,
        )
        .unwrap();
        let data = FinderData::load(dir.path()).unwrap();
        assert_eq!(data.feeds.len(), 1);
        assert_eq!(data.feeds[0].onestop_id, "f-test");
        assert!(data.stops.is_empty());

        let empty = tempfile::tempdir().unwrap();
        assert!(matches!(
            FinderData::load(empty.path()),
            Err(FinderError::Backend(_))
        ));
    }
}
