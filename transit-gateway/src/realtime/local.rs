//! In-process realtime store.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono_tz::Tz;
use gtfs_realtime::{Alert as GtfsAlert, TripUpdate};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::convert::{make_alert, make_vehicle_position};
use super::lookup::LookupCache;
use super::snapshot::{FeedSources, RtSnapshot};
use super::source::Source;
use super::topic::{TopicKind, parse_topic_key, topic_key};
use crate::domain::*;
use crate::finder::{AlertQuery, Finder, FinderError, RtFinder};

/// Realtime finder over messages held in memory.
///
/// Each topic key maps to the latest decoded [`Source`]; a new message
/// swaps the whole entry, so readers holding a snapshot keep the old one.
pub struct LocalRtFinder {
    sources: RwLock<HashMap<String, Arc<Source>>>,
    lookup: LookupCache,
}

impl LocalRtFinder {
    pub fn new(finder: Arc<dyn Finder>) -> Self {
        Self {
            sources: RwLock::new(HashMap::new()),
            lookup: LookupCache::new(finder),
        }
    }

    /// Install an already-decoded message.
    pub async fn add_message(&self, key: &str, message: gtfs_realtime::FeedMessage) {
        let source = Arc::new(Source::from_message(message));
        self.sources.write().await.insert(key.to_string(), source);
    }

    /// Install every `realtime/{feed}/{kind}.pb` file under `data_dir`.
    ///
    /// Returns how many messages were installed. A file that fails to
    /// decode is skipped with a warning.
    pub async fn load_dir(&self, data_dir: impl AsRef<Path>) -> Result<usize, FinderError> {
        let root = data_dir.as_ref().join("realtime");
        if !root.is_dir() {
            return Ok(0);
        }
        let entries = std::fs::read_dir(&root)
            .map_err(|e| FinderError::Backend(format!("failed to read {:?}: {}", root, e)))?;
        let mut feeds: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().into_string().ok())
            .collect();
        feeds.sort();

        let mut installed = 0;
        for feed in &feeds {
            for kind in TopicKind::ALL {
                let path = root.join(feed).join(format!("{}.pb", kind.as_str()));
                let Ok(data) = std::fs::read(&path) else {
                    continue;
                };
                match self.add_data(&topic_key(feed, kind), &data).await {
                    Ok(()) => installed += 1,
                    Err(e) => warn!(path = %path.display(), error = %e, "skipping realtime file"),
                }
            }
        }
        info!(path = %root.display(), feeds = feeds.len(), installed, "loaded realtime messages");
        Ok(installed)
    }

    async fn feed_sources(&self, feed_onestop_id: &str) -> FeedSources {
        let sources = self.sources.read().await;
        let get = |kind| sources.get(&topic_key(feed_onestop_id, kind)).cloned();
        FeedSources {
            feed_onestop_id: feed_onestop_id.to_string(),
            trip_updates: get(TopicKind::TripUpdates),
            alerts: get(TopicKind::Alerts),
            vehicle_positions: get(TopicKind::VehiclePositions),
        }
    }
}

/// Convert the alerts picked by `pick`, apply the active filter and limit.
pub fn select_alerts<'a>(
    alerts: impl Iterator<Item = &'a GtfsAlert>,
    query: AlertQuery,
    mut pick: impl FnMut(&GtfsAlert) -> bool,
) -> Vec<Alert> {
    let now = query.now.timestamp();
    alerts
        .filter(|&a| pick(a))
        .map(make_alert)
        .filter(|a| !query.active || a.is_active_at(now))
        .take(query.limit)
        .collect()
}

#[async_trait]
impl RtFinder for LocalRtFinder {
    async fn add_data(&self, topic_key: &str, data: &[u8]) -> Result<(), FinderError> {
        let source = Arc::new(Source::decode(data)?);
        debug!(topic_key, timestamp = source.timestamp, "realtime message installed");
        self.sources
            .write()
            .await
            .insert(topic_key.to_string(), source);
        Ok(())
    }

    async fn snapshot(&self, feed_version_id: i64) -> Result<RtSnapshot, FinderError> {
        let topics = self.lookup.rt_topics(feed_version_id).await?;
        let mut feeds = Vec::with_capacity(topics.len());
        for topic in topics.iter() {
            feeds.push(self.feed_sources(topic).await);
        }
        Ok(RtSnapshot::new(feeds))
    }

    async fn find_trip(&self, trip: &Trip) -> Result<Option<TripUpdate>, FinderError> {
        let snapshot = self.snapshot(trip.feed_version_id).await?;
        Ok(snapshot.find_trip(&trip.trip_id).cloned())
    }

    async fn make_trip(
        &self,
        feed_version_id: i64,
        rt_trip_id: &str,
    ) -> Result<Trip, FinderError> {
        let snapshot = self.snapshot(feed_version_id).await?;
        let not_found = || FinderError::not_found("trip", rt_trip_id);
        let rt_trip = snapshot.find_trip(rt_trip_id).ok_or_else(not_found)?;
        let gtfs_route_id = rt_trip.trip.route_id.as_deref().unwrap_or_default();
        let route_id = self
            .lookup
            .route_id(feed_version_id, gtfs_route_id)
            .await?
            .ok_or_else(not_found)?;
        Ok(Trip {
            id: ADDED_TRIP_ID,
            feed_version_id,
            trip_id: rt_trip_id.to_string(),
            route_id,
            direction_id: rt_trip.trip.direction_id.map_or(0, |d| d as i32),
            ..Default::default()
        })
    }

    async fn get_gtfs_trip_id(&self, trip_id: i64) -> Result<Option<String>, FinderError> {
        self.lookup.gtfs_trip_id(trip_id).await
    }

    async fn find_stop_time_update(
        &self,
        trip: &Trip,
        stop_time: &StopTime,
    ) -> Result<Option<RtStopTimeUpdate>, FinderError> {
        let snapshot = self.snapshot(trip.feed_version_id).await?;
        if snapshot.find_trip(&trip.trip_id).is_none() {
            return Ok(None);
        }
        let stop_id = self.lookup.gtfs_stop_id(stop_time.stop_id).await?;
        Ok(snapshot.find_stop_time_update(&trip.trip_id, stop_time.stop_sequence, stop_id.as_deref()))
    }

    async fn get_added_trips_for_stop(&self, stop: &Stop) -> Result<Vec<TripUpdate>, FinderError> {
        let snapshot = self.snapshot(stop.feed_version_id).await?;
        Ok(snapshot
            .added_trips_for_stop(&stop.stop_id)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn find_alerts_for_agency(
        &self,
        agency: &Agency,
        query: AlertQuery,
    ) -> Result<Vec<Alert>, FinderError> {
        let snapshot = self.snapshot(agency.feed_version_id).await?;
        Ok(alerts_for_agency(&snapshot, &agency.agency_id, query))
    }

    async fn find_alerts_for_route(
        &self,
        route: &Route,
        query: AlertQuery,
    ) -> Result<Vec<Alert>, FinderError> {
        let snapshot = self.snapshot(route.feed_version_id).await?;
        Ok(alerts_for_route(&snapshot, &route.route_id, query))
    }

    async fn find_alerts_for_trip(
        &self,
        trip: &Trip,
        query: AlertQuery,
    ) -> Result<Vec<Alert>, FinderError> {
        let snapshot = self.snapshot(trip.feed_version_id).await?;
        Ok(alerts_for_trip(&snapshot, &trip.trip_id, query))
    }

    async fn find_alerts_for_stop(
        &self,
        stop: &Stop,
        query: AlertQuery,
    ) -> Result<Vec<Alert>, FinderError> {
        let snapshot = self.snapshot(stop.feed_version_id).await?;
        Ok(alerts_for_stop(&snapshot, &stop.stop_id, query))
    }

    async fn find_alerts_for_feed(
        &self,
        feed_onestop_id: &str,
        query: AlertQuery,
    ) -> Result<Vec<Alert>, FinderError> {
        let feed = self.feed_sources(feed_onestop_id).await;
        let alerts = feed.alerts.iter().flat_map(|s| s.alerts());
        Ok(select_alerts(alerts, query, |_| true))
    }

    async fn find_vehicle_positions(
        &self,
        limit: usize,
        filter: Option<&VehiclePositionFilter>,
    ) -> Result<Vec<VehiclePosition>, FinderError> {
        let sources = self.sources.read().await;
        let mut keys: Vec<&String> = sources.keys().collect();
        keys.sort();
        let mut out = Vec::new();
        for key in keys {
            let Some((feed, TopicKind::VehiclePositions)) = parse_topic_key(key) else {
                continue;
            };
            if let Some(f) = filter {
                if !f.feed_onestop_ids.is_empty() && !f.feed_onestop_ids.iter().any(|id| id == feed) {
                    continue;
                }
            }
            let Some(source) = sources.get(key) else {
                continue;
            };
            for v in source.vehicles() {
                let vp = make_vehicle_position(feed, v);
                if filter.is_none_or(|f| vehicle_matches(&vp, f)) {
                    out.push(vp);
                    if out.len() >= limit {
                        return Ok(out);
                    }
                }
            }
        }
        Ok(out)
    }

    async fn stop_timezone(&self, stop_id: i64, known: &str) -> Result<Option<Tz>, FinderError> {
        self.lookup.stop_timezone(stop_id, known).await
    }
}

fn vehicle_matches(vp: &VehiclePosition, f: &VehiclePositionFilter) -> bool {
    if f.route_id.is_some() && vp.route_id != f.route_id {
        return false;
    }
    if f.trip_id.is_some() && vp.trip_id != f.trip_id {
        return false;
    }
    if let Some(bbox) = &f.bbox {
        if !vp.position.is_some_and(|p| bbox.contains(&p)) {
            return false;
        }
    }
    if let Some(near) = &f.near {
        if !vp.position.is_some_and(|p| near.contains(&p)) {
            return false;
        }
    }
    true
}

/// Alerts whose selectors name the trip.
pub fn alerts_for_trip(snapshot: &RtSnapshot, trip_id: &str, query: AlertQuery) -> Vec<Alert> {
    select_alerts(snapshot.alerts().map(|(_, a)| a), query, |a| {
        a.informed_entity.iter().any(|s| {
            s.trip
                .as_ref()
                .is_some_and(|t| t.trip_id.as_deref() == Some(trip_id))
        })
    })
}

/// Alerts whose trip-free selectors name the route.
pub fn alerts_for_route(snapshot: &RtSnapshot, route_id: &str, query: AlertQuery) -> Vec<Alert> {
    select_alerts(snapshot.alerts().map(|(_, a)| a), query, |a| {
        a.informed_entity
            .iter()
            .any(|s| s.trip.is_none() && s.route_id.as_deref() == Some(route_id))
    })
}

/// Alerts whose trip-free selectors name the agency.
pub fn alerts_for_agency(snapshot: &RtSnapshot, agency_id: &str, query: AlertQuery) -> Vec<Alert> {
    select_alerts(snapshot.alerts().map(|(_, a)| a), query, |a| {
        a.informed_entity
            .iter()
            .any(|s| s.trip.is_none() && s.agency_id.as_deref() == Some(agency_id))
    })
}

/// Alerts whose selectors name the stop.
pub fn alerts_for_stop(snapshot: &RtSnapshot, stop_id: &str, query: AlertQuery) -> Vec<Alert> {
    select_alerts(snapshot.alerts().map(|(_, a)| a), query, |a| {
        a.informed_entity
            .iter()
            .any(|s| s.stop_id.as_deref() == Some(stop_id))
    })
}
