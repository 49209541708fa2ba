//! Memoized id and timezone lookups backing the realtime finder.

use std::sync::Arc;

use chrono_tz::Tz;
use moka::future::Cache as MokaCache;
use tracing::trace;

use crate::finder::{Finder, FinderError};
use crate::loader::{BatchResult, Param};
use crate::service_time::parse_timezone;

/// Default entry cap for each lookup table.
const LOOKUP_CAPACITY: u64 = 100_000;

fn first<T>(batch: BatchResult<T>) -> Result<Option<T>, FinderError> {
    batch?.into_iter().next().transpose()
}

/// Maps between internal ids and the GTFS ids realtime feeds speak in.
///
/// Values are fetched from the finder on first use and kept; the data
/// they come from does not change within a feed version.
#[derive(Clone)]
pub struct LookupCache {
    finder: Arc<dyn Finder>,
    rt_topics: MokaCache<i64, Arc<Vec<String>>>,
    gtfs_trip_ids: MokaCache<i64, Option<String>>,
    gtfs_stop_ids: MokaCache<i64, Option<String>>,
    route_ids: MokaCache<(i64, String), Option<i64>>,
    stop_zones: MokaCache<i64, Option<Tz>>,
}

impl LookupCache {
    pub fn new(finder: Arc<dyn Finder>) -> Self {
        Self {
            finder,
            rt_topics: MokaCache::new(LOOKUP_CAPACITY),
            gtfs_trip_ids: MokaCache::new(LOOKUP_CAPACITY),
            gtfs_stop_ids: MokaCache::new(LOOKUP_CAPACITY),
            route_ids: MokaCache::new(LOOKUP_CAPACITY),
            stop_zones: MokaCache::new(LOOKUP_CAPACITY),
        }
    }

    /// Realtime feed onestop ids associated with a feed version.
    pub async fn rt_topics(&self, feed_version_id: i64) -> Result<Arc<Vec<String>>, FinderError> {
        let finder = Arc::clone(&self.finder);
        self.rt_topics
            .try_get_with(feed_version_id, async move {
                finder
                    .feed_version_rt_topics(feed_version_id)
                    .await
                    .map(Arc::new)
            })
            .await
            .map_err(|e| (*e).clone())
    }

    pub async fn gtfs_trip_id(&self, trip_id: i64) -> Result<Option<String>, FinderError> {
        let finder = Arc::clone(&self.finder);
        self.gtfs_trip_ids
            .try_get_with(trip_id, async move {
                let trip = first(finder.trips_by_ids(vec![trip_id]).await)?.flatten();
                Ok::<_, FinderError>(trip.map(|t| t.trip_id))
            })
            .await
            .map_err(|e| (*e).clone())
    }

    pub async fn gtfs_stop_id(&self, stop_id: i64) -> Result<Option<String>, FinderError> {
        let finder = Arc::clone(&self.finder);
        self.gtfs_stop_ids
            .try_get_with(stop_id, async move {
                let stop = first(finder.stops_by_ids(vec![stop_id]).await)?.flatten();
                Ok::<_, FinderError>(stop.map(|s| s.stop_id))
            })
            .await
            .map_err(|e| (*e).clone())
    }

    /// Internal id of a route named by its GTFS route id.
    pub async fn route_id(
        &self,
        feed_version_id: i64,
        route_id: &str,
    ) -> Result<Option<i64>, FinderError> {
        let finder = Arc::clone(&self.finder);
        let route = route_id.to_string();
        self.route_ids
            .try_get_with((feed_version_id, route.clone()), async move {
                finder.route_internal_id(feed_version_id, &route).await
            })
            .await
            .map_err(|e| (*e).clone())
    }

    /// Timezone of a stop.
    ///
    /// `known` wins when it names a zone. Otherwise the stop's own zone,
    /// then its parent station's, then the first agency zone of its feed
    /// version.
    pub async fn stop_timezone(&self, stop_id: i64, known: &str) -> Result<Option<Tz>, FinderError> {
        if !known.is_empty() {
            trace!(stop_id, known, "tz: using known timezone");
            return Ok(parse_timezone(known).ok());
        }
        if stop_id == 0 {
            return Ok(None);
        }
        let finder = Arc::clone(&self.finder);
        self.stop_zones
            .try_get_with(stop_id, async move {
                let zone = lookup_stop_timezone(finder.as_ref(), stop_id).await?;
                trace!(stop_id, zone = zone.map(|z| z.name()), "tz: looked up");
                Ok::<_, FinderError>(zone)
            })
            .await
            .map_err(|e| (*e).clone())
    }
}

async fn lookup_stop_timezone(finder: &dyn Finder, stop_id: i64) -> Result<Option<Tz>, FinderError> {
    let Some(stop) = first(finder.stops_by_ids(vec![stop_id]).await)?.flatten() else {
        return Ok(None);
    };
    if !stop.stop_timezone.is_empty() {
        return Ok(parse_timezone(&stop.stop_timezone).ok());
    }
    if let Some(parent_id) = stop.parent_station {
        let parent = first(finder.stops_by_ids(vec![parent_id]).await)?.flatten();
        if let Some(parent) = parent.filter(|p| !p.stop_timezone.is_empty()) {
            return Ok(parse_timezone(&parent.stop_timezone).ok());
        }
    }
    let agencies = first(
        finder
            .agencies_by_feed_version_ids(vec![Param::new(stop.feed_version_id).with_limit(Some(1))])
            .await,
    )?
    .unwrap_or_default();
    Ok(agencies
        .first()
        .and_then(|a| parse_timezone(&a.agency_timezone).ok()))
}
