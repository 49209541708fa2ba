use geo::LineString;

use super::{alert_query, cursor};
use crate::domain::*;
use crate::loader::Param;
use crate::request::{FieldResult, RequestContext, ResolverError, check_float};

/// Largest radius, in meters, for a route's stop buffer.
const MAX_BUFFER_RADIUS: f64 = 2000.0;

pub struct RouteResolver;

impl RouteResolver {
    pub fn cursor(&self, obj: &Route) -> Cursor {
        cursor(obj.feed_version_id, obj.id)
    }

    pub async fn agency(
        &self,
        ctx: &RequestContext,
        obj: &Route,
    ) -> Result<Option<Agency>, ResolverError> {
        ctx.loaders
            .agencies_by_id
            .load(obj.agency_id)
            .await
            .field("agency")
    }

    pub async fn feed_version(
        &self,
        ctx: &RequestContext,
        obj: &Route,
    ) -> Result<Option<FeedVersion>, ResolverError> {
        ctx.loaders
            .feed_versions_by_id
            .load(obj.feed_version_id)
            .await
            .field("feed_version")
    }

    pub async fn trips(
        &self,
        ctx: &RequestContext,
        obj: &Route,
        limit: Option<i32>,
        filter: Option<TripFilter>,
    ) -> Result<Vec<Trip>, ResolverError> {
        let param = Param::new(obj.id).with_limit(limit).with_filter(filter);
        ctx.loaders.trips_by_route_id.load(param).await.field("trips")
    }

    pub async fn stops(
        &self,
        ctx: &RequestContext,
        obj: &Route,
        limit: Option<i32>,
        filter: Option<StopFilter>,
    ) -> Result<Vec<Stop>, ResolverError> {
        let param = Param::new(obj.id).with_limit(limit).with_filter(filter);
        ctx.loaders.stops_by_route_id.load(param).await.field("stops")
    }

    pub async fn route_stops(
        &self,
        ctx: &RequestContext,
        obj: &Route,
        limit: Option<i32>,
    ) -> Result<Vec<RouteStop>, ResolverError> {
        let param = Param::new(obj.id).with_limit(limit);
        ctx.loaders
            .route_stops_by_route_id
            .load(param)
            .await
            .field("route_stops")
    }

    pub async fn headways(
        &self,
        ctx: &RequestContext,
        obj: &Route,
        limit: Option<i32>,
    ) -> Result<Vec<RouteHeadway>, ResolverError> {
        let param = Param::new(obj.id).with_limit(limit);
        ctx.loaders
            .route_headways_by_route_id
            .load(param)
            .await
            .field("headways")
    }

    pub async fn patterns(
        &self,
        ctx: &RequestContext,
        obj: &Route,
    ) -> Result<Vec<RouteStopPattern>, ResolverError> {
        ctx.loaders
            .route_stop_patterns_by_route_id
            .load(Param::new(obj.id))
            .await
            .field("patterns")
    }

    pub async fn geometries(
        &self,
        ctx: &RequestContext,
        obj: &Route,
        limit: Option<i32>,
    ) -> Result<Vec<RouteGeometry>, ResolverError> {
        let param = Param::new(obj.id).with_limit(limit);
        ctx.loaders
            .route_geometries_by_route_id
            .load(param)
            .await
            .field("geometries")
    }

    /// The first stored geometry of the route.
    pub async fn geometry(
        &self,
        ctx: &RequestContext,
        obj: &Route,
    ) -> Result<Option<LineString<f64>>, ResolverError> {
        let geometries = ctx
            .loaders
            .route_geometries_by_route_id
            .load(Param::new(obj.id))
            .await
            .field("geometry")?;
        Ok(geometries.into_iter().find_map(|g| g.geometry))
    }

    /// Stop points, their convex hull and a buffer of `radius` meters.
    ///
    /// Not batched: each call runs its own finder query.
    pub async fn route_stop_buffer(
        &self,
        ctx: &RequestContext,
        obj: &Route,
        radius: Option<f64>,
    ) -> Result<Option<RouteStopBuffer>, ResolverError> {
        let radius = check_float(radius.unwrap_or(0.0), 0.0, MAX_BUFFER_RADIUS);
        ctx.finder()
            .route_stop_buffer(obj.id, radius)
            .await
            .field("route_stop_buffer")
    }

    pub async fn census_geographies(
        &self,
        ctx: &RequestContext,
        obj: &Route,
        limit: Option<i32>,
        filter: Option<CensusGeographyFilter>,
    ) -> Result<Vec<CensusGeography>, ResolverError> {
        let param = Param::new((CensusEntityKind::Route, obj.id))
            .with_limit(limit)
            .with_filter(filter);
        ctx.loaders
            .census_geographies_by_entity_id
            .load(param)
            .await
            .field("census_geographies")
    }

    pub async fn alerts(
        &self,
        ctx: &RequestContext,
        obj: &Route,
        active: Option<bool>,
        limit: Option<i32>,
    ) -> Result<Vec<Alert>, ResolverError> {
        ctx.rt()
            .find_alerts_for_route(obj, alert_query(ctx, active, limit))
            .await
            .field("alerts")
    }
}

pub struct RouteStopResolver;

impl RouteStopResolver {
    pub async fn route(
        &self,
        ctx: &RequestContext,
        obj: &RouteStop,
    ) -> Result<Option<Route>, ResolverError> {
        ctx.loaders.routes_by_id.load(obj.route_id).await.field("route")
    }

    pub async fn stop(
        &self,
        ctx: &RequestContext,
        obj: &RouteStop,
    ) -> Result<Option<Stop>, ResolverError> {
        ctx.loaders.stops_by_id.load(obj.stop_id).await.field("stop")
    }

    pub async fn agency(
        &self,
        ctx: &RequestContext,
        obj: &RouteStop,
    ) -> Result<Option<Agency>, ResolverError> {
        ctx.loaders
            .agencies_by_id
            .load(obj.agency_id)
            .await
            .field("agency")
    }
}

pub struct RouteHeadwayResolver;

impl RouteHeadwayResolver {
    pub async fn stop(
        &self,
        ctx: &RequestContext,
        obj: &RouteHeadway,
    ) -> Result<Option<Stop>, ResolverError> {
        ctx.loaders
            .stops_by_id
            .load(obj.selected_stop_id)
            .await
            .field("stop")
    }

    /// Departure times as wide times; out-of-range values are dropped.
    pub fn departures(&self, obj: &RouteHeadway) -> Vec<WideTime> {
        obj.departures
            .iter()
            .filter_map(|s| WideTime::from_seconds(*s).ok())
            .collect()
    }
}

pub struct RouteStopPatternResolver;

impl RouteStopPatternResolver {
    pub async fn trips(
        &self,
        ctx: &RequestContext,
        obj: &RouteStopPattern,
        limit: Option<i32>,
    ) -> Result<Vec<Trip>, ResolverError> {
        let filter = TripFilter {
            stop_pattern_id: Some(obj.stop_pattern_id),
            ..Default::default()
        };
        let param = Param::new(obj.route_id)
            .with_limit(limit)
            .with_filter(Some(filter));
        ctx.loaders.trips_by_route_id.load(param).await.field("trips")
    }
}
