use tracing::debug;

use super::{alert_query, cursor, reference};
use crate::domain::*;
use crate::finder::FindArgs;
use crate::loader::Param;
use crate::realtime::merge_stop_times;
use crate::request::{FieldResult, RequestContext, ResolverError, check_float};
use crate::service_time::{LocalNow, local_now, normalize_stop_time_filter, split_service_days};

pub struct StopResolver;

impl StopResolver {
    pub fn cursor(&self, obj: &Stop) -> Cursor {
        cursor(obj.feed_version_id, obj.id)
    }

    pub async fn feed_version(
        &self,
        ctx: &RequestContext,
        obj: &Stop,
    ) -> Result<Option<FeedVersion>, ResolverError> {
        ctx.loaders
            .feed_versions_by_id
            .load(obj.feed_version_id)
            .await
            .field("feed_version")
    }

    pub async fn level(
        &self,
        ctx: &RequestContext,
        obj: &Stop,
    ) -> Result<Option<Level>, ResolverError> {
        reference(&ctx.loaders.levels_by_id, obj.level_id, "level").await
    }

    pub async fn parent(
        &self,
        ctx: &RequestContext,
        obj: &Stop,
    ) -> Result<Option<Stop>, ResolverError> {
        reference(&ctx.loaders.stops_by_id, obj.parent_station, "parent").await
    }

    pub async fn children(
        &self,
        ctx: &RequestContext,
        obj: &Stop,
        limit: Option<i32>,
    ) -> Result<Vec<Stop>, ResolverError> {
        let param = Param::new(obj.id).with_limit(limit);
        ctx.loaders
            .stops_by_parent_stop_id
            .load(param)
            .await
            .field("children")
    }

    pub async fn child_levels(
        &self,
        ctx: &RequestContext,
        obj: &Stop,
        limit: Option<i32>,
    ) -> Result<Vec<Level>, ResolverError> {
        let param = Param::new(obj.id).with_limit(limit);
        ctx.loaders
            .levels_by_parent_station_id
            .load(param)
            .await
            .field("child_levels")
    }

    pub async fn route_stops(
        &self,
        ctx: &RequestContext,
        obj: &Stop,
        limit: Option<i32>,
    ) -> Result<Vec<RouteStop>, ResolverError> {
        let param = Param::new(obj.id).with_limit(limit);
        ctx.loaders
            .route_stops_by_stop_id
            .load(param)
            .await
            .field("route_stops")
    }

    pub async fn pathways_from_stop(
        &self,
        ctx: &RequestContext,
        obj: &Stop,
        limit: Option<i32>,
    ) -> Result<Vec<Pathway>, ResolverError> {
        let param = Param::new(obj.id).with_limit(limit);
        ctx.loaders
            .pathways_by_from_stop_id
            .load(param)
            .await
            .field("pathways_from_stop")
    }

    pub async fn pathways_to_stop(
        &self,
        ctx: &RequestContext,
        obj: &Stop,
        limit: Option<i32>,
    ) -> Result<Vec<Pathway>, ResolverError> {
        let param = Param::new(obj.id).with_limit(limit);
        ctx.loaders
            .pathways_by_to_stop_id
            .load(param)
            .await
            .field("pathways_to_stop")
    }

    pub async fn external_reference(
        &self,
        ctx: &RequestContext,
        obj: &Stop,
    ) -> Result<Option<StopExternalReference>, ResolverError> {
        ctx.loaders
            .stop_external_references_by_stop_id
            .load(obj.id)
            .await
            .field("external_reference")
    }

    pub async fn census_geographies(
        &self,
        ctx: &RequestContext,
        obj: &Stop,
        limit: Option<i32>,
        filter: Option<CensusGeographyFilter>,
    ) -> Result<Vec<CensusGeography>, ResolverError> {
        let param = Param::new((CensusEntityKind::Stop, obj.id))
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
        obj: &Stop,
        active: Option<bool>,
        limit: Option<i32>,
    ) -> Result<Vec<Alert>, ResolverError> {
        ctx.rt()
            .find_alerts_for_stop(obj, alert_query(ctx, active, limit))
            .await
            .field("alerts")
    }

    /// Stops within `radius` meters. Not batched.
    pub async fn nearby_stops(
        &self,
        ctx: &RequestContext,
        obj: &Stop,
        limit: Option<i32>,
        radius: Option<f64>,
    ) -> Result<Vec<Stop>, ResolverError> {
        let max_radius = ctx.config().max_radius;
        let near = PointRadius {
            lon: obj.geometry.x(),
            lat: obj.geometry.y(),
            radius: check_float(radius.unwrap_or(0.0), 0.0, max_radius),
        };
        let args = FindArgs {
            limit: ctx.limit(limit),
            filter: Some(StopFilter {
                near: Some(near),
                ..Default::default()
            }),
            ..Default::default()
        };
        ctx.finder()
            .find_stops(args)
            .await
            .field("nearby_stops")
    }

    pub async fn stop_times(
        &self,
        ctx: &RequestContext,
        obj: &Stop,
        limit: Option<i32>,
        filter: Option<StopTimeFilter>,
    ) -> Result<Vec<StopTime>, ResolverError> {
        self.scheduled_and_realtime(ctx, obj, limit, filter.unwrap_or_default())
            .await
    }

    /// Stop times that leave the stop: the trip's final call is dropped.
    pub async fn departures(
        &self,
        ctx: &RequestContext,
        obj: &Stop,
        limit: Option<i32>,
        filter: Option<StopTimeFilter>,
    ) -> Result<Vec<StopTime>, ResolverError> {
        let filter = StopTimeFilter {
            exclude_last: Some(true),
            ..filter.unwrap_or_default()
        };
        self.scheduled_and_realtime(ctx, obj, limit, filter).await
    }

    /// Stop times that reach the stop: the trip's first call is dropped.
    pub async fn arrivals(
        &self,
        ctx: &RequestContext,
        obj: &Stop,
        limit: Option<i32>,
        filter: Option<StopTimeFilter>,
    ) -> Result<Vec<StopTime>, ResolverError> {
        let filter = StopTimeFilter {
            exclude_first: Some(true),
            ..filter.unwrap_or_default()
        };
        self.scheduled_and_realtime(ctx, obj, limit, filter).await
    }

    /// Resolve the filter in the stop's timezone, query each service day
    /// it touches, then overlay realtime updates and ADDED trips.
    async fn scheduled_and_realtime(
        &self,
        ctx: &RequestContext,
        obj: &Stop,
        limit: Option<i32>,
        filter: StopTimeFilter,
    ) -> Result<Vec<StopTime>, ResolverError> {
        let tz = ctx
            .rt()
            .stop_timezone(obj.id, &obj.stop_timezone)
            .await
            .field("stop_times")?
            .ok_or(ResolverError::TimezoneUnavailable)?;
        let (date, seconds) = local_now(ctx.now(), tz);

        let window = if filter.use_service_window.unwrap_or(false) {
            ctx.service_windows()
                .get(ctx.finder(), obj.feed_version_id)
                .await
                .field("stop_times")?
        } else {
            None
        };
        let filter = normalize_stop_time_filter(filter, LocalNow { date, seconds }, window.as_ref());

        let days = split_service_days(&filter, ctx.config().lookbehind_secs);
        let keys = days
            .iter()
            .map(|day| {
                Param::new((obj.feed_version_id, obj.id))
                    .with_limit(limit)
                    .with_filter(Some(day.clone()))
            })
            .collect();
        let found = ctx.loaders.stop_times_by_stop_id.load_many(keys).await;

        let mut rows = Vec::new();
        for (day, result) in days.iter().zip(found) {
            let mut day_rows = result.field("stop_times")?;
            if let Some(service_date) = day.service_date {
                for row in &mut day_rows {
                    row.stamp_service_date(service_date);
                }
            }
            rows.extend(day_rows);
        }
        debug!(
            stop_id = obj.id,
            service_days = days.len(),
            scheduled = rows.len(),
            "stop times"
        );

        ctx.check_cancelled()?;
        let snapshot = ctx
            .rt()
            .snapshot(obj.feed_version_id)
            .await
            .field("stop_times")?;
        let added_date = filter.date.or(filter.service_date).or(Some(date));
        merge_stop_times(ctx.rt().as_ref(), &snapshot, obj, tz, rows, added_date)
            .await
            .field("stop_times")
    }
}

pub struct StopExternalReferenceResolver;

impl StopExternalReferenceResolver {
    /// The referenced stop in the active version of the target feed.
    pub async fn target_active_stop(
        &self,
        ctx: &RequestContext,
        obj: &StopExternalReference,
    ) -> Result<Option<Stop>, ResolverError> {
        if obj.inactive {
            return Ok(None);
        }
        ctx.loaders
            .target_stops_by_stop_id
            .load(obj.stop_id)
            .await
            .field("target_active_stop")
    }
}
