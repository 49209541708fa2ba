use chrono_tz::Tz;
use gtfs_realtime::trip_update::{StopTimeEvent as GtfsEvent, StopTimeUpdate};

use crate::domain::*;
use crate::realtime::{build_stop_time_event, is_skipped, trip_schedule_relationship};
use crate::request::{FieldResult, RequestContext, ResolverError};

pub struct StopTimeResolver;

impl StopTimeResolver {
    pub async fn stop(
        &self,
        ctx: &RequestContext,
        obj: &StopTime,
    ) -> Result<Option<Stop>, ResolverError> {
        ctx.loaders.stops_by_id.load(obj.stop_id).await.field("stop")
    }

    /// The scheduled trip, or a shell built from realtime for an ADDED row.
    pub async fn trip(
        &self,
        ctx: &RequestContext,
        obj: &StopTime,
    ) -> Result<Option<Trip>, ResolverError> {
        if let (ADDED_TRIP_ID, Some(rt_trip_id)) = (obj.trip_id, obj.rt_trip_id.as_deref()) {
            let trip = ctx
                .rt()
                .make_trip(obj.feed_version_id, rt_trip_id)
                .await
                .field("trip")?;
            return Ok(Some(trip));
        }
        ctx.loaders.trips_by_id.load(obj.trip_id).await.field("trip")
    }

    pub async fn arrival(
        &self,
        ctx: &RequestContext,
        obj: &StopTime,
    ) -> Result<StopTimeEvent, ResolverError> {
        let tz = self.timezone(ctx, obj).await?;
        let (rt, last_delay) = self.events(obj, |u| u.arrival.as_ref().or(u.departure.as_ref()));
        Ok(build_stop_time_event(
            tz,
            obj.service_date,
            obj.arrival_time,
            rt,
            last_delay,
        ))
    }

    pub async fn departure(
        &self,
        ctx: &RequestContext,
        obj: &StopTime,
    ) -> Result<StopTimeEvent, ResolverError> {
        let tz = self.timezone(ctx, obj).await?;
        let (rt, last_delay) = self.events(obj, |u| u.departure.as_ref().or(u.arrival.as_ref()));
        Ok(build_stop_time_event(
            tz,
            obj.service_date,
            obj.departure_time,
            rt,
            last_delay,
        ))
    }

    /// `added` for realtime-only rows and `canceled` for a skipped stop.
    /// Otherwise the trip-level realtime value, `scheduled` when realtime
    /// has no update for the trip, and `None` for a value this gateway
    /// does not know.
    pub async fn schedule_relationship(
        &self,
        ctx: &RequestContext,
        obj: &StopTime,
    ) -> Result<Option<ScheduleRelationship>, ResolverError> {
        if obj.is_realtime_added() {
            return Ok(Some(ScheduleRelationship::Added));
        }
        if obj.rt_stop_time_update.as_ref().is_some_and(is_skipped) {
            return Ok(Some(ScheduleRelationship::Canceled));
        }
        let Some(trip_id) = ctx
            .rt()
            .get_gtfs_trip_id(obj.trip_id)
            .await
            .field("schedule_relationship")?
        else {
            return Ok(Some(ScheduleRelationship::Scheduled));
        };
        let snapshot = ctx
            .rt()
            .snapshot(obj.feed_version_id)
            .await
            .field("schedule_relationship")?;
        Ok(match snapshot.find_trip(&trip_id) {
            None => Some(ScheduleRelationship::Scheduled),
            Some(tu) => {
                trip_schedule_relationship(Some(tu.trip.schedule_relationship.unwrap_or(0)))
            }
        })
    }

    async fn timezone(&self, ctx: &RequestContext, obj: &StopTime) -> Result<Tz, ResolverError> {
        ctx.rt()
            .stop_timezone(obj.stop_id, "")
            .await
            .field("stop_timezone")?
            .ok_or(ResolverError::TimezoneUnavailable)
    }

    fn events<'a>(
        &self,
        obj: &'a StopTime,
        pick: impl Fn(&'a StopTimeUpdate) -> Option<&'a GtfsEvent>,
    ) -> (Option<&'a GtfsEvent>, Option<i32>) {
        let Some(update) = obj.rt_stop_time_update.as_ref() else {
            return (None, None);
        };
        let rt = update.stop_time_update.as_ref().and_then(pick);
        (rt, update.last_delay)
    }
}
