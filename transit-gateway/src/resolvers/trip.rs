use chrono::{DateTime, Utc};

use super::{alert_query, cursor, reference};
use crate::domain::*;
use crate::loader::Param;
use crate::realtime::trip_schedule_relationship;
use crate::request::{FieldResult, RequestContext, ResolverError};

pub struct TripResolver;

impl TripResolver {
    pub fn cursor(&self, obj: &Trip) -> Cursor {
        cursor(obj.feed_version_id, obj.id)
    }

    pub async fn route(
        &self,
        ctx: &RequestContext,
        obj: &Trip,
    ) -> Result<Option<Route>, ResolverError> {
        ctx.loaders.routes_by_id.load(obj.route_id).await.field("route")
    }

    pub async fn feed_version(
        &self,
        ctx: &RequestContext,
        obj: &Trip,
    ) -> Result<Option<FeedVersion>, ResolverError> {
        ctx.loaders
            .feed_versions_by_id
            .load(obj.feed_version_id)
            .await
            .field("feed_version")
    }

    pub async fn shape(
        &self,
        ctx: &RequestContext,
        obj: &Trip,
    ) -> Result<Option<Shape>, ResolverError> {
        reference(&ctx.loaders.shapes_by_id, obj.shape_id, "shape").await
    }

    pub async fn calendar(
        &self,
        ctx: &RequestContext,
        obj: &Trip,
    ) -> Result<Option<Calendar>, ResolverError> {
        ctx.loaders
            .calendars_by_id
            .load(obj.service_id)
            .await
            .field("calendar")
    }

    pub async fn stop_times(
        &self,
        ctx: &RequestContext,
        obj: &Trip,
        limit: Option<i32>,
        filter: Option<TripStopTimeFilter>,
    ) -> Result<Vec<StopTime>, ResolverError> {
        let param = Param::new((obj.feed_version_id, obj.id))
            .with_limit(limit)
            .with_filter(filter);
        ctx.loaders
            .stop_times_by_trip_id
            .load(param)
            .await
            .field("stop_times")
    }

    pub async fn frequencies(
        &self,
        ctx: &RequestContext,
        obj: &Trip,
        limit: Option<i32>,
    ) -> Result<Vec<Frequency>, ResolverError> {
        let param = Param::new(obj.id).with_limit(limit);
        ctx.loaders
            .frequencies_by_trip_id
            .load(param)
            .await
            .field("frequencies")
    }

    /// `scheduled` unless realtime says otherwise; `None` when realtime
    /// carries a value this gateway does not know.
    pub async fn schedule_relationship(
        &self,
        ctx: &RequestContext,
        obj: &Trip,
    ) -> Result<Option<ScheduleRelationship>, ResolverError> {
        let rt_trip = ctx
            .rt()
            .find_trip(obj)
            .await
            .field("schedule_relationship")?;
        Ok(match rt_trip {
            None => Some(ScheduleRelationship::Scheduled),
            Some(tu) => trip_schedule_relationship(Some(tu.trip.schedule_relationship.unwrap_or(0))),
        })
    }

    /// When realtime data for the trip was produced: the update's own
    /// timestamp, else its feed's header timestamp.
    pub async fn timestamp(
        &self,
        ctx: &RequestContext,
        obj: &Trip,
    ) -> Result<Option<DateTime<Utc>>, ResolverError> {
        let snapshot = ctx
            .rt()
            .snapshot(obj.feed_version_id)
            .await
            .field("timestamp")?;
        let Some(tu) = snapshot.find_trip(&obj.trip_id) else {
            return Ok(None);
        };
        let seconds = tu
            .timestamp
            .or_else(|| snapshot.trip_timestamp(&obj.trip_id))
            .and_then(|t| i64::try_from(t).ok());
        Ok(seconds.and_then(|s| DateTime::from_timestamp(s, 0)))
    }

    pub async fn alerts(
        &self,
        ctx: &RequestContext,
        obj: &Trip,
        active: Option<bool>,
        limit: Option<i32>,
    ) -> Result<Vec<Alert>, ResolverError> {
        ctx.rt()
            .find_alerts_for_trip(obj, alert_query(ctx, active, limit))
            .await
            .field("alerts")
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use gtfs_realtime::{FeedEntity, TripDescriptor, TripUpdate, trip_descriptor};

    use super::*;
    use crate::realtime::TopicKind;
    use crate::request::User;
    use crate::resolvers::fixtures::Fixture;

    fn update(trip_id: &str, relationship: Option<i32>, timestamp: Option<u64>) -> FeedEntity {
        FeedEntity {
            id: trip_id.to_string(),
            trip_update: Some(TripUpdate {
                trip: TripDescriptor {
                    trip_id: Some(trip_id.to_string()),
                    schedule_relationship: relationship,
                    ..Default::default()
                },
                timestamp,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn relationship_and_timestamp_follow_realtime() {
        let fx = Fixture::new();
        let canceled = trip_descriptor::ScheduleRelationship::Canceled as i32;
        let at = Utc.with_ymd_and_hms(2018, 5, 30, 22, 49, 0).unwrap();
        fx.publish(
            TopicKind::TripUpdates,
            vec![
                update("2211533WKDY", Some(canceled), Some(at.timestamp() as u64)),
                update("1031527WKDY", None, None),
            ],
        )
        .await;
        let ctx = fx.context(User::anon());
        let trips: Vec<Trip> = ctx
            .loaders
            .trips_by_id
            .load_many(vec![1, 2, 3])
            .await
            .into_iter()
            .map(|t| t.unwrap().unwrap())
            .collect();
        let mut relationships = Vec::new();
        for trip in &trips {
            relationships.push(TripResolver.schedule_relationship(&ctx, trip).await.unwrap());
        }
        assert_eq!(
            relationships,
            vec![
                Some(ScheduleRelationship::Scheduled),
                Some(ScheduleRelationship::Canceled),
                Some(ScheduleRelationship::Scheduled),
            ]
        );

        assert_eq!(TripResolver.timestamp(&ctx, &trips[1]).await.unwrap(), Some(at));
        assert_eq!(TripResolver.timestamp(&ctx, &trips[2]).await.unwrap(), None);
    }

    #[tokio::test]
    async fn stop_times_in_sequence_order() {
        let fx = Fixture::new();
        let ctx = fx.context(User::anon());
        let trip = ctx.loaders.trips_by_id.load(5).await.unwrap().unwrap();
        let rows = TripResolver.stop_times(&ctx, &trip, None, None).await.unwrap();
        let seqs: Vec<i32> = rows.iter().map(|r| r.stop_sequence).collect();
        assert_eq!(seqs, vec![1, 2, 3]);

        let later = TripResolver
            .stop_times(
                &ctx,
                &trip,
                None,
                Some(TripStopTimeFilter {
                    start: WideTime::parse("24:00:00").ok(),
                    end: None,
                }),
            )
            .await
            .unwrap();
        assert_eq!(later.len(), 2);
    }

    #[tokio::test]
    async fn missing_shape_skips_the_loader() {
        let fx = Fixture::new();
        let ctx = fx.context(User::anon());
        let trip = ctx.loaders.trips_by_id.load(1).await.unwrap().unwrap();
        assert_eq!(TripResolver.shape(&ctx, &trip).await.unwrap(), None);
        assert_eq!(fx.finder.calls("shapes_by_ids"), 0);
        let calendar = TripResolver.calendar(&ctx, &trip).await.unwrap().unwrap();
        assert_eq!(calendar.service_id, "WKDY");
    }
}
