use super::{alert_query, cursor, reference};
use crate::domain::*;
use crate::loader::Param;
use crate::request::{FieldResult, RequestContext, ResolverError};

pub struct FeedResolver;

impl FeedResolver {
    pub fn cursor(&self, obj: &Feed) -> Cursor {
        cursor(0, obj.id)
    }

    pub async fn feed_state(
        &self,
        ctx: &RequestContext,
        obj: &Feed,
    ) -> Result<Option<FeedState>, ResolverError> {
        ctx.loaders
            .feed_states_by_feed_id
            .load(obj.id)
            .await
            .field("feed_state")
    }

    pub async fn feed_versions(
        &self,
        ctx: &RequestContext,
        obj: &Feed,
        limit: Option<i32>,
        filter: Option<FeedVersionFilter>,
    ) -> Result<Vec<FeedVersion>, ResolverError> {
        let param = Param::new(obj.id).with_limit(limit).with_filter(filter);
        ctx.loaders
            .feed_versions_by_feed_id
            .load(param)
            .await
            .field("feed_versions")
    }

    pub async fn feed_fetches(
        &self,
        ctx: &RequestContext,
        obj: &Feed,
        limit: Option<i32>,
        filter: Option<FeedFetchFilter>,
    ) -> Result<Vec<FeedFetch>, ResolverError> {
        let param = Param::new(obj.id).with_limit(limit).with_filter(filter);
        ctx.loaders
            .feed_fetches_by_feed_id
            .load(param)
            .await
            .field("feed_fetches")
    }

    pub async fn associated_operators(
        &self,
        ctx: &RequestContext,
        obj: &Feed,
    ) -> Result<Vec<Operator>, ResolverError> {
        ctx.loaders
            .operators_by_feed_id
            .load(Param::new(obj.id))
            .await
            .field("associated_operators")
    }

    /// Alerts published by this feed, whatever they target.
    pub async fn alerts(
        &self,
        ctx: &RequestContext,
        obj: &Feed,
        active: Option<bool>,
        limit: Option<i32>,
    ) -> Result<Vec<Alert>, ResolverError> {
        ctx.rt()
            .find_alerts_for_feed(&obj.onestop_id, alert_query(ctx, active, limit))
            .await
            .field("alerts")
    }
}

pub struct FeedStateResolver;

impl FeedStateResolver {
    pub async fn feed_version(
        &self,
        ctx: &RequestContext,
        obj: &FeedState,
    ) -> Result<Option<FeedVersion>, ResolverError> {
        reference(&ctx.loaders.feed_versions_by_id, obj.feed_version_id, "feed_version").await
    }
}

#[cfg(test)]
mod tests {
    use gtfs_realtime::{Alert as GtfsAlert, FeedEntity};

    use super::*;
    use crate::realtime::TopicKind;
    use crate::request::User;
    use crate::resolvers::fixtures::{FV, Fixture, RT_FEED};

    #[tokio::test]
    async fn active_version_through_feed_state() {
        let fx = Fixture::new();
        let ctx = fx.context(User::anon());
        let feed = ctx.loaders.feeds_by_id.load(1).await.unwrap().unwrap();
        let state = FeedResolver.feed_state(&ctx, &feed).await.unwrap().unwrap();
        let active = FeedStateResolver
            .feed_version(&ctx, &state)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(active.id, FV);
        assert_eq!(FeedResolver.cursor(&feed), Cursor::new(0, 1));

        let versions = FeedResolver
            .feed_versions(&ctx, &feed, None, None)
            .await
            .unwrap();
        assert_eq!(versions.len(), 1);
    }

    #[tokio::test]
    async fn feed_alerts_ignore_selectors() {
        let fx = Fixture::new();
        fx.publish(
            TopicKind::Alerts,
            vec![FeedEntity {
                id: "a1".into(),
                alert: Some(GtfsAlert::default()),
                ..Default::default()
            }],
        )
        .await;
        let ctx = fx.context(User::anon());
        let rt_feed = ctx.loaders.feeds_by_id.load(2).await.unwrap().unwrap();
        assert_eq!(rt_feed.onestop_id, RT_FEED);
        let alerts = FeedResolver.alerts(&ctx, &rt_feed, None, None).await.unwrap();
        assert_eq!(alerts.len(), 1);
    }
}
