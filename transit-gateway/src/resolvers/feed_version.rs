use super::cursor;
use crate::domain::*;
use crate::loader::Param;
use crate::request::{FieldResult, RequestContext, ResolverError};
use crate::service_time::ServiceWindow;

pub struct FeedVersionResolver;

impl FeedVersionResolver {
    pub fn cursor(&self, obj: &FeedVersion) -> Cursor {
        cursor(0, obj.id)
    }

    pub async fn feed(
        &self,
        ctx: &RequestContext,
        obj: &FeedVersion,
    ) -> Result<Option<Feed>, ResolverError> {
        ctx.loaders.feeds_by_id.load(obj.feed_id).await.field("feed")
    }

    pub async fn agencies(
        &self,
        ctx: &RequestContext,
        obj: &FeedVersion,
        limit: Option<i32>,
        filter: Option<AgencyFilter>,
    ) -> Result<Vec<Agency>, ResolverError> {
        let param = Param::new(obj.id).with_limit(limit).with_filter(filter);
        ctx.loaders
            .agencies_by_feed_version_id
            .load(param)
            .await
            .field("agencies")
    }

    pub async fn routes(
        &self,
        ctx: &RequestContext,
        obj: &FeedVersion,
        limit: Option<i32>,
        filter: Option<RouteFilter>,
    ) -> Result<Vec<Route>, ResolverError> {
        let param = Param::new(obj.id).with_limit(limit).with_filter(filter);
        ctx.loaders
            .routes_by_feed_version_id
            .load(param)
            .await
            .field("routes")
    }

    pub async fn stops(
        &self,
        ctx: &RequestContext,
        obj: &FeedVersion,
        limit: Option<i32>,
        filter: Option<StopFilter>,
    ) -> Result<Vec<Stop>, ResolverError> {
        let param = Param::new(obj.id).with_limit(limit).with_filter(filter);
        ctx.loaders
            .stops_by_feed_version_id
            .load(param)
            .await
            .field("stops")
    }

    pub async fn trips(
        &self,
        ctx: &RequestContext,
        obj: &FeedVersion,
        limit: Option<i32>,
        filter: Option<TripFilter>,
    ) -> Result<Vec<Trip>, ResolverError> {
        let param = Param::new(obj.id).with_limit(limit).with_filter(filter);
        ctx.loaders
            .trips_by_feed_version_id
            .load(param)
            .await
            .field("trips")
    }

    pub async fn gtfs_import(
        &self,
        ctx: &RequestContext,
        obj: &FeedVersion,
    ) -> Result<Option<FeedVersionGtfsImport>, ResolverError> {
        ctx.loaders
            .feed_version_gtfs_imports_by_feed_version_id
            .load(obj.id)
            .await
            .field("feed_version_gtfs_import")
    }

    pub async fn service_levels(
        &self,
        ctx: &RequestContext,
        obj: &FeedVersion,
        limit: Option<i32>,
        filter: Option<FeedVersionServiceLevelFilter>,
    ) -> Result<Vec<FeedVersionServiceLevel>, ResolverError> {
        let param = Param::new(obj.id).with_limit(limit).with_filter(filter);
        ctx.loaders
            .feed_version_service_levels_by_feed_version_id
            .load(param)
            .await
            .field("service_levels")
    }

    pub async fn feed_infos(
        &self,
        ctx: &RequestContext,
        obj: &FeedVersion,
        limit: Option<i32>,
    ) -> Result<Vec<FeedInfo>, ResolverError> {
        let param = Param::new(obj.id).with_limit(limit);
        ctx.loaders
            .feed_infos_by_feed_version_id
            .load(param)
            .await
            .field("feed_infos")
    }

    /// The stored service window record, if one was computed at import.
    pub async fn service_window(
        &self,
        ctx: &RequestContext,
        obj: &FeedVersion,
    ) -> Result<Option<FeedVersionServiceWindow>, ResolverError> {
        ctx.loaders
            .feed_version_service_windows_by_feed_version_id
            .load(obj.id)
            .await
            .field("service_window")
    }

    /// The window stop-time queries use: the stored record, else one
    /// derived from service levels.
    pub async fn effective_service_window(
        &self,
        ctx: &RequestContext,
        obj: &FeedVersion,
    ) -> Result<Option<ServiceWindow>, ResolverError> {
        ctx.service_windows()
            .get(ctx.finder(), obj.id)
            .await
            .field("effective_service_window")
    }
}
