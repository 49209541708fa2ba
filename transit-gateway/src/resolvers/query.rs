//! Root selections.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use crate::domain::*;
use crate::finder::FindArgs;
use crate::request::{FieldResult, ROLE_USER, RequestContext, ResolverError};

/// Arguments shared by every root selection.
#[derive(Debug, Clone)]
pub struct RootArgs<W> {
    pub limit: Option<i32>,
    /// Opaque cursor of the last row already seen.
    pub after: Option<String>,
    pub ids: Vec<i64>,
    pub filter: Option<W>,
}

impl<W> Default for RootArgs<W> {
    fn default() -> Self {
        Self {
            limit: None,
            after: None,
            ids: Vec::new(),
            filter: None,
        }
    }
}

impl<W> RootArgs<W> {
    pub fn filter(filter: W) -> Self {
        Self {
            filter: Some(filter),
            ..Default::default()
        }
    }

    pub fn with_limit(mut self, limit: i32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_after(mut self, after: Cursor) -> Self {
        self.after = Some(after.encode());
        self
    }

    pub fn with_ids(mut self, ids: Vec<i64>) -> Self {
        self.ids = ids;
        self
    }

    fn find(self, ctx: &RequestContext, limit: usize) -> Result<FindArgs<W>, ResolverError> {
        Ok(FindArgs {
            limit,
            after: ctx.cursor(self.after.as_deref())?,
            ids: self.ids,
            filter: self.filter,
        })
    }
}

/// The caller as seen by the `me` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Me {
    pub name: String,
    pub roles: BTreeSet<String>,
    pub external_ids: BTreeMap<String, String>,
}

pub struct QueryResolver;

impl QueryResolver {
    pub async fn me(&self, ctx: &RequestContext) -> Result<Me, ResolverError> {
        ctx.require_role(ROLE_USER)?;
        Ok(Me {
            name: ctx.user.name.clone(),
            roles: ctx.user.roles.clone(),
            external_ids: ctx.user.external_ids.clone(),
        })
    }

    pub async fn agencies(
        &self,
        ctx: &RequestContext,
        mut args: RootArgs<AgencyFilter>,
    ) -> Result<Vec<Agency>, ResolverError> {
        ctx.meter_resolver("agencies");
        if let Some(f) = args.filter.as_mut() {
            f.near = ctx.near(f.near);
            ctx.bbox(f.bbox)?;
        }
        let limit = ctx.limit(args.limit);
        ctx.finder()
            .find_agencies(args.find(ctx, limit)?)
            .await
            .field("agencies")
    }

    pub async fn routes(
        &self,
        ctx: &RequestContext,
        mut args: RootArgs<RouteFilter>,
    ) -> Result<Vec<Route>, ResolverError> {
        ctx.meter_resolver("routes");
        if let Some(f) = args.filter.as_mut() {
            f.near = ctx.near(f.near);
            ctx.bbox(f.bbox)?;
        }
        let limit = ctx.limit(args.limit);
        ctx.finder()
            .find_routes(args.find(ctx, limit)?)
            .await
            .field("routes")
    }

    pub async fn stops(
        &self,
        ctx: &RequestContext,
        mut args: RootArgs<StopFilter>,
    ) -> Result<Vec<Stop>, ResolverError> {
        ctx.meter_resolver("stops");
        if let Some(f) = args.filter.as_mut() {
            f.near = ctx.near(f.near);
            ctx.bbox(f.bbox)?;
        }
        let limit = ctx.large_limit(args.limit);
        ctx.finder()
            .find_stops(args.find(ctx, limit)?)
            .await
            .field("stops")
    }

    pub async fn trips(
        &self,
        ctx: &RequestContext,
        args: RootArgs<TripFilter>,
    ) -> Result<Vec<Trip>, ResolverError> {
        ctx.meter_resolver("trips");
        let limit = ctx.large_limit(args.limit);
        ctx.finder()
            .find_trips(args.find(ctx, limit)?)
            .await
            .field("trips")
    }

    pub async fn feeds(
        &self,
        ctx: &RequestContext,
        args: RootArgs<FeedFilter>,
    ) -> Result<Vec<Feed>, ResolverError> {
        ctx.meter_resolver("feeds");
        let limit = ctx.limit(args.limit);
        ctx.finder()
            .find_feeds(args.find(ctx, limit)?)
            .await
            .field("feeds")
    }

    pub async fn feed_versions(
        &self,
        ctx: &RequestContext,
        args: RootArgs<FeedVersionFilter>,
    ) -> Result<Vec<FeedVersion>, ResolverError> {
        ctx.meter_resolver("feed_versions");
        let limit = ctx.limit(args.limit);
        ctx.finder()
            .find_feed_versions(args.find(ctx, limit)?)
            .await
            .field("feed_versions")
    }

    pub async fn operators(
        &self,
        ctx: &RequestContext,
        args: RootArgs<OperatorFilter>,
    ) -> Result<Vec<Operator>, ResolverError> {
        ctx.meter_resolver("operators");
        let limit = ctx.limit(args.limit);
        ctx.finder()
            .find_operators(args.find(ctx, limit)?)
            .await
            .field("operators")
    }

    pub async fn places(
        &self,
        ctx: &RequestContext,
        limit: Option<i32>,
        level: Option<PlaceAggregationLevel>,
        filter: Option<PlaceFilter>,
    ) -> Result<Vec<Place>, ResolverError> {
        ctx.meter_resolver("places");
        ctx.finder()
            .find_places(ctx.limit(limit), level.unwrap_or_default(), filter)
            .await
            .field("places")
    }

    pub async fn census_datasets(
        &self,
        ctx: &RequestContext,
        args: RootArgs<CensusDatasetFilter>,
    ) -> Result<Vec<CensusDataset>, ResolverError> {
        ctx.meter_resolver("census_datasets");
        let limit = ctx.limit(args.limit);
        ctx.finder()
            .find_census_datasets(args.find(ctx, limit)?)
            .await
            .field("census_datasets")
    }

    pub async fn vehicle_positions(
        &self,
        ctx: &RequestContext,
        limit: Option<i32>,
        mut filter: Option<VehiclePositionFilter>,
    ) -> Result<Vec<VehiclePosition>, ResolverError> {
        ctx.meter_resolver("vehicle_positions");
        if let Some(f) = filter.as_mut() {
            f.near = ctx.near(f.near);
            ctx.bbox(f.bbox)?;
        }
        let positions = ctx
            .rt()
            .find_vehicle_positions(ctx.limit(limit), filter.as_ref())
            .await
            .field("vehicle_positions")?;
        debug!(count = positions.len(), "vehicle positions");
        Ok(positions)
    }

    pub async fn bikes(
        &self,
        ctx: &RequestContext,
        limit: Option<i32>,
        mut request: GbfsBikeRequest,
    ) -> Result<Vec<GbfsFreeBikeStatus>, ResolverError> {
        ctx.meter_resolver("bikes");
        request.near = ctx.near(request.near);
        ctx.gbfs()
            .find_bikes(ctx.limit(limit), &request)
            .await
            .field("bikes")
    }

    pub async fn docks(
        &self,
        ctx: &RequestContext,
        limit: Option<i32>,
        mut request: GbfsDockRequest,
    ) -> Result<Vec<GbfsStationInformation>, ResolverError> {
        ctx.meter_resolver("docks");
        request.near = ctx.near(request.near);
        ctx.gbfs()
            .find_docks(ctx.limit(limit), &request)
            .await
            .field("docks")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{MemoryMeter, User};
    use crate::resolvers::StopResolver;
    use crate::resolvers::fixtures::{self, Fixture};
    use std::sync::Arc;

    #[tokio::test]
    async fn roots_tag_the_meter() {
        let fx = Fixture::new();
        let meter = Arc::new(MemoryMeter::new());
        let ctx = fx.services.request(User::anon(), meter.clone());
        QueryResolver
            .agencies(&ctx, RootArgs::default())
            .await
            .unwrap();
        assert_eq!(
            meter.dimensions(),
            vec![("graphql".into(), "resolver".into(), "agencies".into())]
        );
    }

    #[tokio::test]
    async fn agencies_by_place() {
        let fx = Fixture::new();
        let ctx = fx.context(User::anon());
        let found = QueryResolver
            .agencies(
                &ctx,
                RootArgs::filter(AgencyFilter {
                    adm0_iso: Some("US".into()),
                    adm1_iso: Some("US-CA".into()),
                    ..Default::default()
                }),
            )
            .await
            .unwrap();
        let ids: Vec<&str> = found.iter().map(|a| a.onestop_id.as_str()).collect();
        assert_eq!(ids, vec![fixtures::BART_AGENCY]);
    }

    async fn page_through_stops(ctx: &RequestContext, limit: i32) -> Vec<(i64, i64)> {
        let mut seen = Vec::new();
        let mut after = None;
        loop {
            let mut args = RootArgs::default().with_limit(limit);
            if let Some(c) = after {
                args = args.with_after(c);
            }
            let page = QueryResolver.stops(ctx, args).await.unwrap();
            let Some(last) = page.last() else { break };
            after = Some(StopResolver.cursor(last));
            seen.extend(page.iter().map(|s| (s.feed_version_id, s.id)));
        }
        seen
    }

    #[tokio::test]
    async fn cursor_pages_through_stops_without_gaps() {
        let fx = Fixture::new();
        let ctx = fx.context(User::anon());
        let all = QueryResolver
            .stops(&ctx, RootArgs::default())
            .await
            .unwrap();
        let expected: Vec<_> = all.iter().map(|s| (s.feed_version_id, s.id)).collect();
        assert_eq!(page_through_stops(&ctx, 2).await, expected);
    }

    #[tokio::test]
    async fn cursor_carries_the_feed_version_across_pages() {
        let mut data = fixtures::bart();
        let extra = |id: i64, feed_version_id: i64| Stop {
            id,
            feed_version_id,
            stop_id: format!("X{id}"),
            ..Default::default()
        };
        // Id order disagrees with (feed version, id) order.
        data.stops.push(extra(10, 1));
        data.stops.push(extra(5, 2));
        let fx = Fixture::with_data(data);
        let ctx = fx.context(User::anon());
        assert_eq!(
            page_through_stops(&ctx, 2).await,
            vec![(1, 1), (1, 2), (1, 3), (1, 10), (2, 5)]
        );
    }

    #[tokio::test]
    async fn malformed_cursor_is_invalid_input() {
        let fx = Fixture::new();
        let ctx = fx.context(User::anon());
        let args = RootArgs::<StopFilter> {
            after: Some("10".into()),
            ..Default::default()
        };
        let err = QueryResolver.stops(&ctx, args).await.unwrap_err();
        assert!(matches!(err, ResolverError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn oversized_bbox_is_rejected() {
        let fx = Fixture::new();
        let ctx = fx.context(User::anon());
        let err = QueryResolver
            .stops(
                &ctx,
                RootArgs::filter(StopFilter {
                    bbox: Some(BoundingBox::new(-123.0, 36.0, -121.0, 38.5)),
                    ..Default::default()
                }),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ResolverError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn me_requires_a_named_caller() {
        let fx = Fixture::new();
        let anon = fx.context(User::anon());
        assert_eq!(
            QueryResolver.me(&anon).await.unwrap_err(),
            ResolverError::AccessDenied
        );
        let named = fx.context(User::named("ian").with_roles(["admin"]));
        let me = QueryResolver.me(&named).await.unwrap();
        assert_eq!(me.name, "ian");
        assert!(me.roles.contains("admin"));
    }
}
