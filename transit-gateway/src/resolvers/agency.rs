use super::{alert_query, cursor};
use crate::domain::*;
use crate::loader::Param;
use crate::request::{FieldResult, RequestContext, ResolverError};

pub struct AgencyResolver;

impl AgencyResolver {
    pub fn cursor(&self, obj: &Agency) -> Cursor {
        cursor(obj.feed_version_id, obj.id)
    }

    pub async fn routes(
        &self,
        ctx: &RequestContext,
        obj: &Agency,
        limit: Option<i32>,
        filter: Option<RouteFilter>,
    ) -> Result<Vec<Route>, ResolverError> {
        let param = Param::new(obj.id).with_limit(limit).with_filter(filter);
        ctx.loaders.routes_by_agency_id.load(param).await.field("routes")
    }

    pub async fn feed_version(
        &self,
        ctx: &RequestContext,
        obj: &Agency,
    ) -> Result<Option<FeedVersion>, ResolverError> {
        ctx.loaders
            .feed_versions_by_id
            .load(obj.feed_version_id)
            .await
            .field("feed_version")
    }

    pub async fn places(
        &self,
        ctx: &RequestContext,
        obj: &Agency,
        limit: Option<i32>,
        filter: Option<AgencyPlaceFilter>,
    ) -> Result<Vec<AgencyPlace>, ResolverError> {
        let param = Param::new(obj.id).with_limit(limit).with_filter(filter);
        ctx.loaders
            .agency_places_by_agency_id
            .load(param)
            .await
            .field("places")
    }

    pub async fn operator(
        &self,
        ctx: &RequestContext,
        obj: &Agency,
    ) -> Result<Option<Operator>, ResolverError> {
        ctx.loaders
            .operators_by_agency_id
            .load(obj.id)
            .await
            .field("operator")
    }

    pub async fn census_geographies(
        &self,
        ctx: &RequestContext,
        obj: &Agency,
        limit: Option<i32>,
        filter: Option<CensusGeographyFilter>,
    ) -> Result<Vec<CensusGeography>, ResolverError> {
        let param = Param::new((CensusEntityKind::Agency, obj.id))
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
        obj: &Agency,
        active: Option<bool>,
        limit: Option<i32>,
    ) -> Result<Vec<Alert>, ResolverError> {
        ctx.rt()
            .find_alerts_for_agency(obj, alert_query(ctx, active, limit))
            .await
            .field("alerts")
    }
}

#[cfg(test)]
mod tests {
    use gtfs_realtime::{Alert as GtfsAlert, EntitySelector, FeedEntity, TimeRange};

    use super::*;
    use crate::realtime::TopicKind;
    use crate::request::User;
    use crate::resolvers::fixtures::Fixture;

    fn alert(id: &str, agency_id: &str, period: Option<(u64, u64)>) -> FeedEntity {
        FeedEntity {
            id: id.to_string(),
            alert: Some(GtfsAlert {
                active_period: period
                    .map(|(start, end)| TimeRange {
                        start: Some(start),
                        end: Some(end),
                    })
                    .into_iter()
                    .collect(),
                informed_entity: vec![EntitySelector {
                    agency_id: Some(agency_id.to_string()),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn active_alerts_follow_the_request_clock() {
        let fx = Fixture::new();
        let now = 1527720600; // 2018-05-30T22:50:00Z
        fx.publish(
            TopicKind::Alerts,
            vec![
                alert("current", "BART", Some((now - 60, now + 60))),
                alert("expired", "BART", Some((now - 7200, now - 3600))),
                alert("always", "BART", None),
                alert("elsewhere", "RTC", None),
            ],
        )
        .await;
        let ctx = fx.context(User::anon());
        let bart = ctx.loaders.agencies_by_id.load(1).await.unwrap().unwrap();

        let all = AgencyResolver
            .alerts(&ctx, &bart, None, None)
            .await
            .unwrap();
        assert_eq!(all.len(), 3);

        let active = AgencyResolver
            .alerts(&ctx, &bart, Some(true), None)
            .await
            .unwrap();
        assert_eq!(active.len(), 2);
        assert!(active.iter().all(|a| a.is_active_at(now as i64)));
    }

    #[tokio::test]
    async fn routes_and_places_come_through_loaders() {
        let fx = Fixture::new();
        let ctx = fx.context(User::anon());
        let bart = ctx.loaders.agencies_by_id.load(1).await.unwrap().unwrap();

        let routes = AgencyResolver.routes(&ctx, &bart, None, None).await.unwrap();
        assert_eq!(routes.len(), 1);
        let places = AgencyResolver.places(&ctx, &bart, None, None).await.unwrap();
        assert_eq!(places[0].adm1_iso.as_deref(), Some("US-CA"));
        assert_eq!(fx.finder.calls("find_agencies"), 0);
        assert_eq!(fx.finder.calls("routes_by_agency_ids"), 1);
    }
}
