use super::cursor;
use crate::domain::*;
use crate::loader::Param;
use crate::request::{FieldResult, RequestContext, ResolverError};

pub struct OperatorResolver;

impl OperatorResolver {
    /// Operators are not versioned; the cursor carries only the id.
    pub fn cursor(&self, obj: &Operator) -> Cursor {
        cursor(0, obj.id)
    }

    /// Agencies in active feed versions that carry this operator's onestop id.
    pub async fn agencies(
        &self,
        ctx: &RequestContext,
        obj: &Operator,
    ) -> Result<Vec<Agency>, ResolverError> {
        ctx.loaders
            .agencies_by_onestop_id
            .load(Param::new(obj.onestop_id.clone()))
            .await
            .field("agencies")
    }

    pub async fn feeds(
        &self,
        ctx: &RequestContext,
        obj: &Operator,
        limit: Option<i32>,
        filter: Option<FeedFilter>,
    ) -> Result<Vec<Feed>, ResolverError> {
        let param = Param::new(obj.onestop_id.clone())
            .with_limit(limit)
            .with_filter(filter);
        ctx.loaders
            .feeds_by_operator_onestop_id
            .load(param)
            .await
            .field("feeds")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::User;
    use crate::resolvers::fixtures::{BART_AGENCY, Fixture, bart};

    #[tokio::test]
    async fn operator_links_agencies_and_feeds() {
        let mut data = bart();
        data.operators.push(Operator {
            id: 7,
            onestop_id: BART_AGENCY.into(),
            feed_id: Some(1),
            agency_id: Some(1),
            ..Default::default()
        });
        let fx = Fixture::with_data(data);
        let ctx = fx.context(User::anon());
        let agency = ctx.loaders.agencies_by_id.load(1).await.unwrap().unwrap();
        let operator = ctx
            .loaders
            .operators_by_agency_id
            .load(agency.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(OperatorResolver.cursor(&operator), Cursor::new(0, 7));

        let agencies = OperatorResolver.agencies(&ctx, &operator).await.unwrap();
        assert_eq!(agencies.iter().map(|a| a.id).collect::<Vec<_>>(), vec![1]);
        let feeds = OperatorResolver
            .feeds(&ctx, &operator, None, None)
            .await
            .unwrap();
        assert_eq!(feeds.iter().map(|f| f.id).collect::<Vec<_>>(), vec![1]);
    }
}
