use crate::domain::*;
use crate::loader::Param;
use crate::request::{FieldResult, RequestContext, ResolverError};

pub struct LevelResolver;

impl LevelResolver {
    pub async fn stops(
        &self,
        ctx: &RequestContext,
        obj: &Level,
        limit: Option<i32>,
    ) -> Result<Vec<Stop>, ResolverError> {
        let param = Param::new(obj.id).with_limit(limit);
        ctx.loaders.stops_by_level_id.load(param).await.field("stops")
    }
}

pub struct PathwayResolver;

impl PathwayResolver {
    pub async fn from_stop(
        &self,
        ctx: &RequestContext,
        obj: &Pathway,
    ) -> Result<Option<Stop>, ResolverError> {
        ctx.loaders
            .stops_by_id
            .load(obj.from_stop_id)
            .await
            .field("from_stop")
    }

    pub async fn to_stop(
        &self,
        ctx: &RequestContext,
        obj: &Pathway,
    ) -> Result<Option<Stop>, ResolverError> {
        ctx.loaders
            .stops_by_id
            .load(obj.to_stop_id)
            .await
            .field("to_stop")
    }
}
