//! One resolver per exposed entity.
//!
//! Each method takes the request context, the parent record and the
//! field's arguments. Root selections go to the finder; child collections
//! and references only ever go through the request's loaders.

mod agency;
mod calendar;
mod census;
mod feed;
mod feed_version;
mod mutation;
mod operator;
mod pathway;
mod query;
mod route;
mod stop;
mod stop_time;
mod trip;

#[cfg(test)]
pub(crate) mod fixtures;

use std::hash::Hash;

pub use agency::AgencyResolver;
pub use calendar::CalendarResolver;
pub use census::{
    CensusDatasetResolver, CensusGeographyResolver, CensusTableResolver, CensusValueResolver,
};
pub use feed::{FeedResolver, FeedStateResolver};
pub use feed_version::FeedVersionResolver;
pub use mutation::MutationResolver;
pub use operator::OperatorResolver;
pub use pathway::{LevelResolver, PathwayResolver};
pub use query::{Me, QueryResolver, RootArgs};
pub use route::{RouteHeadwayResolver, RouteResolver, RouteStopPatternResolver, RouteStopResolver};
pub use stop::{StopExternalReferenceResolver, StopResolver};
pub use stop_time::StopTimeResolver;
pub use trip::TripResolver;

use crate::domain::Cursor;
use crate::finder::AlertQuery;
use crate::loader::Loader;
use crate::request::{FieldResult, RequestContext, ResolverError};

/// Follow a nullable reference. A missing key resolves to `None` without
/// touching the loader.
async fn reference<K, T>(
    loader: &Loader<K, Option<T>>,
    key: Option<K>,
    field: &'static str,
) -> Result<Option<T>, ResolverError>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    match key {
        Some(key) => loader.load(key).await.field(field),
        None => Ok(None),
    }
}

/// Alert query for an `alerts(active, limit)` field.
fn alert_query(ctx: &RequestContext, active: Option<bool>, limit: Option<i32>) -> AlertQuery {
    AlertQuery {
        limit: ctx.limit(limit),
        active: active.unwrap_or(false),
        now: ctx.now(),
    }
}

fn cursor(feed_version_id: i64, id: i64) -> Cursor {
    Cursor::new(feed_version_id, id)
}
