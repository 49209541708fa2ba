//! HTTP route handlers.

use axum::extract::{Path, Query};
use axum::routing::{get, post};
use axum::{Extension, Json, Router, middleware};
use futures::future::try_join_all;
use tower_http::trace::TraceLayer;

use super::dto::*;
use super::error::AppError;
use super::middleware::request_context;
use super::state::AppState;
use crate::domain::{
    Agency, Alert, FeedFilter, FeedVersionImportResult, Route, StopTime, VehiclePosition,
};
use crate::request::{FieldResult, RequestContext, ResolverError};
use crate::resolvers::{
    FeedResolver, Me, MutationResolver, QueryResolver, RootArgs, StopResolver, StopTimeResolver,
};

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/agencies", get(agencies))
        .route("/routes", get(routes))
        .route("/stops/:id/stop_times", get(stop_times))
        .route("/stops/:id/departures", get(departures))
        .route("/vehicles", get(vehicles))
        .route("/feeds/:onestop_id/alerts", get(feed_alerts))
        .route("/me", get(me))
        .route("/admin/feed_versions/:sha1/import", post(import_feed_version))
        .layer(middleware::from_fn_with_state(state.clone(), request_context))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

async fn agencies(
    Extension(ctx): Extension<RequestContext>,
    Query(q): Query<AgenciesQuery>,
) -> Result<Json<Vec<Agency>>, AppError> {
    Ok(Json(QueryResolver.agencies(&ctx, q.into_args()).await?))
}

async fn routes(
    Extension(ctx): Extension<RequestContext>,
    Query(q): Query<RoutesQuery>,
) -> Result<Json<Vec<Route>>, AppError> {
    Ok(Json(QueryResolver.routes(&ctx, q.into_args()).await?))
}

async fn stop_times(
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
    Query(q): Query<StopTimesQuery>,
) -> Result<Json<Vec<StopTimeView>>, AppError> {
    let stop = ctx
        .loaders
        .stops_by_id
        .load(id)
        .await
        .field("stop")?
        .ok_or_else(|| ResolverError::not_found("stop", id))?;
    let rows = StopResolver
        .stop_times(&ctx, &stop, q.limit, Some(q.filter()))
        .await?;
    Ok(Json(views(&ctx, rows).await?))
}

async fn departures(
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
    Query(q): Query<StopTimesQuery>,
) -> Result<Json<Vec<StopTimeView>>, AppError> {
    let stop = ctx
        .loaders
        .stops_by_id
        .load(id)
        .await
        .field("stop")?
        .ok_or_else(|| ResolverError::not_found("stop", id))?;
    let rows = StopResolver
        .departures(&ctx, &stop, q.limit, Some(q.filter()))
        .await?;
    Ok(Json(views(&ctx, rows).await?))
}

/// Resolve the events of every row together, so their trip lookups share
/// batches.
async fn views(ctx: &RequestContext, rows: Vec<StopTime>) -> Result<Vec<StopTimeView>, AppError> {
    let views = try_join_all(rows.into_iter().map(|row| async move {
        let (arrival, departure, schedule_relationship, trip) = tokio::try_join!(
            StopTimeResolver.arrival(ctx, &row),
            StopTimeResolver.departure(ctx, &row),
            StopTimeResolver.schedule_relationship(ctx, &row),
            StopTimeResolver.trip(ctx, &row),
        )?;
        Ok::<_, ResolverError>(StopTimeView {
            gtfs_trip_id: trip.map(|t| t.trip_id),
            stop_time: row,
            arrival,
            departure,
            schedule_relationship,
        })
    }))
    .await?;
    Ok(views)
}

async fn vehicles(
    Extension(ctx): Extension<RequestContext>,
    Query(q): Query<VehiclesQuery>,
) -> Result<Json<Vec<VehiclePosition>>, AppError> {
    let positions = QueryResolver
        .vehicle_positions(&ctx, q.limit, Some(q.filter()))
        .await?;
    Ok(Json(positions))
}

async fn feed_alerts(
    Extension(ctx): Extension<RequestContext>,
    Path(onestop_id): Path<String>,
    Query(q): Query<AlertsQuery>,
) -> Result<Json<Vec<Alert>>, AppError> {
    let filter = FeedFilter {
        onestop_id: Some(onestop_id.clone()),
        ..Default::default()
    };
    let feed = QueryResolver
        .feeds(&ctx, RootArgs::filter(filter).with_limit(1))
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ResolverError::not_found("feed", &onestop_id))?;
    Ok(Json(FeedResolver.alerts(&ctx, &feed, q.active, q.limit).await?))
}

async fn me(Extension(ctx): Extension<RequestContext>) -> Result<Json<Me>, AppError> {
    Ok(Json(QueryResolver.me(&ctx).await?))
}

async fn import_feed_version(
    Extension(ctx): Extension<RequestContext>,
    Path(sha1): Path<String>,
) -> Result<Json<FeedVersionImportResult>, AppError> {
    Ok(Json(MutationResolver.feed_version_import(&ctx, &sha1).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{ROLE_ADMIN, User};
    use crate::resolvers::fixtures::{Fixture, TWELFTH};

    #[tokio::test]
    async fn departures_carry_events_and_trip_ids() {
        let fx = Fixture::new();
        let ctx = fx.context(User::anon());
        let q = StopTimesQuery {
            next: Some(900),
            ..Default::default()
        };
        let Json(views) = departures(Extension(ctx), Path(TWELFTH), Query(q))
            .await
            .unwrap();
        let trips: Vec<_> = views.iter().filter_map(|v| v.gtfs_trip_id.as_deref()).collect();
        assert_eq!(
            trips,
            vec!["1031527WKDY", "2211533WKDY", "3610403WKDY", "4410403WKDY"]
        );
        assert!(views.iter().all(|v| v.departure.stop_timezone == "America/Los_Angeles"));
    }

    #[tokio::test]
    async fn unknown_stop_is_not_found() {
        let fx = Fixture::new();
        let ctx = fx.context(User::anon());
        let err = stop_times(Extension(ctx), Path(999), Query(StopTimesQuery::default()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn import_is_admin_only() {
        let fx = Fixture::new();
        let sha1 = "e535eb2b3b9ac3ef15d82c56575e914575e732e0".to_string();
        let err = import_feed_version(Extension(fx.context(User::named("drew"))), Path(sha1.clone()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::FORBIDDEN);

        let admin = fx.context(User::named("ian").with_roles([ROLE_ADMIN]));
        let Json(result) = import_feed_version(Extension(admin), Path(sha1)).await.unwrap();
        assert!(result.success);
    }

    #[tokio::test]
    async fn alerts_for_an_unknown_feed() {
        let fx = Fixture::new();
        let ctx = fx.context(User::anon());
        let err = feed_alerts(Extension(ctx), Path("nope".into()), Query(AlertsQuery::default()))
            .await
            .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::NOT_FOUND);
    }
}
