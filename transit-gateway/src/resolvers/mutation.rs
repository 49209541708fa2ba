//! Entity edits and feed-version lifecycle commands.
//!
//! Edits reload the affected row through the finder rather than the
//! request's loaders, which may already hold the pre-edit value.

use tracing::info;

use crate::domain::*;
use crate::finder::{FindArgs, Job};
use crate::loader::BatchResult;
use crate::realtime::TopicKind;
use crate::request::{FieldResult, ROLE_ADMIN, ROLE_USER, RequestContext, ResolverError};

/// Job kind for a queued static fetch.
pub const STATIC_FETCH_JOB: &str = "static-fetch";

/// The single row of a one-id batch.
fn reloaded<T>(
    rows: BatchResult<Option<T>>,
    entity: &'static str,
    id: i64,
    field: &'static str,
) -> Result<T, ResolverError> {
    rows.field(field)?
        .into_iter()
        .next()
        .transpose()
        .field(field)?
        .flatten()
        .ok_or_else(|| ResolverError::not_found(entity, id))
}

fn required_id(id: Option<i64>) -> Result<i64, ResolverError> {
    id.ok_or_else(|| ResolverError::invalid("id is required"))
}

pub struct MutationResolver;

impl MutationResolver {
    pub async fn stop_create(
        &self,
        ctx: &RequestContext,
        input: StopSetInput,
    ) -> Result<Stop, ResolverError> {
        ctx.require_role(ROLE_ADMIN)?;
        let id = ctx.finder().stop_create(input).await.field("stop_create")?;
        info!(user = %ctx.user.name, id, "stop created");
        self.stop(ctx, id, "stop_create").await
    }

    pub async fn stop_update(
        &self,
        ctx: &RequestContext,
        input: StopSetInput,
    ) -> Result<Stop, ResolverError> {
        ctx.require_role(ROLE_ADMIN)?;
        required_id(input.id)?;
        let id = ctx.finder().stop_update(input).await.field("stop_update")?;
        self.stop(ctx, id, "stop_update").await
    }

    pub async fn stop_delete(
        &self,
        ctx: &RequestContext,
        id: i64,
    ) -> Result<DeleteResult, ResolverError> {
        ctx.require_role(ROLE_ADMIN)?;
        ctx.finder().stop_delete(id).await.field("stop_delete")?;
        info!(user = %ctx.user.name, id, "stop deleted");
        Ok(DeleteResult { id })
    }

    pub async fn level_create(
        &self,
        ctx: &RequestContext,
        input: LevelSetInput,
    ) -> Result<Level, ResolverError> {
        ctx.require_role(ROLE_ADMIN)?;
        let id = ctx.finder().level_create(input).await.field("level_create")?;
        self.level(ctx, id, "level_create").await
    }

    pub async fn level_update(
        &self,
        ctx: &RequestContext,
        input: LevelSetInput,
    ) -> Result<Level, ResolverError> {
        ctx.require_role(ROLE_ADMIN)?;
        required_id(input.id)?;
        let id = ctx.finder().level_update(input).await.field("level_update")?;
        self.level(ctx, id, "level_update").await
    }

    pub async fn level_delete(
        &self,
        ctx: &RequestContext,
        id: i64,
    ) -> Result<DeleteResult, ResolverError> {
        ctx.require_role(ROLE_ADMIN)?;
        ctx.finder().level_delete(id).await.field("level_delete")?;
        Ok(DeleteResult { id })
    }

    pub async fn pathway_create(
        &self,
        ctx: &RequestContext,
        input: PathwaySetInput,
    ) -> Result<Pathway, ResolverError> {
        ctx.require_role(ROLE_ADMIN)?;
        let id = ctx
            .finder()
            .pathway_create(input)
            .await
            .field("pathway_create")?;
        self.pathway(ctx, id, "pathway_create").await
    }

    pub async fn pathway_update(
        &self,
        ctx: &RequestContext,
        input: PathwaySetInput,
    ) -> Result<Pathway, ResolverError> {
        ctx.require_role(ROLE_ADMIN)?;
        required_id(input.id)?;
        let id = ctx
            .finder()
            .pathway_update(input)
            .await
            .field("pathway_update")?;
        self.pathway(ctx, id, "pathway_update").await
    }

    pub async fn pathway_delete(
        &self,
        ctx: &RequestContext,
        id: i64,
    ) -> Result<DeleteResult, ResolverError> {
        ctx.require_role(ROLE_ADMIN)?;
        ctx.finder().pathway_delete(id).await.field("pathway_delete")?;
        Ok(DeleteResult { id })
    }

    /// Fetch a static feed now, from `url` or an uploaded `file`.
    pub async fn feed_version_fetch(
        &self,
        ctx: &RequestContext,
        feed_onestop_id: &str,
        url: Option<&str>,
        file: Option<Vec<u8>>,
    ) -> Result<FeedVersionFetchResult, ResolverError> {
        ctx.require_role(ROLE_ADMIN)?;
        if url.is_none() && file.is_none() {
            return Err(ResolverError::invalid("a url or a file is required"));
        }
        ctx.actions()
            .static_fetch(feed_onestop_id, url, file)
            .await
            .field("feed_version_fetch")
    }

    /// Fetch one realtime message for `target_feed` now.
    ///
    /// `url_type` names the message kind, e.g. `realtime_trip_updates`.
    pub async fn feed_rt_fetch(
        &self,
        ctx: &RequestContext,
        target_feed: &str,
        url: &str,
        url_type: &str,
    ) -> Result<(), ResolverError> {
        ctx.require_role(ROLE_ADMIN)?;
        if TopicKind::parse(url_type).is_none() {
            return Err(ResolverError::invalid(format!(
                "unknown realtime url type {url_type:?}"
            )));
        }
        if url.trim().is_empty() {
            return Err(ResolverError::invalid("a url is required"));
        }
        info!(user = %ctx.user.name, target_feed, url_type, "realtime fetch requested");
        ctx.actions()
            .rt_fetch(target_feed, url, url_type)
            .await
            .field("feed_rt_fetch")
    }

    /// Fetch a GBFS feed now.
    pub async fn gbfs_fetch(
        &self,
        ctx: &RequestContext,
        feed_onestop_id: &str,
        url: &str,
    ) -> Result<(), ResolverError> {
        ctx.require_role(ROLE_ADMIN)?;
        if url.trim().is_empty() {
            return Err(ResolverError::invalid("a url is required"));
        }
        ctx.actions()
            .gbfs_fetch(feed_onestop_id, url)
            .await
            .field("gbfs_fetch")
    }

    /// Queue static fetches to run outside the request.
    pub async fn feed_fetch_enqueue(
        &self,
        ctx: &RequestContext,
        feed_onestop_ids: &[String],
    ) -> Result<usize, ResolverError> {
        ctx.require_role(ROLE_ADMIN)?;
        for feed in feed_onestop_ids {
            let job = Job {
                kind: STATIC_FETCH_JOB.to_string(),
                args: vec![feed.clone()],
            };
            ctx.jobs().enqueue(job).await.field("feed_fetch_enqueue")?;
        }
        Ok(feed_onestop_ids.len())
    }

    pub async fn feed_version_import(
        &self,
        ctx: &RequestContext,
        sha1: &str,
    ) -> Result<FeedVersionImportResult, ResolverError> {
        ctx.require_role(ROLE_ADMIN)?;
        let fv = self.feed_version_by_sha1(ctx, sha1).await?;
        info!(user = %ctx.user.name, feed_version_id = fv.id, sha1, "import requested");
        ctx.actions()
            .feed_version_import(fv.id)
            .await
            .field("feed_version_import")
    }

    pub async fn feed_version_unimport(
        &self,
        ctx: &RequestContext,
        sha1: &str,
    ) -> Result<FeedVersionUnimportResult, ResolverError> {
        ctx.require_role(ROLE_ADMIN)?;
        let fv = self.feed_version_by_sha1(ctx, sha1).await?;
        info!(user = %ctx.user.name, feed_version_id = fv.id, sha1, "unimport requested");
        ctx.actions()
            .feed_version_unimport(fv.id)
            .await
            .field("feed_version_unimport")
    }

    pub async fn feed_version_delete(
        &self,
        ctx: &RequestContext,
        sha1: &str,
    ) -> Result<FeedVersionDeleteResult, ResolverError> {
        ctx.require_role(ROLE_ADMIN)?;
        let fv = self.feed_version_by_sha1(ctx, sha1).await?;
        info!(user = %ctx.user.name, feed_version_id = fv.id, sha1, "delete requested");
        ctx.actions()
            .feed_version_delete(fv.id)
            .await
            .field("feed_version_delete")
    }

    /// Validate an uploaded or linked static feed without importing it.
    pub async fn validate_gtfs(
        &self,
        ctx: &RequestContext,
        url: Option<&str>,
        file: Option<Vec<u8>>,
        realtime_urls: &[String],
    ) -> Result<ValidationResult, ResolverError> {
        ctx.require_role(ROLE_USER)?;
        ctx.actions()
            .validate_upload(url, file, realtime_urls)
            .await
            .field("validate_gtfs")
    }

    async fn feed_version_by_sha1(
        &self,
        ctx: &RequestContext,
        sha1: &str,
    ) -> Result<FeedVersion, ResolverError> {
        let args = FindArgs {
            limit: 1,
            after: None,
            ids: Vec::new(),
            filter: Some(FeedVersionFilter {
                sha1: Some(sha1.to_string()),
                ..Default::default()
            }),
        };
        ctx.finder()
            .find_feed_versions(args)
            .await
            .field("feed_version")?
            .into_iter()
            .next()
            .ok_or_else(|| ResolverError::not_found("feed version", sha1))
    }

    async fn stop(
        &self,
        ctx: &RequestContext,
        id: i64,
        field: &'static str,
    ) -> Result<Stop, ResolverError> {
        reloaded(ctx.finder().stops_by_ids(vec![id]).await, "stop", id, field)
    }

    async fn level(
        &self,
        ctx: &RequestContext,
        id: i64,
        field: &'static str,
    ) -> Result<Level, ResolverError> {
        reloaded(ctx.finder().levels_by_ids(vec![id]).await, "level", id, field)
    }

    async fn pathway(
        &self,
        ctx: &RequestContext,
        id: i64,
        field: &'static str,
    ) -> Result<Pathway, ResolverError> {
        reloaded(
            ctx.finder().pathways_by_ids(vec![id]).await,
            "pathway",
            id,
            field,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finder::FinderError;
    use crate::request::User;
    use crate::resolvers::fixtures::{FTVL, FV, Fixture, MCAR_S};

    const SHA1: &str = "e535eb2b3b9ac3ef15d82c56575e914575e732e0";

    fn admin() -> User {
        User::named("ian").with_roles([ROLE_ADMIN])
    }

    #[tokio::test]
    async fn edits_need_the_admin_role() {
        let fx = Fixture::new();
        for user in [User::anon(), User::named("drew")] {
            let ctx = fx.context(user);
            assert_eq!(
                MutationResolver
                    .stop_create(&ctx, StopSetInput::default())
                    .await
                    .unwrap_err(),
                ResolverError::AccessDenied
            );
            assert_eq!(
                MutationResolver
                    .feed_version_import(&ctx, SHA1)
                    .await
                    .unwrap_err(),
                ResolverError::AccessDenied
            );
        }
        assert_eq!(fx.finder.calls("stop_create"), 0);
    }

    #[tokio::test]
    async fn validation_needs_a_named_caller() {
        let fx = Fixture::new();
        let anon = fx.context(User::anon());
        assert_eq!(
            MutationResolver
                .validate_gtfs(&anon, None, Some(b"PK\x03\x04".to_vec()), &[])
                .await
                .unwrap_err(),
            ResolverError::AccessDenied
        );
        let user = fx.context(User::named("drew"));
        let result = MutationResolver
            .validate_gtfs(&user, None, Some(b"PK\x03\x04".to_vec()), &[])
            .await
            .unwrap();
        assert!(result.success);
    }

    #[tokio::test]
    async fn stop_edits_reload_the_row() {
        let fx = Fixture::new();
        let ctx = fx.context(admin());
        let created = MutationResolver
            .stop_create(
                &ctx,
                StopSetInput {
                    feed_version_id: Some(FV),
                    stop_id: Some("19TH".into()),
                    stop_name: Some("19th St Oakland".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(created.stop_id, "19TH");
        assert_eq!(created.feed_version_sha1, SHA1);

        let updated = MutationResolver
            .stop_update(
                &ctx,
                StopSetInput {
                    id: Some(created.id),
                    stop_name: Some("19th Street".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.stop_name, "19th Street");

        let deleted = MutationResolver.stop_delete(&ctx, created.id).await.unwrap();
        assert_eq!(deleted.id, created.id);
        assert!(matches!(
            MutationResolver.stop_delete(&ctx, created.id).await,
            Err(ResolverError::Collaborator { .. })
        ));
    }

    #[tokio::test]
    async fn updates_need_an_id() {
        let fx = Fixture::new();
        let ctx = fx.context(admin());
        let err = MutationResolver
            .level_update(&ctx, LevelSetInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ResolverError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn pathway_between_two_platforms() {
        let fx = Fixture::new();
        let ctx = fx.context(admin());
        let pathway = MutationResolver
            .pathway_create(
                &ctx,
                PathwaySetInput {
                    feed_version_id: Some(FV),
                    pathway_id: Some("P1".into()),
                    from_stop_id: Some(FTVL),
                    to_stop_id: Some(MCAR_S),
                    pathway_mode: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!((pathway.from_stop_id, pathway.to_stop_id), (FTVL, MCAR_S));
    }

    #[tokio::test]
    async fn lifecycle_commands_resolve_the_sha1() {
        let fx = Fixture::new();
        let ctx = fx.context(admin());
        let err = MutationResolver
            .feed_version_unimport(&ctx, "0000")
            .await
            .unwrap_err();
        assert_eq!(err, ResolverError::not_found("feed version", "0000"));

        let imported = MutationResolver
            .feed_version_import(&ctx, SHA1)
            .await
            .unwrap();
        assert!(imported.success);
        let imports = fx
            .context(User::anon())
            .loaders
            .feed_version_gtfs_imports_by_feed_version_id
            .load(FV)
            .await
            .unwrap();
        assert!(imports.is_some_and(|i| i.success));
    }

    #[tokio::test]
    async fn fetches_are_queued() {
        let fx = Fixture::new();
        let ctx = fx.context(admin());
        let queued = MutationResolver
            .feed_fetch_enqueue(&ctx, &["BA".to_string()])
            .await
            .unwrap();
        assert_eq!(queued, 1);
        assert_eq!(
            fx.jobs.jobs(),
            vec![Job {
                kind: STATIC_FETCH_JOB.into(),
                args: vec!["BA".into()],
            }]
        );

        let err = MutationResolver
            .feed_version_fetch(&ctx, "BA", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolverError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn realtime_and_gbfs_fetches_reach_the_actions() {
        let fx = Fixture::new();
        let user = fx.context(User::named("drew"));
        assert_eq!(
            MutationResolver
                .feed_rt_fetch(&user, "BA~rt", "http://x/tu.pb", "realtime_trip_updates")
                .await
                .unwrap_err(),
            ResolverError::AccessDenied
        );
        assert_eq!(
            MutationResolver
                .gbfs_fetch(&user, "bikes", "http://x/gbfs.json")
                .await
                .unwrap_err(),
            ResolverError::AccessDenied
        );

        let ctx = fx.context(admin());
        let err = MutationResolver
            .feed_rt_fetch(&ctx, "BA~rt", "http://x/tu.pb", "realtime_buses")
            .await
            .unwrap_err();
        assert!(matches!(err, ResolverError::InvalidInput(_)));
        let err = MutationResolver
            .gbfs_fetch(&ctx, "bikes", " ")
            .await
            .unwrap_err();
        assert!(matches!(err, ResolverError::InvalidInput(_)));

        // The in-memory actions cannot fetch; the failure is attributed to the field.
        let err = MutationResolver
            .feed_rt_fetch(&ctx, "BA~rt", "http://x/tu.pb", "realtime_trip_updates")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ResolverError::Collaborator {
                field: "feed_rt_fetch",
                source: FinderError::Unsupported(_)
            }
        ));
        let err = MutationResolver
            .gbfs_fetch(&ctx, "bikes", "http://x/gbfs.json")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ResolverError::Collaborator {
                field: "gbfs_fetch",
                source: FinderError::Unsupported(_)
            }
        ));
    }
}
