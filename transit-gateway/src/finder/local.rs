//! In-process stand-ins for the authorization backend, ingestion actions
//! and the job queue.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{info, warn};

use super::memory::MemoryFinder;
use super::{Actions, Checker, FinderError, Job, JobQueue};
use crate::domain::*;

/// Zip archives start with this signature.
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Grants fixed roles to named callers.
#[derive(Debug, Clone, Default)]
pub struct StaticChecker {
    roles: HashMap<String, Vec<String>>,
}

impl StaticChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_roles(mut self, user_name: impl Into<String>, roles: &[&str]) -> Self {
        self.roles.insert(
            user_name.into(),
            roles.iter().map(|r| r.to_string()).collect(),
        );
        self
    }
}

#[async_trait]
impl Checker for StaticChecker {
    async fn roles_for(&self, user_name: &str) -> Result<Vec<String>, FinderError> {
        Ok(self.roles.get(user_name).cloned().unwrap_or_default())
    }
}

/// Feed-version lifecycle commands applied directly to a [`MemoryFinder`].
///
/// Fetching over the network is not available; fetch commands report a
/// fetch error instead.
pub struct MemoryActions {
    finder: Arc<MemoryFinder>,
}

impl MemoryActions {
    pub fn new(finder: Arc<MemoryFinder>) -> Self {
        Self { finder }
    }
}

#[async_trait]
impl Actions for MemoryActions {
    async fn static_fetch(
        &self,
        feed_onestop_id: &str,
        url: Option<&str>,
        _body: Option<Vec<u8>>,
    ) -> Result<FeedVersionFetchResult, FinderError> {
        warn!(feed_onestop_id, url = ?url, "static fetch requested without a fetcher");
        Ok(FeedVersionFetchResult {
            fetch_error: Some("static fetch is not available".into()),
            ..Default::default()
        })
    }

    async fn rt_fetch(
        &self,
        _target_feed: &str,
        _url: &str,
        _url_type: &str,
    ) -> Result<(), FinderError> {
        Err(FinderError::Unsupported("realtime fetch"))
    }

    async fn gbfs_fetch(&self, _feed_onestop_id: &str, _url: &str) -> Result<(), FinderError> {
        Err(FinderError::Unsupported("gbfs fetch"))
    }

    async fn validate_upload(
        &self,
        url: Option<&str>,
        body: Option<Vec<u8>>,
        _rt_urls: &[String],
    ) -> Result<ValidationResult, FinderError> {
        let Some(body) = body else {
            return Ok(ValidationResult {
                failure_reason: Some(match url {
                    Some(_) => "fetching by url is not available".into(),
                    None => "no file or url given".into(),
                }),
                ..Default::default()
            });
        };
        if !body.starts_with(ZIP_MAGIC) {
            return Ok(ValidationResult {
                failure_reason: Some("not a zip archive".into()),
                errors: vec!["file is not a zip archive".into()],
                ..Default::default()
            });
        }
        Ok(ValidationResult {
            success: true,
            ..Default::default()
        })
    }

    async fn feed_version_import(
        &self,
        feed_version_id: i64,
    ) -> Result<FeedVersionImportResult, FinderError> {
        self.finder
            .edit("feed_version_import", |d| -> Result<(), FinderError> {
                let feed_id = d
                    .feed_version(feed_version_id)
                    .map(|fv| fv.feed_id)
                    .ok_or_else(|| FinderError::not_found("feed version", feed_version_id))?;
                d.feed_version_gtfs_imports
                    .retain(|i| i.feed_version_id != feed_version_id);
                let id = d
                    .feed_version_gtfs_imports
                    .iter()
                    .map(|i| i.id)
                    .max()
                    .unwrap_or(0)
                    + 1;
                d.feed_version_gtfs_imports.push(FeedVersionGtfsImport {
                    id,
                    feed_version_id,
                    success: true,
                    ..Default::default()
                });
                match d.feed_states.iter_mut().find(|s| s.feed_id == feed_id) {
                    Some(state) => state.feed_version_id = Some(feed_version_id),
                    None => {
                        let id = d.feed_states.iter().map(|s| s.id).max().unwrap_or(0) + 1;
                        d.feed_states.push(FeedState {
                            id,
                            feed_id,
                            feed_version_id: Some(feed_version_id),
                            public: false,
                        });
                    }
                }
                Ok(())
            })
            .await?;
        info!(feed_version_id, "feed version imported");
        Ok(FeedVersionImportResult { success: true })
    }

    async fn feed_version_unimport(
        &self,
        feed_version_id: i64,
    ) -> Result<FeedVersionUnimportResult, FinderError> {
        let removed = self
            .finder
            .edit("feed_version_unimport", |d| {
                let before = d.feed_version_gtfs_imports.len();
                d.feed_version_gtfs_imports
                    .retain(|i| i.feed_version_id != feed_version_id);
                for state in &mut d.feed_states {
                    if state.feed_version_id == Some(feed_version_id) {
                        state.feed_version_id = None;
                    }
                }
                before != d.feed_version_gtfs_imports.len()
            })
            .await;
        if !removed {
            return Err(FinderError::InvalidQuery(format!(
                "feed version {} is not imported",
                feed_version_id
            )));
        }
        info!(feed_version_id, "feed version unimported");
        Ok(FeedVersionUnimportResult { success: true })
    }

    async fn feed_version_delete(
        &self,
        feed_version_id: i64,
    ) -> Result<FeedVersionDeleteResult, FinderError> {
        self.finder
            .edit("feed_version_delete", |d| {
                if d
                    .feed_version_gtfs_imports
                    .iter()
                    .any(|i| i.feed_version_id == feed_version_id)
                {
                    return Err(FinderError::InvalidQuery(format!(
                        "feed version {} must be unimported first",
                        feed_version_id
                    )));
                }
                let before = d.feed_versions.len();
                d.feed_versions.retain(|fv| fv.id != feed_version_id);
                if before == d.feed_versions.len() {
                    return Err(FinderError::not_found("feed version", feed_version_id));
                }
                Ok(())
            })
            .await?;
        info!(feed_version_id, "feed version deleted");
        Ok(FeedVersionDeleteResult { success: true })
    }
}

/// Collects jobs in memory.
#[derive(Debug, Default)]
pub struct MemoryJobQueue {
    jobs: Mutex<Vec<Job>>,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jobs enqueued so far, oldest first.
    pub fn jobs(&self) -> Vec<Job> {
        self.jobs.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue(&self, job: Job) -> Result<(), FinderError> {
        info!(kind = %job.kind, "job enqueued");
        self.jobs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(job);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finder::{Finder, FinderData};

    fn finder() -> Arc<MemoryFinder> {
        Arc::new(MemoryFinder::new(FinderData {
            feeds: vec![Feed {
                id: 1,
                onestop_id: "f-test".into(),
                ..Default::default()
            }],
            feed_versions: vec![FeedVersion {
                id: 5,
                feed_id: 1,
                sha1: "e535".into(),
                ..Default::default()
            }],
            ..Default::default()
        }))
    }

    #[tokio::test]
    async fn import_unimport_delete_lifecycle() {
        let finder = finder();
        let actions = MemoryActions::new(Arc::clone(&finder));

        assert!(actions.feed_version_import(5).await.unwrap().success);
        let state = finder
            .feed_states_by_feed_ids(vec![1])
            .await
            .unwrap()
            .remove(0)
            .unwrap()
            .unwrap();
        assert_eq!(state.feed_version_id, Some(5));
        assert!(actions.feed_version_delete(5).await.is_err());

        assert!(actions.feed_version_unimport(5).await.unwrap().success);
        assert!(actions.feed_version_unimport(5).await.is_err());
        assert!(actions.feed_version_delete(5).await.unwrap().success);
        assert!(matches!(
            actions.feed_version_import(5).await,
            Err(FinderError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn validation_checks_for_zip_archives() {
        let actions = MemoryActions::new(finder());
        let ok = actions
            .validate_upload(None, Some(b"PK\x03\x04rest".to_vec()), &[])
            .await
            .unwrap();
        assert!(ok.success);

        let bad = actions
            .validate_upload(None, Some(b"hello".to_vec()), &[])
            .await
            .unwrap();
        assert!(!bad.success);
        assert_eq!(bad.failure_reason.as_deref(), Some("not a zip archive"));
    }

    #[tokio::test]
    async fn static_checker_grants_named_roles() {
        let checker = StaticChecker::new().with_roles("ian", &["admin"]);
        assert_eq!(checker.roles_for("ian").await.unwrap(), vec!["admin"]);
        assert!(checker.roles_for("drew").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn job_queue_keeps_order() {
        let queue = MemoryJobQueue::new();
        for kind in ["fetch", "import"] {
            queue
                .enqueue(Job {
                    kind: kind.into(),
                    args: vec![],
                })
                .await
                .unwrap();
        }
        let kinds: Vec<String> = queue.jobs().into_iter().map(|j| j.kind).collect();
        assert_eq!(kinds, vec!["fetch", "import"]);
    }
}
