//! Per-request context.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::auth::User;
use super::error::ResolverError;
use super::input::{check_bbox, check_cursor, check_limit, check_point_radius};
use super::meter::ApiMeter;
use crate::config::GatewayConfig;
use crate::domain::{BoundingBox, Cursor, PointRadius};
use crate::finder::{Actions, Checker, Finder, GbfsFinder, JobQueue, RtFinder};
use crate::loader::{CancelSignal, Loaders};
use crate::service_time::{Clock, ServiceWindowCache};

/// Collaborators and caches shared by every request.
#[derive(Clone)]
pub struct Services {
    pub finder: Arc<dyn Finder>,
    pub rt: Arc<dyn RtFinder>,
    pub gbfs: Arc<dyn GbfsFinder>,
    pub checker: Arc<dyn Checker>,
    pub actions: Arc<dyn Actions>,
    pub jobs: Arc<dyn JobQueue>,
    pub clock: Arc<dyn Clock>,
    pub config: Arc<GatewayConfig>,
    pub service_windows: ServiceWindowCache,
}

impl Services {
    /// Start a request: a fresh loader set and cancel signal for `user`.
    pub fn request(&self, user: User, meter: Arc<dyn ApiMeter>) -> RequestContext {
        let cancel = CancelSignal::new();
        let loaders = Loaders::new(&self.finder, self.config.loader_settings(), &cancel);
        RequestContext {
            services: self.clone(),
            user,
            meter,
            loaders: Arc::new(loaders),
            cancel,
        }
    }
}

/// Everything a resolver needs while answering one request.
///
/// Cheap to clone; clones share the loader cache and cancel signal.
#[derive(Clone)]
pub struct RequestContext {
    services: Services,
    pub user: User,
    pub meter: Arc<dyn ApiMeter>,
    pub loaders: Arc<Loaders>,
    pub cancel: CancelSignal,
}

impl RequestContext {
    pub fn finder(&self) -> &Arc<dyn Finder> {
        &self.services.finder
    }

    pub fn rt(&self) -> &Arc<dyn RtFinder> {
        &self.services.rt
    }

    pub fn gbfs(&self) -> &Arc<dyn GbfsFinder> {
        &self.services.gbfs
    }

    pub fn checker(&self) -> &Arc<dyn Checker> {
        &self.services.checker
    }

    pub fn actions(&self) -> &Arc<dyn Actions> {
        &self.services.actions
    }

    pub fn jobs(&self) -> &Arc<dyn JobQueue> {
        &self.services.jobs
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.services.config
    }

    pub fn service_windows(&self) -> &ServiceWindowCache {
        &self.services.service_windows
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.services.clock.now()
    }

    /// The role gate run before a protected field.
    pub fn require_role(&self, role: &str) -> Result<(), ResolverError> {
        self.user.require_role(role)
    }

    /// Tag the request meter with the root resolver being run.
    pub fn meter_resolver(&self, name: &str) {
        self.meter.add_dimension("graphql", "resolver", name);
    }

    pub fn limit(&self, limit: Option<i32>) -> usize {
        let c = self.config();
        check_limit(limit, c.default_limit, c.max_limit)
    }

    /// Limit for roots allowed the larger cap (`stops`, `trips`).
    pub fn large_limit(&self, limit: Option<i32>) -> usize {
        let c = self.config();
        check_limit(limit, c.default_limit, c.large_root_limit())
    }

    pub fn cursor(&self, after: Option<&str>) -> Result<Option<Cursor>, ResolverError> {
        check_cursor(after)
    }

    pub fn near(&self, near: Option<PointRadius>) -> Option<PointRadius> {
        near.map(|n| check_point_radius(n, self.config().max_radius))
    }

    pub fn bbox(&self, bbox: Option<BoundingBox>) -> Result<Option<BoundingBox>, ResolverError> {
        if let Some(b) = &bbox {
            check_bbox(b, self.config().max_radius)?;
        }
        Ok(bbox)
    }

    /// Fail fast once the request has been abandoned.
    pub fn check_cancelled(&self) -> Result<(), ResolverError> {
        if self.cancel.is_cancelled() {
            return Err(ResolverError::Cancelled);
        }
        Ok(())
    }
}
