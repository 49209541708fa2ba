//! Caller identity and role checks.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::error::ResolverError;
use crate::finder::{Checker, FinderError};

/// Role every caller holds.
pub const ROLE_ANON: &str = "anon";
/// Role held by any named caller.
pub const ROLE_USER: &str = "user";
pub const ROLE_ADMIN: &str = "admin";

/// The caller of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct User {
    pub name: String,
    pub roles: BTreeSet<String>,
    pub external_ids: BTreeMap<String, String>,
}

impl User {
    /// A caller with no name and no roles.
    pub fn anon() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    pub fn with_external_id(mut self, provider: impl Into<String>, id: impl Into<String>) -> Self {
        self.external_ids.insert(provider.into(), id.into());
        self
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.is_empty()
    }

    pub fn has_role(&self, role: &str) -> bool {
        match role {
            ROLE_ANON => true,
            ROLE_USER => !self.name.is_empty(),
            _ => self.roles.contains(role),
        }
    }

    pub fn require_role(&self, role: &str) -> Result<(), ResolverError> {
        if self.has_role(role) {
            Ok(())
        } else {
            debug!(user = %self.name, role, "access denied");
            Err(ResolverError::AccessDenied)
        }
    }

    /// Add whatever roles the authorization backend grants this caller.
    pub async fn with_checked_roles(mut self, checker: &dyn Checker) -> Result<Self, FinderError> {
        if self.is_anonymous() {
            return Ok(self);
        }
        let granted = checker.roles_for(&self.name).await?;
        self.roles.extend(granted);
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finder::StaticChecker;

    #[test]
    fn role_rules() {
        let anon = User::anon();
        assert!(anon.has_role(ROLE_ANON));
        assert!(!anon.has_role(ROLE_USER));
        assert!(!anon.has_role(ROLE_ADMIN));

        let user = User::named("ian");
        assert!(user.has_role(ROLE_USER));
        assert!(!user.has_role(ROLE_ADMIN));

        let admin = User::named("ian").with_roles([ROLE_ADMIN]);
        assert!(admin.has_role(ROLE_ADMIN));
        assert_eq!(admin.require_role(ROLE_ADMIN), Ok(()));
        assert_eq!(user.require_role(ROLE_ADMIN), Err(ResolverError::AccessDenied));
    }

    #[tokio::test]
    async fn checker_grants_extra_roles() {
        let checker = StaticChecker::new().with_roles("ian", &["admin"]);
        let user = User::named("ian").with_checked_roles(&checker).await.unwrap();
        assert!(user.has_role(ROLE_ADMIN));

        let anon = User::anon().with_checked_roles(&checker).await.unwrap();
        assert!(anon.roles.is_empty());
    }
}
