//! Per-request context.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use super::error::AppError;
use super::state::AppState;
use crate::finder::Checker;
use crate::request::{ApiMeter, FieldResult, MemoryMeter, User};

pub const HEADER_USER_NAME: &str = "x-user-name";

/// Comma-separated roles asserted by the upstream proxy.
pub const HEADER_USER_ROLES: &str = "x-user-roles";

/// Identify the caller: anonymous without a name header, otherwise the
/// header roles plus whatever the checker grants.
pub async fn caller_from_headers(
    headers: &HeaderMap,
    checker: &dyn Checker,
) -> Result<User, AppError> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    let Some(name) = header(HEADER_USER_NAME) else {
        return Ok(User::anon());
    };
    let mut roles: Vec<String> = header(HEADER_USER_ROLES)
        .map(|r| {
            r.split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();
    let granted = checker.roles_for(name).await.field("roles")?;
    roles.extend(granted);
    Ok(User::named(name).with_roles(roles))
}

/// Attach a fresh [`RequestContext`](crate::request::RequestContext) to
/// the request, then meter the response.
pub async fn request_context(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = caller_from_headers(request.headers(), state.services.checker.as_ref()).await?;
    let meter = Arc::new(MemoryMeter::new());
    let ctx = state.services.request(user, meter.clone());
    let _guard = ctx.cancel.drop_guard();
    request.extensions_mut().insert(ctx);

    let response = next.run(request).await;

    let status = response.status();
    meter.meter("graphql", 1.0, &[("status".into(), status.as_u16().to_string())]);
    debug!(events = ?meter.events(), "request metered");
    Ok(response)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::http::{HeaderValue, StatusCode};

    use super::*;
    use crate::finder::{FinderError, StaticChecker};
    use crate::request::{ROLE_ADMIN, ROLE_USER, ResolverError};

    struct DownChecker;

    #[async_trait]
    impl Checker for DownChecker {
        async fn roles_for(&self, _user_name: &str) -> Result<Vec<String>, FinderError> {
            Err(FinderError::Backend("authz unreachable".into()))
        }
    }

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_str(v).unwrap());
        }
        map
    }

    #[tokio::test]
    async fn no_name_is_anonymous() {
        let checker = StaticChecker::new().with_roles("ian", &[ROLE_ADMIN]);
        let user = caller_from_headers(&headers(&[(HEADER_USER_ROLES, "admin")]), &checker)
            .await
            .unwrap();
        assert!(user.is_anonymous());
        assert!(!user.has_role(ROLE_ADMIN));
    }

    #[tokio::test]
    async fn header_and_checker_roles_combine() {
        let checker = StaticChecker::new().with_roles("ian", &[ROLE_ADMIN]);
        let user = caller_from_headers(
            &headers(&[(HEADER_USER_NAME, "ian"), (HEADER_USER_ROLES, "tlv2, ")]),
            &checker,
        )
        .await
        .unwrap();
        assert_eq!(user.name, "ian");
        assert!(user.has_role(ROLE_USER));
        assert!(user.has_role(ROLE_ADMIN));
        assert!(user.has_role("tlv2"));

        let drew = caller_from_headers(&headers(&[(HEADER_USER_NAME, "drew")]), &checker)
            .await
            .unwrap();
        assert!(!drew.has_role(ROLE_ADMIN));
    }

    #[tokio::test]
    async fn checker_failure_is_a_bad_gateway() {
        let err = caller_from_headers(&headers(&[(HEADER_USER_NAME, "ian")]), &DownChecker)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Resolver(ResolverError::Collaborator { field: "roles", .. })
        ));
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);

        // Anonymous callers never reach the checker.
        let anon = caller_from_headers(&HeaderMap::new(), &DownChecker)
            .await
            .unwrap();
        assert!(anon.is_anonymous());
    }
}
