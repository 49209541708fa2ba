//! Mapping resolver failures to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{debug, error};

use super::dto::ErrorResponse;
use crate::request::ResolverError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Resolver(#[from] ResolverError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Resolver(e) => match e {
                ResolverError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                ResolverError::NotFound { .. } => StatusCode::NOT_FOUND,
                ResolverError::AccessDenied => StatusCode::FORBIDDEN,
                ResolverError::TimezoneUnavailable => StatusCode::UNPROCESSABLE_ENTITY,
                ResolverError::Collaborator { .. } => StatusCode::BAD_GATEWAY,
                ResolverError::Cancelled => StatusCode::REQUEST_TIMEOUT,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        if status.is_server_error() {
            error!(%status, %message, "request failed");
        } else {
            debug!(%status, %message, "request rejected");
        }
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finder::FinderError;

    #[test]
    fn statuses() {
        let cases = [
            (ResolverError::invalid("bad bbox"), StatusCode::BAD_REQUEST),
            (ResolverError::not_found("stop", 9), StatusCode::NOT_FOUND),
            (ResolverError::AccessDenied, StatusCode::FORBIDDEN),
            (
                ResolverError::collaborator("stops", FinderError::Backend("down".into())),
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status(), status);
        }
    }

    #[test]
    fn body_carries_the_message() {
        let response = AppError::from(ResolverError::not_found("stop", 9)).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
