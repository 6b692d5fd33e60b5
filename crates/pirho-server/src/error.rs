//! HTTP mapping of domain errors.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use pirho_core::error::{ConflictKind, PirhoError};
use pirho_game::GameError;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] PirhoError),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

impl From<GameError> for ApiError {
    fn from(err: GameError) -> Self {
        ApiError::Domain(err.into())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, Value) {
        match self {
            ApiError::MalformedPayload(_) => (StatusCode::BAD_REQUEST, json!("malformed_payload")),
            ApiError::Domain(err) => match err {
                PirhoError::Validation { .. } => (StatusCode::BAD_REQUEST, json!("validation")),
                PirhoError::NotFound { .. } => (StatusCode::NOT_FOUND, json!("not_found")),
                PirhoError::AuthenticationFailed { .. } => {
                    (StatusCode::UNAUTHORIZED, json!("authentication_failed"))
                }
                PirhoError::AccessDenied { reason } => (StatusCode::FORBIDDEN, json!(reason)),
                PirhoError::Conflict(
                    kind @ (ConflictKind::ProductNotInSession | ConflictKind::SelfInvite),
                ) => (StatusCode::BAD_REQUEST, json!(kind)),
                PirhoError::Conflict(kind) => (StatusCode::CONFLICT, json!(kind)),
                PirhoError::StorageUnavailable(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, json!("storage_unavailable"))
                }
                PirhoError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, json!("internal")),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = if status.is_server_error() {
            error!(error = %self, "Request failed");
            // Storage and internal details stay in the logs.
            status
                .canonical_reason()
                .unwrap_or("Internal Server Error")
                .to_string()
        } else {
            debug!(error = %self, %status, "Request rejected");
            self.to_string()
        };

        (status, Json(json!({ "error": message, "code": code }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pirho_core::error::DenyReason;

    fn status(err: PirhoError) -> StatusCode {
        ApiError::from(err).status_and_code().0
    }

    #[test]
    fn domain_errors_map_to_statuses() {
        assert_eq!(status(PirhoError::validation("name", "x")), StatusCode::BAD_REQUEST);
        assert_eq!(status(PirhoError::not_found("session", "1")), StatusCode::NOT_FOUND);
        assert_eq!(status(DenyReason::FriendsOnly.into()), StatusCode::FORBIDDEN);
        assert_eq!(status(ConflictKind::SessionFull.into()), StatusCode::CONFLICT);
        assert_eq!(status(ConflictKind::SelfInvite.into()), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(PirhoError::StorageUnavailable("down".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(GameError::TokenExpired).status_and_code().0,
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn codes_are_snake_case() {
        let (_, code) = ApiError::from(PirhoError::from(ConflictKind::AlreadyAnswered))
            .status_and_code();
        assert_eq!(code, json!("already_answered"));

        let (_, code) = ApiError::from(PirhoError::from(DenyReason::NotCreatorOrAdmin))
            .status_and_code();
        assert_eq!(code, json!("not_creator_or_admin"));
    }
}
