//! Bearer token extractors.

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use pirho_core::models::user::Principal;
use pirho_game::GameError;
use pirho_game::token::validate_access_token;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// An authenticated caller. Rejects the request with 401 otherwise.
#[derive(Debug, Clone, Copy)]
pub struct AuthPrincipal(pub Principal);

/// The caller if a valid token is present. A missing or invalid token
/// makes the caller anonymous.
#[derive(Debug, Clone, Copy)]
pub struct MaybePrincipal(pub Option<Principal>);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[async_trait]
impl FromRequestParts<AppState> for AuthPrincipal {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(GameError::TokenMissing)?;
        let principal = validate_access_token(token, &state.tokens)?;
        Ok(AuthPrincipal(principal))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybePrincipal {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Ok(MaybePrincipal(None));
        };

        match validate_access_token(token, &state.tokens) {
            Ok(principal) => Ok(MaybePrincipal(Some(principal))),
            Err(e) => {
                debug!(error = %e, "Ignoring invalid optional token");
                Ok(MaybePrincipal(None))
            }
        }
    }
}
