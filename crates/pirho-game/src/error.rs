//! Game-layer error types.

use pirho_core::error::PirhoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("missing bearer token")]
    TokenMissing,

    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<GameError> for PirhoError {
    fn from(err: GameError) -> Self {
        match err {
            GameError::TokenMissing | GameError::TokenExpired | GameError::TokenInvalid(_) => {
                PirhoError::AuthenticationFailed {
                    reason: err.to_string(),
                }
            }
            GameError::Crypto(msg) => PirhoError::Internal(msg),
        }
    }
}
