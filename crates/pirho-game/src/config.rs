//! Game and token configuration.

use pirho_core::models::leaderboard::{DEFAULT_LEADERBOARD_LIMIT, MAX_LEADERBOARD_LIMIT};

/// Tunables for the game services.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Global leaderboard size when the caller asks for none (default: 50).
    pub leaderboard_default_limit: u32,
    /// Hard cap on the global leaderboard size (default: 100).
    pub leaderboard_max_limit: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            leaderboard_default_limit: DEFAULT_LEADERBOARD_LIMIT,
            leaderboard_max_limit: MAX_LEADERBOARD_LIMIT,
        }
    }
}

/// Configuration for access token validation.
///
/// Tokens are issued by the identity layer; this side only needs the
/// public key. The private key is optional and only used by tooling and
/// tests that mint tokens.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// PEM-encoded Ed25519 public key for JWT verification.
    pub jwt_public_key_pem: String,
    /// PEM-encoded Ed25519 private key for JWT signing.
    pub jwt_private_key_pem: Option<String>,
    /// Expected `iss` claim.
    pub jwt_issuer: String,
    /// Lifetime of minted tokens in seconds (default: 900 = 15 minutes).
    pub access_token_lifetime_secs: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            jwt_public_key_pem: String::new(),
            jwt_private_key_pem: None,
            jwt_issuer: "pirho".into(),
            access_token_lifetime_secs: 900,
        }
    }
}
