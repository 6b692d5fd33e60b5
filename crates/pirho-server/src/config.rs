//! Server configuration, read from `PIRHO_*` environment variables.
//!
//! Every setting except the token verification key has a default. Missing
//! variables are logged and fall back; malformed ones are errors.

use std::env;
use std::fmt::Display;
use std::fs::read_to_string;
use std::str::FromStr;

use pirho_db::DbConfig;
use pirho_game::{GameConfig, TokenConfig};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("{key} is required")]
    Missing { key: &'static str },

    #[error("failed to read {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub db: DbConfig,
    pub game: GameConfig,
    pub token: TokenConfig,
}

impl ServerConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let db_defaults = DbConfig::default();
        let game_defaults = GameConfig::default();
        let token_defaults = TokenConfig::default();

        Ok(Self {
            port: try_load("PIRHO_PORT", 8080)?,
            db: DbConfig {
                url: try_load("PIRHO_DB_URL", db_defaults.url)?,
                namespace: try_load("PIRHO_DB_NAMESPACE", db_defaults.namespace)?,
                database: try_load("PIRHO_DB_DATABASE", db_defaults.database)?,
                username: try_load("PIRHO_DB_USERNAME", db_defaults.username)?,
                password: secret("PIRHO_DB_PASSWORD")?.unwrap_or(db_defaults.password),
            },
            game: GameConfig {
                leaderboard_default_limit: try_load(
                    "PIRHO_LEADERBOARD_DEFAULT_LIMIT",
                    game_defaults.leaderboard_default_limit,
                )?,
                leaderboard_max_limit: try_load(
                    "PIRHO_LEADERBOARD_MAX_LIMIT",
                    game_defaults.leaderboard_max_limit,
                )?,
            },
            token: TokenConfig {
                jwt_public_key_pem: secret("PIRHO_JWT_PUBLIC_KEY")?.ok_or(ConfigError::Missing {
                    key: "PIRHO_JWT_PUBLIC_KEY",
                })?,
                jwt_private_key_pem: None,
                jwt_issuer: try_load("PIRHO_JWT_ISSUER", token_defaults.jwt_issuer)?,
                access_token_lifetime_secs: token_defaults.access_token_lifetime_secs,
            },
        })
    }
}

fn try_load<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::Invalid {
                key,
                message: e.to_string(),
            }
        }),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

/// A secret given inline in `key` or as a path in `key_FILE`.
fn secret(key: &'static str) -> Result<Option<String>, ConfigError> {
    if let Ok(value) = env::var(key) {
        return Ok(Some(value));
    }

    let file_key = format!("{key}_FILE");
    match env::var(&file_key) {
        Ok(path) => read_to_string(&path)
            .map(|s| Some(s.trim().to_string()))
            .map_err(|source| ConfigError::Unreadable { path, source }),
        Err(_) => {
            warn!("Neither {key} nor {file_key} is set");
            Ok(None)
        }
    }
}
