//! Pi & Rho's Games engine — session lifecycle, access control, answer
//! scoring, leaderboards and invites, plus access token validation.

pub mod access;
pub mod config;
pub mod error;
pub mod invite;
pub mod leaderboard;
pub mod scoring;
pub mod service;
pub mod token;

pub use config::{GameConfig, TokenConfig};
pub use error::GameError;
pub use service::GameService;
