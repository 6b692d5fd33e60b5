//! Leaderboard views.
//!
//! Rank is the 1-based output position: tied scores receive consecutive,
//! distinct ranks.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Global leaderboard size when the caller gives no usable limit.
pub const DEFAULT_LEADERBOARD_LIMIT: u32 = 50;

/// Largest global leaderboard a caller may request.
pub const MAX_LEADERBOARD_LIMIT: u32 = 100;

/// Clamp a caller-supplied limit into `1..=max`. Missing or non-positive
/// requests get `default`.
pub fn effective_limit(requested: Option<i64>, default: u32, max: u32) -> u32 {
    match requested {
        Some(n) if n > 0 => n.min(i64::from(max)) as u32,
        _ => default.min(max),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderboardScope {
    Session(Uuid),
    Global { limit: Option<i64> },
    Friends,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStanding {
    pub rank: u32,
    pub participant_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub session_score: u32,
    pub answers_count: u32,
    pub completed: bool,
    pub is_viewer: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerStanding {
    pub rank: u32,
    pub user_id: Uuid,
    pub username: String,
    pub total_score: u64,
    pub games_played: u32,
    pub best_session_score: u32,
    pub average_score: f64,
    pub is_viewer: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Leaderboard {
    Session(Vec<SessionStanding>),
    Players(Vec<PlayerStanding>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_defaults_and_caps() {
        let limit = |n| effective_limit(n, DEFAULT_LEADERBOARD_LIMIT, MAX_LEADERBOARD_LIMIT);
        assert_eq!(limit(None), 50);
        assert_eq!(limit(Some(0)), 50);
        assert_eq!(limit(Some(-5)), 50);
        assert_eq!(limit(Some(10)), 10);
        assert_eq!(limit(Some(1000)), 100);
    }
}
