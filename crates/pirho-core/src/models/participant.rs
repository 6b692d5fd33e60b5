//! Participant domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's membership and running score within one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: Uuid,
    pub session_id: Uuid,
    pub user_id: Uuid,
    /// Always equal to the sum of this participant's answer scores.
    pub session_score: u32,
    pub answers_count: u32,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Participant row joined with the user's name, in standings order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantSummary {
    pub participant_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub session_score: u32,
    pub answers_count: u32,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}
