//! Answer domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One committed price guess. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub id: Uuid,
    pub participant_id: Uuid,
    pub product_id: Uuid,
    pub guessed_price: f64,
    pub score: u32,
    pub created_at: DateTime<Utc>,
}

/// Caller-supplied guess.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAnswer {
    pub product_id: Uuid,
    pub guessed_price: f64,
}

/// Repository input for recording a scored answer.
#[derive(Debug, Clone)]
pub struct RecordAnswer {
    pub session_id: Uuid,
    pub participant_id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub guessed_price: f64,
    pub score: u32,
}

/// State of the participant right after an answer was committed.
#[derive(Debug, Clone)]
pub struct RecordedAnswer {
    pub answer: Answer,
    pub session_score: u32,
    pub answers_count: u32,
    pub completed: bool,
}

/// Result returned to the player. `actual_price` is safe to reveal only
/// because the guess is already committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerOutcome {
    pub answer: Answer,
    pub score: u32,
    pub actual_price: f64,
    pub session_score: u32,
    pub completed: bool,
    pub answers_count: u32,
}
