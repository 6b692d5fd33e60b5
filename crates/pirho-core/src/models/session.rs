//! Game session domain model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{PirhoError, PirhoResult};

/// Number of catalog products bound to every session.
pub const PRODUCTS_PER_SESSION: usize = 4;

/// Capacity used when the creator gives none (or a non-positive one).
pub const DEFAULT_MAX_PARTICIPANTS: u32 = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
    Archived,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Archived => "archived",
        }
    }

    /// Status only moves forward: active → completed → archived.
    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        next > *self
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SessionStatus::Active),
            "completed" => Ok(SessionStatus::Completed),
            "archived" => Ok(SessionStatus::Archived),
            other => Err(format!("unknown session status: {other}")),
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Private,
    FriendsOnly,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
            Visibility::FriendsOnly => "friends_only",
        }
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            "friends_only" => Ok(Visibility::FriendsOnly),
            other => Err(format!("unknown visibility: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub name: String,
    pub creator_id: Uuid,
    pub creator_username: String,
    pub status: SessionStatus,
    pub difficulty: Difficulty,
    pub visibility: Visibility,
    pub max_participants: u32,
    pub participant_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn is_full(&self) -> bool {
        self.participant_count >= self.max_participants
    }
}

/// Session as seen by a particular viewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDetail {
    #[serde(flatten)]
    pub session: Session,
    pub is_participant: bool,
    pub has_completed: bool,
}

/// Caller-supplied session request. Optional fields are resolved to
/// their defaults once, by [`NewSession::resolve`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSession {
    pub name: String,
    pub difficulty: Option<Difficulty>,
    pub visibility: Option<Visibility>,
    pub max_participants: Option<i64>,
}

/// Validated session settings with every default applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub name: String,
    pub difficulty: Difficulty,
    pub visibility: Visibility,
    pub max_participants: u32,
}

impl NewSession {
    pub fn resolve(self) -> PirhoResult<SessionSettings> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(PirhoError::validation("name", "session name is required"));
        }

        let max_participants = match self.max_participants {
            Some(n) if n > 0 => u32::try_from(n).map_err(|_| {
                PirhoError::validation("max_participants", "max_participants is too large")
            })?,
            _ => DEFAULT_MAX_PARTICIPANTS,
        };

        Ok(SessionSettings {
            name: name.to_string(),
            difficulty: self.difficulty.unwrap_or_default(),
            visibility: self.visibility.unwrap_or_default(),
            max_participants,
        })
    }
}

/// Repository input: a session together with the products it binds, in
/// position order (index 0 is position 1).
#[derive(Debug, Clone)]
pub struct CreateSession {
    pub creator_id: Uuid,
    pub settings: SessionSettings,
    pub product_ids: [Uuid; PRODUCTS_PER_SESSION],
}

/// Optional narrowing filters for session listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionFilter {
    pub status: Option<SessionStatus>,
    pub visibility: Option<Visibility>,
    pub creator_id: Option<Uuid>,
}

/// A product as revealed to a participant: no price.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionProduct {
    pub product_id: Uuid,
    pub name: String,
    pub image_url: Option<String>,
    pub position: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_applies_defaults() {
        let settings = NewSession {
            name: "  Friday night  ".into(),
            ..Default::default()
        }
        .resolve()
        .unwrap();

        assert_eq!(settings.name, "Friday night");
        assert_eq!(settings.difficulty, Difficulty::Medium);
        assert_eq!(settings.visibility, Visibility::Public);
        assert_eq!(settings.max_participants, DEFAULT_MAX_PARTICIPANTS);
    }

    #[test]
    fn resolve_replaces_non_positive_capacity() {
        for bad in [0, -3] {
            let settings = NewSession {
                name: "x".into(),
                max_participants: Some(bad),
                ..Default::default()
            }
            .resolve()
            .unwrap();
            assert_eq!(settings.max_participants, DEFAULT_MAX_PARTICIPANTS);
        }
    }

    #[test]
    fn resolve_keeps_explicit_values() {
        let settings = NewSession {
            name: "x".into(),
            difficulty: Some(Difficulty::Hard),
            visibility: Some(Visibility::FriendsOnly),
            max_participants: Some(2),
        }
        .resolve()
        .unwrap();
        assert_eq!(settings.difficulty, Difficulty::Hard);
        assert_eq!(settings.visibility, Visibility::FriendsOnly);
        assert_eq!(settings.max_participants, 2);
    }

    #[test]
    fn resolve_rejects_blank_name() {
        let err = NewSession {
            name: "   ".into(),
            ..Default::default()
        }
        .resolve()
        .unwrap_err();
        assert!(matches!(err, PirhoError::Validation { ref field, .. } if field == "name"));
    }

    #[test]
    fn status_only_moves_forward() {
        use SessionStatus::*;
        assert!(Active.can_transition_to(Completed));
        assert!(Active.can_transition_to(Archived));
        assert!(Completed.can_transition_to(Archived));
        assert!(!Completed.can_transition_to(Active));
        assert!(!Archived.can_transition_to(Completed));
        assert!(!Active.can_transition_to(Active));
    }

    #[test]
    fn enums_round_trip_through_strings() {
        for v in [Visibility::Public, Visibility::Private, Visibility::FriendsOnly] {
            assert_eq!(v.as_str().parse::<Visibility>().unwrap(), v);
        }
        assert!("secret".parse::<Visibility>().is_err());
    }
}
