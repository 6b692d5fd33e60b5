//! Error types for Pi & Rho's Games.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Why an access-control check refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// Session is `friends_only` and the viewer is not a friend of the creator.
    FriendsOnly,
    /// Session is `private` and the viewer holds no accepted invite.
    PrivateSession,
    /// Operation is reserved to the session creator or an admin.
    NotCreatorOrAdmin,
    /// Operation requires the caller to participate in the session.
    NotParticipant,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DenyReason::FriendsOnly => "session is restricted to the creator's friends",
            DenyReason::PrivateSession => "session is private",
            DenyReason::NotCreatorOrAdmin => "only the session creator or an admin may do this",
            DenyReason::NotParticipant => "you must participate in this session",
        };
        f.write_str(s)
    }
}

/// State conflicts the caller may resolve by changing its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    AlreadyAnswered,
    AlreadyParticipant,
    SessionFull,
    SessionClosed,
    InsufficientCatalog,
    ProductNotInSession,
    InvitePending,
    InviteAlreadyAccepted,
    InviteAlreadyProcessed,
    SelfInvite,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConflictKind::AlreadyAnswered => "product has already been answered",
            ConflictKind::AlreadyParticipant => "already participating in this session",
            ConflictKind::SessionFull => "session has reached its maximum number of participants",
            ConflictKind::SessionClosed => "session is already completed",
            ConflictKind::InsufficientCatalog => "at least four products are required",
            ConflictKind::ProductNotInSession => "product is not part of this session",
            ConflictKind::InvitePending => "an invite is already pending for this user",
            ConflictKind::InviteAlreadyAccepted => "this user already accepted an invite",
            ConflictKind::InviteAlreadyProcessed => "invite has already been processed",
            ConflictKind::SelfInvite => "you cannot invite yourself",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum PirhoError {
    #[error("Validation error on {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("Access denied: {reason}")]
    AccessDenied { reason: DenyReason },

    #[error("Conflict: {0}")]
    Conflict(ConflictKind),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PirhoError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        PirhoError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        PirhoError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }
}

impl From<DenyReason> for PirhoError {
    fn from(reason: DenyReason) -> Self {
        PirhoError::AccessDenied { reason }
    }
}

impl From<ConflictKind> for PirhoError {
    fn from(kind: ConflictKind) -> Self {
        PirhoError::Conflict(kind)
    }
}

pub type PirhoResult<T> = Result<T, PirhoError>;
