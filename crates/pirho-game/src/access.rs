//! Session access rules.
//!
//! [`can_access`] is a pure predicate: the relationship facts it needs
//! (friendship with the creator, an accepted invite) are looked up by the
//! caller and handed in through [`ViewerContext`]. Listing uses the same
//! rules decomposed into a query filter
//! ([`VisibilityScope`](pirho_core::repository::VisibilityScope)).

use pirho_core::error::{DenyReason, PirhoResult};
use pirho_core::models::session::{Session, Visibility};
use pirho_core::models::user::Principal;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny(DenyReason),
}

impl Access {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Access::Allow)
    }

    pub fn into_result(self) -> PirhoResult<()> {
        match self {
            Access::Allow => Ok(()),
            Access::Deny(reason) => Err(reason.into()),
        }
    }
}

/// What is known about the viewer relative to one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewerContext {
    /// `None` for an unauthenticated viewer.
    pub viewer_id: Option<Uuid>,
    pub is_friend_of_creator: bool,
    pub has_accepted_invite: bool,
}

impl ViewerContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_user(viewer_id: Uuid) -> Self {
        Self {
            viewer_id: Some(viewer_id),
            ..Self::default()
        }
    }
}

pub fn can_access(session: &Session, viewer: &ViewerContext) -> Access {
    let is_creator = viewer.viewer_id == Some(session.creator_id);

    match session.visibility {
        Visibility::Public => Access::Allow,
        Visibility::FriendsOnly if is_creator || viewer.is_friend_of_creator => Access::Allow,
        Visibility::FriendsOnly => Access::Deny(DenyReason::FriendsOnly),
        Visibility::Private if is_creator || viewer.has_accepted_invite => Access::Allow,
        Visibility::Private => Access::Deny(DenyReason::PrivateSession),
    }
}

/// The single creator-or-admin rule behind delete, status changes and
/// invite management.
pub fn authorize_creator_or_admin(principal: &Principal, creator_id: Uuid) -> PirhoResult<()> {
    if principal.is_admin() || principal.user_id == creator_id {
        Ok(())
    } else {
        Err(DenyReason::NotCreatorOrAdmin.into())
    }
}
