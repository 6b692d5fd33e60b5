//! Game service: session lifecycle and participation.
//!
//! Scoring, leaderboards and invites extend [`GameService`] from their own
//! modules.

use pirho_core::error::{ConflictKind, DenyReason, PirhoError, PirhoResult};
use pirho_core::models::participant::{Participant, ParticipantSummary};
use pirho_core::models::session::{
    CreateSession, NewSession, PRODUCTS_PER_SESSION, Session, SessionDetail, SessionFilter,
    SessionProduct, SessionStatus, Visibility,
};
use pirho_core::models::user::Principal;
use pirho_core::repository::{
    FriendshipRepository, InviteRepository, ParticipantRepository, ProductRepository,
    SessionRepository, Store, VisibilityScope,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::access::{Access, ViewerContext, authorize_creator_or_admin, can_access};
use crate::config::GameConfig;

/// Game service.
///
/// Generic over the repository bundle so that the game layer has no
/// dependency on the database crate.
pub struct GameService<St: Store> {
    pub(crate) store: St,
    pub(crate) config: GameConfig,
}

impl<St: Store> GameService<St> {
    pub fn new(store: St, config: GameConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &St {
        &self.store
    }

    /// Create a session owned by `principal` with four random products.
    pub async fn create_session(
        &self,
        principal: &Principal,
        input: NewSession,
    ) -> PirhoResult<Session> {
        let settings = input.resolve()?;

        let picked = self.store.products().pick_random(PRODUCTS_PER_SESSION).await?;
        let product_ids: [Uuid; PRODUCTS_PER_SESSION] = picked
            .iter()
            .map(|p| p.id)
            .collect::<Vec<_>>()
            .try_into()
            .map_err(|_| {
                info!(available = picked.len(), "Catalog too small to create a session");
                PirhoError::from(ConflictKind::InsufficientCatalog)
            })?;

        let session = self
            .store
            .sessions()
            .create(CreateSession {
                creator_id: principal.user_id,
                settings,
                product_ids,
            })
            .await?;

        info!(
            session_id = %session.id,
            creator_id = %principal.user_id,
            visibility = %session.visibility.as_str(),
            max_participants = session.max_participants,
            "Session created"
        );

        Ok(session)
    }

    /// Sessions visible to `viewer`, narrowed by `filter`, newest first.
    pub async fn list_sessions(
        &self,
        filter: SessionFilter,
        viewer: Option<&Principal>,
    ) -> PirhoResult<Vec<Session>> {
        let scope = self.visibility_scope(viewer).await?;
        self.store.sessions().list(filter, scope).await
    }

    pub async fn get_session(
        &self,
        session_id: Uuid,
        viewer: Option<&Principal>,
    ) -> PirhoResult<SessionDetail> {
        let session = self.store.sessions().get_by_id(session_id).await?;
        self.ensure_access(&session, viewer).await?;

        let participant = match viewer {
            Some(p) => self.store.participants().find(session_id, p.user_id).await?,
            None => None,
        };

        Ok(SessionDetail {
            is_participant: participant.is_some(),
            has_completed: participant.is_some_and(|p| p.completed),
            session,
        })
    }

    pub async fn delete_session(&self, session_id: Uuid, principal: &Principal) -> PirhoResult<()> {
        let session = self.store.sessions().get_by_id(session_id).await?;
        authorize_creator_or_admin(principal, session.creator_id)?;

        self.store.sessions().delete(session_id).await?;

        info!(session_id = %session_id, deleted_by = %principal.user_id, "Session deleted");
        Ok(())
    }

    /// Move a session forward: active → completed → archived.
    pub async fn transition_status(
        &self,
        session_id: Uuid,
        principal: &Principal,
        status: SessionStatus,
    ) -> PirhoResult<Session> {
        let session = self.store.sessions().get_by_id(session_id).await?;
        authorize_creator_or_admin(principal, session.creator_id)?;

        if !session.status.can_transition_to(status) {
            return Err(PirhoError::validation(
                "status",
                format!("cannot move from {} to {}", session.status, status),
            ));
        }

        let updated = self.store.sessions().update_status(session_id, status).await?;

        info!(
            session_id = %session_id,
            from = %session.status,
            to = %status,
            "Session status changed"
        );
        Ok(updated)
    }

    pub async fn join_session(
        &self,
        session_id: Uuid,
        principal: &Principal,
    ) -> PirhoResult<Participant> {
        let session = self.store.sessions().get_by_id(session_id).await?;

        if session.status == SessionStatus::Completed {
            return Err(ConflictKind::SessionClosed.into());
        }
        if self
            .store
            .participants()
            .find(session_id, principal.user_id)
            .await?
            .is_some()
        {
            return Err(ConflictKind::AlreadyParticipant.into());
        }
        self.ensure_access(&session, Some(principal)).await?;

        // Capacity is settled inside the join transaction.
        let participant = self
            .store
            .participants()
            .join(session_id, principal.user_id)
            .await?;

        info!(session_id = %session_id, user_id = %principal.user_id, "Player joined session");
        Ok(participant)
    }

    pub async fn list_participants(
        &self,
        session_id: Uuid,
        viewer: Option<&Principal>,
    ) -> PirhoResult<Vec<ParticipantSummary>> {
        let session = self.store.sessions().get_by_id(session_id).await?;
        self.ensure_access_or_participation(&session, viewer).await?;

        self.store.participants().list_by_session(session_id).await
    }

    /// The session's products without prices. Participants only.
    pub async fn get_session_products(
        &self,
        session_id: Uuid,
        principal: &Principal,
    ) -> PirhoResult<Vec<SessionProduct>> {
        self.store.sessions().get_by_id(session_id).await?;
        self.require_participant(session_id, principal).await?;

        self.store.sessions().get_products(session_id).await
    }

    // -----------------------------------------------------------------------
    // Access helpers shared by the other service modules
    // -----------------------------------------------------------------------

    /// Gather the relationship facts [`can_access`] needs. Only the lookup
    /// the session's visibility calls for is performed.
    pub(crate) async fn viewer_context(
        &self,
        session: &Session,
        viewer: Option<&Principal>,
    ) -> PirhoResult<ViewerContext> {
        let Some(principal) = viewer else {
            return Ok(ViewerContext::anonymous());
        };

        let mut ctx = ViewerContext::for_user(principal.user_id);
        if principal.user_id == session.creator_id {
            return Ok(ctx);
        }

        match session.visibility {
            Visibility::Public => {}
            Visibility::FriendsOnly => {
                ctx.is_friend_of_creator = self
                    .store
                    .friendships()
                    .are_friends(principal.user_id, session.creator_id)
                    .await?;
            }
            Visibility::Private => {
                ctx.has_accepted_invite = self
                    .store
                    .invites()
                    .get_accepted(session.id, principal.user_id)
                    .await?
                    .is_some();
            }
        }

        Ok(ctx)
    }

    pub(crate) async fn ensure_access(
        &self,
        session: &Session,
        viewer: Option<&Principal>,
    ) -> PirhoResult<()> {
        let ctx = self.viewer_context(session, viewer).await?;
        let access = can_access(session, &ctx);
        if let Access::Deny(reason) = access {
            debug!(session_id = %session.id, viewer_id = ?ctx.viewer_id, %reason, "Access denied");
        }
        access.into_result()
    }

    /// Like [`Self::ensure_access`], but participants are always let in.
    pub(crate) async fn ensure_access_or_participation(
        &self,
        session: &Session,
        viewer: Option<&Principal>,
    ) -> PirhoResult<()> {
        match self.ensure_access(session, viewer).await {
            Ok(()) => Ok(()),
            Err(denied @ PirhoError::AccessDenied { .. }) => {
                let Some(principal) = viewer else {
                    return Err(denied);
                };
                match self.store.participants().find(session.id, principal.user_id).await? {
                    Some(_) => Ok(()),
                    None => Err(denied),
                }
            }
            Err(other) => Err(other),
        }
    }

    pub(crate) async fn require_participant(
        &self,
        session_id: Uuid,
        principal: &Principal,
    ) -> PirhoResult<Participant> {
        self.store
            .participants()
            .find(session_id, principal.user_id)
            .await?
            .ok_or_else(|| DenyReason::NotParticipant.into())
    }

    async fn visibility_scope(&self, viewer: Option<&Principal>) -> PirhoResult<VisibilityScope> {
        let Some(principal) = viewer else {
            return Ok(VisibilityScope::default());
        };

        Ok(VisibilityScope {
            viewer_id: Some(principal.user_id),
            friend_ids: self
                .store
                .friendships()
                .list_friend_ids(principal.user_id)
                .await?,
            invited_session_ids: self
                .store
                .invites()
                .accepted_session_ids(principal.user_id)
                .await?,
        })
    }
}
