//! Session invites: send, list, accept, reject and cancel.

use pirho_core::error::{ConflictKind, PirhoError, PirhoResult};
use pirho_core::models::invite::{CreateInvite, Invite, InviteStatus, InviteSummary, InviteeRef};
use pirho_core::models::participant::Participant;
use pirho_core::models::session::SessionStatus;
use pirho_core::models::user::{Principal, User};
use pirho_core::repository::{
    InviteRepository, ParticipantRepository, SessionRepository, Store, UserRepository,
};
use tracing::info;
use uuid::Uuid;

use crate::access::authorize_creator_or_admin;
use crate::service::GameService;

impl<St: Store> GameService<St> {
    /// Invite a user to a session. A previously rejected invite is put
    /// back to pending instead of creating a new one.
    pub async fn send_invite(
        &self,
        session_id: Uuid,
        principal: &Principal,
        invitee: InviteeRef,
    ) -> PirhoResult<Invite> {
        let session = self.store.sessions().get_by_id(session_id).await?;
        authorize_creator_or_admin(principal, session.creator_id)?;

        if session.status == SessionStatus::Completed {
            return Err(ConflictKind::SessionClosed.into());
        }

        let invitee = self.resolve_invitee(invitee).await?;
        if invitee.id == principal.user_id {
            return Err(ConflictKind::SelfInvite.into());
        }
        if self
            .store
            .participants()
            .find(session_id, invitee.id)
            .await?
            .is_some()
        {
            return Err(ConflictKind::AlreadyParticipant.into());
        }
        if session.is_full() {
            return Err(ConflictKind::SessionFull.into());
        }

        let invite = match self.store.invites().find(session_id, invitee.id).await? {
            Some(existing) => match existing.status {
                InviteStatus::Pending => return Err(ConflictKind::InvitePending.into()),
                InviteStatus::Accepted => return Err(ConflictKind::InviteAlreadyAccepted.into()),
                InviteStatus::Rejected => {
                    self.store
                        .invites()
                        .set_status(existing.id, InviteStatus::Pending)
                        .await?
                }
            },
            None => {
                self.store
                    .invites()
                    .create(CreateInvite {
                        session_id,
                        inviter_id: principal.user_id,
                        invitee_id: invitee.id,
                    })
                    .await?
            }
        };

        info!(
            invite_id = %invite.id,
            session_id = %session_id,
            invitee_id = %invitee.id,
            "Invite sent"
        );
        Ok(invite)
    }

    pub async fn list_session_invites(
        &self,
        session_id: Uuid,
        principal: &Principal,
    ) -> PirhoResult<Vec<InviteSummary>> {
        let session = self.store.sessions().get_by_id(session_id).await?;
        authorize_creator_or_admin(principal, session.creator_id)?;

        self.store.invites().list_by_session(session_id).await
    }

    pub async fn list_received_invites(
        &self,
        principal: &Principal,
        status: Option<InviteStatus>,
    ) -> PirhoResult<Vec<InviteSummary>> {
        self.store
            .invites()
            .list_received(principal.user_id, status)
            .await
    }

    pub async fn list_sent_invites(&self, principal: &Principal) -> PirhoResult<Vec<InviteSummary>> {
        self.store.invites().list_sent(principal.user_id).await
    }

    /// Accept an invite and join its session.
    pub async fn accept_invite(
        &self,
        invite_id: Uuid,
        principal: &Principal,
    ) -> PirhoResult<Participant> {
        let invite = self.own_pending_invite(invite_id, principal).await?;

        let session = self.store.sessions().get_by_id(invite.session_id).await?;
        if session.status == SessionStatus::Completed {
            return Err(ConflictKind::SessionClosed.into());
        }
        if self
            .store
            .participants()
            .find(session.id, principal.user_id)
            .await?
            .is_some()
        {
            return Err(ConflictKind::AlreadyParticipant.into());
        }

        let participant = self.store.invites().accept(invite_id).await?;

        info!(
            invite_id = %invite_id,
            session_id = %session.id,
            user_id = %principal.user_id,
            "Invite accepted"
        );
        Ok(participant)
    }

    pub async fn reject_invite(&self, invite_id: Uuid, principal: &Principal) -> PirhoResult<Invite> {
        self.own_pending_invite(invite_id, principal).await?;

        let invite = self
            .store
            .invites()
            .set_status(invite_id, InviteStatus::Rejected)
            .await?;

        info!(invite_id = %invite_id, user_id = %principal.user_id, "Invite rejected");
        Ok(invite)
    }

    /// Withdraw an invite. Inviter or admin only.
    pub async fn cancel_invite(&self, invite_id: Uuid, principal: &Principal) -> PirhoResult<()> {
        let invite = self.store.invites().get_by_id(invite_id).await?;
        authorize_creator_or_admin(principal, invite.inviter_id)?;

        self.store.invites().delete(invite_id).await?;

        info!(invite_id = %invite_id, cancelled_by = %principal.user_id, "Invite cancelled");
        Ok(())
    }

    /// The invite, if it is addressed to `principal` and still pending.
    /// Someone else's invite is reported as missing.
    async fn own_pending_invite(
        &self,
        invite_id: Uuid,
        principal: &Principal,
    ) -> PirhoResult<Invite> {
        let invite = self.store.invites().get_by_id(invite_id).await?;
        if invite.invitee_id != principal.user_id {
            return Err(PirhoError::not_found("invite", invite_id));
        }
        if invite.status != InviteStatus::Pending {
            return Err(ConflictKind::InviteAlreadyProcessed.into());
        }
        Ok(invite)
    }

    async fn resolve_invitee(&self, invitee: InviteeRef) -> PirhoResult<User> {
        match invitee {
            InviteeRef::Id(id) => self.store.users().get_by_id(id).await,
            InviteeRef::Username(username) => self.store.users().get_by_username(&username).await,
            InviteeRef::Email(email) => self.store.users().get_by_email(&email).await,
        }
    }
}
