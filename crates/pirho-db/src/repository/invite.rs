//! SurrealDB implementation of [`InviteRepository`].

use chrono::{DateTime, Utc};
use pirho_core::error::{ConflictKind, PirhoError, PirhoResult};
use pirho_core::models::invite::{CreateInvite, Invite, InviteStatus, InviteSummary};
use pirho_core::models::participant::Participant;
use pirho_core::repository::InviteRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::{debug, warn};
use uuid::Uuid;

use super::participant::{
    CLAIM_SEAT, MAX_SEAT_ATTEMPTS, SeatClaim, explain_failed_join, find_participant,
};
use crate::error::{DbError, parse_enum, parse_uuid};

/// Invite columns plus the names a listing shows.
const SUMMARY_PROJECTION: &str = "meta::id(id) AS record_id, *, \
    (SELECT VALUE name FROM type::record('session', $parent.session_id))[0] AS session_name, \
    (SELECT VALUE username FROM type::record('user', $parent.inviter_id))[0] AS inviter_username, \
    (SELECT VALUE username FROM type::record('user', $parent.invitee_id))[0] AS invitee_username";

#[derive(Debug, SurrealValue)]
struct InviteRow {
    record_id: String,
    session_id: String,
    inviter_id: String,
    invitee_id: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InviteRow {
    fn try_into_invite(self) -> Result<Invite, DbError> {
        Ok(Invite {
            id: parse_uuid(&self.record_id, "invite")?,
            session_id: parse_uuid(&self.session_id, "session")?,
            inviter_id: parse_uuid(&self.inviter_id, "inviter")?,
            invitee_id: parse_uuid(&self.invitee_id, "invitee")?,
            status: parse_enum(&self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct InviteSummaryRow {
    record_id: String,
    session_id: String,
    inviter_id: String,
    invitee_id: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    session_name: Option<String>,
    inviter_username: Option<String>,
    invitee_username: Option<String>,
}

impl InviteSummaryRow {
    fn try_into_summary(self) -> Result<InviteSummary, DbError> {
        let invite = InviteRow {
            record_id: self.record_id,
            session_id: self.session_id,
            inviter_id: self.inviter_id,
            invitee_id: self.invitee_id,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .try_into_invite()?;

        Ok(InviteSummary {
            invite,
            session_name: self.session_name.unwrap_or_default(),
            inviter_username: self.inviter_username.unwrap_or_default(),
            invitee_username: self.invitee_username.unwrap_or_default(),
        })
    }
}

/// SurrealDB implementation of the Invite repository.
#[derive(Clone)]
pub struct SurrealInviteRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealInviteRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn find_with_status(
        &self,
        session_id: Uuid,
        invitee_id: Uuid,
        status: Option<InviteStatus>,
    ) -> PirhoResult<Option<Invite>> {
        let query = if status.is_some() {
            "SELECT meta::id(id) AS record_id, * FROM session_invite \
             WHERE session_id = $session_id AND invitee_id = $invitee_id \
             AND status = $status LIMIT 1"
        } else {
            "SELECT meta::id(id) AS record_id, * FROM session_invite \
             WHERE session_id = $session_id AND invitee_id = $invitee_id LIMIT 1"
        };

        let mut builder = self
            .db
            .query(query)
            .bind(("session_id", session_id.to_string()))
            .bind(("invitee_id", invitee_id.to_string()));
        if let Some(status) = status {
            builder = builder.bind(("status", status.as_str()));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<InviteRow> = result.take(0).map_err(DbError::from)?;
        let invite = rows
            .into_iter()
            .next()
            .map(InviteRow::try_into_invite)
            .transpose()?;

        Ok(invite)
    }

    async fn list_summaries(
        &self,
        filter: &'static str,
        binds: Vec<(&'static str, String)>,
    ) -> PirhoResult<Vec<InviteSummary>> {
        let query = format!(
            "SELECT {SUMMARY_PROJECTION} FROM session_invite WHERE {filter} \
             ORDER BY created_at DESC"
        );

        let mut builder = self.db.query(&query);
        for bind in binds {
            builder = builder.bind(bind);
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<InviteSummaryRow> = result.take(0).map_err(DbError::from)?;

        let invites = rows
            .into_iter()
            .map(InviteSummaryRow::try_into_summary)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(invites)
    }
}

impl<C: Connection> InviteRepository for SurrealInviteRepository<C> {
    async fn create(&self, input: CreateInvite) -> PirhoResult<Invite> {
        let id = Uuid::new_v4();

        let result = self
            .db
            .query(
                "CREATE type::record('session_invite', $id) SET \
                 session_id = $session_id, inviter_id = $inviter_id, \
                 invitee_id = $invitee_id, status = 'pending'",
            )
            .bind(("id", id.to_string()))
            .bind(("session_id", input.session_id.to_string()))
            .bind(("inviter_id", input.inviter_id.to_string()))
            .bind(("invitee_id", input.invitee_id.to_string()))
            .await
            .map_err(DbError::from)?;

        if let Err(e) = result.check() {
            // Lost a race against another invite for the same pair.
            if self.find(input.session_id, input.invitee_id).await?.is_some() {
                return Err(ConflictKind::InvitePending.into());
            }
            return Err(DbError::Query(e.to_string()).into());
        }

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> PirhoResult<Invite> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('session_invite', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<InviteRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "invite".into(),
            id: id_str,
        })?;

        row.try_into_invite().map_err(Into::into)
    }

    async fn find(&self, session_id: Uuid, invitee_id: Uuid) -> PirhoResult<Option<Invite>> {
        self.find_with_status(session_id, invitee_id, None).await
    }

    async fn get_accepted(
        &self,
        session_id: Uuid,
        invitee_id: Uuid,
    ) -> PirhoResult<Option<Invite>> {
        self.find_with_status(session_id, invitee_id, Some(InviteStatus::Accepted))
            .await
    }

    async fn accepted_session_ids(&self, invitee_id: Uuid) -> PirhoResult<Vec<Uuid>> {
        let mut result = self
            .db
            .query(
                "SELECT VALUE session_id FROM session_invite \
                 WHERE invitee_id = $invitee_id AND status = 'accepted'",
            )
            .bind(("invitee_id", invitee_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let ids: Vec<String> = result.take(0).map_err(DbError::from)?;
        let ids = ids
            .iter()
            .map(|id| parse_uuid(id, "session"))
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(ids)
    }

    async fn set_status(&self, id: Uuid, status: InviteStatus) -> PirhoResult<Invite> {
        self.get_by_id(id).await?;

        let result = self
            .db
            .query(
                "UPDATE type::record('session_invite', $id) SET \
                 status = $status, updated_at = time::now()",
            )
            .bind(("id", id.to_string()))
            .bind(("status", status.as_str()))
            .await
            .map_err(DbError::from)?;

        result.check().map_err(|e| DbError::Query(e.to_string()))?;

        self.get_by_id(id).await
    }

    async fn accept(&self, id: Uuid) -> PirhoResult<Participant> {
        let invite = self.get_by_id(id).await?;
        let participant_id = Uuid::new_v4();

        let query = format!(
            "BEGIN TRANSACTION;\n\
             LET $invite = (UPDATE type::record('session_invite', $invite_id) SET \
                 status = 'accepted', updated_at = time::now() \
                 WHERE status = 'pending' RETURN AFTER);\n\
             IF array::len($invite) = 0 {{ THROW 'invite is not pending' }};\n\
             {CLAIM_SEAT}COMMIT TRANSACTION;"
        );

        let mut cause = String::new();

        for attempt in 1..=MAX_SEAT_ATTEMPTS {
            let result = self
                .db
                .query(&query)
                .bind(("invite_id", id.to_string()))
                .bind(("session_id", invite.session_id.to_string()))
                .bind(("user_id", invite.invitee_id.to_string()))
                .bind(("participant_id", participant_id.to_string()))
                .bind(("by_invite", true))
                .await
                .map_err(DbError::from)?;

            let Err(e) = result.check() else {
                debug!(invite_id = %id, session_id = %invite.session_id, "Invite accepted");
                return find_participant(&self.db, invite.session_id, invite.invitee_id)
                    .await?
                    .ok_or_else(|| PirhoError::not_found("participant", participant_id));
            };

            let current = self.get_by_id(id).await?;
            if current.status != InviteStatus::Pending {
                return Err(ConflictKind::InviteAlreadyProcessed.into());
            }
            let explained = explain_failed_join(
                &self.db,
                invite.session_id,
                invite.invitee_id,
                SeatClaim::AcceptInvite,
            )
            .await?;
            if let Some(rejection) = explained {
                return Err(rejection);
            }
            debug!(invite_id = %id, attempt, "Invite acceptance contended, retrying");
            cause = e.to_string();
        }

        warn!(invite_id = %id, error = %cause, "Invite acceptance failed");
        Err(PirhoError::StorageUnavailable(cause))
    }

    async fn delete(&self, id: Uuid) -> PirhoResult<()> {
        self.get_by_id(id).await?;

        let result = self
            .db
            .query("DELETE type::record('session_invite', $id)")
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        result.check().map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn list_by_session(&self, session_id: Uuid) -> PirhoResult<Vec<InviteSummary>> {
        self.list_summaries(
            "session_id = $session_id",
            vec![("session_id", session_id.to_string())],
        )
        .await
    }

    async fn list_received(
        &self,
        invitee_id: Uuid,
        status: Option<InviteStatus>,
    ) -> PirhoResult<Vec<InviteSummary>> {
        match status {
            Some(status) => {
                self.list_summaries(
                    "invitee_id = $invitee_id AND status = $status",
                    vec![
                        ("invitee_id", invitee_id.to_string()),
                        ("status", status.as_str().to_string()),
                    ],
                )
                .await
            }
            None => {
                self.list_summaries(
                    "invitee_id = $invitee_id",
                    vec![("invitee_id", invitee_id.to_string())],
                )
                .await
            }
        }
    }

    async fn list_sent(&self, inviter_id: Uuid) -> PirhoResult<Vec<InviteSummary>> {
        self.list_summaries(
            "inviter_id = $inviter_id",
            vec![("inviter_id", inviter_id.to_string())],
        )
        .await
    }
}
