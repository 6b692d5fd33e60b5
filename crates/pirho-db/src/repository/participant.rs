//! SurrealDB implementation of [`ParticipantRepository`].
//!
//! Joining claims a seat by bumping the session's `participant_count`
//! under a capacity guard, then creates the participant row. Both writes
//! share one transaction with the status and access guards, so two
//! concurrent joins for the last seat touch the same session record and
//! only one of them commits.

use chrono::{DateTime, Utc};
use pirho_core::error::{ConflictKind, DenyReason, PirhoError, PirhoResult};
use pirho_core::models::participant::{Participant, ParticipantSummary};
use pirho_core::repository::ParticipantRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DbError, parse_uuid};

/// Guards, seat claim and participant insert. Expects `$session_id`,
/// `$user_id`, `$participant_id` and `$by_invite`; must run inside a
/// transaction.
///
/// Unless the seat comes with an invite being accepted, private sessions
/// need an accepted invite and friends-only sessions a friendship with the
/// creator, read inside the transaction so that a revoked invite cannot
/// slip through.
pub(crate) const CLAIM_SEAT: &str = "\
LET $target = (SELECT creator_id, visibility, status
    FROM type::record('session', $session_id))[0];
IF !$target { THROW 'session not found' };
IF $target.status = 'completed' { THROW 'session is closed' };
IF !$by_invite AND $target.creator_id != $user_id AND (
    ($target.visibility = 'private' AND array::len((SELECT VALUE id FROM session_invite
        WHERE session_id = $session_id AND invitee_id = $user_id
        AND status = 'accepted')) = 0)
    OR ($target.visibility = 'friends_only' AND array::len((SELECT VALUE id FROM friendship
        WHERE (user_low = $user_id AND user_high = $target.creator_id)
        OR (user_high = $user_id AND user_low = $target.creator_id))) = 0)
) { THROW 'access denied' };
LET $seat = (UPDATE type::record('session', $session_id) SET
    participant_count += 1, updated_at = time::now()
    WHERE participant_count < max_participants RETURN AFTER);
IF array::len($seat) = 0 { THROW 'no seat available' };
CREATE type::record('participant', $participant_id) SET
    session_id = $session_id, user_id = $user_id,
    session_score = 0, answers_count = 0, completed = false;
";

/// Attempts before a contended seat claim is reported as a storage failure.
pub(crate) const MAX_SEAT_ATTEMPTS: u32 = 8;

/// What the guards of [`CLAIM_SEAT`] look at, read back after a failure.
const JOIN_FACTS: &str = "\
SELECT creator_id, visibility, status, participant_count, max_participants,
    array::len((SELECT VALUE id FROM session_invite
        WHERE session_id = $session_id AND invitee_id = $user_id
        AND status = 'accepted')) > 0 AS has_accepted_invite,
    array::len((SELECT VALUE id FROM friendship
        WHERE (user_low = $user_id AND user_high = $parent.creator_id)
        OR (user_high = $user_id AND user_low = $parent.creator_id))) > 0 AS is_friend
FROM type::record('session', $session_id)";

#[derive(Debug, SurrealValue)]
pub(crate) struct ParticipantRow {
    record_id: String,
    session_id: String,
    user_id: String,
    session_score: u32,
    answers_count: u32,
    completed: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ParticipantRow {
    pub(crate) fn try_into_participant(self) -> Result<Participant, DbError> {
        Ok(Participant {
            id: parse_uuid(&self.record_id, "participant")?,
            session_id: parse_uuid(&self.session_id, "session")?,
            user_id: parse_uuid(&self.user_id, "user")?,
            session_score: self.session_score,
            answers_count: self.answers_count,
            completed: self.completed,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct SummaryRow {
    record_id: String,
    user_id: String,
    username: Option<String>,
    session_score: u32,
    answers_count: u32,
    completed: bool,
    created_at: DateTime<Utc>,
}

impl SummaryRow {
    fn try_into_summary(self) -> Result<ParticipantSummary, DbError> {
        Ok(ParticipantSummary {
            participant_id: parse_uuid(&self.record_id, "participant")?,
            user_id: parse_uuid(&self.user_id, "user")?,
            username: self.username.unwrap_or_default(),
            session_score: self.session_score,
            answers_count: self.answers_count,
            completed: self.completed,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct JoinFacts {
    creator_id: String,
    visibility: String,
    status: String,
    participant_count: u32,
    max_participants: u32,
    has_accepted_invite: bool,
    is_friend: bool,
}

/// How the seat is being claimed. Accepting an invite is its own grant,
/// so the visibility guard is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SeatClaim {
    Join,
    AcceptInvite,
}

pub(crate) async fn find_participant<C: Connection>(
    db: &Surreal<C>,
    session_id: Uuid,
    user_id: Uuid,
) -> Result<Option<Participant>, DbError> {
    let mut result = db
        .query(
            "SELECT meta::id(id) AS record_id, * FROM participant \
             WHERE session_id = $session_id AND user_id = $user_id LIMIT 1",
        )
        .bind(("session_id", session_id.to_string()))
        .bind(("user_id", user_id.to_string()))
        .await?;

    let rows: Vec<ParticipantRow> = result.take(0)?;
    rows.into_iter()
        .next()
        .map(ParticipantRow::try_into_participant)
        .transpose()
}

/// Work out why a failed seat-claiming transaction did not commit.
///
/// `None` means every guard still holds: the attempt lost a write
/// conflict and may be re-run.
pub(crate) async fn explain_failed_join<C: Connection>(
    db: &Surreal<C>,
    session_id: Uuid,
    user_id: Uuid,
    claim: SeatClaim,
) -> Result<Option<PirhoError>, DbError> {
    if find_participant(db, session_id, user_id).await?.is_some() {
        return Ok(Some(ConflictKind::AlreadyParticipant.into()));
    }

    let mut result = db
        .query(JOIN_FACTS)
        .bind(("session_id", session_id.to_string()))
        .bind(("user_id", user_id.to_string()))
        .await?;
    let rows: Vec<JoinFacts> = result.take(0)?;
    let Some(facts) = rows.into_iter().next() else {
        return Ok(Some(PirhoError::not_found("session", session_id)));
    };

    if facts.status == "completed" {
        return Ok(Some(ConflictKind::SessionClosed.into()));
    }

    let is_creator = facts.creator_id == user_id.to_string();
    if claim == SeatClaim::Join && !is_creator {
        match facts.visibility.as_str() {
            "private" if !facts.has_accepted_invite => {
                return Ok(Some(DenyReason::PrivateSession.into()));
            }
            "friends_only" if !facts.is_friend => {
                return Ok(Some(DenyReason::FriendsOnly.into()));
            }
            _ => {}
        }
    }

    if facts.participant_count >= facts.max_participants {
        return Ok(Some(ConflictKind::SessionFull.into()));
    }

    Ok(None)
}

/// SurrealDB implementation of the Participant repository.
#[derive(Clone)]
pub struct SurrealParticipantRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealParticipantRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> ParticipantRepository for SurrealParticipantRepository<C> {
    async fn join(&self, session_id: Uuid, user_id: Uuid) -> PirhoResult<Participant> {
        let participant_id = Uuid::new_v4();
        let query = format!("BEGIN TRANSACTION;\n{CLAIM_SEAT}COMMIT TRANSACTION;");
        let mut cause = String::new();

        for attempt in 1..=MAX_SEAT_ATTEMPTS {
            let result = self
                .db
                .query(&query)
                .bind(("session_id", session_id.to_string()))
                .bind(("user_id", user_id.to_string()))
                .bind(("participant_id", participant_id.to_string()))
                .bind(("by_invite", false))
                .await
                .map_err(DbError::from)?;

            match result.check() {
                Ok(_) => {
                    return find_participant(&self.db, session_id, user_id)
                        .await?
                        .ok_or_else(|| PirhoError::not_found("participant", participant_id));
                }
                Err(e) => {
                    let explained =
                        explain_failed_join(&self.db, session_id, user_id, SeatClaim::Join)
                            .await?;
                    if let Some(rejection) = explained {
                        return Err(rejection);
                    }
                    debug!(
                        session_id = %session_id,
                        user_id = %user_id,
                        attempt,
                        "Seat claim contended, retrying"
                    );
                    cause = e.to_string();
                }
            }
        }

        warn!(session_id = %session_id, user_id = %user_id, error = %cause, "Join transaction failed");
        Err(PirhoError::StorageUnavailable(cause))
    }

    async fn find(&self, session_id: Uuid, user_id: Uuid) -> PirhoResult<Option<Participant>> {
        find_participant(&self.db, session_id, user_id)
            .await
            .map_err(Into::into)
    }

    async fn list_by_session(&self, session_id: Uuid) -> PirhoResult<Vec<ParticipantSummary>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, *, \
                 (SELECT VALUE username FROM type::record('user', $parent.user_id))[0] \
                 AS username \
                 FROM participant WHERE session_id = $session_id \
                 ORDER BY session_score DESC, created_at ASC",
            )
            .bind(("session_id", session_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SummaryRow> = result.take(0).map_err(DbError::from)?;

        let participants = rows
            .into_iter()
            .map(SummaryRow::try_into_summary)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(participants)
    }
}
