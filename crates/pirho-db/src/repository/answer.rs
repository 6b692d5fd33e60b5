//! SurrealDB implementation of [`AnswerRepository`].

use chrono::{DateTime, Utc};
use pirho_core::error::{ConflictKind, DenyReason, PirhoError, PirhoResult};
use pirho_core::models::answer::{Answer, RecordAnswer, RecordedAnswer};
use pirho_core::models::session::PRODUCTS_PER_SESSION;
use pirho_core::repository::AnswerRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::{debug, warn};
use uuid::Uuid;

use super::participant::ParticipantRow;
use crate::error::{DbError, parse_uuid};

/// Guards, answer insert, participant roll-up and, when this answer
/// completes the participant, the user's aggregate update.
///
/// The guards repeat the service's pre-checks so that a session closed or
/// deleted in the meantime aborts the whole script. The UNIQUE
/// (participant_id, product_id) index makes the losing writer of a
/// concurrent double submit fail it too.
const RECORD_ANSWER: &str = "\
BEGIN TRANSACTION;
LET $participant = type::record('participant', $participant_id);
LET $current = (SELECT session_id, user_id, completed FROM $participant)[0];
IF !$current OR $current.session_id != $session_id OR $current.user_id != $user_id {
    THROW 'not a participant of this session'
};
LET $status = (SELECT VALUE status FROM type::record('session', $session_id))[0];
IF !$status { THROW 'session not found' };
IF $status = 'completed' { THROW 'session is closed' };
IF array::len((SELECT VALUE id FROM session_product
    WHERE session_id = $session_id AND product_id = $product_id)) = 0 {
    THROW 'product is not part of this session'
};
LET $was_completed = $current.completed;
CREATE type::record('answer', $answer_id) SET
    participant_id = $participant_id, product_id = $product_id,
    guessed_price = $guessed_price, score = $score;
LET $answered = (SELECT count() AS total FROM answer
    WHERE participant_id = $participant_id GROUP ALL)[0].total;
LET $after = (UPDATE $participant SET
    session_score += $score,
    answers_count = $answered,
    completed = $answered >= $required,
    updated_at = time::now()
    RETURN AFTER)[0];
IF $after.completed AND !$was_completed {
    LET $user = type::record('user', $user_id);
    LET $stats = (SELECT total_score, games_played, best_session_score FROM $user)[0];
    LET $total = $stats.total_score + $after.session_score;
    LET $games = $stats.games_played + 1;
    UPDATE $user SET
        total_score = $total,
        games_played = $games,
        best_session_score = math::max([$stats.best_session_score, $after.session_score]),
        average_score = <float> $total / $games,
        updated_at = time::now();
};
COMMIT TRANSACTION;
";

/// Everything the guards of [`RECORD_ANSWER`] look at, read back after a
/// failed attempt.
const ANSWER_FACTS: &str = "\
SELECT status,
    array::len((SELECT VALUE id FROM type::record('participant', $participant_id)
        WHERE session_id = $session_id AND user_id = $user_id)) > 0 AS is_participant,
    array::len((SELECT VALUE id FROM session_product
        WHERE session_id = $session_id AND product_id = $product_id)) > 0 AS has_product,
    array::len((SELECT VALUE id FROM answer
        WHERE participant_id = $participant_id AND product_id = $product_id)) > 0 AS answered
FROM type::record('session', $session_id)";

/// Attempts before a contended answer is reported as a storage failure.
const MAX_RECORD_ATTEMPTS: u32 = 8;

#[derive(Debug, SurrealValue)]
struct AnswerFacts {
    status: String,
    is_participant: bool,
    has_product: bool,
    answered: bool,
}

#[derive(Debug, SurrealValue)]
struct AnswerRow {
    record_id: String,
    participant_id: String,
    product_id: String,
    guessed_price: f64,
    score: u32,
    created_at: DateTime<Utc>,
}

impl AnswerRow {
    fn try_into_answer(self) -> Result<Answer, DbError> {
        Ok(Answer {
            id: parse_uuid(&self.record_id, "answer")?,
            participant_id: parse_uuid(&self.participant_id, "participant")?,
            product_id: parse_uuid(&self.product_id, "product")?,
            guessed_price: self.guessed_price,
            score: self.score,
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the Answer repository.
#[derive(Clone)]
pub struct SurrealAnswerRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAnswerRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn get_answer(&self, id: Uuid) -> PirhoResult<Answer> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('answer', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AnswerRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "answer".into(),
            id: id_str,
        })?;

        row.try_into_answer().map_err(Into::into)
    }

    async fn get_participant_row(&self, id: Uuid) -> PirhoResult<ParticipantRow> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('participant', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ParticipantRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "participant".into(),
            id: id_str,
        })?;

        Ok(row)
    }

    async fn recorded(&self, answer_id: Uuid, participant_id: Uuid) -> PirhoResult<RecordedAnswer> {
        let answer = self.get_answer(answer_id).await?;
        let participant = self
            .get_participant_row(participant_id)
            .await?
            .try_into_participant()?;

        Ok(RecordedAnswer {
            answer,
            session_score: participant.session_score,
            answers_count: participant.answers_count,
            completed: participant.completed,
        })
    }

    /// Why a failed [`RECORD_ANSWER`] did not commit, checked in the same
    /// order as the script's guards. `None` means every guard still holds
    /// and the attempt lost a write conflict.
    async fn explain_failed_answer(&self, input: &RecordAnswer) -> PirhoResult<Option<PirhoError>> {
        let mut result = self
            .db
            .query(ANSWER_FACTS)
            .bind(("session_id", input.session_id.to_string()))
            .bind(("participant_id", input.participant_id.to_string()))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("product_id", input.product_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AnswerFacts> = result.take(0).map_err(DbError::from)?;
        let Some(facts) = rows.into_iter().next() else {
            return Ok(Some(PirhoError::not_found("session", input.session_id)));
        };

        let rejection = if !facts.is_participant {
            Some(DenyReason::NotParticipant.into())
        } else if facts.status == "completed" {
            Some(ConflictKind::SessionClosed.into())
        } else if !facts.has_product {
            Some(ConflictKind::ProductNotInSession.into())
        } else if facts.answered {
            Some(ConflictKind::AlreadyAnswered.into())
        } else {
            None
        };

        Ok(rejection)
    }
}

impl<C: Connection> AnswerRepository for SurrealAnswerRepository<C> {
    async fn record(&self, input: RecordAnswer) -> PirhoResult<RecordedAnswer> {
        let answer_id = Uuid::new_v4();
        let mut cause = String::new();

        for attempt in 1..=MAX_RECORD_ATTEMPTS {
            let result = self
                .db
                .query(RECORD_ANSWER)
                .bind(("answer_id", answer_id.to_string()))
                .bind(("session_id", input.session_id.to_string()))
                .bind(("participant_id", input.participant_id.to_string()))
                .bind(("user_id", input.user_id.to_string()))
                .bind(("product_id", input.product_id.to_string()))
                .bind(("guessed_price", input.guessed_price))
                .bind(("score", input.score))
                .bind(("required", PRODUCTS_PER_SESSION as u32))
                .await
                .map_err(DbError::from)?;

            match result.check() {
                Ok(_) => return self.recorded(answer_id, input.participant_id).await,
                Err(e) => {
                    if let Some(rejection) = self.explain_failed_answer(&input).await? {
                        return Err(rejection);
                    }
                    debug!(
                        participant_id = %input.participant_id,
                        product_id = %input.product_id,
                        attempt,
                        "Answer transaction contended, retrying"
                    );
                    cause = e.to_string();
                }
            }
        }

        warn!(
            participant_id = %input.participant_id,
            product_id = %input.product_id,
            error = %cause,
            "Answer transaction failed"
        );
        Err(PirhoError::StorageUnavailable(cause))
    }

    async fn find(&self, participant_id: Uuid, product_id: Uuid) -> PirhoResult<Option<Answer>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM answer \
                 WHERE participant_id = $participant_id AND product_id = $product_id \
                 LIMIT 1",
            )
            .bind(("participant_id", participant_id.to_string()))
            .bind(("product_id", product_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AnswerRow> = result.take(0).map_err(DbError::from)?;
        let answer = rows
            .into_iter()
            .next()
            .map(AnswerRow::try_into_answer)
            .transpose()?;

        Ok(answer)
    }

    async fn list_by_participant(&self, participant_id: Uuid) -> PirhoResult<Vec<Answer>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM answer \
                 WHERE participant_id = $participant_id ORDER BY created_at ASC",
            )
            .bind(("participant_id", participant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AnswerRow> = result.take(0).map_err(DbError::from)?;

        let answers = rows
            .into_iter()
            .map(AnswerRow::try_into_answer)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(answers)
    }
}
