//! Answer submission and scoring.

use pirho_core::error::{ConflictKind, PirhoError, PirhoResult};
use pirho_core::models::answer::{AnswerOutcome, RecordAnswer, SubmitAnswer};
use pirho_core::models::session::SessionStatus;
use pirho_core::models::user::Principal;
use pirho_core::repository::{
    AnswerRepository, ProductRepository, SessionRepository, Store,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::service::GameService;

/// Points for a guess: 100 minus the absolute error, rounded half away
/// from zero, never below 0.
pub fn score_guess(guessed_price: f64, actual_price: f64) -> u32 {
    (100.0 - (guessed_price - actual_price).abs()).round().max(0.0) as u32
}

impl<St: Store> GameService<St> {
    /// Record one guess for one of the session's products.
    ///
    /// The actual price is returned only once the answer is committed.
    pub async fn submit_answer(
        &self,
        session_id: Uuid,
        principal: &Principal,
        input: SubmitAnswer,
    ) -> PirhoResult<AnswerOutcome> {
        if !input.guessed_price.is_finite() || input.guessed_price < 0.0 {
            return Err(PirhoError::validation(
                "guessed_price",
                "guessed price must be a non-negative number",
            ));
        }

        let session = self.store.sessions().get_by_id(session_id).await?;
        let participant = self.require_participant(session_id, principal).await?;

        if session.status == SessionStatus::Completed {
            return Err(ConflictKind::SessionClosed.into());
        }
        if !self
            .store
            .sessions()
            .has_product(session_id, input.product_id)
            .await?
        {
            return Err(ConflictKind::ProductNotInSession.into());
        }
        if self
            .store
            .answers()
            .find(participant.id, input.product_id)
            .await?
            .is_some()
        {
            return Err(ConflictKind::AlreadyAnswered.into());
        }

        let actual_price = self.store.products().get_price(input.product_id).await?;
        let score = score_guess(input.guessed_price, actual_price);

        // Every check above is repeated inside the write transaction.
        let recorded = self
            .store
            .answers()
            .record(RecordAnswer {
                session_id,
                participant_id: participant.id,
                user_id: principal.user_id,
                product_id: input.product_id,
                guessed_price: input.guessed_price,
                score,
            })
            .await?;

        debug!(
            session_id = %session_id,
            participant_id = %participant.id,
            product_id = %input.product_id,
            score,
            "Answer recorded"
        );
        if recorded.completed && !participant.completed {
            info!(
                session_id = %session_id,
                user_id = %principal.user_id,
                session_score = recorded.session_score,
                "Player finished session"
            );
        }

        Ok(AnswerOutcome {
            answer: recorded.answer,
            score,
            actual_price,
            session_score: recorded.session_score,
            completed: recorded.completed,
            answers_count: recorded.answers_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_guess_scores_high() {
        assert_eq!(score_guess(80.0, 100.0), 80);
        assert_eq!(score_guess(100.0, 100.0), 100);
        assert_eq!(score_guess(120.0, 100.0), 80);
    }

    #[test]
    fn far_guess_is_clamped_to_zero() {
        assert_eq!(score_guess(250.0, 100.0), 0);
        assert_eq!(score_guess(0.0, 1000.0), 0);
        assert_eq!(score_guess(200.0, 100.0), 0);
    }

    #[test]
    fn halves_round_up() {
        assert_eq!(score_guess(10.5, 10.0), 100);
        assert_eq!(score_guess(11.5, 10.0), 99);
        assert_eq!(score_guess(10.0, 10.4), 100);
        assert_eq!(score_guess(99.5, 0.0), 1);
    }
}
