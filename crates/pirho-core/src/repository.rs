//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Operations that touch more than
//! one record (session creation, joins, answers, invite acceptance,
//! deletion) are atomic: they either commit every write or none.

use uuid::Uuid;

use crate::error::PirhoResult;
use crate::models::{
    answer::{Answer, RecordAnswer, RecordedAnswer},
    invite::{CreateInvite, Invite, InviteStatus, InviteSummary},
    participant::{Participant, ParticipantSummary},
    product::{CreateProduct, Product},
    session::{CreateSession, Session, SessionFilter, SessionProduct, SessionStatus},
    user::{CreateUser, User},
};

/// Which sessions a viewer may see, decomposed for query-level filtering.
///
/// `viewer_id == None` means an anonymous viewer, who only sees public
/// sessions. Otherwise the viewer sees their own sessions, public ones,
/// friends-only sessions created by `friend_ids`, and private sessions
/// listed in `invited_session_ids`.
#[derive(Debug, Clone, Default)]
pub struct VisibilityScope {
    pub viewer_id: Option<Uuid>,
    pub friend_ids: Vec<Uuid>,
    pub invited_session_ids: Vec<Uuid>,
}

/// Population and size of a player ranking.
#[derive(Debug, Clone, Default)]
pub struct RankingQuery {
    /// Restrict to these users (`None` = everyone).
    pub among: Option<Vec<Uuid>>,
    /// Include this user even if they have not finished a game yet.
    pub always_include: Option<Uuid>,
    pub limit: Option<u32>,
}

// ---------------------------------------------------------------------------
// Collaborators: identity, catalog, social graph
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = PirhoResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = PirhoResult<User>> + Send;
    fn get_by_username(&self, username: &str) -> impl Future<Output = PirhoResult<User>> + Send;
    fn get_by_email(&self, email: &str) -> impl Future<Output = PirhoResult<User>> + Send;

    /// Users ordered by total score desc, best session score desc, then
    /// account age. Users who never finished a game are left out unless
    /// named in `always_include`.
    fn list_ranked(&self, query: RankingQuery)
    -> impl Future<Output = PirhoResult<Vec<User>>> + Send;
}

pub trait ProductRepository: Send + Sync {
    fn create(&self, input: CreateProduct) -> impl Future<Output = PirhoResult<Product>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = PirhoResult<Product>> + Send;

    /// Up to `n` distinct products in random order. Returns fewer when
    /// the catalog is smaller than `n`.
    fn pick_random(&self, n: usize) -> impl Future<Output = PirhoResult<Vec<Product>>> + Send;

    /// Authoritative price of a product.
    fn get_price(&self, id: Uuid) -> impl Future<Output = PirhoResult<f64>> + Send;
}

pub trait FriendshipRepository: Send + Sync {
    /// Record a friendship. Idempotent.
    fn add(&self, a: Uuid, b: Uuid) -> impl Future<Output = PirhoResult<()>> + Send;
    fn remove(&self, a: Uuid, b: Uuid) -> impl Future<Output = PirhoResult<()>> + Send;
    /// Symmetric: `are_friends(a, b) == are_friends(b, a)`.
    fn are_friends(&self, a: Uuid, b: Uuid) -> impl Future<Output = PirhoResult<bool>> + Send;
    fn list_friend_ids(&self, user_id: Uuid) -> impl Future<Output = PirhoResult<Vec<Uuid>>> + Send;
}

// ---------------------------------------------------------------------------
// Core: sessions, participants, answers, invites
// ---------------------------------------------------------------------------

pub trait SessionRepository: Send + Sync {
    /// Insert the session and its product bindings in one transaction.
    fn create(&self, input: CreateSession) -> impl Future<Output = PirhoResult<Session>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = PirhoResult<Session>> + Send;

    /// Sessions matching `filter` and visible under `scope`, newest first.
    fn list(
        &self,
        filter: SessionFilter,
        scope: VisibilityScope,
    ) -> impl Future<Output = PirhoResult<Vec<Session>>> + Send;

    fn update_status(
        &self,
        id: Uuid,
        status: SessionStatus,
    ) -> impl Future<Output = PirhoResult<Session>> + Send;

    /// Delete the session with its products, participants, answers and
    /// invites.
    fn delete(&self, id: Uuid) -> impl Future<Output = PirhoResult<()>> + Send;

    /// Bound products ordered by position, without prices.
    fn get_products(
        &self,
        session_id: Uuid,
    ) -> impl Future<Output = PirhoResult<Vec<SessionProduct>>> + Send;

    fn has_product(
        &self,
        session_id: Uuid,
        product_id: Uuid,
    ) -> impl Future<Output = PirhoResult<bool>> + Send;
}

pub trait ParticipantRepository: Send + Sync {
    /// Add a user to a session, enforcing status, visibility, capacity and
    /// uniqueness in the same transaction. Fails with `SessionClosed`,
    /// `AccessDenied`, `SessionFull` or `AlreadyParticipant`.
    fn join(
        &self,
        session_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = PirhoResult<Participant>> + Send;

    fn find(
        &self,
        session_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = PirhoResult<Option<Participant>>> + Send;

    /// Participants by session score desc, earliest join first on ties.
    fn list_by_session(
        &self,
        session_id: Uuid,
    ) -> impl Future<Output = PirhoResult<Vec<ParticipantSummary>>> + Send;
}

pub trait AnswerRepository: Send + Sync {
    /// Persist a scored answer and update the participant (and, on the
    /// completing answer, the user aggregates) atomically. Membership,
    /// session status and the product binding are re-checked in the same
    /// transaction; `AlreadyAnswered` when the pair already has an answer.
    fn record(
        &self,
        input: RecordAnswer,
    ) -> impl Future<Output = PirhoResult<RecordedAnswer>> + Send;

    fn find(
        &self,
        participant_id: Uuid,
        product_id: Uuid,
    ) -> impl Future<Output = PirhoResult<Option<Answer>>> + Send;

    fn list_by_participant(
        &self,
        participant_id: Uuid,
    ) -> impl Future<Output = PirhoResult<Vec<Answer>>> + Send;
}

pub trait InviteRepository: Send + Sync {
    fn create(&self, input: CreateInvite) -> impl Future<Output = PirhoResult<Invite>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = PirhoResult<Invite>> + Send;

    fn find(
        &self,
        session_id: Uuid,
        invitee_id: Uuid,
    ) -> impl Future<Output = PirhoResult<Option<Invite>>> + Send;

    /// The invitee's invite to the session, if it has been accepted.
    fn get_accepted(
        &self,
        session_id: Uuid,
        invitee_id: Uuid,
    ) -> impl Future<Output = PirhoResult<Option<Invite>>> + Send;

    /// Sessions for which the user holds an accepted invite.
    fn accepted_session_ids(
        &self,
        invitee_id: Uuid,
    ) -> impl Future<Output = PirhoResult<Vec<Uuid>>> + Send;

    fn set_status(
        &self,
        id: Uuid,
        status: InviteStatus,
    ) -> impl Future<Output = PirhoResult<Invite>> + Send;

    /// Mark a pending invite accepted and create the participant in one
    /// transaction, enforcing capacity.
    fn accept(&self, id: Uuid) -> impl Future<Output = PirhoResult<Participant>> + Send;

    fn delete(&self, id: Uuid) -> impl Future<Output = PirhoResult<()>> + Send;

    fn list_by_session(
        &self,
        session_id: Uuid,
    ) -> impl Future<Output = PirhoResult<Vec<InviteSummary>>> + Send;

    fn list_received(
        &self,
        invitee_id: Uuid,
        status: Option<InviteStatus>,
    ) -> impl Future<Output = PirhoResult<Vec<InviteSummary>>> + Send;

    fn list_sent(
        &self,
        inviter_id: Uuid,
    ) -> impl Future<Output = PirhoResult<Vec<InviteSummary>>> + Send;
}

/// Every repository the game services need, injected as one handle.
pub trait Store: Send + Sync {
    type Users: UserRepository;
    type Products: ProductRepository;
    type Friendships: FriendshipRepository;
    type Sessions: SessionRepository;
    type Participants: ParticipantRepository;
    type Answers: AnswerRepository;
    type Invites: InviteRepository;

    fn users(&self) -> &Self::Users;
    fn products(&self) -> &Self::Products;
    fn friendships(&self) -> &Self::Friendships;
    fn sessions(&self) -> &Self::Sessions;
    fn participants(&self) -> &Self::Participants;
    fn answers(&self) -> &Self::Answers;
    fn invites(&self) -> &Self::Invites;
}
