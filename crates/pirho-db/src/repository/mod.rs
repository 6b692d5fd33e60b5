//! SurrealDB repository implementations.

mod answer;
mod friendship;
mod invite;
mod participant;
mod product;
mod session;
mod user;

pub use answer::SurrealAnswerRepository;
pub use friendship::SurrealFriendshipRepository;
pub use invite::SurrealInviteRepository;
pub use participant::SurrealParticipantRepository;
pub use product::SurrealProductRepository;
pub use session::SurrealSessionRepository;
pub use user::SurrealUserRepository;

use pirho_core::repository::Store;
use surrealdb::{Connection, Surreal};

/// Every SurrealDB repository over one shared client.
#[derive(Clone)]
pub struct SurrealStore<C: Connection> {
    users: SurrealUserRepository<C>,
    products: SurrealProductRepository<C>,
    friendships: SurrealFriendshipRepository<C>,
    sessions: SurrealSessionRepository<C>,
    participants: SurrealParticipantRepository<C>,
    answers: SurrealAnswerRepository<C>,
    invites: SurrealInviteRepository<C>,
}

impl<C: Connection> SurrealStore<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self {
            users: SurrealUserRepository::new(db.clone()),
            products: SurrealProductRepository::new(db.clone()),
            friendships: SurrealFriendshipRepository::new(db.clone()),
            sessions: SurrealSessionRepository::new(db.clone()),
            participants: SurrealParticipantRepository::new(db.clone()),
            answers: SurrealAnswerRepository::new(db.clone()),
            invites: SurrealInviteRepository::new(db),
        }
    }
}

impl<C: Connection> Store for SurrealStore<C> {
    type Users = SurrealUserRepository<C>;
    type Products = SurrealProductRepository<C>;
    type Friendships = SurrealFriendshipRepository<C>;
    type Sessions = SurrealSessionRepository<C>;
    type Participants = SurrealParticipantRepository<C>;
    type Answers = SurrealAnswerRepository<C>;
    type Invites = SurrealInviteRepository<C>;

    fn users(&self) -> &Self::Users {
        &self.users
    }

    fn products(&self) -> &Self::Products {
        &self.products
    }

    fn friendships(&self) -> &Self::Friendships {
        &self.friendships
    }

    fn sessions(&self) -> &Self::Sessions {
        &self.sessions
    }

    fn participants(&self) -> &Self::Participants {
        &self.participants
    }

    fn answers(&self) -> &Self::Answers {
        &self.answers
    }

    fn invites(&self) -> &Self::Invites {
        &self.invites
    }
}
