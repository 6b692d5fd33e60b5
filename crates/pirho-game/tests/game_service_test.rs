//! Integration tests for the game service using in-memory SurrealDB.

use pirho_core::error::{ConflictKind, DenyReason, PirhoError};
use pirho_core::models::answer::SubmitAnswer;
use pirho_core::models::invite::{InviteStatus, InviteeRef};
use pirho_core::models::leaderboard::{Leaderboard, LeaderboardScope};
use pirho_core::models::product::CreateProduct;
use pirho_core::models::session::{
    NewSession, Session, SessionFilter, SessionStatus, Visibility,
};
use pirho_core::models::user::{CreateUser, Principal, Role};
use pirho_core::repository::{FriendshipRepository, ProductRepository, Store, UserRepository};
use pirho_db::SurrealStore;
use pirho_game::{GameConfig, GameService};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

type Service = GameService<SurrealStore<Db>>;

/// Spin up in-memory DB, run migrations, seed the catalog.
async fn setup_with_catalog(prices: &[f64]) -> Service {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    pirho_db::run_migrations(&db).await.unwrap();

    let store = SurrealStore::new(db);
    for (i, price) in prices.iter().enumerate() {
        store
            .products()
            .create(CreateProduct {
                name: format!("Product {i}"),
                image_url: None,
                price: *price,
            })
            .await
            .unwrap();
    }

    GameService::new(store, GameConfig::default())
}

async fn setup() -> Service {
    // Every price is distinct so a guess identifies its product.
    setup_with_catalog(&[100.0, 50.0, 20.0, 10.0]).await
}

async fn player(service: &Service, name: &str) -> Principal {
    player_with_role(service, name, Role::Player).await
}

async fn player_with_role(service: &Service, name: &str, role: Role) -> Principal {
    let user = service
        .store()
        .users()
        .create(CreateUser {
            username: name.into(),
            email: format!("{name}@example.com"),
            role,
        })
        .await
        .unwrap();
    Principal::new(user.id, role)
}

async fn new_session(service: &Service, creator: &Principal, visibility: Visibility) -> Session {
    service
        .create_session(
            creator,
            NewSession {
                name: "Price night".into(),
                visibility: Some(visibility),
                ..Default::default()
            },
        )
        .await
        .unwrap()
}

/// Product id and price of every product bound to the session.
async fn priced_products(service: &Service, session: &Session, who: &Principal) -> Vec<(Uuid, f64)> {
    let products = service.get_session_products(session.id, who).await.unwrap();
    let mut priced = Vec::new();
    for p in products {
        let price = service.store().products().get_price(p.product_id).await.unwrap();
        priced.push((p.product_id, price));
    }
    priced
}

fn guess(product_id: Uuid, guessed_price: f64) -> SubmitAnswer {
    SubmitAnswer {
        product_id,
        guessed_price,
    }
}

#[tokio::test]
async fn create_session_applies_defaults() {
    let service = setup().await;
    let alice = player(&service, "alice").await;

    let session = service
        .create_session(
            &alice,
            NewSession {
                name: "  Quick round ".into(),
                max_participants: Some(-1),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(session.name, "Quick round");
    assert_eq!(session.visibility, Visibility::Public);
    assert_eq!(session.max_participants, 10);
    assert_eq!(session.participant_count, 0);
    assert_eq!(session.creator_username, "alice");
    assert_eq!(session.status, SessionStatus::Active);
}

#[tokio::test]
async fn create_session_needs_four_products() {
    let service = setup_with_catalog(&[1.0, 2.0, 3.0]).await;
    let alice = player(&service, "alice").await;

    let err = service
        .create_session(
            &alice,
            NewSession {
                name: "Too small".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PirhoError::Conflict(ConflictKind::InsufficientCatalog)));

    let listed = service
        .list_sessions(SessionFilter::default(), Some(&alice))
        .await
        .unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn blank_name_is_a_validation_error() {
    let service = setup().await;
    let alice = player(&service, "alice").await;

    let err = service
        .create_session(&alice, NewSession::default())
        .await
        .unwrap_err();
    assert!(matches!(err, PirhoError::Validation { ref field, .. } if field == "name"));
}

#[tokio::test]
async fn scoring_and_completion() {
    let service = setup().await;
    let alice = player(&service, "alice").await;
    let session = new_session(&service, &alice, Visibility::Public).await;
    service.join_session(session.id, &alice).await.unwrap();

    let priced = priced_products(&service, &session, &alice).await;
    let (hundred, _) = *priced.iter().find(|(_, price)| *price == 100.0).unwrap();

    let outcome = service
        .submit_answer(session.id, &alice, guess(hundred, 80.0))
        .await
        .unwrap();
    assert_eq!(outcome.score, 80);
    assert_eq!(outcome.actual_price, 100.0);
    assert_eq!(outcome.session_score, 80);
    assert!(!outcome.completed);

    let err = service
        .submit_answer(session.id, &alice, guess(hundred, 100.0))
        .await
        .unwrap_err();
    assert!(matches!(err, PirhoError::Conflict(ConflictKind::AlreadyAnswered)));

    let mut last = None;
    for (product_id, price) in priced.iter().filter(|(id, _)| *id != hundred) {
        last = Some(
            service
                .submit_answer(session.id, &alice, guess(*product_id, price + 250.0))
                .await
                .unwrap(),
        );
    }
    let last = last.unwrap();
    assert_eq!(last.score, 0);
    assert!(last.completed);
    assert_eq!(last.answers_count, 4);
    assert_eq!(last.session_score, 80);

    let user = service.store().users().get_by_id(alice.user_id).await.unwrap();
    assert_eq!(user.total_score, 80);
    assert_eq!(user.games_played, 1);
    assert_eq!(user.best_session_score, 80);
    assert!((user.average_score - 80.0).abs() < f64::EPSILON);

    let detail = service.get_session(session.id, Some(&alice)).await.unwrap();
    assert!(detail.is_participant);
    assert!(detail.has_completed);
    // Per-participant completion never closes the session itself.
    assert_eq!(detail.session.status, SessionStatus::Active);
}

#[tokio::test]
async fn answer_preconditions() {
    let service = setup().await;
    let alice = player(&service, "alice").await;
    let bob = player(&service, "bob").await;
    let session = new_session(&service, &alice, Visibility::Public).await;
    service.join_session(session.id, &alice).await.unwrap();
    let priced = priced_products(&service, &session, &alice).await;

    let err = service
        .submit_answer(session.id, &bob, guess(priced[0].0, 10.0))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PirhoError::AccessDenied {
            reason: DenyReason::NotParticipant
        }
    ));

    let err = service
        .submit_answer(session.id, &alice, guess(Uuid::new_v4(), 10.0))
        .await
        .unwrap_err();
    assert!(matches!(err, PirhoError::Conflict(ConflictKind::ProductNotInSession)));

    let err = service
        .submit_answer(session.id, &alice, guess(priced[0].0, -1.0))
        .await
        .unwrap_err();
    assert!(matches!(err, PirhoError::Validation { ref field, .. } if field == "guessed_price"));

    service
        .transition_status(session.id, &alice, SessionStatus::Completed)
        .await
        .unwrap();
    let err = service
        .submit_answer(session.id, &alice, guess(priced[0].0, 10.0))
        .await
        .unwrap_err();
    assert!(matches!(err, PirhoError::Conflict(ConflictKind::SessionClosed)));
}

#[tokio::test]
async fn products_are_revealed_to_participants_only() {
    let service = setup().await;
    let alice = player(&service, "alice").await;
    let bob = player(&service, "bob").await;
    let session = new_session(&service, &alice, Visibility::Public).await;

    let err = service.get_session_products(session.id, &bob).await.unwrap_err();
    assert!(matches!(
        err,
        PirhoError::AccessDenied {
            reason: DenyReason::NotParticipant
        }
    ));

    service.join_session(session.id, &bob).await.unwrap();
    let products = service.get_session_products(session.id, &bob).await.unwrap();
    assert_eq!(
        products.iter().map(|p| p.position).collect::<Vec<_>>(),
        vec![1, 2, 3, 4]
    );
}

#[tokio::test]
async fn friends_only_opens_after_friendship() {
    let service = setup().await;
    let alice = player(&service, "alice").await;
    let bob = player(&service, "bob").await;
    let session = new_session(&service, &alice, Visibility::FriendsOnly).await;

    let err = service.get_session(session.id, Some(&bob)).await.unwrap_err();
    assert!(matches!(
        err,
        PirhoError::AccessDenied {
            reason: DenyReason::FriendsOnly
        }
    ));
    let err = service.join_session(session.id, &bob).await.unwrap_err();
    assert!(matches!(err, PirhoError::AccessDenied { .. }));
    assert!(service.get_session(session.id, None).await.is_err());

    service
        .store()
        .friendships()
        .add(alice.user_id, bob.user_id)
        .await
        .unwrap();

    service.get_session(session.id, Some(&bob)).await.unwrap();
    service.join_session(session.id, &bob).await.unwrap();

    let visible = service
        .list_sessions(SessionFilter::default(), Some(&bob))
        .await
        .unwrap();
    assert_eq!(visible.len(), 1);
    let anonymous = service
        .list_sessions(SessionFilter::default(), None)
        .await
        .unwrap();
    assert!(anonymous.is_empty());
}

#[tokio::test]
async fn join_rules() {
    let service = setup().await;
    let alice = player(&service, "alice").await;
    let bob = player(&service, "bob").await;
    let carol = player(&service, "carol").await;

    let session = service
        .create_session(
            &alice,
            NewSession {
                name: "Duel".into(),
                max_participants: Some(2),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    service.join_session(session.id, &alice).await.unwrap();
    let err = service.join_session(session.id, &alice).await.unwrap_err();
    assert!(matches!(err, PirhoError::Conflict(ConflictKind::AlreadyParticipant)));

    service.join_session(session.id, &bob).await.unwrap();
    let err = service.join_session(session.id, &carol).await.unwrap_err();
    assert!(matches!(err, PirhoError::Conflict(ConflictKind::SessionFull)));

    let participants = service.list_participants(session.id, None).await.unwrap();
    assert_eq!(participants.len(), 2);

    let err = service.join_session(Uuid::new_v4(), &carol).await.unwrap_err();
    assert!(matches!(err, PirhoError::NotFound { .. }));
}

#[tokio::test]
async fn completed_session_cannot_be_joined() {
    let service = setup().await;
    let alice = player(&service, "alice").await;
    let bob = player(&service, "bob").await;
    let session = new_session(&service, &alice, Visibility::Public).await;

    service
        .transition_status(session.id, &alice, SessionStatus::Completed)
        .await
        .unwrap();

    let err = service.join_session(session.id, &bob).await.unwrap_err();
    assert!(matches!(err, PirhoError::Conflict(ConflictKind::SessionClosed)));
}

#[tokio::test]
async fn status_changes_are_forward_only_and_guarded() {
    let service = setup().await;
    let alice = player(&service, "alice").await;
    let bob = player(&service, "bob").await;
    let admin = player_with_role(&service, "root", Role::Admin).await;
    let session = new_session(&service, &alice, Visibility::Public).await;

    let err = service
        .transition_status(session.id, &bob, SessionStatus::Completed)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PirhoError::AccessDenied {
            reason: DenyReason::NotCreatorOrAdmin
        }
    ));

    let archived = service
        .transition_status(session.id, &admin, SessionStatus::Archived)
        .await
        .unwrap();
    assert_eq!(archived.status, SessionStatus::Archived);

    let err = service
        .transition_status(session.id, &alice, SessionStatus::Active)
        .await
        .unwrap_err();
    assert!(matches!(err, PirhoError::Validation { ref field, .. } if field == "status"));
}

#[tokio::test]
async fn delete_is_creator_only_and_cascades() {
    let service = setup().await;
    let alice = player(&service, "alice").await;
    let bob = player(&service, "bob").await;
    let session = new_session(&service, &alice, Visibility::Public).await;
    service.join_session(session.id, &bob).await.unwrap();
    let priced = priced_products(&service, &session, &bob).await;
    service
        .submit_answer(session.id, &bob, guess(priced[0].0, 1.0))
        .await
        .unwrap();

    let err = service.delete_session(session.id, &bob).await.unwrap_err();
    assert!(matches!(err, PirhoError::AccessDenied { .. }));

    service.delete_session(session.id, &alice).await.unwrap();

    let err = service.get_session(session.id, Some(&alice)).await.unwrap_err();
    assert!(matches!(err, PirhoError::NotFound { .. }));
    let err = service.delete_session(session.id, &alice).await.unwrap_err();
    assert!(matches!(err, PirhoError::NotFound { .. }));
}

#[tokio::test]
async fn private_session_through_invite() {
    let service = setup().await;
    let alice = player(&service, "alice").await;
    let bob = player(&service, "bob").await;
    let session = new_session(&service, &alice, Visibility::Private).await;

    let err = service.join_session(session.id, &bob).await.unwrap_err();
    assert!(matches!(
        err,
        PirhoError::AccessDenied {
            reason: DenyReason::PrivateSession
        }
    ));

    let invite = service
        .send_invite(session.id, &alice, InviteeRef::Username("bob".into()))
        .await
        .unwrap();
    assert_eq!(invite.status, InviteStatus::Pending);

    let err = service
        .send_invite(session.id, &alice, InviteeRef::Email("bob@example.com".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, PirhoError::Conflict(ConflictKind::InvitePending)));

    let received = service.list_received_invites(&bob, None).await.unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].inviter_username, "alice");

    // Only the invitee may act on it.
    let err = service.accept_invite(invite.id, &alice).await.unwrap_err();
    assert!(matches!(err, PirhoError::NotFound { .. }));

    let participant = service.accept_invite(invite.id, &bob).await.unwrap();
    assert_eq!(participant.user_id, bob.user_id);

    let detail = service.get_session(session.id, Some(&bob)).await.unwrap();
    assert!(detail.is_participant);

    let err = service.accept_invite(invite.id, &bob).await.unwrap_err();
    assert!(matches!(err, PirhoError::Conflict(ConflictKind::InviteAlreadyProcessed)));

    let visible = service
        .list_sessions(SessionFilter::default(), Some(&bob))
        .await
        .unwrap();
    assert_eq!(visible.len(), 1);
}

#[tokio::test]
async fn invite_rules() {
    let service = setup().await;
    let alice = player(&service, "alice").await;
    let bob = player(&service, "bob").await;
    let carol = player(&service, "carol").await;
    let session = new_session(&service, &alice, Visibility::Private).await;

    let err = service
        .send_invite(session.id, &alice, InviteeRef::Id(alice.user_id))
        .await
        .unwrap_err();
    assert!(matches!(err, PirhoError::Conflict(ConflictKind::SelfInvite)));

    let err = service
        .send_invite(session.id, &bob, InviteeRef::Id(carol.user_id))
        .await
        .unwrap_err();
    assert!(matches!(err, PirhoError::AccessDenied { .. }));

    let err = service
        .send_invite(session.id, &alice, InviteeRef::Username("nobody".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, PirhoError::NotFound { .. }));

    let invite = service
        .send_invite(session.id, &alice, InviteeRef::Id(bob.user_id))
        .await
        .unwrap();
    let rejected = service.reject_invite(invite.id, &bob).await.unwrap();
    assert_eq!(rejected.status, InviteStatus::Rejected);

    // Re-inviting reuses the rejected invite.
    let resent = service
        .send_invite(session.id, &alice, InviteeRef::Id(bob.user_id))
        .await
        .unwrap();
    assert_eq!(resent.id, invite.id);
    assert_eq!(resent.status, InviteStatus::Pending);

    service.accept_invite(invite.id, &bob).await.unwrap();
    let err = service
        .send_invite(session.id, &alice, InviteeRef::Id(bob.user_id))
        .await
        .unwrap_err();
    assert!(matches!(err, PirhoError::Conflict(ConflictKind::AlreadyParticipant)));

    let second = service
        .send_invite(session.id, &alice, InviteeRef::Id(carol.user_id))
        .await
        .unwrap();
    assert_eq!(service.list_session_invites(session.id, &alice).await.unwrap().len(), 2);
    assert_eq!(service.list_sent_invites(&alice).await.unwrap().len(), 2);
    assert!(service.list_session_invites(session.id, &carol).await.is_err());

    let err = service.cancel_invite(second.id, &carol).await.unwrap_err();
    assert!(matches!(err, PirhoError::AccessDenied { .. }));
    service.cancel_invite(second.id, &alice).await.unwrap();
    assert!(service.list_received_invites(&carol, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn leaderboards_rank_and_flag_viewer() {
    let service = setup().await;
    let alice = player(&service, "alice").await;
    let bob = player(&service, "bob").await;
    let carol = player(&service, "carol").await;
    let session = new_session(&service, &alice, Visibility::Public).await;

    // Alice guesses every price exactly, Bob is off by 10 each time.
    for (who, offset) in [(&alice, 0.0), (&bob, 10.0)] {
        service.join_session(session.id, who).await.unwrap();
        for (product_id, price) in priced_products(&service, &session, who).await {
            service
                .submit_answer(session.id, who, guess(product_id, price + offset))
                .await
                .unwrap();
        }
    }
    service.join_session(session.id, &carol).await.unwrap();

    let standings = service.session_leaderboard(session.id, &bob).await.unwrap();
    let order: Vec<(u32, Uuid, u32)> = standings
        .iter()
        .map(|s| (s.rank, s.user_id, s.session_score))
        .collect();
    assert_eq!(
        order,
        vec![
            (1, alice.user_id, 400),
            (2, bob.user_id, 360),
            (3, carol.user_id, 0)
        ]
    );
    assert!(standings[1].is_viewer);
    assert!(!standings[0].is_viewer);

    // Carol has not finished a game yet.
    let global = service.global_leaderboard(Some(-3), Some(&carol)).await.unwrap();
    assert_eq!(global.len(), 2);
    assert_eq!(global[0].user_id, alice.user_id);
    assert!(global.iter().all(|s| !s.is_viewer));

    let top = service.global_leaderboard(Some(1), None).await.unwrap();
    assert_eq!(top.len(), 1);

    service
        .store()
        .friendships()
        .add(carol.user_id, bob.user_id)
        .await
        .unwrap();
    let friends = service.friends_leaderboard(&carol).await.unwrap();
    let names: Vec<&str> = friends.iter().map(|s| s.username.as_str()).collect();
    assert_eq!(names, vec!["bob", "carol"]);
    assert!(friends[1].is_viewer);
    assert_eq!(friends[1].rank, 2);

    match service
        .leaderboard(LeaderboardScope::Global { limit: None }, &alice)
        .await
        .unwrap()
    {
        Leaderboard::Players(players) => assert!(players[0].is_viewer),
        Leaderboard::Session(_) => panic!("expected player standings"),
    }
}

#[tokio::test]
async fn session_leaderboard_follows_access_rules() {
    let service = setup().await;
    let alice = player(&service, "alice").await;
    let bob = player(&service, "bob").await;
    let session = new_session(&service, &alice, Visibility::FriendsOnly).await;

    let err = service.session_leaderboard(session.id, &bob).await.unwrap_err();
    assert!(matches!(
        err,
        PirhoError::AccessDenied {
            reason: DenyReason::FriendsOnly
        }
    ));
    assert!(service.session_leaderboard(session.id, &alice).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn double_submit_scores_once() {
    let service = std::sync::Arc::new(setup().await);
    let alice = player(&service, "alice").await;
    let session = new_session(&service, &alice, Visibility::Public).await;
    service.join_session(session.id, &alice).await.unwrap();

    let priced = priced_products(&service, &session, &alice).await;
    let (hundred, _) = *priced.iter().find(|(_, price)| *price == 100.0).unwrap();
    let session_id = session.id;

    let handles: Vec<_> = [100.0, 90.0, 80.0, 70.0, 60.0, 50.0]
        .into_iter()
        .map(|guessed| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .submit_answer(session_id, &alice, guess(hundred, guessed))
                    .await
            })
        })
        .collect();

    let mut scores = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(outcome) => scores.push(outcome.score),
            Err(PirhoError::Conflict(ConflictKind::AlreadyAnswered)) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(scores.len(), 1);

    let detail = service.get_session(session.id, Some(&alice)).await.unwrap();
    assert!(detail.is_participant);
    let standings = service.session_leaderboard(session.id, &alice).await.unwrap();
    assert_eq!(standings.len(), 1);
    assert_eq!(standings[0].session_score, scores[0]);
}
