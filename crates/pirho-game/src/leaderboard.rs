//! Leaderboard views: one session, everyone, and the viewer's friends.

use pirho_core::error::PirhoResult;
use pirho_core::models::leaderboard::{
    Leaderboard, LeaderboardScope, PlayerStanding, SessionStanding, effective_limit,
};
use pirho_core::models::user::{Principal, User};
use pirho_core::repository::{
    FriendshipRepository, ParticipantRepository, RankingQuery, SessionRepository, Store,
    UserRepository,
};
use uuid::Uuid;

use crate::service::GameService;

fn rank(position: usize) -> u32 {
    position as u32 + 1
}

fn player_standings(users: Vec<User>, viewer_id: Option<Uuid>) -> Vec<PlayerStanding> {
    users
        .into_iter()
        .enumerate()
        .map(|(i, user)| PlayerStanding {
            rank: rank(i),
            is_viewer: viewer_id == Some(user.id),
            user_id: user.id,
            username: user.username,
            total_score: user.total_score,
            games_played: user.games_played,
            best_session_score: user.best_session_score,
            average_score: user.average_score,
        })
        .collect()
}

impl<St: Store> GameService<St> {
    /// Participants by session score, earliest join first on ties.
    pub async fn session_leaderboard(
        &self,
        session_id: Uuid,
        viewer: &Principal,
    ) -> PirhoResult<Vec<SessionStanding>> {
        let session = self.store.sessions().get_by_id(session_id).await?;
        self.ensure_access_or_participation(&session, Some(viewer))
            .await?;

        let participants = self.store.participants().list_by_session(session_id).await?;

        Ok(participants
            .into_iter()
            .enumerate()
            .map(|(i, p)| SessionStanding {
                rank: rank(i),
                is_viewer: p.user_id == viewer.user_id,
                participant_id: p.participant_id,
                user_id: p.user_id,
                username: p.username,
                session_score: p.session_score,
                answers_count: p.answers_count,
                completed: p.completed,
            })
            .collect())
    }

    /// Everyone who finished at least one game.
    pub async fn global_leaderboard(
        &self,
        limit: Option<i64>,
        viewer: Option<&Principal>,
    ) -> PirhoResult<Vec<PlayerStanding>> {
        let limit = effective_limit(
            limit,
            self.config.leaderboard_default_limit,
            self.config.leaderboard_max_limit,
        );

        let users = self
            .store
            .users()
            .list_ranked(RankingQuery {
                limit: Some(limit),
                ..Default::default()
            })
            .await?;

        Ok(player_standings(users, viewer.map(|p| p.user_id)))
    }

    /// The viewer and their friends. The viewer is listed even before
    /// their first finished game.
    pub async fn friends_leaderboard(&self, viewer: &Principal) -> PirhoResult<Vec<PlayerStanding>> {
        let mut among = self
            .store
            .friendships()
            .list_friend_ids(viewer.user_id)
            .await?;
        among.push(viewer.user_id);

        let users = self
            .store
            .users()
            .list_ranked(RankingQuery {
                among: Some(among),
                always_include: Some(viewer.user_id),
                limit: None,
            })
            .await?;

        Ok(player_standings(users, Some(viewer.user_id)))
    }

    pub async fn leaderboard(
        &self,
        scope: LeaderboardScope,
        viewer: &Principal,
    ) -> PirhoResult<Leaderboard> {
        match scope {
            LeaderboardScope::Session(session_id) => self
                .session_leaderboard(session_id, viewer)
                .await
                .map(Leaderboard::Session),
            LeaderboardScope::Global { limit } => self
                .global_leaderboard(limit, Some(viewer))
                .await
                .map(Leaderboard::Players),
            LeaderboardScope::Friends => self
                .friends_leaderboard(viewer)
                .await
                .map(Leaderboard::Players),
        }
    }
}
