//! SurrealDB implementation of [`FriendshipRepository`].
//!
//! Each friendship is one row keyed by its canonical `(low, high)` pair,
//! so adding the same friendship twice is a no-op.

use pirho_core::error::PirhoResult;
use pirho_core::models::friendship::FriendPair;
use pirho_core::repository::FriendshipRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, parse_uuid};

#[derive(Debug, SurrealValue)]
struct FriendshipRow {
    user_low: String,
    user_high: String,
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn pair_key(pair: &FriendPair) -> String {
    format!("{}_{}", pair.low(), pair.high())
}

/// SurrealDB implementation of the Friendship repository.
#[derive(Clone)]
pub struct SurrealFriendshipRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealFriendshipRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> FriendshipRepository for SurrealFriendshipRepository<C> {
    async fn add(&self, a: Uuid, b: Uuid) -> PirhoResult<()> {
        let pair = FriendPair::new(a, b);

        let result = self
            .db
            .query(
                "UPSERT type::record('friendship', $key) SET \
                 user_low = $low, user_high = $high",
            )
            .bind(("key", pair_key(&pair)))
            .bind(("low", pair.low().to_string()))
            .bind(("high", pair.high().to_string()))
            .await
            .map_err(DbError::from)?;

        result.check().map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn remove(&self, a: Uuid, b: Uuid) -> PirhoResult<()> {
        let pair = FriendPair::new(a, b);

        let result = self
            .db
            .query("DELETE type::record('friendship', $key)")
            .bind(("key", pair_key(&pair)))
            .await
            .map_err(DbError::from)?;

        result.check().map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn are_friends(&self, a: Uuid, b: Uuid) -> PirhoResult<bool> {
        let pair = FriendPair::new(a, b);

        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM friendship \
                 WHERE user_low = $low AND user_high = $high GROUP ALL",
            )
            .bind(("low", pair.low().to_string()))
            .bind(("high", pair.high().to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }

    async fn list_friend_ids(&self, user_id: Uuid) -> PirhoResult<Vec<Uuid>> {
        let mut result = self
            .db
            .query(
                "SELECT user_low, user_high FROM friendship \
                 WHERE user_low = $user_id OR user_high = $user_id",
            )
            .bind(("user_id", user_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<FriendshipRow> = result.take(0).map_err(DbError::from)?;

        let mut friends = Vec::with_capacity(rows.len());
        for row in rows {
            let pair = FriendPair::new(
                parse_uuid(&row.user_low, "friendship user")?,
                parse_uuid(&row.user_high, "friendship user")?,
            );
            if let Some(friend) = pair.other(user_id) {
                friends.push(friend);
            }
        }

        Ok(friends)
    }
}
