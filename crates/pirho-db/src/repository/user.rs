//! SurrealDB implementation of [`UserRepository`].
//!
//! The user table belongs to the identity layer. This repository only
//! offers what the game needs: lookups, seeding, and ranked listings of
//! the score aggregates that completed sessions write.

use chrono::{DateTime, Utc};
use pirho_core::error::PirhoResult;
use pirho_core::models::user::{CreateUser, User};
use pirho_core::repository::{RankingQuery, UserRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, parse_enum, parse_uuid};

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct UserRow {
    record_id: String,
    username: String,
    email: String,
    role: String,
    total_score: u64,
    games_played: u32,
    best_session_score: u32,
    average_score: f64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn try_into_user(self) -> Result<User, DbError> {
        Ok(User {
            id: parse_uuid(&self.record_id, "user")?,
            username: self.username,
            email: self.email,
            role: parse_enum(&self.role)?,
            total_score: self.total_score,
            games_played: self.games_played,
            best_session_score: self.best_session_score,
            average_score: self.average_score,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the User repository.
#[derive(Clone)]
pub struct SurrealUserRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealUserRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// Fetch the single user matched by `query`, which filters on `$value`.
    async fn fetch_matching(&self, query: &'static str, value: String) -> PirhoResult<User> {
        let mut result = self
            .db
            .query(query)
            .bind(("value", value.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: value,
        })?;

        row.try_into_user().map_err(Into::into)
    }
}

impl<C: Connection> UserRepository for SurrealUserRepository<C> {
    async fn create(&self, input: CreateUser) -> PirhoResult<User> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('user', $id) SET \
                 username = $username, email = $email, role = $role",
            )
            .bind(("id", id_str.clone()))
            .bind(("username", input.username))
            .bind(("email", input.email))
            .bind(("role", input.role.as_str()))
            .await
            .map_err(DbError::from)?;

        result.check().map_err(|e| DbError::Query(e.to_string()))?;

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> PirhoResult<User> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('user', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "user".into(),
            id: id_str,
        })?;

        row.try_into_user().map_err(Into::into)
    }

    async fn get_by_username(&self, username: &str) -> PirhoResult<User> {
        self.fetch_matching(
            "SELECT meta::id(id) AS record_id, * FROM user WHERE username = $value LIMIT 1",
            username.to_string(),
        )
        .await
    }

    async fn get_by_email(&self, email: &str) -> PirhoResult<User> {
        self.fetch_matching(
            "SELECT meta::id(id) AS record_id, * FROM user WHERE email = $value LIMIT 1",
            email.to_string(),
        )
        .await
    }

    async fn list_ranked(&self, query: RankingQuery) -> PirhoResult<Vec<User>> {
        let mut clauses = Vec::new();
        if query.always_include.is_some() {
            clauses.push("(games_played > 0 OR meta::id(id) = $always_include)");
        } else {
            clauses.push("games_played > 0");
        }
        if query.among.is_some() {
            clauses.push("meta::id(id) IN $among");
        }

        let mut sql = format!(
            "SELECT meta::id(id) AS record_id, * FROM user WHERE {} \
             ORDER BY total_score DESC, best_session_score DESC, created_at ASC",
            clauses.join(" AND ")
        );
        if query.limit.is_some() {
            sql.push_str(" LIMIT $limit");
        }

        let mut builder = self.db.query(&sql);
        if let Some(user_id) = query.always_include {
            builder = builder.bind(("always_include", user_id.to_string()));
        }
        if let Some(among) = query.among {
            let among: Vec<String> = among.iter().map(Uuid::to_string).collect();
            builder = builder.bind(("among", among));
        }
        if let Some(limit) = query.limit {
            builder = builder.bind(("limit", limit));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<UserRow> = result.take(0).map_err(DbError::from)?;

        let users = rows
            .into_iter()
            .map(UserRow::try_into_user)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(users)
    }
}
