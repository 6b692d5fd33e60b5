//! SurrealDB implementation of [`SessionRepository`].

use chrono::{DateTime, Utc};
use pirho_core::error::PirhoResult;
use pirho_core::models::session::{
    CreateSession, Session, SessionFilter, SessionProduct, SessionStatus,
};
use pirho_core::repository::{SessionRepository, VisibilityScope};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, parse_enum, parse_uuid};

/// Session columns plus the creator's username, resolved per row.
const SESSION_PROJECTION: &str = "meta::id(id) AS record_id, *, \
    (SELECT VALUE username FROM type::record('user', $parent.creator_id))[0] \
    AS creator_username";

/// Session row and its four product bindings, all or nothing.
const CREATE_SESSION: &str = "\
BEGIN TRANSACTION;
CREATE type::record('session', $id) SET
    name = $name, creator_id = $creator_id, status = 'active',
    difficulty = $difficulty, visibility = $visibility,
    max_participants = $max_participants, participant_count = 0;
CREATE session_product SET session_id = $id, product_id = $product_1, position = 1;
CREATE session_product SET session_id = $id, product_id = $product_2, position = 2;
CREATE session_product SET session_id = $id, product_id = $product_3, position = 3;
CREATE session_product SET session_id = $id, product_id = $product_4, position = 4;
COMMIT TRANSACTION;
";

/// Answers go first since they hang off participants, not the session.
const DELETE_SESSION: &str = "\
BEGIN TRANSACTION;
LET $participants = (SELECT VALUE meta::id(id) FROM participant WHERE session_id = $id);
DELETE answer WHERE participant_id IN $participants;
DELETE participant WHERE session_id = $id;
DELETE session_product WHERE session_id = $id;
DELETE session_invite WHERE session_id = $id;
DELETE type::record('session', $id);
COMMIT TRANSACTION;
";

#[derive(Debug, SurrealValue)]
struct SessionRow {
    record_id: String,
    name: String,
    creator_id: String,
    creator_username: Option<String>,
    status: String,
    difficulty: String,
    visibility: String,
    max_participants: u32,
    participant_count: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SessionRow {
    fn try_into_session(self) -> Result<Session, DbError> {
        Ok(Session {
            id: parse_uuid(&self.record_id, "session")?,
            name: self.name,
            creator_id: parse_uuid(&self.creator_id, "creator")?,
            creator_username: self.creator_username.unwrap_or_default(),
            status: parse_enum(&self.status)?,
            difficulty: parse_enum(&self.difficulty)?,
            visibility: parse_enum(&self.visibility)?,
            max_participants: self.max_participants,
            participant_count: self.participant_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct SessionProductRow {
    product_id: String,
    position: i64,
    name: Option<String>,
    image_url: Option<String>,
}

impl SessionProductRow {
    fn try_into_product(self) -> Result<SessionProduct, DbError> {
        let position = u8::try_from(self.position)
            .map_err(|_| DbError::Corrupt(format!("invalid position: {}", self.position)))?;
        Ok(SessionProduct {
            product_id: parse_uuid(&self.product_id, "product")?,
            name: self.name.unwrap_or_default(),
            image_url: self.image_url,
            position,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the Session repository.
#[derive(Clone)]
pub struct SurrealSessionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSessionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> SessionRepository for SurrealSessionRepository<C> {
    async fn create(&self, input: CreateSession) -> PirhoResult<Session> {
        let id = Uuid::new_v4();
        let [p1, p2, p3, p4] = input.product_ids;

        let result = self
            .db
            .query(CREATE_SESSION)
            .bind(("id", id.to_string()))
            .bind(("name", input.settings.name))
            .bind(("creator_id", input.creator_id.to_string()))
            .bind(("difficulty", input.settings.difficulty.as_str()))
            .bind(("visibility", input.settings.visibility.as_str()))
            .bind(("max_participants", input.settings.max_participants))
            .bind(("product_1", p1.to_string()))
            .bind(("product_2", p2.to_string()))
            .bind(("product_3", p3.to_string()))
            .bind(("product_4", p4.to_string()))
            .await
            .map_err(DbError::from)?;

        result.check().map_err(|e| DbError::Query(e.to_string()))?;

        debug!(session_id = %id, "Session and products written");

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> PirhoResult<Session> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(format!(
                "SELECT {SESSION_PROJECTION} FROM type::record('session', $id)"
            ))
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SessionRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "session".into(),
            id: id_str,
        })?;

        row.try_into_session().map_err(Into::into)
    }

    async fn list(
        &self,
        filter: SessionFilter,
        scope: VisibilityScope,
    ) -> PirhoResult<Vec<Session>> {
        let mut clauses = Vec::new();
        if filter.status.is_some() {
            clauses.push("status = $status");
        }
        if filter.visibility.is_some() {
            clauses.push("visibility = $visibility");
        }
        if filter.creator_id.is_some() {
            clauses.push("creator_id = $creator_id");
        }
        if scope.viewer_id.is_some() {
            clauses.push(
                "(visibility = 'public' \
                 OR creator_id = $viewer_id \
                 OR (visibility = 'friends_only' AND creator_id IN $friend_ids) \
                 OR (visibility = 'private' AND meta::id(id) IN $invited_session_ids))",
            );
        } else {
            clauses.push("visibility = 'public'");
        }

        let query = format!(
            "SELECT {SESSION_PROJECTION} FROM session WHERE {} ORDER BY created_at DESC",
            clauses.join(" AND ")
        );

        let mut builder = self.db.query(&query);
        if let Some(status) = filter.status {
            builder = builder.bind(("status", status.as_str()));
        }
        if let Some(visibility) = filter.visibility {
            builder = builder.bind(("visibility", visibility.as_str()));
        }
        if let Some(creator_id) = filter.creator_id {
            builder = builder.bind(("creator_id", creator_id.to_string()));
        }
        if let Some(viewer_id) = scope.viewer_id {
            let friend_ids: Vec<String> = scope.friend_ids.iter().map(Uuid::to_string).collect();
            let invited: Vec<String> = scope
                .invited_session_ids
                .iter()
                .map(Uuid::to_string)
                .collect();
            builder = builder
                .bind(("viewer_id", viewer_id.to_string()))
                .bind(("friend_ids", friend_ids))
                .bind(("invited_session_ids", invited));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<SessionRow> = result.take(0).map_err(DbError::from)?;

        let sessions = rows
            .into_iter()
            .map(SessionRow::try_into_session)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(sessions)
    }

    async fn update_status(&self, id: Uuid, status: SessionStatus) -> PirhoResult<Session> {
        // UPDATE on a missing record id is a silent no-op.
        self.get_by_id(id).await?;

        let result = self
            .db
            .query(
                "UPDATE type::record('session', $id) SET \
                 status = $status, updated_at = time::now()",
            )
            .bind(("id", id.to_string()))
            .bind(("status", status.as_str()))
            .await
            .map_err(DbError::from)?;

        result.check().map_err(|e| DbError::Query(e.to_string()))?;

        self.get_by_id(id).await
    }

    async fn delete(&self, id: Uuid) -> PirhoResult<()> {
        self.get_by_id(id).await?;

        let result = self
            .db
            .query(DELETE_SESSION)
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        result.check().map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn get_products(&self, session_id: Uuid) -> PirhoResult<Vec<SessionProduct>> {
        let mut result = self
            .db
            .query(
                "SELECT product_id, position, \
                 (SELECT VALUE name FROM type::record('product', $parent.product_id))[0] AS name, \
                 (SELECT VALUE image_url FROM type::record('product', $parent.product_id))[0] \
                 AS image_url \
                 FROM session_product WHERE session_id = $session_id \
                 ORDER BY position ASC",
            )
            .bind(("session_id", session_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SessionProductRow> = result.take(0).map_err(DbError::from)?;

        let products = rows
            .into_iter()
            .map(SessionProductRow::try_into_product)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(products)
    }

    async fn has_product(&self, session_id: Uuid, product_id: Uuid) -> PirhoResult<bool> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM session_product \
                 WHERE session_id = $session_id AND product_id = $product_id GROUP ALL",
            )
            .bind(("session_id", session_id.to_string()))
            .bind(("product_id", product_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0) > 0)
    }
}
