//! Database-specific error types and conversions.

use std::str::FromStr;

use pirho_core::error::PirhoError;
use uuid::Uuid;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },
}

impl From<DbError> for PirhoError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => PirhoError::NotFound { entity, id },
            DbError::Corrupt(msg) | DbError::Migration(msg) => PirhoError::Internal(msg),
            other => PirhoError::StorageUnavailable(other.to_string()),
        }
    }
}

pub(crate) fn parse_uuid(value: &str, field: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Corrupt(format!("invalid {field} UUID: {e}")))
}

pub(crate) fn parse_enum<T: FromStr<Err = String>>(value: &str) -> Result<T, DbError> {
    value.parse().map_err(DbError::Corrupt)
}
