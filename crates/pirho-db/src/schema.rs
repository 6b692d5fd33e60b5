//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as lowercase strings
//! with ASSERT constraints. Every uniqueness rule the game relies on is
//! a UNIQUE index, so concurrent writers are arbitrated by the database.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Users (owned by the identity layer; aggregates written on completion)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD username ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD role ON TABLE user TYPE string \
    ASSERT $value IN ['player', 'admin'];
DEFINE FIELD total_score ON TABLE user TYPE int DEFAULT 0 \
    ASSERT $value >= 0;
DEFINE FIELD games_played ON TABLE user TYPE int DEFAULT 0 \
    ASSERT $value >= 0;
DEFINE FIELD best_session_score ON TABLE user TYPE int DEFAULT 0 \
    ASSERT $value >= 0;
DEFINE FIELD average_score ON TABLE user TYPE float DEFAULT 0.0;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_username ON TABLE user COLUMNS username UNIQUE;
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;
DEFINE INDEX idx_user_ranking ON TABLE user \
    COLUMNS total_score, best_session_score;

-- =======================================================================
-- Catalog
-- =======================================================================
DEFINE TABLE product SCHEMAFULL;
DEFINE FIELD name ON TABLE product TYPE string;
DEFINE FIELD image_url ON TABLE product TYPE option<string>;
DEFINE FIELD price ON TABLE product TYPE float ASSERT $value >= 0;
DEFINE FIELD created_at ON TABLE product TYPE datetime \
    DEFAULT time::now();

-- =======================================================================
-- Friendships (canonical low/high ordering)
-- =======================================================================
DEFINE TABLE friendship SCHEMAFULL;
DEFINE FIELD user_low ON TABLE friendship TYPE string;
DEFINE FIELD user_high ON TABLE friendship TYPE string;
DEFINE FIELD created_at ON TABLE friendship TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_friendship_pair ON TABLE friendship \
    COLUMNS user_low, user_high UNIQUE;
DEFINE INDEX idx_friendship_high ON TABLE friendship COLUMNS user_high;

-- =======================================================================
-- Sessions
-- =======================================================================
DEFINE TABLE session SCHEMAFULL;
DEFINE FIELD name ON TABLE session TYPE string;
DEFINE FIELD creator_id ON TABLE session TYPE string;
DEFINE FIELD status ON TABLE session TYPE string \
    ASSERT $value IN ['active', 'completed', 'archived'];
DEFINE FIELD difficulty ON TABLE session TYPE string \
    ASSERT $value IN ['easy', 'medium', 'hard'];
DEFINE FIELD visibility ON TABLE session TYPE string \
    ASSERT $value IN ['public', 'private', 'friends_only'];
DEFINE FIELD max_participants ON TABLE session TYPE int \
    ASSERT $value > 0;
DEFINE FIELD participant_count ON TABLE session TYPE int DEFAULT 0 \
    ASSERT $value >= 0;
DEFINE FIELD created_at ON TABLE session TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE session TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_session_creator ON TABLE session COLUMNS creator_id;
DEFINE INDEX idx_session_created ON TABLE session COLUMNS created_at;

DEFINE TABLE session_product SCHEMAFULL;
DEFINE FIELD session_id ON TABLE session_product TYPE string;
DEFINE FIELD product_id ON TABLE session_product TYPE string;
DEFINE FIELD position ON TABLE session_product TYPE int \
    ASSERT $value >= 1 AND $value <= 4;
DEFINE INDEX idx_session_product_position ON TABLE session_product \
    COLUMNS session_id, position UNIQUE;
DEFINE INDEX idx_session_product_product ON TABLE session_product \
    COLUMNS session_id, product_id UNIQUE;

-- =======================================================================
-- Participants and answers
-- =======================================================================
DEFINE TABLE participant SCHEMAFULL;
DEFINE FIELD session_id ON TABLE participant TYPE string;
DEFINE FIELD user_id ON TABLE participant TYPE string;
DEFINE FIELD session_score ON TABLE participant TYPE int DEFAULT 0 \
    ASSERT $value >= 0;
DEFINE FIELD answers_count ON TABLE participant TYPE int DEFAULT 0 \
    ASSERT $value >= 0 AND $value <= 4;
DEFINE FIELD completed ON TABLE participant TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE participant TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE participant TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_participant_session_user ON TABLE participant \
    COLUMNS session_id, user_id UNIQUE;

DEFINE TABLE answer SCHEMAFULL;
DEFINE FIELD participant_id ON TABLE answer TYPE string;
DEFINE FIELD product_id ON TABLE answer TYPE string;
DEFINE FIELD guessed_price ON TABLE answer TYPE float \
    ASSERT $value >= 0;
DEFINE FIELD score ON TABLE answer TYPE int \
    ASSERT $value >= 0 AND $value <= 100;
DEFINE FIELD created_at ON TABLE answer TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_answer_participant_product ON TABLE answer \
    COLUMNS participant_id, product_id UNIQUE;

-- =======================================================================
-- Session invites
-- =======================================================================
DEFINE TABLE session_invite SCHEMAFULL;
DEFINE FIELD session_id ON TABLE session_invite TYPE string;
DEFINE FIELD inviter_id ON TABLE session_invite TYPE string;
DEFINE FIELD invitee_id ON TABLE session_invite TYPE string;
DEFINE FIELD status ON TABLE session_invite TYPE string \
    ASSERT $value IN ['pending', 'accepted', 'rejected'];
DEFINE FIELD created_at ON TABLE session_invite TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE session_invite TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_invite_session_invitee ON TABLE session_invite \
    COLUMNS session_id, invitee_id UNIQUE;
DEFINE INDEX idx_invite_invitee ON TABLE session_invite COLUMNS invitee_id;
DEFINE INDEX idx_invite_inviter ON TABLE session_invite COLUMNS inviter_id;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT version FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }

        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "Migration v{} '{}' failed: {}",
                migration.version, migration.name, e,
            ))
        })?;

        db.query("CREATE _migration SET version = $version, name = $name")
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

        info!(version = migration.version, "Migration applied");
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
