//! Pi & Rho's Games Database — SurrealDB connection management, schema
//! migrations and repository implementations.
//!
//! This crate provides:
//! - Connection management ([`DbManager`], [`DbConfig`])
//! - Schema initialization and migrations ([`run_migrations`])
//! - Repository implementations of the `pirho-core` traits, bundled as
//!   [`SurrealStore`]
//! - Error types ([`DbError`])

mod connection;
mod error;
pub mod repository;
mod schema;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use repository::SurrealStore;
pub use schema::{run_migrations, schema_v1};
