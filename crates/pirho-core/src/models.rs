//! Domain models for Pi & Rho's Games.
//!
//! These are the core types shared across all crates.

pub mod answer;
pub mod friendship;
pub mod invite;
pub mod leaderboard;
pub mod participant;
pub mod product;
pub mod session;
pub mod user;
