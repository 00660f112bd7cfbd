//! Rewind persistence
//!
//! Repository traits for the dedup store and the beta opt-in list, with a Postgres
//! implementation (sqlx) and an in-memory implementation for tests and database-less runs.

pub mod db;
pub mod setup;

pub use db::{
    BetaRepository, DedupRepository, InMemoryBetaRepository, InMemoryDedupRepository,
    PgBetaRepository, PgDedupRepository,
};
pub use setup::setup_database;
