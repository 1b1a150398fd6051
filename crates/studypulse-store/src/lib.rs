//! studypulse-store — SQLite persistence.
//!
//! Implements the repository traits from `studypulse-core` on top of a sqlx
//! SQLite pool.

pub mod sqlite;

pub use sqlite::{connect, SqliteInitError, SqliteRepository};
