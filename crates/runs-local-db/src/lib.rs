//! SQLite database management for the runs experiment tracker.
//!
//! This crate persists run entries in a single path-keyed table and exposes
//! glob-style queries over it. Paths in queries may contain `%`, which
//! matches any substring; every other character is literal.

pub mod connection;
pub mod migrations;
pub mod models;
pub mod schema;

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for database operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration error: {message}")]
    Migration { message: String },

    #[error("No run matches '{0}'")]
    NotFound(String),

    #[error("'{pattern}' matches {count} runs, expected exactly one")]
    AmbiguousPath { pattern: String, count: usize },

    #[error("A run already exists at '{0}'")]
    DuplicatePath(String),

    #[error("Invalid stored run: {0}")]
    Model(#[from] runs_model::ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a new migration error.
    pub fn migration<S: Into<String>>(message: S) -> Self {
        Self::Migration {
            message: message.into(),
        }
    }
}

/// Database connection and management.
pub use connection::Database;

/// Low-level row access.
pub use models::{glob_pattern, RunStore};

/// Schema definitions and constants.
pub use schema::*;
