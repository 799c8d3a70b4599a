//! Transaction engine for the runs experiment tracker.
//!
//! A run lives in three places at once: a row in the run database, a set of
//! directories under the configured root, and a detached terminal session.
//! This crate keeps them in step by routing every mutation through a
//! [`Transaction`].

pub mod editor;
pub mod error;
pub mod fs;
pub mod transaction;
pub mod ui;

/// Core result type used throughout the runs tool.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type that encompasses all runs operations.
pub use error::Error;

/// Interactive editor integration for descriptions.
pub use editor::{description_header, Editor, EditorError, ExternalEditor, EDITOR_HINT};

/// Per-run directory trees.
pub use fs::RunDirs;

/// Batched, validated mutations.
pub use transaction::{DescriptionChange, Env, MoveItem, Signal, Transaction};

/// Terminal output and prompts.
pub use ui::Ui;
