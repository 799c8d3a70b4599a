//! Data model for the runs experiment tracker.
//!
//! This crate holds the types shared by every other runs crate: hierarchical
//! run paths and the glob patterns that query them, the persisted run entry,
//! the tokenized view of a run's shell command, and the cross-product specs
//! that `to-json` / `from-json` exchange. Nothing here performs I/O.

pub mod command;
pub mod correlation;
pub mod cross;
pub mod entry;
pub mod error;
pub mod natural;
pub mod path;

pub use command::{Arg, ArgGroup, Change, Command, DiffToken, DEFAULT_DELIMITER};
pub use cross::{parse_specs, CrossSpec};
pub use entry::{Field, RunEntry};
pub use error::ValidationError;
pub use natural::{natural_cmp, natural_sort_by_key};
pub use path::{RunPath, ROOT};

/// Result type for model validation.
pub type Result<T> = std::result::Result<T, ValidationError>;
