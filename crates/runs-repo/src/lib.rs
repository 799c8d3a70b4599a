//! Source-control probes used when recording a run.
//!
//! A run records the commit it was launched from; launching from a dirty
//! working tree asks for confirmation first.

pub mod error;
pub mod repo;

pub mod test_helpers;

pub use error::{VcsError, VcsResult};
pub use repo::{SourceControl, VcsRepo, PROBE_TIMEOUT};
