//! Detached-session supervisor trait and shared types
//!
//! Every run executes inside a named, detached terminal session. This crate
//! defines the interface a session backend must provide, without any
//! knowledge of the run database.

use std::fmt;
use std::path::Path;

/// Session name derived from a run path.
///
/// Session backends reserve `.` and `:` in target names, so they are
/// replaced by `,` and `;` respectively.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionName(String);

impl SessionName {
    pub fn for_path(path: &str) -> Self {
        Self(path.replace('.', ",").replace(':', ";"))
    }

    /// Wrap a name reported by the backend as-is.
    pub fn from_raw<S: Into<String>>(name: S) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug)]
pub struct SessionOptions<'a> {
    /// Title of the session's single window.
    pub window_title: &'a str,
    /// Shell command the window runs.
    pub command: &'a str,
    pub cwd: Option<&'a Path>,
}

#[derive(thiserror::Error, Debug)]
pub enum MuxError {
    #[error("session supervisor not available: {0}")]
    NotAvailable(&'static str),
    #[error("session not found: {0}")]
    NotFound(String),
    #[error("command failed: {0}")]
    CommandFailed(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Lifecycle of named detached sessions.
///
/// `kill`, `rename` and `interrupt` treat a missing session as success: the
/// command it ran may simply have finished.
pub trait SessionSupervisor {
    /// Implementation identifier (e.g., "tmux").
    fn id(&self) -> &'static str;

    /// Check whether the implementation is available and usable on this system.
    fn is_available(&self) -> bool;

    /// Replace any session called `name` with a fresh one running `opts.command`.
    fn new_session(&self, name: &SessionName, opts: &SessionOptions) -> Result<(), MuxError>;

    fn kill(&self, name: &SessionName) -> Result<(), MuxError>;

    fn rename(&self, from: &SessionName, to: &SessionName) -> Result<(), MuxError>;

    /// Send an interrupt (Ctrl-C) to the session's foreground process.
    fn interrupt(&self, name: &SessionName) -> Result<(), MuxError>;

    /// Names of all live sessions.
    fn list(&self) -> Result<Vec<SessionName>, MuxError>;

    fn is_active(&self, name: &SessionName) -> Result<bool, MuxError> {
        Ok(self.list()?.contains(name))
    }
}
