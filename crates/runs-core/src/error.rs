//! Core error types for the runs tool.

use std::path::PathBuf;

use crate::editor::EditorError;

/// Core error type for every transaction and collaborator failure.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Database(#[from] runs_local_db::Error),

    #[error(transparent)]
    Validation(#[from] runs_model::ValidationError),

    #[error("Source control error: {0}")]
    Vcs(#[from] runs_repo::VcsError),

    #[error("Session error: {0}")]
    Session(#[from] runs_mux_core::MuxError),

    #[error("Editor error: {0}")]
    Editor(#[from] EditorError),

    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The user declined a confirmation prompt.
    #[error("Cancelled: {0}")]
    UserCancelled(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn filesystem<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::UserCancelled(_))
    }
}
