use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VcsError {
    #[error("Repository not found from path: {0}")]
    RepositoryNotFound(String),

    #[error("Command execution failed: {command} (exit code: {exit_code})")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("Command timed out after {timeout:?}: {command}")]
    Timeout { command: String, timeout: Duration },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("UTF-8 encoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub type VcsResult<T> = Result<T, VcsError>;
