//! Validation errors raised before any mutation is applied.

/// Error type for model-level validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Colliding moves: {sources} would all be moved to '{destination}'")]
    CollidingMoves {
        destination: String,
        sources: String,
    },

    #[error("Cannot move '{run}' into its own subtree at '{destination}'")]
    MoveIntoSelf { run: String, destination: String },

    #[error("Commands do not share a stem: '{first}' vs '{other}'")]
    HeterogeneousStems { first: String, other: String },

    #[error("Invalid spec: {0}")]
    InvalidSpec(String),

    #[error("No patterns given for {0}")]
    EmptyQuery(String),

    #[error("Expected {expected} {what}, got {actual}")]
    MismatchedArguments {
        what: String,
        expected: String,
        actual: usize,
    },
}

impl ValidationError {
    /// Create a new invalid-path error.
    pub fn invalid_path<P: Into<String>, R: Into<String>>(path: P, reason: R) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new invalid-spec error.
    pub fn invalid_spec<S: Into<String>>(message: S) -> Self {
        Self::InvalidSpec(message.into())
    }
}
