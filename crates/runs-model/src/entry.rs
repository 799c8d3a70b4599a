//! The persisted record of one run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::path::RunPath;

/// Sentinel description replaced by the current commit message.
pub const COMMIT_MESSAGE: &str = "commit-message";

/// One recorded invocation of a training command.
///
/// Entries are never edited in place; a change is a new entry replacing the
/// old one under the same (or a new) path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunEntry {
    pub path: RunPath,
    pub command: String,
    pub commit: String,
    pub datetime: String,
    pub description: String,
}

impl RunEntry {
    pub fn with_path(self, path: RunPath) -> Self {
        Self { path, ..self }
    }

    pub fn with_description<S: Into<String>>(self, description: S) -> Self {
        Self {
            description: description.into(),
            ..self
        }
    }

    /// The value of a single field, rendered as stored.
    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::Path => self.path.as_str(),
            Field::Command => &self.command,
            Field::Commit => &self.commit,
            Field::Datetime => &self.datetime,
            Field::Description => &self.description,
        }
    }
}

/// The columns of a run entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Path,
    Command,
    Commit,
    Datetime,
    Description,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Path,
        Field::Command,
        Field::Commit,
        Field::Datetime,
        Field::Description,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Path => "path",
            Field::Command => "command",
            Field::Commit => "commit",
            Field::Datetime => "datetime",
            Field::Description => "description",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .into_iter()
            .find(|field| field.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| ValidationError::MismatchedArguments {
                what: "field name".to_string(),
                expected: Field::ALL.map(|f| f.as_str()).join("|"),
                actual: 0,
            })
    }
}
