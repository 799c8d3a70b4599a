//! Slash-delimited hierarchical run identifiers and the patterns that query them.
//!
//! A [`RunPath`] is a concrete, normalized run identifier such as `sweep/lr/3`.
//! Queries use plain strings in which `%` matches any substring (including
//! `/`); every other character, `/` included, is literal.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Representation of the empty (root) path.
pub const ROOT: &str = ".";

/// Wildcard character accepted in query patterns.
pub const WILDCARD: char = '%';

/// A normalized, slash-delimited run identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RunPath(String);

impl RunPath {
    /// Parse and normalize a run path.
    ///
    /// Leading, trailing and repeated slashes are dropped. An input with no
    /// segments is the root path `.`.
    pub fn new<S: AsRef<str>>(raw: S) -> crate::Result<Self> {
        let raw = raw.as_ref().trim();
        let segments: Vec<&str> = raw.split('/').filter(|s| !s.is_empty()).collect();

        if segments.is_empty() || segments == [ROOT] {
            return Ok(Self::root());
        }

        for segment in &segments {
            if *segment == "." || *segment == ".." {
                return Err(ValidationError::invalid_path(raw, "relative segments are not allowed"));
            }
            if segment.contains(WILDCARD) {
                return Err(ValidationError::invalid_path(
                    raw,
                    "'%' is reserved for query patterns",
                ));
            }
        }

        Ok(Self(segments.join("/")))
    }

    pub fn root() -> Self {
        Self(ROOT.to_string())
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Iterate over the path's segments. The root has none.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        let inner = if self.is_root() { "" } else { self.0.as_str() };
        inner.split('/').filter(|s| !s.is_empty())
    }

    /// The path with its last segment removed; the root is its own parent.
    pub fn parent(&self) -> RunPath {
        match self.0.rfind('/') {
            Some(idx) => Self(self.0[..idx].to_string()),
            None => Self::root(),
        }
    }

    /// The last segment of the path.
    pub fn name(&self) -> &str {
        match self.0.rfind('/') {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }

    /// True if `self` is a strict ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &RunPath) -> bool {
        if self == other {
            return false;
        }
        if self.is_root() {
            return true;
        }
        other
            .0
            .strip_prefix(&self.0)
            .is_some_and(|rest| rest.starts_with('/'))
    }

    /// True if `self` is a strict descendant of `other`.
    pub fn is_descendant_of(&self, other: &RunPath) -> bool {
        other.is_ancestor_of(self)
    }

    /// The part of `self` below `ancestor`, or `None` if `ancestor` is not an
    /// ancestor. A path relative to itself is the empty string.
    pub fn relative_to(&self, ancestor: &RunPath) -> Option<&str> {
        if self == ancestor {
            return Some("");
        }
        if ancestor.is_root() {
            return Some(&self.0);
        }
        self.0
            .strip_prefix(&ancestor.0)
            .and_then(|rest| rest.strip_prefix('/'))
    }

    /// Append a relative sub-path.
    pub fn join<S: AsRef<str>>(&self, rest: S) -> crate::Result<RunPath> {
        let rest = rest.as_ref();
        if self.is_root() {
            return RunPath::new(rest);
        }
        RunPath::new(format!("{}/{}", self.0, rest))
    }

    /// Replace `<path>` and `<name>` tokens in a user-provided flag or arg.
    pub fn substitute(&self, template: &str) -> String {
        template.replace("<path>", &self.0).replace("<name>", self.name())
    }
}

impl fmt::Display for RunPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RunPath {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RunPath {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RunPath> for String {
    fn from(path: RunPath) -> Self {
        path.0
    }
}

impl AsRef<str> for RunPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalize a user query pattern: trim whitespace and surrounding slashes.
pub fn normalize_pattern(pattern: &str) -> String {
    let trimmed = pattern.trim().trim_matches('/');
    if trimmed.is_empty() {
        ROOT.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Expand a pattern into the pair matching the pattern itself and everything below it.
pub fn descendant_patterns(pattern: &str) -> [String; 2] {
    let pattern = normalize_pattern(pattern);
    if pattern == ROOT {
        return [WILDCARD.to_string(), WILDCARD.to_string()];
    }
    let below = format!("{pattern}/{WILDCARD}");
    [pattern, below]
}

/// True if the pattern contains the wildcard.
pub fn is_glob(pattern: &str) -> bool {
    pattern.contains(WILDCARD)
}

/// Compile a pattern into an anchored regex in which `%` matches any substring.
pub fn pattern_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let literal: Vec<String> = pattern.split(WILDCARD).map(regex::escape).collect();
    Regex::new(&format!("(?s)^{}$", literal.join(".*")))
}

/// Match a path against a pattern in which `%` matches any substring.
pub fn matches(pattern: &str, path: &str) -> bool {
    pattern_regex(pattern).is_ok_and(|re| re.is_match(path))
}
