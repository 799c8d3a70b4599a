//! Tokenized view of a run's shell command.
//!
//! A command string is split on whitespace and its tokens are grouped by
//! whether they start with `-`. Positional groups keep their order; option
//! groups are sets. Consecutive groups are paired as
//! `(positional list, option set)`, so `python train.py --lr=1 --seed=2 eval --quick`
//! becomes:
//!
//! ```text
//! [ (["python", "train.py"], {"--lr=1", "--seed=2"}),
//!   (["eval"],               {"--quick"}) ]
//! ```

use std::collections::BTreeSet;
use std::fmt;

/// Default delimiter between an option's key and its value.
pub const DEFAULT_DELIMITER: char = '=';

/// One positional run followed by the options that come after it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ArgGroup {
    pub positional: Vec<String>,
    pub options: BTreeSet<String>,
}

/// A command split into alternating positional and option groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Command {
    groups: Vec<ArgGroup>,
}

/// Classification of an option token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arg<'a> {
    /// `key<delimiter>value`, split on the first delimiter.
    KeyValue { key: &'a str, value: &'a str },
    /// A bare flag such as `--verbose`.
    Flag(&'a str),
}

impl<'a> Arg<'a> {
    pub fn parse(token: &'a str, delimiter: char) -> Self {
        match token.split_once(delimiter) {
            Some((key, value)) => Arg::KeyValue { key, value },
            None => Arg::Flag(token),
        }
    }
}

/// How a token differs between two commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Change {
    Unchanged,
    Added,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffToken {
    pub change: Change,
    pub token: String,
}

impl DiffToken {
    fn new(change: Change, token: &str) -> Self {
        Self {
            change,
            token: token.to_string(),
        }
    }
}

fn is_option(token: &str) -> bool {
    token.starts_with('-')
}

impl Command {
    /// Tokenize and group a command string.
    pub fn parse(command: &str) -> Self {
        let mut groups: Vec<ArgGroup> = Vec::new();
        let mut current = ArgGroup::default();

        for token in command.split_whitespace() {
            if is_option(token) {
                current.options.insert(token.to_string());
            } else {
                if !current.options.is_empty() {
                    groups.push(std::mem::take(&mut current));
                }
                current.positional.push(token.to_string());
            }
        }

        if !current.positional.is_empty() || !current.options.is_empty() {
            groups.push(current);
        }

        Self { groups }
    }

    pub fn groups(&self) -> &[ArgGroup] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// All positional tokens, in order.
    pub fn positional(&self) -> impl Iterator<Item = &str> {
        self.groups
            .iter()
            .flat_map(|group| group.positional.iter().map(String::as_str))
    }

    /// All option tokens across every group.
    pub fn options(&self) -> impl Iterator<Item = &str> {
        self.groups
            .iter()
            .flat_map(|group| group.options.iter().map(String::as_str))
    }

    /// The positional tokens joined by single spaces.
    pub fn stem(&self) -> String {
        self.positional().collect::<Vec<_>>().join(" ")
    }

    /// `key<delimiter>value` options, in group order.
    pub fn key_values(&self, delimiter: char) -> Vec<(&str, &str)> {
        self.options()
            .filter_map(|token| match Arg::parse(token, delimiter) {
                Arg::KeyValue { key, value } => Some((key, value)),
                Arg::Flag(_) => None,
            })
            .collect()
    }

    /// Bare flags (options without a delimiter).
    pub fn flags(&self, delimiter: char) -> BTreeSet<&str> {
        self.options()
            .filter(|token| matches!(Arg::parse(token, delimiter), Arg::Flag(_)))
            .collect()
    }

    /// Compare against `other`, reporting tokens of `self` as `Added` and
    /// tokens only in `other` as `Deleted`.
    pub fn diff(&self, other: &Command) -> Vec<DiffToken> {
        let mut out = Vec::new();
        let empty = ArgGroup::default();
        let pairs = self.groups.len().max(other.groups.len());

        for i in 0..pairs {
            let left = self.groups.get(i).unwrap_or(&empty);
            let right = other.groups.get(i).unwrap_or(&empty);

            let width = left.positional.len().max(right.positional.len());
            for j in 0..width {
                match (left.positional.get(j), right.positional.get(j)) {
                    (Some(a), Some(b)) if a == b => out.push(DiffToken::new(Change::Unchanged, a)),
                    (a, b) => {
                        if let Some(a) = a {
                            out.push(DiffToken::new(Change::Added, a));
                        }
                        if let Some(b) = b {
                            out.push(DiffToken::new(Change::Deleted, b));
                        }
                    }
                }
            }

            out.extend(
                left.options
                    .intersection(&right.options)
                    .map(|t| DiffToken::new(Change::Unchanged, t)),
            );
            out.extend(
                left.options
                    .difference(&right.options)
                    .map(|t| DiffToken::new(Change::Added, t)),
            );
            out.extend(
                right
                    .options
                    .difference(&left.options)
                    .map(|t| DiffToken::new(Change::Deleted, t)),
            );
        }

        out
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tokens: Vec<&str> = self
            .groups
            .iter()
            .flat_map(|g| {
                g.positional
                    .iter()
                    .chain(g.options.iter())
                    .map(String::as_str)
            })
            .collect();
        f.write_str(&tokens.join(" "))
    }
}

/// Remove a configured prefix (e.g. `nice python`) from a stored command.
pub fn strip_prefix<'a>(command: &'a str, prefix: &str) -> &'a str {
    let prefix = prefix.trim();
    if prefix.is_empty() {
        return command.trim();
    }
    match command.trim().strip_prefix(prefix) {
        Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => rest.trim(),
        _ => command.trim(),
    }
}
