//! Commands that change existing runs.

use anyhow::Result;
use clap::Args;
use std::collections::BTreeSet;
use tracing::debug;

use runs_local_db::Database;
use runs_model::path::{descendant_patterns, is_glob, normalize_pattern, pattern_regex};
use runs_model::{RunPath, ValidationError};
use runs_mux_core::SessionName;

use crate::app::{query, query_required, App};
use crate::new::resolve_description;

/// Arguments for removing runs
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Runs to remove; `%` matches any substring
    #[arg(value_name = "PATTERN", required = true)]
    pub patterns: Vec<String>,

    /// Keep runs matching this pattern
    #[arg(long = "unless", value_name = "PATTERN")]
    pub unless: Vec<String>,
}

impl RmArgs {
    pub fn run(self, app: &App) -> Result<()> {
        let mut tx = app.transaction()?;
        for entry in query_required(tx.db(), "rm", &self.patterns, &self.unless)? {
            tx.remove(entry.path);
        }
        tx.commit()?;
        Ok(())
    }
}

/// Arguments for moving runs
#[derive(Args, Debug)]
pub struct MvArgs {
    /// Runs to move followed by the destination
    #[arg(value_name = "PATH", num_args = 2.., required = true)]
    pub paths: Vec<String>,

    /// Leave runs matching this pattern in place
    #[arg(long = "unless", value_name = "PATTERN")]
    pub unless: Vec<String>,

    /// Kill the sessions of moved runs instead of renaming them
    #[arg(long = "kill-tmux")]
    pub kill_tmux: bool,
}

impl MvArgs {
    pub fn run(self, app: &App) -> Result<()> {
        let Some((destination, sources)) = self.paths.split_last() else {
            return Err(ValidationError::EmptyQuery("mv".to_string()).into());
        };

        let mut tx = app.transaction()?;
        let moves = plan_moves(tx.db(), sources, destination, &self.unless)?;
        let moving: BTreeSet<&str> = moves.iter().map(|(src, _)| src.as_str()).collect();

        let mut occupied = Vec::new();
        for (_, dest) in &moves {
            if !moving.contains(dest.as_str()) && tx.db().contains(&[dest.as_str()])? {
                occupied.push(dest.clone());
            }
        }

        for dest in occupied {
            debug!(path = %dest, "Destination occupied; removing");
            tx.remove(dest);
        }
        for (src, dest) in moves {
            tx.move_run(src, dest, self.kill_tmux);
        }
        tx.commit()?;
        Ok(())
    }
}

/// Work out where every run matched by `sources` goes.
///
/// Runs are moved *into* `destination` when there are several sources, a
/// source is a glob, `destination` ends with `/`, or runs already live below
/// `destination`. Otherwise the single source is renamed to `destination`.
pub fn plan_moves(
    db: &Database,
    sources: &[String],
    destination: &str,
    unless: &[String],
) -> Result<Vec<(RunPath, RunPath)>> {
    if sources.is_empty() {
        return Err(ValidationError::EmptyQuery("mv".to_string()).into());
    }

    let dest_root = RunPath::new(normalize_pattern(destination))?;
    let [_, below_dest] = descendant_patterns(dest_root.as_str());
    let into = dest_root.is_root()
        || sources.len() > 1
        || sources.iter().any(|s| is_glob(s))
        || destination.ends_with('/')
        || db.contains(&[below_dest])?;

    let mut moves = Vec::new();
    for source in sources {
        let pattern = normalize_pattern(source);
        let entries = query_required(db, "mv", std::slice::from_ref(source), unless)?;
        for entry in entries {
            let dest = if into {
                let base = matched_base(&pattern, &entry.path).parent();
                let kept = entry.path.relative_to(&base).unwrap_or(entry.path.as_str());
                dest_root.join(kept)?
            } else {
                match entry.path.relative_to(&RunPath::new(&pattern)?) {
                    Some(rest) if !rest.is_empty() => dest_root.join(rest)?,
                    _ => dest_root.clone(),
                }
            };
            moves.push((entry.path, dest));
        }
    }
    Ok(moves)
}

/// The shortest ancestor-or-self of `path` that `pattern` matches.
fn matched_base(pattern: &str, path: &RunPath) -> RunPath {
    let Ok(re) = pattern_regex(pattern) else {
        return path.clone();
    };
    let segments: Vec<&str> = path.segments().collect();
    (1..=segments.len())
        .map(|n| segments[..n].join("/"))
        .find(|prefix| re.is_match(prefix))
        .and_then(|prefix| RunPath::new(prefix).ok())
        .unwrap_or_else(|| path.clone())
}

/// Arguments for killing sessions
#[derive(Args, Debug)]
pub struct KillArgs {
    /// Runs whose sessions to kill
    #[arg(value_name = "PATTERN")]
    pub patterns: Vec<String>,

    /// Only runs whose session is alive; without patterns, all of them
    #[arg(long = "active")]
    pub active: bool,

    /// Spare runs matching this pattern
    #[arg(long = "unless", value_name = "PATTERN")]
    pub unless: Vec<String>,
}

impl KillArgs {
    pub fn run(self, app: &App) -> Result<()> {
        if self.patterns.is_empty() && !self.active {
            return Err(ValidationError::EmptyQuery("kill".to_string()).into());
        }

        let mut tx = app.transaction()?;
        let mut entries = query(tx.db(), &self.patterns, &self.unless)?;
        if self.active {
            let live: BTreeSet<SessionName> = tx.env().supervisor.list()?.into_iter().collect();
            entries.retain(|entry| live.contains(&SessionName::for_path(entry.path.as_str())));
        }
        if entries.is_empty() {
            tx.ui().print("No sessions to kill")?;
            return Ok(());
        }

        for entry in entries {
            tx.kill(entry.path);
        }
        tx.commit()?;
        Ok(())
    }
}

/// Arguments for interrupting sessions
#[derive(Args, Debug)]
pub struct InterruptArgs {
    /// Runs whose sessions receive Ctrl-C
    #[arg(value_name = "PATTERN", required = true)]
    pub patterns: Vec<String>,

    /// Spare runs matching this pattern
    #[arg(long = "unless", value_name = "PATTERN")]
    pub unless: Vec<String>,
}

impl InterruptArgs {
    pub fn run(self, app: &App) -> Result<()> {
        let mut tx = app.transaction()?;
        for entry in query_required(tx.db(), "interrupt", &self.patterns, &self.unless)? {
            tx.interrupt(entry.path);
        }
        tx.commit()?;
        Ok(())
    }
}

/// Arguments for changing run descriptions
#[derive(Args, Debug)]
pub struct ChangeDescriptionArgs {
    /// Runs to describe
    #[arg(value_name = "PATTERN")]
    pub pattern: String,

    /// New description; opens the editor when omitted
    #[arg(value_name = "DESCRIPTION")]
    pub description: Option<String>,
}

impl ChangeDescriptionArgs {
    pub fn run(self, app: &App) -> Result<()> {
        let mut tx = app.transaction()?;
        let entries = query_required(
            tx.db(),
            "change-description",
            std::slice::from_ref(&self.pattern),
            &[],
        )?;
        let new = self
            .description
            .as_deref()
            .map(|d| resolve_description(&tx, d))
            .transpose()?;

        for entry in entries {
            tx.change_description(entry.path, entry.command, entry.description, new.clone());
        }
        tx.commit()?;
        Ok(())
    }
}
