//! Wiring between the parsed command line, the config file and the core.

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use std::cell::OnceCell;
use std::path::PathBuf;

use runs_core::{Env, ExternalEditor, RunDirs, Transaction, Ui};
use runs_local_db::Database;
use runs_model::{RunEntry, ValidationError, ROOT};
use runs_mux::TmuxSupervisor;
use runs_repo::{SourceControl, VcsRepo, VcsResult};

use crate::config::Config;
use crate::GlobalArgs;

/// Everything a subcommand needs, resolved once per invocation.
pub struct App {
    pub config: Config,
    quiet: bool,
    assume_yes: bool,
    /// Timestamp given to every run created by this invocation.
    now: String,
}

impl App {
    pub fn from_args(global: &GlobalArgs) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to read the current directory")?;
        let mut config = Config::load_or_init(&cwd)?;
        config.apply_overrides(
            global.root.clone(),
            global.db_path.clone(),
            global.dir_names.clone(),
        )?;
        Ok(Self::new(config, global.quiet, global.assume_yes))
    }

    pub fn new(config: Config, quiet: bool, assume_yes: bool) -> Self {
        Self {
            config,
            quiet,
            assume_yes,
            now: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    pub fn now(&self) -> &str {
        &self.now
    }

    pub fn open_db(&self) -> Result<Database> {
        let db = Database::open(&self.config.db_path).with_context(|| {
            format!("Failed to open run database {}", self.config.db_path.display())
        })?;
        Ok(db.with_sort(self.config.sort))
    }

    pub fn ui(&self) -> Ui {
        Ui::new(self.quiet, self.assume_yes)
    }

    pub fn env(&self) -> Env {
        Env {
            ui: self.ui(),
            dirs: RunDirs::new(&self.config.root, self.config.dir_names.clone()),
            supervisor: Box::new(TmuxSupervisor::new()),
            repo: Box::new(LazyRepo::new(self.config.dir.clone())),
            editor: Box::new(ExternalEditor),
            session_cwd: Some(self.config.dir.clone()),
        }
    }

    pub fn transaction(&self) -> Result<Transaction> {
        Ok(Transaction::open(self.open_db()?, self.env()))
    }
}

/// Runs matching any of `patterns` (and everything below them), minus `unless`.
///
/// With no patterns, every run is returned.
pub fn query(db: &Database, patterns: &[String], unless: &[String]) -> Result<Vec<RunEntry>> {
    let entries = if patterns.is_empty() {
        db.descendants(&[ROOT], unless)?
    } else {
        db.descendants(patterns, unless)?
    };
    Ok(entries)
}

/// Like [`query`], but an empty pattern list or an empty result is an error.
pub fn query_required(
    db: &Database,
    command: &str,
    patterns: &[String],
    unless: &[String],
) -> Result<Vec<RunEntry>> {
    if patterns.is_empty() {
        return Err(ValidationError::EmptyQuery(command.to_string()).into());
    }
    let entries = query(db, patterns, unless)?;
    if entries.is_empty() {
        return Err(runs_local_db::Error::NotFound(patterns.join(" ")).into());
    }
    Ok(entries)
}

/// Opens the git repository on first use, so commands that never ask for
/// the commit work outside a repository.
struct LazyRepo {
    dir: PathBuf,
    repo: OnceCell<VcsRepo>,
}

impl LazyRepo {
    fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            repo: OnceCell::new(),
        }
    }

    fn repo(&self) -> VcsResult<&VcsRepo> {
        if let Some(repo) = self.repo.get() {
            return Ok(repo);
        }
        let repo = VcsRepo::new(&self.dir)?;
        Ok(self.repo.get_or_init(|| repo))
    }
}

impl SourceControl for LazyRepo {
    fn last_commit(&self) -> VcsResult<String> {
        self.repo()?.last_commit()
    }

    fn is_dirty(&self) -> VcsResult<bool> {
        self.repo()?.is_dirty()
    }

    fn last_commit_message(&self) -> VcsResult<String> {
        self.repo()?.last_commit_message()
    }
}
