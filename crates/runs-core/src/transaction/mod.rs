//! Batched mutations over the run database, the directory trees and the
//! session set.
//!
//! Callers enqueue intents on a [`Transaction`] and then [`Transaction::commit`]
//! it. Commit sorts every queue naturally, validates every non-empty queue
//! (which may prompt the user), and only then applies them in a fixed order:
//!
//! 1. description changes
//! 2. interrupts, then kills
//! 3. removals
//! 4. moves
//! 5. new runs
//!
//! Removals and moves run before new runs so that a path vacated in the same
//! transaction can be reused. A transaction dropped without committing
//! changes nothing.

mod description;
mod moves;
mod new_run;
mod queue;
mod removal;
mod signals;

use std::path::PathBuf;
use tracing::{debug, warn};

use runs_local_db::Database;
use runs_model::{RunEntry, RunPath};
use runs_mux_core::SessionSupervisor;
use runs_repo::SourceControl;

use crate::editor::Editor;
use crate::fs::RunDirs;
use crate::ui::Ui;
use crate::Result;

pub use description::DescriptionChange;
pub use moves::MoveItem;
pub use signals::Signal;

use description::DescriptionChanges;
use moves::Moves;
use new_run::NewRuns;
use removal::Removals;
use signals::Signals;

/// The collaborators a transaction acts through.
pub struct Env {
    pub ui: Ui,
    pub dirs: RunDirs,
    pub supervisor: Box<dyn SessionSupervisor>,
    pub repo: Box<dyn SourceControl>,
    pub editor: Box<dyn Editor>,
    /// Working directory of newly started sessions.
    pub session_cwd: Option<PathBuf>,
}

/// One kind of queued mutation.
trait SubTransaction {
    fn is_empty(&self) -> bool;

    fn sort(&mut self);

    /// Check the queue and ask for confirmation. Must not mutate anything.
    fn validate(&mut self, db: &Database, env: &mut Env) -> Result<()>;

    fn process(&mut self, db: &Database, env: &mut Env) -> Result<()>;
}

pub struct Transaction {
    db: Database,
    env: Env,
    descriptions: DescriptionChanges,
    interrupts: Signals,
    kills: Signals,
    removals: Removals,
    moves: Moves,
    new_runs: NewRuns,
}

impl Transaction {
    pub fn open(db: Database, env: Env) -> Self {
        Self {
            db,
            env,
            descriptions: DescriptionChanges::default(),
            interrupts: Signals::new(Signal::Interrupt),
            kills: Signals::new(Signal::Kill),
            removals: Removals::default(),
            moves: Moves::default(),
            new_runs: NewRuns::default(),
        }
    }

    /// The database as it stands before any queued change is applied.
    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn ui(&mut self) -> &mut Ui {
        &mut self.env.ui
    }

    /// Queue a new run. A run already stored at the same path is queued for removal.
    pub fn add_run(&mut self, entry: RunEntry) -> Result<()> {
        let occupied = self.db.contains(&[entry.path.as_str()])?;
        if occupied && !self.moves.queue.contains_key(entry.path.as_str()) {
            debug!(path = %entry.path, "Replacing existing run");
            self.removals.queue.push(entry.path.clone());
        }
        self.new_runs.queue.push(entry);
        Ok(())
    }

    pub fn move_run(&mut self, src: RunPath, dest: RunPath, kill_session: bool) {
        self.moves.queue.push(MoveItem {
            src,
            dest,
            kill_session,
        });
    }

    pub fn remove(&mut self, path: RunPath) {
        self.removals.queue.push(path);
    }

    pub fn kill(&mut self, path: RunPath) {
        self.kills.queue.push(path);
    }

    pub fn interrupt(&mut self, path: RunPath) {
        self.interrupts.queue.push(path);
    }

    /// Queue a description change; `new: None` asks the editor during validation.
    pub fn change_description(
        &mut self,
        path: RunPath,
        command: String,
        old: String,
        new: Option<String>,
    ) {
        self.descriptions.queue.push(DescriptionChange {
            path,
            command,
            old,
            new,
        });
    }

    /// Validate and apply everything queued, then make the database durable.
    ///
    /// A validation failure (including a declined prompt) changes nothing.
    /// A failure while applying stops at the failing item; the stages already
    /// applied cannot be undone, so the database is committed to match them
    /// before the error is returned.
    pub fn commit(self) -> Result<()> {
        let Transaction {
            db,
            mut env,
            mut descriptions,
            mut interrupts,
            mut kills,
            mut removals,
            mut moves,
            mut new_runs,
        } = self;

        let mut stages: [&mut dyn SubTransaction; 6] = [
            &mut descriptions,
            &mut interrupts,
            &mut kills,
            &mut removals,
            &mut moves,
            &mut new_runs,
        ];

        for stage in stages.iter_mut() {
            stage.sort();
        }
        for stage in stages.iter_mut().filter(|s| !s.is_empty()) {
            stage.validate(&db, &mut env)?;
        }

        let mut outcome = Ok(());
        for stage in stages.iter_mut().filter(|s| !s.is_empty()) {
            outcome = stage.process(&db, &mut env);
            if outcome.is_err() {
                break;
            }
        }

        if let Err(e) = &outcome {
            warn!(error = %e, "Transaction failed part-way; keeping applied changes");
        }
        db.commit()?;
        outcome
    }
}
