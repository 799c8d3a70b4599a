use tracing::info;

use runs_local_db::Database;
use runs_model::RunPath;
use runs_mux_core::SessionName;

use super::queue::{Keyed, Queue};
use super::{Env, SubTransaction};
use crate::Result;

impl Keyed for RunPath {
    fn key(&self) -> &str {
        self.as_str()
    }
}

/// Runs to delete together with their sessions and directories.
#[derive(Debug, Default)]
pub struct Removals {
    pub(super) queue: Queue<RunPath>,
}

impl Removals {
    /// Runs nested below `path` that are not being removed with it.
    fn staying_below(&self, db: &Database, path: &RunPath) -> Result<Vec<RunPath>> {
        Ok(db
            .descendants(&[path.as_str()], &[] as &[&str])?
            .into_iter()
            .map(|entry| entry.path)
            .filter(|nested| nested != path && !self.queue.contains_key(nested.as_str()))
            .collect())
    }
}

impl SubTransaction for Removals {
    fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn sort(&mut self) {
        self.queue.sort();
    }

    fn validate(&mut self, _db: &Database, env: &mut Env) -> Result<()> {
        env.ui
            .confirm_list("Runs to be removed:", self.queue.iter(), "Remove these runs?")
    }

    fn process(&mut self, db: &Database, env: &mut Env) -> Result<()> {
        for path in self.queue.iter() {
            env.supervisor.kill(&SessionName::for_path(path.as_str()))?;
            let staying = self.staying_below(db, path)?;
            env.dirs.rmdirs(path, &staying)?;
            db.delete(&[path.as_str()])?;
            info!(path = %path, "Removed run");
        }
        Ok(())
    }
}
