use tracing::info;

use runs_local_db::Database;
use runs_model::RunEntry;
use runs_mux_core::{SessionName, SessionOptions};

use super::queue::{Keyed, Queue};
use super::{Env, SubTransaction};
use crate::Result;

impl Keyed for RunEntry {
    fn key(&self) -> &str {
        self.path.as_str()
    }
}

/// Runs to create: directories, then a session, then the database row.
#[derive(Debug, Default)]
pub struct NewRuns {
    pub(super) queue: Queue<RunEntry>,
}

impl SubTransaction for NewRuns {
    fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn sort(&mut self) {
        self.queue.sort();
    }

    fn validate(&mut self, _db: &Database, env: &mut Env) -> Result<()> {
        if env.repo.is_dirty()? {
            env.ui.confirm("Repo is dirty. Run anyway?")?;
        }
        if self.queue.len() > 1 {
            let planned = self
                .queue
                .iter()
                .map(|entry| format!("{}: {}", entry.path, entry.command));
            env.ui.confirm_list("Runs to be created:", planned, "Create these runs?")?;
        }
        Ok(())
    }

    fn process(&mut self, db: &Database, env: &mut Env) -> Result<()> {
        for entry in self.queue.iter() {
            env.dirs.mkdirs(&entry.path)?;
            env.supervisor.new_session(
                &SessionName::for_path(entry.path.as_str()),
                &SessionOptions {
                    window_title: entry.path.name(),
                    command: &entry.command,
                    cwd: env.session_cwd.as_deref(),
                },
            )?;
            db.append(entry)?;
            info!(path = %entry.path, "Created run");
            env.ui.print(format!("Created {}", entry.path))?;
        }
        Ok(())
    }
}
