use std::collections::BTreeMap;
use tracing::info;

use runs_local_db::Database;
use runs_model::{Field, RunPath, ValidationError};
use runs_mux_core::SessionName;

use super::queue::{Keyed, Queue};
use super::{Env, SubTransaction};
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveItem {
    pub src: RunPath,
    pub dest: RunPath,
    /// Kill the run's session instead of renaming it.
    pub kill_session: bool,
}

impl Keyed for MoveItem {
    fn key(&self) -> &str {
        self.src.as_str()
    }
}

#[derive(Debug, Default)]
pub struct Moves {
    pub(super) queue: Queue<MoveItem>,
}

impl Moves {
    fn check_collisions(&self) -> Result<()> {
        let mut by_dest: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for item in self.queue.iter() {
            by_dest.entry(item.dest.as_str()).or_default().push(item.src.as_str());
        }
        if let Some((dest, sources)) = by_dest.into_iter().find(|(_, s)| s.len() > 1) {
            return Err(ValidationError::CollidingMoves {
                destination: dest.to_string(),
                sources: sources.join(", "),
            }
            .into());
        }
        Ok(())
    }

    fn check_into_self(&self) -> Result<()> {
        match self.queue.iter().find(|item| item.dest.is_descendant_of(&item.src)) {
            Some(item) => Err(ValidationError::MoveIntoSelf {
                run: item.src.to_string(),
                destination: item.dest.to_string(),
            }
            .into()),
            None => Ok(()),
        }
    }

    /// Runs nested below `item.src` whose directories do not travel with it.
    fn staying_below(&self, db: &Database, item: &MoveItem) -> Result<Vec<RunPath>> {
        let mut staying = Vec::new();
        for entry in db.descendants(&[item.src.as_str()], &[] as &[&str])? {
            let rest = match entry.path.relative_to(&item.src) {
                Some(rest) if !rest.is_empty() => rest,
                _ => continue,
            };
            let carried = item.dest.join(rest)?;
            let travels = self
                .queue
                .iter()
                .any(|other| other.src == entry.path && other.dest == carried);
            if !travels {
                staying.push(entry.path);
            }
        }
        Ok(staying)
    }
}

impl SubTransaction for Moves {
    fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn sort(&mut self) {
        self.queue.sort();
    }

    fn validate(&mut self, _db: &Database, env: &mut Env) -> Result<()> {
        self.check_collisions()?;
        self.check_into_self()?;

        let (killed, renamed): (Vec<&MoveItem>, Vec<&MoveItem>) = self
            .queue
            .iter()
            .filter(|item| item.src != item.dest)
            .partition(|item| item.kill_session);
        if killed.is_empty() && renamed.is_empty() {
            return Ok(());
        }
        let describe = |items: Vec<&MoveItem>| -> Vec<String> {
            items
                .iter()
                .map(|item| format!("{} -> {}", item.src, item.dest))
                .collect()
        };

        env.ui.confirm_sections(
            &[
                ("Moving runs and killing their sessions:".to_string(), describe(killed)),
                ("Moving runs and renaming their sessions:".to_string(), describe(renamed)),
            ],
            "Move these runs?",
        )
    }

    fn process(&mut self, db: &Database, env: &mut Env) -> Result<()> {
        for item in self.queue.iter().filter(|item| item.src != item.dest) {
            let staying = self.staying_below(db, item)?;
            env.dirs.mvdirs(&item.src, &item.dest, &staying)?;

            let session = SessionName::for_path(item.src.as_str());
            if item.kill_session {
                env.supervisor.kill(&session)?;
            } else {
                env.supervisor
                    .rename(&session, &SessionName::for_path(item.dest.as_str()))?;
            }

            db.update(&[item.src.as_str()], &[(Field::Path, item.dest.as_str())])?;
            info!(from = %item.src, to = %item.dest, "Moved run");
        }
        Ok(())
    }
}
