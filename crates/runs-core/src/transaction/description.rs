use tracing::info;

use runs_local_db::Database;
use runs_model::{Field, RunPath};

use super::queue::{Keyed, Queue};
use super::{Env, SubTransaction};
use crate::editor::{description_header, EditorError};
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionChange {
    pub path: RunPath,
    pub command: String,
    pub old: String,
    /// `None` until the user has written it in the editor.
    pub new: Option<String>,
}

impl Keyed for DescriptionChange {
    fn key(&self) -> &str {
        self.path.as_str()
    }
}

#[derive(Debug, Default)]
pub struct DescriptionChanges {
    pub(super) queue: Queue<DescriptionChange>,
}

impl SubTransaction for DescriptionChanges {
    fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn sort(&mut self) {
        self.queue.sort();
    }

    /// Ask the editor for every description that was not given up front.
    fn validate(&mut self, _db: &Database, env: &mut Env) -> Result<()> {
        let missing: Vec<usize> = self
            .queue
            .iter()
            .enumerate()
            .filter(|(_, change)| change.new.is_none())
            .map(|(i, _)| i)
            .collect();

        for (i, change) in self.queue.iter_mut().enumerate() {
            if !missing.contains(&i) {
                continue;
            }
            let header = description_header(change.path.as_str(), &change.command);
            let edited = env.editor.edit(&header, &change.old).map_err(|e| match e {
                EditorError::EmptyDescription => {
                    Error::UserCancelled(format!("empty description for {}", change.path))
                }
                other => other.into(),
            })?;
            change.new = Some(edited);
        }
        Ok(())
    }

    fn process(&mut self, db: &Database, env: &mut Env) -> Result<()> {
        for change in self.queue.iter() {
            let Some(new) = change.new.as_deref() else {
                continue;
            };
            db.update(&[change.path.as_str()], &[(Field::Description, new)])?;
            info!(path = %change.path, "Changed description");
            env.ui.print(format!("Updated description of {}", change.path))?;
        }
        Ok(())
    }
}
