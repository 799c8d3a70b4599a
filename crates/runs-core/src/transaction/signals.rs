use tracing::info;

use runs_local_db::Database;
use runs_model::RunPath;
use runs_mux_core::SessionName;

use super::queue::Queue;
use super::{Env, SubTransaction};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Kill,
    Interrupt,
}

/// Sessions to kill or interrupt. The database and directories are untouched.
#[derive(Debug)]
pub struct Signals {
    signal: Signal,
    pub(super) queue: Queue<RunPath>,
}

impl Signals {
    pub fn new(signal: Signal) -> Self {
        Self {
            signal,
            queue: Queue::default(),
        }
    }
}

impl SubTransaction for Signals {
    fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn sort(&mut self) {
        self.queue.sort();
    }

    fn validate(&mut self, _db: &Database, env: &mut Env) -> Result<()> {
        let (heading, question) = match self.signal {
            Signal::Kill => ("Sessions to be killed:", "Kill these sessions?"),
            Signal::Interrupt => ("Sessions to be interrupted:", "Interrupt these sessions?"),
        };
        env.ui.confirm_list(heading, self.queue.iter(), question)
    }

    fn process(&mut self, _db: &Database, env: &mut Env) -> Result<()> {
        for path in self.queue.iter() {
            let session = SessionName::for_path(path.as_str());
            match self.signal {
                Signal::Kill => env.supervisor.kill(&session)?,
                Signal::Interrupt => env.supervisor.interrupt(&session)?,
            }
            info!(path = %path, signal = ?self.signal, "Signalled session");
        }
        Ok(())
    }
}
