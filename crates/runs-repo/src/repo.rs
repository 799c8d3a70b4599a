use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;
use tracing::debug;
use wait_timeout::ChildExt;

use crate::error::{VcsError, VcsResult};

/// Hard limit on every git probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// What a run needs to know about the working tree it is launched from.
pub trait SourceControl {
    /// Revision identifier of `HEAD`.
    fn last_commit(&self) -> VcsResult<String>;

    /// True if the working tree has uncommitted or untracked changes.
    fn is_dirty(&self) -> VcsResult<bool>;

    /// Full message of the `HEAD` commit, trailing newlines removed.
    fn last_commit_message(&self) -> VcsResult<String>;
}

#[derive(Debug)]
pub struct VcsRepo {
    root: PathBuf,
    timeout: Duration,
}

impl VcsRepo {
    /// Open the git repository containing `path_in_repo`.
    pub fn new<P: AsRef<Path>>(path_in_repo: P) -> VcsResult<Self> {
        let root = Self::find_repo_root(path_in_repo.as_ref())?;
        Ok(Self {
            root,
            timeout: PROBE_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get the repository root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn find_repo_root(start_path: &Path) -> VcsResult<PathBuf> {
        let not_found = || VcsError::RepositoryNotFound(start_path.display().to_string());
        let mut current_dir = start_path.canonicalize().map_err(|_| not_found())?;

        if current_dir.is_file() {
            current_dir = current_dir.parent().ok_or_else(not_found)?.to_path_buf();
        }

        loop {
            // `.git` is a directory in a normal checkout and a file in a worktree.
            if current_dir.join(".git").exists() {
                return Ok(current_dir);
            }
            match current_dir.parent() {
                Some(parent) if parent != current_dir => current_dir = parent.to_path_buf(),
                _ => return Err(not_found()),
            }
        }
    }

    fn run_git(&self, args: &[&str]) -> VcsResult<String> {
        let command = format!("git {}", args.join(" "));
        debug!(command = %command, root = %self.root.display(), "Running git probe");

        let mut child = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .env("GIT_CONFIG_NOSYSTEM", "1")
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("GIT_ASKPASS", "echo")
            .env("SSH_ASKPASS", "echo")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| VcsError::CommandFailed {
                command: command.clone(),
                exit_code: -1,
                stderr: e.to_string(),
            })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = wait_with_timeout(&mut child, self.timeout, &command)?;

        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        if status.success() {
            String::from_utf8(stdout).map_err(VcsError::Utf8)
        } else {
            Err(VcsError::CommandFailed {
                command,
                exit_code: status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&stderr).to_string(),
            })
        }
    }
}

impl SourceControl for VcsRepo {
    fn last_commit(&self) -> VcsResult<String> {
        Ok(self.run_git(&["rev-parse", "HEAD"])?.trim().to_string())
    }

    fn is_dirty(&self) -> VcsResult<bool> {
        Ok(!self.run_git(&["status", "--porcelain"])?.trim().is_empty())
    }

    fn last_commit_message(&self) -> VcsResult<String> {
        let message = self.run_git(&["log", "-1", "--pretty=%B"])?;
        Ok(message.trim_end_matches('\n').to_string())
    }
}

/// Read a child pipe to the end on a helper thread so a full pipe never blocks the child.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

fn wait_with_timeout(child: &mut Child, timeout: Duration, command: &str) -> VcsResult<ExitStatus> {
    if let Some(status) = child.wait_timeout(timeout)? {
        return Ok(status);
    }
    // Kill before joining the pipe readers, which only finish once the child exits.
    let _ = child.kill();
    let _ = child.wait();
    Err(VcsError::Timeout {
        command: command.to_string(),
        timeout,
    })
}
