//! tmux session supervisor
//!
//! Implements the SessionSupervisor trait for tmux using its command-line
//! interface. Each run gets its own detached session with a single window.

use runs_mux_core::*;
use std::process::{Command, Stdio};
use tracing::debug;

/// tmux-backed session supervisor
#[derive(Debug, Default)]
pub struct TmuxSupervisor {
    /// Alternate server socket (`tmux -L`), used to isolate tests.
    socket: Option<String>,
}

impl TmuxSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Talk to a private tmux server instead of the user's default one.
    pub fn with_socket(socket: impl Into<String>) -> Self {
        Self {
            socket: Some(socket.into()),
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new("tmux");
        if let Some(socket) = &self.socket {
            command.args(["-L", socket]);
        }
        command
    }

    /// Run a tmux command and return its output
    fn run_tmux_command(&self, args: &[&str]) -> Result<String, MuxError> {
        debug!(args = ?args, "Running tmux command");
        let output = self.command().args(args).stdin(Stdio::null()).output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                MuxError::NotAvailable("tmux")
            } else {
                MuxError::Io(e)
            }
        })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(MuxError::CommandFailed(format!(
                "tmux {} failed: {}",
                args.join(" "),
                stderr.trim()
            )))
        }
    }

    /// Exact-match target; a bare name would also match by prefix.
    fn target(name: &SessionName) -> String {
        format!("={name}")
    }

    fn has_session(&self, name: &SessionName) -> Result<bool, MuxError> {
        match self.run_tmux_command(&["has-session", "-t", &Self::target(name)]) {
            Ok(_) => Ok(true),
            Err(MuxError::CommandFailed(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl SessionSupervisor for TmuxSupervisor {
    fn id(&self) -> &'static str {
        "tmux"
    }

    fn is_available(&self) -> bool {
        Command::new("tmux")
            .arg("-V")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn new_session(&self, name: &SessionName, opts: &SessionOptions) -> Result<(), MuxError> {
        self.kill(name)?;

        let cwd = opts.cwd.map(|p| p.to_string_lossy().to_string());
        let mut args = vec!["new-session", "-d", "-s", name.as_str(), "-n", opts.window_title];
        if let Some(cwd) = &cwd {
            args.extend(["-c", cwd.as_str()]);
        }
        args.push(opts.command);

        self.run_tmux_command(&args)?;
        debug!(session = %name, command = opts.command, "Started session");
        Ok(())
    }

    fn kill(&self, name: &SessionName) -> Result<(), MuxError> {
        if self.has_session(name)? {
            self.run_tmux_command(&["kill-session", "-t", &Self::target(name)])?;
            debug!(session = %name, "Killed session");
        }
        Ok(())
    }

    fn rename(&self, from: &SessionName, to: &SessionName) -> Result<(), MuxError> {
        if self.has_session(from)? {
            self.run_tmux_command(&["rename-session", "-t", &Self::target(from), to.as_str()])?;
            debug!(from = %from, to = %to, "Renamed session");
        }
        Ok(())
    }

    fn interrupt(&self, name: &SessionName) -> Result<(), MuxError> {
        if self.has_session(name)? {
            let pane = format!("{}:", Self::target(name));
            self.run_tmux_command(&["send-keys", "-t", &pane, "C-c"])?;
            debug!(session = %name, "Interrupted session");
        }
        Ok(())
    }

    fn list(&self) -> Result<Vec<SessionName>, MuxError> {
        match self.run_tmux_command(&["list-sessions", "-F", "#{session_name}"]) {
            Ok(output) => Ok(output
                .lines()
                .filter(|line| !line.is_empty())
                .map(SessionName::from_raw)
                .collect()),
            // No server means no sessions.
            Err(MuxError::CommandFailed(msg))
                if msg.contains("no server running") || msg.contains("error connecting") =>
            {
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    fn is_active(&self, name: &SessionName) -> Result<bool, MuxError> {
        self.has_session(name)
    }
}
