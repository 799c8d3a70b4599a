//! Git repository fixtures for unit and integration tests.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;

type FixtureResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Check if git is available on the system.
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Configuration options for git repository creation.
#[derive(Debug, Clone)]
pub struct GitRepoConfig {
    pub user_email: String,
    pub user_name: String,
    /// Whether to create an initial commit with README.md (default: true)
    pub create_initial_commit: bool,
    pub initial_commit_message: String,
}

impl GitRepoConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_initial_commit(mut self, create: bool) -> Self {
        self.create_initial_commit = create;
        self
    }

    pub fn initial_commit_message(mut self, message: impl Into<String>) -> Self {
        self.initial_commit_message = message.into();
        self
    }
}

impl Default for GitRepoConfig {
    fn default() -> Self {
        Self {
            user_email: "test@example.com".to_string(),
            user_name: "Test User".to_string(),
            create_initial_commit: true,
            initial_commit_message: "Initial commit".to_string(),
        }
    }
}

/// A git repository living in a temporary directory.
pub struct SimpleGitRepo {
    /// Keeps the directory alive for the lifetime of the fixture.
    pub repo: TempDir,
    pub path: PathBuf,
}

/// Create a git repository in a fresh temporary directory.
pub fn create_git_repo(config: Option<GitRepoConfig>) -> FixtureResult<SimpleGitRepo> {
    let config = config.unwrap_or_default();
    let repo = TempDir::new()?;
    let path = repo.path().to_path_buf();
    initialize_git_repo_with_config(&path, &config)?;
    Ok(SimpleGitRepo { repo, path })
}

/// Initialize a git repository on an existing directory.
pub fn initialize_git_repo_with_config(repo_path: &Path, config: &GitRepoConfig) -> FixtureResult<()> {
    git(repo_path, &["init", "-b", "main"])?;
    git(repo_path, &["config", "user.email", &config.user_email])?;
    git(repo_path, &["config", "user.name", &config.user_name])?;
    git(repo_path, &["config", "commit.gpgsign", "false"])?;

    if config.create_initial_commit {
        commit_file(
            repo_path,
            "README.md",
            "Initial content",
            &config.initial_commit_message,
        )?;
    }
    Ok(())
}

/// Write `content` to `file_name`, stage it and commit with `message`.
pub fn commit_file(repo_path: &Path, file_name: &str, content: &str, message: &str) -> FixtureResult<()> {
    std::fs::write(repo_path.join(file_name), content)?;
    git(repo_path, &["add", file_name])?;
    git(repo_path, &["commit", "-m", message])?;
    Ok(())
}

/// Current `HEAD` revision, read directly with git.
pub fn head_commit(repo_path: &Path) -> FixtureResult<String> {
    Ok(git(repo_path, &["rev-parse", "HEAD"])?.trim().to_string())
}

fn git(repo_path: &Path, args: &[&str]) -> FixtureResult<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_path)
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!("git {} failed: {}", args.join(" "), stderr).into());
    }
    Ok(String::from_utf8(output.stdout)?)
}
