//! Per-run directory trees.
//!
//! Every configured directory name defines a parallel tree under the root:
//! run `a/b` owns `<root>/<dir_name>/a/b` for each name.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use runs_model::RunPath;

use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct RunDirs {
    root: PathBuf,
    dir_names: Vec<String>,
}

impl RunDirs {
    pub fn new<P: Into<PathBuf>>(root: P, dir_names: Vec<String>) -> Self {
        Self {
            root: root.into(),
            dir_names,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir_names(&self) -> &[String] {
        &self.dir_names
    }

    /// One physical directory per configured tree.
    pub fn dir_paths(&self, path: &RunPath) -> Vec<PathBuf> {
        self.dir_names
            .iter()
            .map(|name| self.dir_in(name, path))
            .collect()
    }

    fn dir_in(&self, name: &str, path: &RunPath) -> PathBuf {
        let tree = self.root.join(name);
        if path.is_root() {
            tree
        } else {
            path.segments().fold(tree, |dir, segment| dir.join(segment))
        }
    }

    /// The directories of `runs` within the tree called `name`.
    fn dirs_in(&self, name: &str, runs: &[RunPath]) -> Vec<PathBuf> {
        runs.iter().map(|run| self.dir_in(name, run)).collect()
    }

    pub fn mkdirs(&self, path: &RunPath) -> Result<()> {
        for dir in self.dir_paths(path) {
            std::fs::create_dir_all(&dir).map_err(|e| Error::filesystem(&dir, e))?;
            debug!(dir = %dir.display(), "Created run directory");
        }
        Ok(())
    }

    /// Remove the run's directories, then every ancestor left empty below the root.
    ///
    /// The directories of `keep`, runs nested below `path` that stay, are left
    /// in place along with the directories leading to them.
    pub fn rmdirs(&self, path: &RunPath, keep: &[RunPath]) -> Result<()> {
        for name in &self.dir_names {
            let dir = self.dir_in(name, path);
            remove_except(&dir, &self.dirs_in(name, keep))?;
            if let Some(parent) = dir.parent() {
                self.prune(parent)?;
            }
        }
        Ok(())
    }

    /// Rename each tree's `old` directory to `new`.
    ///
    /// The directories of `keep`, runs nested below `old` that are not moving
    /// with it, stay where they are. A tree without `old` is skipped: the
    /// directory name may have been configured after the run was created.
    pub fn mvdirs(&self, old: &RunPath, new: &RunPath, keep: &[RunPath]) -> Result<()> {
        for name in &self.dir_names {
            let from = self.dir_in(name, old);
            if !from.exists() {
                debug!(dir = %from.display(), "Skipping missing run directory");
                continue;
            }
            let to = self.dir_in(name, new);
            move_except(&from, &to, &self.dirs_in(name, keep))?;
            debug!(from = %from.display(), to = %to.display(), "Moved run directory");
            if let Some(parent) = from.parent() {
                self.prune(parent)?;
            }
        }
        Ok(())
    }

    /// Delete `dir` and its ancestors while they are empty, stopping at the root.
    fn prune(&self, dir: &Path) -> Result<()> {
        let mut current = Some(dir);
        while let Some(dir) = current {
            if dir == self.root || !dir.starts_with(&self.root) {
                break;
            }
            match std::fs::remove_dir(dir) {
                Ok(()) => debug!(dir = %dir.display(), "Pruned empty directory"),
                // Not empty (or already gone): nothing above it can be empty either.
                Err(e)
                    if e.kind() == ErrorKind::NotFound
                        || e.kind() == ErrorKind::DirectoryNotEmpty =>
                {
                    break
                }
                Err(e) => {
                    // Some platforms report a non-empty directory as a generic error.
                    if dir.read_dir().map(|mut d| d.next().is_some()).unwrap_or(false) {
                        break;
                    }
                    return Err(Error::filesystem(dir, e));
                }
            }
            current = dir.parent();
        }
        Ok(())
    }
}

/// True if `dir` is one of `kept` or lies on the way to one.
fn leads_to_kept(dir: &Path, kept: &[PathBuf]) -> bool {
    kept.iter().any(|k| k.starts_with(dir))
}

fn children(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| Error::filesystem(dir, e))? {
        paths.push(entry.map_err(|e| Error::filesystem(dir, e))?.path());
    }
    Ok(paths)
}

/// `remove_dir_all`, except for the `kept` directories inside `dir`.
fn remove_except(dir: &Path, kept: &[PathBuf]) -> Result<()> {
    if !leads_to_kept(dir, kept) {
        return match std::fs::remove_dir_all(dir) {
            Ok(()) => {
                debug!(dir = %dir.display(), "Removed run directory");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::filesystem(dir, e)),
        };
    }
    if kept.iter().any(|k| k == dir) {
        return Ok(());
    }
    for child in children(dir)? {
        if child.is_dir() {
            remove_except(&child, kept)?;
        } else {
            std::fs::remove_file(&child).map_err(|e| Error::filesystem(&child, e))?;
        }
    }
    Ok(())
}

/// Rename `from` to `to`, leaving the `kept` directories inside `from` behind.
///
/// When `to` already exists, or something under `from` stays, entries are
/// moved one by one into `to`.
fn move_except(from: &Path, to: &Path, kept: &[PathBuf]) -> Result<()> {
    if kept.iter().any(|k| k == from) {
        return Ok(());
    }
    let stays = leads_to_kept(from, kept);
    if !from.is_dir() || (!stays && !to.exists()) {
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::filesystem(parent, e))?;
        }
        return std::fs::rename(from, to).map_err(|e| Error::filesystem(from, e));
    }

    std::fs::create_dir_all(to).map_err(|e| Error::filesystem(to, e))?;
    for child in children(from)? {
        if let Some(file_name) = child.file_name() {
            move_except(&child, &to.join(file_name), kept)?;
        }
    }
    if !stays {
        std::fs::remove_dir(from).map_err(|e| Error::filesystem(from, e))?;
    }
    Ok(())
}
