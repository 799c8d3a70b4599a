//! Database connection management.

use rusqlite::Connection;
use std::cmp::Ordering;
use std::path::Path;
use tracing::{debug, warn};

use runs_model::path::{descendant_patterns, normalize_pattern};
use runs_model::{natural_cmp, Field, RunEntry};

use crate::models::{glob_pattern, RunStore};

/// A run database opened for the span of one transaction.
///
/// Opening begins an SQLite transaction. Every mutation is visible to later
/// queries on the same handle immediately, but only becomes durable once
/// [`Database::commit`] is called. Dropping the handle without committing
/// rolls everything back.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
    sort: Field,
}

impl Database {
    /// Open a database at the specified path, creating it (and its parent
    /// directory) if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        debug!(path = %path.display(), "Opening run database");
        Self::initialize(Connection::open(path)?)
    }

    /// Open an in-memory database for testing.
    pub fn open_in_memory() -> crate::Result<Self> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> crate::Result<Self> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        crate::migrations::MigrationManager::migrate(&conn)?;
        conn.execute_batch("BEGIN")?;
        Ok(Self {
            conn,
            sort: Field::Path,
        })
    }

    /// Order query results by `sort` instead of by path.
    pub fn with_sort(mut self, sort: Field) -> Self {
        self.sort = sort;
        self
    }

    /// Make every change made through this handle durable.
    pub fn commit(self) -> crate::Result<()> {
        debug!("Committing run database");
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn store(&self) -> RunStore<'_> {
        RunStore::new(&self.conn)
    }

    /// True if any run matches at least one of `patterns`.
    pub fn contains<S: AsRef<str>>(&self, patterns: &[S]) -> crate::Result<bool> {
        self.store().exists(&globs(patterns))
    }

    /// Runs matching any of `patterns` and none of `unless`, in sort order.
    pub fn get<S: AsRef<str>, U: AsRef<str>>(
        &self,
        patterns: &[S],
        unless: &[U],
    ) -> crate::Result<Vec<RunEntry>> {
        let entries = self.store().select(&globs(patterns), &globs(unless))?;
        Ok(self.sorted(entries))
    }

    /// Like [`Database::get`], but each pattern also matches everything below it.
    ///
    /// `unless` patterns are widened the same way, so excluding `a` excludes `a/b`.
    pub fn descendants<S: AsRef<str>, U: AsRef<str>>(
        &self,
        patterns: &[S],
        unless: &[U],
    ) -> crate::Result<Vec<RunEntry>> {
        let include = expand_descendants(patterns);
        let exclude = expand_descendants(unless);
        let entries = self.store().select(&include, &exclude)?;
        Ok(self.sorted(entries))
    }

    /// The single run matching `path`.
    pub fn entry(&self, path: &str) -> crate::Result<RunEntry> {
        let mut entries = self.get(&[path], &[] as &[&str])?;
        match entries.len() {
            0 => Err(crate::Error::NotFound(normalize_pattern(path))),
            1 => Ok(entries.remove(0)),
            count => Err(crate::Error::AmbiguousPath {
                pattern: normalize_pattern(path),
                count,
            }),
        }
    }

    pub fn append(&self, entry: &RunEntry) -> crate::Result<()> {
        debug!(path = %entry.path, "Inserting run");
        self.store().insert(entry)
    }

    /// Set every `(field, value)` on every run matching `patterns`, atomically.
    ///
    /// Returns the number of runs touched; zero when nothing matches.
    pub fn update<S: AsRef<str>>(
        &self,
        patterns: &[S],
        changes: &[(Field, &str)],
    ) -> crate::Result<usize> {
        let include = globs(patterns);
        let touched = self.store().update(&include, changes)?;
        debug!(patterns = ?include, touched, "Updated runs");
        Ok(touched)
    }

    pub fn delete<S: AsRef<str>>(&self, patterns: &[S]) -> crate::Result<usize> {
        let include = globs(patterns);
        let deleted = self.store().delete(&include)?;
        debug!(patterns = ?include, deleted, "Deleted runs");
        Ok(deleted)
    }

    pub fn all(&self) -> crate::Result<Vec<RunEntry>> {
        self.descendants(&[runs_model::ROOT], &[] as &[&str])
    }

    fn sorted(&self, mut entries: Vec<RunEntry>) -> Vec<RunEntry> {
        let sort = self.sort;
        entries.sort_by(|a, b| compare(a, b, sort));
        entries
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if !self.conn.is_autocommit() {
            debug!("Rolling back uncommitted run database changes");
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                warn!(error = %e, "Rollback failed");
            }
        }
    }
}

fn compare(a: &RunEntry, b: &RunEntry, sort: Field) -> Ordering {
    natural_cmp(a.field(sort), b.field(sort))
        .then_with(|| natural_cmp(a.path.as_str(), b.path.as_str()))
}

fn globs<S: AsRef<str>>(patterns: &[S]) -> Vec<String> {
    patterns
        .iter()
        .map(|p| glob_pattern(&normalize_pattern(p.as_ref())))
        .collect()
}

fn expand_descendants<S: AsRef<str>>(patterns: &[S]) -> Vec<String> {
    patterns
        .iter()
        .flat_map(|p| descendant_patterns(p.as_ref()))
        .map(|p| glob_pattern(&p))
        .collect()
}
