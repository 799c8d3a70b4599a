//! Row mapping and persistence operations for the runs table.

use rusqlite::{params, params_from_iter, Connection, ErrorCode, Row};
use runs_model::{Field, RunEntry, RunPath};

use crate::schema::{quoted, runs, TABLE_RUNS};

/// Translate a user pattern (`%` = any substring) into an SQLite `GLOB` pattern.
///
/// GLOB is case-sensitive; its own metacharacters are escaped with
/// single-character classes so they match literally.
pub fn glob_pattern(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        match c {
            '%' => out.push('*'),
            '*' => out.push_str("[*]"),
            '?' => out.push_str("[?]"),
            '[' => out.push_str("[[]"),
            other => out.push(other),
        }
    }
    out
}

fn select_columns() -> String {
    runs::ALL.map(quoted).join(", ")
}

/// `(path GLOB ?1 OR ...) AND NOT (path GLOB ?k OR ...)` for the given counts.
fn where_clause(include: usize, exclude: usize) -> String {
    let any = |start: usize, count: usize| {
        (start..start + count)
            .map(|i| format!("{} GLOB ?{}", runs::PATH, i))
            .collect::<Vec<_>>()
            .join(" OR ")
    };

    let mut clause = if include == 0 {
        "0".to_string()
    } else {
        format!("({})", any(1, include))
    };
    if exclude > 0 {
        clause.push_str(&format!(" AND NOT ({})", any(include + 1, exclude)));
    }
    clause
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<RunEntry> {
    let path: String = row.get(0)?;
    let path = RunPath::new(&path).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(RunEntry {
        path,
        command: row.get(1)?,
        commit: row.get(2)?,
        datetime: row.get(3)?,
        description: row.get(4)?,
    })
}

fn is_constraint_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

/// Database operations for runs.
pub struct RunStore<'a> {
    conn: &'a Connection,
}

impl<'a> RunStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn insert(&self, entry: &RunEntry) -> crate::Result<()> {
        let sql = format!(
            "INSERT INTO {TABLE_RUNS} ({}) VALUES (?, ?, ?, ?, ?)",
            select_columns()
        );
        self.conn
            .execute(
                &sql,
                params![
                    entry.path.as_str(),
                    entry.command,
                    entry.commit,
                    entry.datetime,
                    entry.description
                ],
            )
            .map_err(|e| {
                if is_constraint_violation(&e) {
                    crate::Error::DuplicatePath(entry.path.to_string())
                } else {
                    e.into()
                }
            })?;
        Ok(())
    }

    /// Rows whose path matches any `include` glob and no `exclude` glob, in table order.
    pub fn select(&self, include: &[String], exclude: &[String]) -> crate::Result<Vec<RunEntry>> {
        let sql = format!(
            "SELECT {} FROM {TABLE_RUNS} WHERE {}",
            select_columns(),
            where_clause(include.len(), exclude.len())
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(include.iter().chain(exclude)), entry_from_row)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    pub fn exists(&self, include: &[String]) -> crate::Result<bool> {
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM {TABLE_RUNS} WHERE {})",
            where_clause(include.len(), 0)
        );
        let exists: bool = self
            .conn
            .query_row(&sql, params_from_iter(include.iter()), |row| row.get(0))?;
        Ok(exists)
    }

    /// Apply every `(field, value)` to the matched rows in one statement.
    ///
    /// Returns the number of rows changed.
    pub fn update(&self, include: &[String], changes: &[(Field, &str)]) -> crate::Result<usize> {
        if changes.is_empty() {
            return Ok(0);
        }
        let assignments = changes
            .iter()
            .enumerate()
            .map(|(i, (field, _))| format!("{} = ?{}", quoted(field.as_str()), include.len() + i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {TABLE_RUNS} SET {assignments} WHERE {}",
            where_clause(include.len(), 0)
        );
        let params = include
            .iter()
            .map(String::as_str)
            .chain(changes.iter().map(|(_, value)| *value));
        self.conn
            .execute(&sql, params_from_iter(params))
            .map_err(|e| {
                if is_constraint_violation(&e) {
                    let path = changes
                        .iter()
                        .find(|(field, _)| *field == Field::Path)
                        .map_or_else(|| include.join(", "), |(_, value)| value.to_string());
                    crate::Error::DuplicatePath(path)
                } else {
                    e.into()
                }
            })
    }

    pub fn delete(&self, include: &[String]) -> crate::Result<usize> {
        let sql = format!(
            "DELETE FROM {TABLE_RUNS} WHERE {}",
            where_clause(include.len(), 0)
        );
        Ok(self.conn.execute(&sql, params_from_iter(include.iter()))?)
    }
}
