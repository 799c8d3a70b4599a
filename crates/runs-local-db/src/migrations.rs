//! Database migration management.

use rusqlite::{params, Connection};

/// Database migration manager.
pub struct MigrationManager;

impl MigrationManager {
    /// Apply all pending migrations to the database.
    pub fn migrate(conn: &Connection) -> crate::Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );
            "#,
        )?;

        let current_version = Self::current_version(conn)?.unwrap_or(0);
        if current_version > crate::schema::SCHEMA_VERSION {
            return Err(crate::Error::migration(format!(
                "database schema version {} is newer than supported version {}",
                current_version,
                crate::schema::SCHEMA_VERSION
            )));
        }

        if current_version < 1 {
            tracing::debug!("Applying runs schema migration 1");
            Self::apply_migration_1(conn)?;
        }

        Ok(())
    }

    /// Apply migration version 1 - the runs table
    fn apply_migration_1(conn: &Connection) -> crate::Result<()> {
        conn.execute_batch(
            r#"
            -- One row per recorded run, keyed by its slash-delimited path
            CREATE TABLE IF NOT EXISTS runs (
                path TEXT PRIMARY KEY NOT NULL,
                command TEXT NOT NULL,
                "commit" TEXT NOT NULL,
                datetime TEXT NOT NULL,
                description TEXT NOT NULL
            );

            INSERT OR REPLACE INTO schema_migrations (version) VALUES (1);
            "#,
        )?;

        Ok(())
    }

    /// Get the current schema version.
    pub fn current_version(conn: &Connection) -> crate::Result<Option<u32>> {
        let mut stmt = conn.prepare("SELECT MAX(version) FROM schema_migrations")?;
        let version: Option<u32> = stmt.query_row(params![], |row| row.get(0))?;
        Ok(version)
    }
}
