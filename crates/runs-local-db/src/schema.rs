//! Database schema definitions and constants.

// Current schema version
pub const SCHEMA_VERSION: u32 = 1;

// Table names
pub const TABLE_SCHEMA_MIGRATIONS: &str = "schema_migrations";
pub const TABLE_RUNS: &str = "runs";

// Column names for runs table
pub mod runs {
    pub const PATH: &str = "path";
    pub const COMMAND: &str = "command";
    pub const COMMIT: &str = "commit";
    pub const DATETIME: &str = "datetime";
    pub const DESCRIPTION: &str = "description";

    /// Columns in table order.
    pub const ALL: [&str; 5] = [PATH, COMMAND, COMMIT, DATETIME, DESCRIPTION];
}

/// Quote a column name for use in SQL (`commit` is a keyword).
pub fn quoted(column: &str) -> String {
    format!("\"{column}\"")
}
