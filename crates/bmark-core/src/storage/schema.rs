//! SQLite schema for the bookmark database
//!
//! Five relational tables plus a `meta` key-value table carrying the
//! schema version and the logical clock. Activeness is never computed in
//! SQL: every lifecycle-bearing table stores a raw `enabled_at` /
//! `disabled_at` stamp pair and the store applies `Lifecycle::is_active`
//! in Rust, so any backend can share the predicate.

use rusqlite::{Connection, Result};

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Schema version and logical clock
        CREATE TABLE IF NOT EXISTS meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        -- Bookmarked URLs
        CREATE TABLE IF NOT EXISTS urls (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            url TEXT UNIQUE NOT NULL,
            created_at INTEGER NOT NULL,
            enabled_at INTEGER NOT NULL,
            disabled_at INTEGER
        );

        -- Tag names (no lifecycle: orphaned tags are purged outright)
        CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT UNIQUE NOT NULL
        );

        -- URL-tag junction (many-to-many), lifecycle independent of the URL's
        CREATE TABLE IF NOT EXISTS url_tags (
            url_id INTEGER NOT NULL,
            tag_id INTEGER NOT NULL,
            enabled_at INTEGER NOT NULL,
            disabled_at INTEGER,
            PRIMARY KEY (url_id, tag_id),
            FOREIGN KEY (url_id) REFERENCES urls(id) ON DELETE CASCADE,
            FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
        );

        -- Named tag sets
        CREATE TABLE IF NOT EXISTS tag_sets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT UNIQUE NOT NULL,
            enabled_at INTEGER NOT NULL,
            disabled_at INTEGER
        );

        -- Tag-set membership junction
        CREATE TABLE IF NOT EXISTS tag_set_tags (
            set_id INTEGER NOT NULL,
            tag_id INTEGER NOT NULL,
            enabled_at INTEGER NOT NULL,
            disabled_at INTEGER,
            PRIMARY KEY (set_id, tag_id),
            FOREIGN KEY (set_id) REFERENCES tag_sets(id) ON DELETE CASCADE,
            FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
        );

        -- Indexes for common query patterns
        CREATE INDEX IF NOT EXISTS idx_tags_name ON tags(name);
        CREATE INDEX IF NOT EXISTS idx_url_tags_tag_id ON url_tags(tag_id);
        CREATE INDEX IF NOT EXISTS idx_tag_set_tags_tag_id ON tag_set_tags(tag_id);
        "#,
    )?;

    // Set schema version; the clock starts at zero and only ever grows
    conn.execute(
        "INSERT OR REPLACE INTO meta (key, value) VALUES ('version', ?)",
        [SCHEMA_VERSION.to_string()],
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO meta (key, value) VALUES ('clock', '0')",
        [],
    )?;

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<Option<i32>> {
    let mut stmt = conn.prepare("SELECT value FROM meta WHERE key = 'version'")?;
    let result: Result<String> = stmt.query_row([], |row| row.get(0));

    match result {
        Ok(version_str) => Ok(version_str.parse().ok()),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Check if schema needs initialization or migration
pub fn needs_init(conn: &Connection) -> bool {
    let table_exists: bool = conn
        .prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name='meta'")
        .and_then(|mut stmt| stmt.exists([]))
        .unwrap_or(false);

    if !table_exists {
        return true;
    }

    match get_schema_version(conn) {
        Ok(Some(v)) => v < SCHEMA_VERSION,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"urls".to_string()));
        assert!(tables.contains(&"tags".to_string()));
        assert!(tables.contains(&"url_tags".to_string()));
        assert!(tables.contains(&"tag_sets".to_string()));
        assert!(tables.contains(&"tag_set_tags".to_string()));
        assert!(tables.contains(&"meta".to_string()));
    }

    #[test]
    fn test_schema_version() {
        let conn = Connection::open_in_memory().unwrap();

        assert!(needs_init(&conn));

        init_schema(&conn).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), Some(SCHEMA_VERSION));
        assert!(!needs_init(&conn));
    }

    #[test]
    fn test_clock_initialized_once() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        conn.execute("UPDATE meta SET value = '42' WHERE key = 'clock'", [])
            .unwrap();

        // Re-running init must not reset the clock
        init_schema(&conn).unwrap();
        let clock: String = conn
            .query_row("SELECT value FROM meta WHERE key = 'clock'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(clock, "42");
    }

    #[test]
    fn test_indexes_exist() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let indexes: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(indexes.contains(&"idx_tags_name".to_string()));
        assert!(indexes.contains(&"idx_url_tags_tag_id".to_string()));
        assert!(indexes.contains(&"idx_tag_set_tags_tag_id".to_string()));
    }
}
