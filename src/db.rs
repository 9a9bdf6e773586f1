use rusqlite::{Connection, OptionalExtension};
use std::path::Path;

pub const DB_FILE_NAME: &str = "gradingd.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS grade_definitions(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            scale TEXT NOT NULL,
            created_at TEXT NOT NULL,
            superseded_by TEXT
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_grade_definitions_superseded ON grade_definitions(superseded_by)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS grade_ranges(
            id TEXT PRIMARY KEY,
            definition_id TEXT NOT NULL,
            idx INTEGER NOT NULL,
            grade TEXT NOT NULL,
            min_marks REAL NOT NULL,
            max_marks REAL NOT NULL,
            grade_point REAL NOT NULL,
            display_order INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY(definition_id) REFERENCES grade_definitions(id),
            UNIQUE(definition_id, idx),
            UNIQUE(definition_id, grade)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_grade_ranges_definition ON grade_ranges(definition_id)",
        [],
    )?;

    Ok(())
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(s) => Ok(Some(serde_json::from_str(&s)?)),
        None => Ok(None),
    }
}

pub fn settings_set_json(
    conn: &Connection,
    key: &str,
    value: &serde_json::Value,
) -> anyhow::Result<()> {
    let text = serde_json::to_string(value)?;
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, text),
    )?;
    Ok(())
}
