use rusqlite::Connection;
use std::path::Path;

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("roster.sqlite3");
    let conn = Connection::open(db_path)?;
    create_schema(&conn)?;
    Ok(conn)
}

pub fn create_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            age INTEGER NOT NULL,
            course TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_course ON students(course)",
        [],
    )?;

    // Workspaces created before created_at existed need the column backfilled.
    ensure_students_created_at(conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_created_at ON students(created_at)",
        [],
    )?;

    Ok(())
}

fn ensure_students_created_at(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "students", "created_at")? {
        return Ok(());
    }
    conn.execute(
        "ALTER TABLE students ADD COLUMN created_at TEXT NOT NULL DEFAULT ''",
        [],
    )?;
    conn.execute(
        "UPDATE students SET created_at = strftime('%Y-%m-%dT%H:%M:%SZ','now') WHERE created_at = ''",
        [],
    )?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}
