use crate::error::Result;
use crate::models::{Status, Todo};
use rusqlite::functions::FunctionFlags;
use rusqlite::{Connection, OptionalExtension, Row};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// How long a statement waits on a lock held by another process
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database handle
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database connection
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        // Enable WAL mode for better concurrency
        let mode = conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        if !mode.eq_ignore_ascii_case("wal") {
            warn!(mode = %mode, "could not switch database to WAL journal mode");
        }

        Self::from_connection(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        register_functions(&conn)?;
        Ok(Database { conn })
    }

    /// Create the schema. Safe to run on every start.
    pub fn init(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS todos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                content TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'deleted'))
            )",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_todos_status ON todos(status)",
            [],
        )?;
        Ok(())
    }

    /// Close the connection, surfacing any error instead of swallowing it in Drop
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| e.into())
    }

    // ==================== Todo Operations ====================

    pub fn insert_todo(&self, content: &str) -> Result<i64> {
        self.conn
            .execute("INSERT INTO todos (content) VALUES (?1)", [content])?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_todo(&self, id: i64) -> Result<Option<Todo>> {
        self.conn
            .query_row(
                "SELECT id, content, status FROM todos WHERE id = ?1",
                [id],
                todo_from_row,
            )
            .optional()
            .map_err(|e| e.into())
    }

    /// Move every row in `from` whose content contains `keyword` to `to`.
    /// Returns the number of rows changed.
    pub fn transition_matching(&self, keyword: &str, from: Status, to: Status) -> Result<usize> {
        let changed = self.conn.execute(
            "UPDATE todos SET status = ?1
             WHERE status = ?2 AND contains_ci(content, ?3)",
            (to.as_str(), from.as_str(), keyword),
        )?;
        Ok(changed)
    }

    pub fn search_active(&self, keyword: &str) -> Result<Vec<Todo>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, content, status FROM todos
             WHERE status = 'active' AND contains_ci(content, ?1)
             ORDER BY id DESC",
        )?;

        let todos = stmt.query_map([keyword], todo_from_row)?;
        todos
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| e.into())
    }

    pub fn list_todos(&self, show_all: bool) -> Result<Vec<Todo>> {
        let sql = if show_all {
            "SELECT id, content, status FROM todos ORDER BY id DESC"
        } else {
            "SELECT id, content, status FROM todos WHERE status = 'active' ORDER BY id DESC"
        };
        let mut stmt = self.conn.prepare(sql)?;

        let todos = stmt.query_map([], todo_from_row)?;
        todos
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| e.into())
    }
}

// ==================== SQL Functions ====================

/// `contains_ci(haystack, needle)`: Unicode-aware case-insensitive substring test.
/// SQLite's own LIKE only folds ASCII.
fn register_functions(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        "contains_ci",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let haystack = ctx.get::<String>(0)?;
            let needle = ctx.get::<String>(1)?;
            Ok(haystack.to_lowercase().contains(&needle.to_lowercase()))
        },
    )?;
    Ok(())
}

// ==================== Row Parsers ====================

fn todo_from_row(row: &Row) -> std::result::Result<Todo, rusqlite::Error> {
    let status_str: String = row.get(2)?;
    let status = Status::try_from(status_str.as_str()).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
        )
    })?;

    Ok(Todo {
        id: row.get(0)?,
        content: row.get(1)?,
        status,
    })
}
