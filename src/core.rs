use crate::db::Database;
use crate::error::{Result, TodoError};
use crate::models::{Status, Todo};
use std::path::Path;
use tracing::{debug, info};

/// Core business logic: the todo store and its soft-delete state machine.
///
/// Every operation is a single statement against the database. Status only
/// moves `active -> deleted` (delete) and `deleted -> active` (restore);
/// rows are never physically removed.
pub struct TodoStore {
    db: Database,
}

impl TodoStore {
    /// Open the database at `path`, creating the schema if needed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let db = Database::open(path)?;
        db.init()?;
        info!(path = %path.display(), "todo store opened");
        Ok(TodoStore { db })
    }

    /// Open a private in-memory store
    pub fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        db.init()?;
        Ok(TodoStore { db })
    }

    /// Release the underlying connection
    pub fn close(self) -> Result<()> {
        self.db.close()?;
        info!("todo store closed");
        Ok(())
    }

    // ==================== Todo Operations ====================

    /// Add a new active todo
    pub fn add(&self, content: &str) -> Result<Todo> {
        let content = content.trim();
        if content.is_empty() {
            return Err(TodoError::EmptyContent);
        }

        let id = self.db.insert_todo(content)?;
        info!(id, "todo added");
        Ok(Todo {
            id,
            content: content.to_string(),
            status: Status::Active,
        })
    }

    /// Soft-delete every active todo containing `keyword`
    pub fn delete(&self, keyword: &str) -> Result<usize> {
        let keyword = require_keyword(keyword)?;
        let count = self
            .db
            .transition_matching(keyword, Status::Active, Status::Deleted)?;
        info!(keyword, count, "todos deleted");
        Ok(count)
    }

    /// Restore every deleted todo containing `keyword`
    pub fn restore(&self, keyword: &str) -> Result<usize> {
        let keyword = require_keyword(keyword)?;
        let count = self
            .db
            .transition_matching(keyword, Status::Deleted, Status::Active)?;
        info!(keyword, count, "todos restored");
        Ok(count)
    }

    /// Search by id when `query` is an integer (any status), otherwise by
    /// content among active todos.
    pub fn search(&self, query: &str) -> Result<Vec<Todo>> {
        let query = require_keyword(query)?;

        if let Ok(id) = query.parse::<i64>() {
            debug!(id, "searching by id");
            return Ok(self.db.get_todo(id)?.into_iter().collect());
        }

        debug!(query, "searching by content");
        self.db.search_active(query)
    }

    /// List todos, newest first
    pub fn list(&self, show_all: bool) -> Result<Vec<Todo>> {
        self.db.list_todos(show_all)
    }

    /// Get a todo by id
    pub fn get(&self, id: i64) -> Result<Option<Todo>> {
        self.db.get_todo(id)
    }
}

fn require_keyword(keyword: &str) -> Result<&str> {
    let keyword = keyword.trim();
    if keyword.is_empty() {
        return Err(TodoError::EmptyKeyword);
    }
    Ok(keyword)
}
