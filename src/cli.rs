use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "todo")]
#[command(about = "Chat with an assistant that manages your todo list")]
#[command(version)]
pub struct Cli {
    /// SQLite database file (overrides TODO_DB_PATH)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive chat session (default)
    Chat,

    /// Add a new todo
    Add {
        /// Todo text
        content: String,
    },

    /// Soft-delete all active todos containing a keyword
    Delete {
        /// Case-insensitive keyword
        keyword: String,
    },

    /// Restore all deleted todos containing a keyword
    Restore {
        /// Case-insensitive keyword
        keyword: String,
    },

    /// Look up a todo by id, or search active todos by keyword
    Search {
        /// Todo id or keyword
        keyword_or_id: String,
    },

    /// List todos, newest first
    List {
        /// Include deleted todos
        #[arg(long)]
        all: bool,
    },

    /// Start MCP server
    Mcp,
}
