use thiserror::Error;

/// All possible errors in the todo assistant
#[derive(Error, Debug)]
pub enum TodoError {
    #[error("Todo content must not be empty")]
    EmptyContent,

    #[error("Keyword must not be empty")]
    EmptyKeyword,

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },

    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Model kept calling tools after {0} rounds without answering")]
    ToolRoundLimit(usize),

    #[error("OPENAI_API_KEY is not set. Export it or add it to .env to start a chat session.")]
    MissingApiKey,

    #[error("MCP error: {0}")]
    Mcp(String),
}

impl TodoError {
    /// Errors caused by bad caller input rather than a storage or transport fault.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TodoError::EmptyContent
                | TodoError::EmptyKeyword
                | TodoError::UnknownTool(_)
                | TodoError::InvalidArguments { .. }
        )
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, TodoError>;
