//! The five todo tools, as a closed set of typed calls.
//!
//! Both the chat agent and the MCP server go through [`ToolCall`], so the
//! input schemas and the text handed back to a model are defined once here.

use crate::core::TodoStore;
use crate::error::{Result, TodoError};
use crate::models::Todo;
use rmcp::schemars;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

pub const ADD_TODO: &str = "add_todo";
pub const DELETE_TODO: &str = "delete_todo";
pub const RESTORE_TODO: &str = "restore_todo";
pub const SEARCH_TODO: &str = "search_todo";
pub const READ_TODO: &str = "read_todo";

pub const NO_TODOS_FOUND: &str = "No todos found";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct AddTodoInput {
    /// Text of the new todo
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct KeywordInput {
    /// Case-insensitive text to match against todo content
    pub keyword: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SearchTodoInput {
    /// A todo id, or text to match against active todos
    #[serde(alias = "keyword_or_id")]
    pub keyword_or_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReadTodoInput {
    /// Include deleted todos
    #[serde(default, alias = "show_all")]
    pub show_all: bool,
}

/// A validated request for one store operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    Add(AddTodoInput),
    Delete(KeywordInput),
    Restore(KeywordInput),
    Search(SearchTodoInput),
    Read(ReadTodoInput),
}

/// Name, description and JSON schema of a tool, as advertised to a model
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Value,
}

impl ToolDefinition {
    fn new<T: schemars::JsonSchema>(name: &'static str, description: &'static str) -> Self {
        let mut parameters = serde_json::to_value(schemars::schema_for!(T))
            .unwrap_or_else(|_| json!({ "type": "object" }));
        if let Some(obj) = parameters.as_object_mut() {
            obj.remove("$schema");
            obj.remove("title");
        }
        Self {
            name,
            description,
            parameters,
        }
    }
}

impl ToolCall {
    /// Build a call from a tool name and its JSON arguments
    pub fn parse(name: &str, arguments: Value) -> Result<Self> {
        // Models send `{}` or nothing at all for argument-less calls
        let arguments = if arguments.is_null() {
            json!({})
        } else {
            arguments
        };

        let invalid = |e: serde_json::Error| TodoError::InvalidArguments {
            tool: name.to_string(),
            message: e.to_string(),
        };

        let call = match name {
            ADD_TODO => ToolCall::Add(serde_json::from_value(arguments).map_err(invalid)?),
            DELETE_TODO => ToolCall::Delete(serde_json::from_value(arguments).map_err(invalid)?),
            RESTORE_TODO => ToolCall::Restore(serde_json::from_value(arguments).map_err(invalid)?),
            SEARCH_TODO => ToolCall::Search(serde_json::from_value(arguments).map_err(invalid)?),
            READ_TODO => ToolCall::Read(serde_json::from_value(arguments).map_err(invalid)?),
            other => return Err(TodoError::UnknownTool(other.to_string())),
        };
        Ok(call)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::Add(_) => ADD_TODO,
            ToolCall::Delete(_) => DELETE_TODO,
            ToolCall::Restore(_) => RESTORE_TODO,
            ToolCall::Search(_) => SEARCH_TODO,
            ToolCall::Read(_) => READ_TODO,
        }
    }

    /// Whether running this call changes stored rows
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            ToolCall::Add(_) | ToolCall::Delete(_) | ToolCall::Restore(_)
        )
    }

    /// All tools, in a stable order
    pub fn definitions() -> Vec<ToolDefinition> {
        vec![
            ToolDefinition::new::<AddTodoInput>(ADD_TODO, "Add a new todo item."),
            ToolDefinition::new::<KeywordInput>(
                DELETE_TODO,
                "Soft-delete every active todo whose content contains the keyword. Returns how many were deleted.",
            ),
            ToolDefinition::new::<SearchTodoInput>(
                SEARCH_TODO,
                "Find todos. A numeric argument looks up that id (including deleted todos); any other text matches active todos by content.",
            ),
            ToolDefinition::new::<KeywordInput>(
                RESTORE_TODO,
                "Restore every deleted todo whose content contains the keyword. Returns how many were restored.",
            ),
            ToolDefinition::new::<ReadTodoInput>(
                READ_TODO,
                "List todos, newest first. Set showAll to include deleted todos.",
            ),
        ]
    }

    /// Run the call against the store and render the result as text
    pub fn execute(&self, store: &TodoStore) -> Result<String> {
        debug!(tool = self.name(), "executing tool call");

        match self {
            ToolCall::Add(input) => {
                let todo = store.add(&input.content)?;
                Ok(format!("Added todo #{}: {}", todo.id, todo.content))
            }
            ToolCall::Delete(input) => {
                let count = store.delete(&input.keyword)?;
                Ok(count_message("Deleted", count, &input.keyword))
            }
            ToolCall::Restore(input) => {
                let count = store.restore(&input.keyword)?;
                Ok(count_message("Restored", count, &input.keyword))
            }
            ToolCall::Search(input) => Ok(render_todos(&store.search(&input.keyword_or_id)?)),
            ToolCall::Read(input) => Ok(render_todos(&store.list(input.show_all)?)),
        }
    }
}

fn count_message(verb: &str, count: usize, keyword: &str) -> String {
    let keyword = keyword.trim();
    if count == 0 {
        format!("No matching todos for \"{keyword}\"")
    } else {
        format!("{verb} {count} todo(s) matching \"{keyword}\"")
    }
}

/// One `#<id> - <content> [<status>]` line per todo
pub fn render_todos(todos: &[Todo]) -> String {
    if todos.is_empty() {
        return NO_TODOS_FOUND.to_string();
    }
    todos
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
