use crate::core::TodoStore;
use crate::error::TodoError;
use crate::tools::{AddTodoInput, KeywordInput, ReadTodoInput, SearchTodoInput, ToolCall};
use rmcp::{
    ErrorData as McpError, ServerHandler, ServiceExt, handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters, model::*, tool, tool_handler, tool_router,
    transport::stdio,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Todo store MCP server
#[derive(Clone)]
pub struct TodoMcp {
    store: Arc<Mutex<TodoStore>>,
    tool_router: ToolRouter<Self>,
}

impl TodoMcp {
    /// Run a tool call under the store lock. Failures become error results so the session survives.
    async fn call(&self, call: ToolCall) -> Result<CallToolResult, McpError> {
        let store = self.store.lock().await;

        match call.execute(&store) {
            Ok(text) => Ok(CallToolResult::success(vec![Content::text(text)])),
            Err(e) => {
                warn!(tool = call.name(), error = %e, "tool call failed");
                Ok(CallToolResult::error(vec![Content::text(e.to_string())]))
            }
        }
    }

    /// Hand back the store once the server has stopped
    pub fn into_store(self) -> Option<TodoStore> {
        Arc::into_inner(self.store).map(Mutex::into_inner)
    }
}

#[tool_router]
impl TodoMcp {
    pub fn new(store: TodoStore) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Add a new todo item.")]
    async fn add_todo(&self, params: Parameters<AddTodoInput>) -> Result<CallToolResult, McpError> {
        self.call(ToolCall::Add(params.0)).await
    }

    #[tool(
        description = "Soft-delete every active todo whose content contains the keyword. Returns how many were deleted."
    )]
    async fn delete_todo(
        &self,
        params: Parameters<KeywordInput>,
    ) -> Result<CallToolResult, McpError> {
        self.call(ToolCall::Delete(params.0)).await
    }

    #[tool(
        description = "Find todos. A numeric argument looks up that id (including deleted todos); any other text matches active todos by content."
    )]
    async fn search_todo(
        &self,
        params: Parameters<SearchTodoInput>,
    ) -> Result<CallToolResult, McpError> {
        self.call(ToolCall::Search(params.0)).await
    }

    #[tool(
        description = "Restore every deleted todo whose content contains the keyword. Returns how many were restored."
    )]
    async fn restore_todo(
        &self,
        params: Parameters<KeywordInput>,
    ) -> Result<CallToolResult, McpError> {
        self.call(ToolCall::Restore(params.0)).await
    }

    #[tool(description = "List todos, newest first. Set showAll to include deleted todos.")]
    async fn read_todo(
        &self,
        params: Parameters<ReadTodoInput>,
    ) -> Result<CallToolResult, McpError> {
        self.call(ToolCall::Read(params.0)).await
    }
}

#[tool_handler]
impl ServerHandler for TodoMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Todo list with soft delete. Deleted todos stay in the list with status 'deleted' and can be restored. \
                 delete_todo and restore_todo act on every todo whose text contains the keyword; use search_todo first \
                 when a keyword could match more than one.".to_string()
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

pub async fn run_mcp_server(store: TodoStore) -> Result<(), TodoError> {
    let mcp = TodoMcp::new(store);

    let service = mcp
        .clone()
        .serve(stdio())
        .await
        .map_err(|e| TodoError::Mcp(format!("failed to start: {e}")))?;
    info!("MCP server listening on stdio");

    service
        .waiting()
        .await
        .map_err(|e| TodoError::Mcp(e.to_string()))?;

    if let Some(store) = mcp.into_store() {
        store.close()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(result: &CallToolResult) -> String {
        let value = serde_json::to_value(result).unwrap();
        value["content"][0]["text"].as_str().unwrap().to_string()
    }

    fn is_error(result: &CallToolResult) -> bool {
        let value = serde_json::to_value(result).unwrap();
        value["isError"].as_bool().unwrap_or(false)
    }

    #[tokio::test]
    async fn test_tools_share_one_store() {
        let mcp = TodoMcp::new(TodoStore::open_in_memory().unwrap());

        let added = mcp
            .add_todo(Parameters(AddTodoInput {
                content: "buy milk".into(),
            }))
            .await
            .unwrap();
        assert_eq!(text_of(&added), "Added todo #1: buy milk");
        assert!(!is_error(&added));

        let deleted = mcp
            .delete_todo(Parameters(KeywordInput {
                keyword: "milk".into(),
            }))
            .await
            .unwrap();
        assert_eq!(text_of(&deleted), "Deleted 1 todo(s) matching \"milk\"");

        let listed = mcp
            .read_todo(Parameters(ReadTodoInput { show_all: true }))
            .await
            .unwrap();
        assert_eq!(text_of(&listed), "#1 - buy milk [deleted]");
    }

    #[tokio::test]
    async fn test_validation_failure_is_error_result() {
        let mcp = TodoMcp::new(TodoStore::open_in_memory().unwrap());

        let result = mcp
            .add_todo(Parameters(AddTodoInput {
                content: " ".into(),
            }))
            .await
            .unwrap();

        assert!(is_error(&result));
        assert_eq!(text_of(&result), TodoError::EmptyContent.to_string());
    }

    #[test]
    fn test_router_lists_five_tools() {
        let mcp = TodoMcp::new(TodoStore::open_in_memory().unwrap());
        let mut names: Vec<String> = mcp
            .tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec!["add_todo", "delete_todo", "read_todo", "restore_todo", "search_todo"]
        );
    }
}
