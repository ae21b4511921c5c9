//! Chat agent: forwards the conversation to a chat-completions model and
//! executes the tool calls it asks for against the todo store.

use crate::config::Settings;
use crate::core::TodoStore;
use crate::error::{Result, TodoError};
use crate::tools::{ToolCall, ToolDefinition};
use async_trait::async_trait;
use reqwest::{Client, header};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const SYSTEM_PROMPT: &str = "You help the user manage their todo list. \
Use the tools to add, delete, restore, search and list todos; never guess at the list's contents. \
Deleting is reversible: deleted todos can be restored by keyword. \
Delete and restore affect every todo whose text contains the keyword, so pick a specific keyword \
or search first. Keep replies short.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A function call requested by the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments, as sent by the model
    #[serde(default)]
    pub arguments: String,
}

fn function_kind() -> String {
    "function".to_string()
}

impl ToolCallRequest {
    pub fn new(id: &str, name: &str, arguments: Value) -> Self {
        Self {
            id: id.to_string(),
            kind: function_kind(),
            function: FunctionCall {
                name: name.to_string(),
                arguments: arguments.to_string(),
            },
        }
    }
}

/// One message of the conversation, in chat-completions wire format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn with_text(role: Role, text: &str) -> Self {
        Self {
            role,
            content: Some(text.to_string()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(text: &str) -> Self {
        Self::with_text(Role::System, text)
    }

    pub fn user(text: &str) -> Self {
        Self::with_text(Role::User, text)
    }

    pub fn assistant(reply: &AssistantReply) -> Self {
        Self {
            role: Role::Assistant,
            content: reply.content.clone(),
            tool_calls: reply.tool_calls.clone(),
            tool_call_id: None,
        }
    }

    pub fn tool_result(call_id: &str, output: &str) -> Self {
        Self {
            tool_call_id: Some(call_id.to_string()),
            ..Self::with_text(Role::Tool, output)
        }
    }
}

/// What the model said back: text, tool calls, or both
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AssistantReply {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
}

impl AssistantReply {
    pub fn text(content: &str) -> Self {
        Self {
            content: Some(content.to_string()),
            tool_calls: Vec::new(),
        }
    }

    pub fn calls(tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            content: None,
            tool_calls,
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<ToolCallRequest>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<ToolCallRequest>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A language model that can answer a conversation, optionally with tool calls
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<AssistantReply>;
}

// ==================== OpenAI-compatible Client ====================

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: AssistantReply,
}

/// Client for any `/chat/completions` endpoint that speaks the OpenAI tool-calling format
#[derive(Debug, Clone)]
pub struct OpenAiChatModel {
    client: Client,
    endpoint: String,
    model: String,
}

impl OpenAiChatModel {
    pub fn new(settings: &Settings) -> Result<Self> {
        let api_key = settings
            .openai_api_key
            .as_deref()
            .ok_or(TodoError::MissingApiKey)?;

        let mut headers = header::HeaderMap::new();
        let mut auth_value = header::HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| TodoError::Agent(format!("Invalid API key format: {e}")))?;
        auth_value.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth_value);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", settings.base_url),
            model: settings.model.clone(),
        })
    }

    fn request_body(&self, messages: &[ChatMessage], tools: &[ToolDefinition]) -> Value {
        let tools: Vec<Value> = tools
            .iter()
            .map(|tool| json!({ "type": "function", "function": tool }))
            .collect();

        json!({
            "model": self.model,
            "messages": messages,
            "tools": tools,
            "tool_choice": "auto",
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<AssistantReply> {
        debug!(model = %self.model, messages = messages.len(), "requesting completion");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&self.request_body(messages, tools))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TodoError::Agent(format!(
                "model endpoint returned {status}: {body}"
            )));
        }

        let completion: CompletionResponse = response.json().await?;
        first_choice(completion)
    }
}

fn first_choice(completion: CompletionResponse) -> Result<AssistantReply> {
    completion
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or_else(|| TodoError::Agent("model returned no choices".to_string()))
}

// ==================== Agent Session ====================

/// A conversation with the model, with exclusive ownership of the store
pub struct Agent<M> {
    model: M,
    store: TodoStore,
    tools: Vec<ToolDefinition>,
    history: Vec<ChatMessage>,
    max_tool_rounds: usize,
}

impl<M: ChatModel> Agent<M> {
    pub fn new(model: M, store: TodoStore, max_tool_rounds: usize) -> Self {
        Self {
            model,
            store,
            tools: ToolCall::definitions(),
            history: vec![ChatMessage::system(SYSTEM_PROMPT)],
            max_tool_rounds,
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn store(&self) -> &TodoStore {
        &self.store
    }

    /// Give the store back, ending the session
    pub fn into_store(self) -> TodoStore {
        self.store
    }

    /// Handle one user utterance.
    ///
    /// A failed turn is dropped from the history. Store changes it already
    /// committed cannot be undone, so they are kept as a system note for the
    /// next turn.
    pub async fn respond(&mut self, input: &str) -> Result<String> {
        let checkpoint = self.history.len();
        let mut applied = Vec::new();
        let result = self.run_turn(input, &mut applied).await;
        if result.is_err() {
            self.history.truncate(checkpoint);
            if !applied.is_empty() {
                warn!(changes = applied.len(), "turn failed after changing the store");
                self.history
                    .push(ChatMessage::system(&applied_note(input, &applied)));
            }
        }
        result
    }

    async fn run_turn(&mut self, input: &str, applied: &mut Vec<String>) -> Result<String> {
        self.history.push(ChatMessage::user(input));

        let mut rounds = 0;
        loop {
            let reply = self.model.complete(&self.history, &self.tools).await?;
            self.history.push(ChatMessage::assistant(&reply));

            if reply.tool_calls.is_empty() {
                return Ok(reply.content.unwrap_or_default());
            }
            if rounds == self.max_tool_rounds {
                return Err(TodoError::ToolRoundLimit(rounds));
            }
            rounds += 1;

            for request in &reply.tool_calls {
                let output = self.dispatch(request, applied)?;
                self.history
                    .push(ChatMessage::tool_result(&request.id, &output));
            }
        }
    }

    /// Run one requested tool. Bad input goes back to the model as text; storage faults end the turn.
    /// Outputs of calls that changed the store are appended to `applied`.
    fn dispatch(&self, request: &ToolCallRequest, applied: &mut Vec<String>) -> Result<String> {
        let name = request.function.name.as_str();
        let outcome = parse_arguments(name, &request.function.arguments)
            .and_then(|args| ToolCall::parse(name, args))
            .and_then(|call| call.execute(&self.store).map(|output| (call, output)));

        match outcome {
            Ok((call, output)) => {
                info!(tool = name, "tool call succeeded");
                if call.is_mutation() {
                    applied.push(output.clone());
                }
                Ok(output)
            }
            Err(e) if e.is_validation() => {
                warn!(tool = name, error = %e, "rejected tool call");
                Ok(format!("Error: {e}"))
            }
            Err(e) => Err(e),
        }
    }
}

fn applied_note(input: &str, applied: &[String]) -> String {
    let mut note = format!(
        "The request \"{input}\" failed before a reply was given, \
         but these changes were already saved:"
    );
    for change in applied {
        note.push_str("\n- ");
        note.push_str(change);
    }
    note
}

fn parse_arguments(tool: &str, raw: &str) -> Result<Value> {
    if raw.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(raw).map_err(|e| TodoError::InvalidArguments {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}
