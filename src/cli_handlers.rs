use crate::agent::{Agent, ChatModel, OpenAiChatModel};
use crate::config::Settings;
use crate::core::TodoStore;
use crate::error::TodoError;
use crate::mcp::run_mcp_server;
use crate::tools::ToolCall;
use std::io::{self, BufRead, Write};
use tracing::error;

const PROMPT: &str = "You: ";

fn open_store(settings: &Settings) -> Result<TodoStore, TodoError> {
    TodoStore::open(&settings.db_path)
}

/// Handle the add/delete/restore/search/list commands: run one tool call and print its result
pub fn handle_tool(settings: &Settings, call: ToolCall) -> Result<(), TodoError> {
    let store = open_store(settings)?;
    let output = call.execute(&store)?;
    println!("{output}");
    store.close()
}

/// Handle the chat command
pub async fn handle_chat(settings: &Settings) -> Result<(), TodoError> {
    // Fail on a missing key before prompting
    let model = OpenAiChatModel::new(settings)?;
    let store = open_store(settings)?;
    let agent = Agent::new(model, store, settings.max_tool_rounds);

    println!("Todo assistant ready. Type 'exit' to quit.");
    let stdin = io::stdin();
    let agent = run_session(agent, stdin.lock(), &mut io::stdout()).await?;

    agent.into_store().close()
}

/// Handle the mcp command
pub async fn handle_mcp(settings: &Settings) -> Result<(), TodoError> {
    let store = open_store(settings)?;
    run_mcp_server(store).await
}

/// Read-eval-print loop. Ends on `exit` or end of input and returns the agent
/// so the caller can release the store. A failed turn is reported and the
/// session carries on.
pub async fn run_session<M, R, W>(
    mut agent: Agent<M>,
    input: R,
    output: &mut W,
) -> Result<Agent<M>, TodoError>
where
    M: ChatModel,
    R: BufRead,
    W: Write,
{
    let mut lines = input.lines();

    loop {
        write!(output, "{PROMPT}")?;
        output.flush()?;

        let Some(line) = lines.next().transpose()? else {
            writeln!(output)?;
            break;
        };
        let line = line.trim();

        if line.is_empty() {
            continue;
        }
        if line.eq_ignore_ascii_case("exit") {
            break;
        }

        match agent.respond(line).await {
            Ok(reply) => writeln!(output, "Assistant: {reply}")?,
            Err(e) => {
                error!(error = %e, "chat turn failed");
                writeln!(output, "Error: {e}")?;
            }
        }
    }

    writeln!(output, "Goodbye!")?;
    Ok(agent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::tests::ScriptedModel;
    use crate::agent::{AssistantReply, ToolCallRequest};
    use crate::tools::ADD_TODO;
    use serde_json::json;
    use std::io::Cursor;

    async fn session(script: Vec<Result<AssistantReply, TodoError>>, input: &str) -> (String, TodoStore) {
        let agent = Agent::new(
            ScriptedModel::new(script),
            TodoStore::open_in_memory().unwrap(),
            4,
        );
        let mut out = Vec::new();
        let agent = run_session(agent, Cursor::new(input.to_string()), &mut out)
            .await
            .unwrap();
        (String::from_utf8(out).unwrap(), agent.into_store())
    }

    #[tokio::test]
    async fn test_exit_is_case_insensitive_and_stops_reading() {
        let script = vec![
            Ok(AssistantReply::calls(vec![ToolCallRequest::new(
                "1",
                ADD_TODO,
                json!({ "content": "buy milk" }),
            )])),
            Ok(AssistantReply::text("Added buy milk.")),
        ];

        let (out, store) = session(script, "add buy milk\n\n  EXIT \nadd eggs\n").await;

        assert!(out.starts_with(PROMPT));
        assert!(out.contains("Assistant: Added buy milk."));
        assert!(out.ends_with("Goodbye!\n"));
        assert_eq!(store.list(true).unwrap().len(), 1);
        store.close().unwrap();
    }

    #[tokio::test]
    async fn test_failed_turn_keeps_session_alive() {
        let script = vec![
            Err(TodoError::Agent("model endpoint returned 503".into())),
            Ok(AssistantReply::text("You have no todos.")),
        ];

        let (out, _store) = session(script, "what's on my list\nwhat's on my list\n").await;

        assert!(out.contains("Error: Agent error: model endpoint returned 503"));
        assert!(out.contains("Assistant: You have no todos."));
    }

    #[tokio::test]
    async fn test_end_of_input_ends_session() {
        let (out, _store) = session(Vec::new(), "").await;
        assert_eq!(out, format!("{PROMPT}\nGoodbye!\n"));
    }
}
