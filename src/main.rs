use clap::Parser;
use std::process;
use todo_chat::cli::{Cli, Commands};
use todo_chat::cli_handlers;
use todo_chat::config::Settings;
use todo_chat::tools::{AddTodoInput, KeywordInput, ReadTodoInput, SearchTodoInput, ToolCall};

#[tokio::main]
async fn main() {
    // Logs go to stderr; stdout carries chat output and MCP frames
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut settings = Settings::load();
    if let Some(db) = cli.db {
        settings.db_path = db;
    }

    let result = match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => cli_handlers::handle_chat(&settings).await,
        Commands::Add { content } => {
            cli_handlers::handle_tool(&settings, ToolCall::Add(AddTodoInput { content }))
        }
        Commands::Delete { keyword } => {
            cli_handlers::handle_tool(&settings, ToolCall::Delete(KeywordInput { keyword }))
        }
        Commands::Restore { keyword } => {
            cli_handlers::handle_tool(&settings, ToolCall::Restore(KeywordInput { keyword }))
        }
        Commands::Search { keyword_or_id } => cli_handlers::handle_tool(
            &settings,
            ToolCall::Search(SearchTodoInput { keyword_or_id }),
        ),
        Commands::List { all } => cli_handlers::handle_tool(
            &settings,
            ToolCall::Read(ReadTodoInput { show_all: all }),
        ),
        Commands::Mcp => cli_handlers::handle_mcp(&settings).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
