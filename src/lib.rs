pub mod agent;
pub mod cli;
pub mod cli_handlers;
pub mod config;
pub mod core;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod tools;

pub use error::{Result, TodoError};
pub use models::*;
