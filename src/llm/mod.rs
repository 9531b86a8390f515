//! Chat-completions transport and tool schema

pub mod client;
pub mod tools;
pub mod types;

pub use client::{ChatClient, ChatProvider};
pub use tools::{default_toolset, execute_command_tool, ExecuteCommandArgs, EXECUTE_COMMAND_TOOL};
pub use types::{
    ChatMessage, ChatRequest, ChatResponse, Choice, FunctionCall, ToolCall, Usage,
};
