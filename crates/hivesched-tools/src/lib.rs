//! # Hivesched Tools
//!
//! The tool catalogue the reasoning backend can call from the
//! query-for-update loop: read-only queries against the drone data
//! store, plus the two terminal tools that end the loop
//! (`send_message`, `skip_message`).

pub mod drone_tools;

use hivesched_core::traits::Tool;
use hivesched_core::types::ToolDefinition;

pub use drone_tools::{QueryToolContext, query_tools};

/// Terminal tool: submits a message and ends the loop.
pub const SEND_MESSAGE: &str = "send_message";
/// Terminal tool: ends the loop without sending anything.
pub const SKIP_MESSAGE: &str = "skip_message";

/// Whether a tool call ends the agentic loop.
pub fn is_terminal(name: &str) -> bool {
    name == SEND_MESSAGE || name == SKIP_MESSAGE
}

/// Find a tool by name from a list.
pub fn find_tool<'a>(tools: &'a [Box<dyn Tool>], name: &str) -> Option<&'a dyn Tool> {
    tools.iter().find(|t| t.name() == name).map(|t| t.as_ref())
}

/// Get all tool definitions from a list.
pub fn list_definitions(tools: &[Box<dyn Tool>]) -> Vec<ToolDefinition> {
    tools.iter().map(|t| t.definition()).collect()
}
