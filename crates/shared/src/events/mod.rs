use serde::{Deserialize, Serialize};

use crate::schemas::ToolOutcome;

/// Progress notifications the conversation loop emits while answering a turn.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    ToolCall {
        tool: String,
        args: serde_json::Value,
    },
    ToolResult {
        tool: String,
        outcome: ToolOutcome,
    },
    Response {
        content: String,
    },
}
