//! Anthropic Messages API backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use timekeeper_shared::Tool;
use tracing::debug;

use super::{post_json, ChatProvider, ModelReply, StopReason};
use crate::config::Config;
use crate::error::Result;
use crate::{ContentBlock, Message, Role, ToolCall};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

pub struct Anthropic {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    system: String,
    base_url: String,
}

#[derive(Serialize)]
pub(crate) struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "str::is_empty")]
    system: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<AnthropicTool<'a>>,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Serialize)]
struct AnthropicTool<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a Value,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'static str,
    content: Vec<RequestBlock<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RequestBlock<'a> {
    Text {
        text: &'a str,
    },
    ToolUse {
        id: &'a str,
        name: &'a str,
        input: &'a Value,
    },
    ToolResult {
        tool_use_id: &'a str,
        content: String,
        is_error: bool,
    },
}

#[derive(Deserialize)]
pub(crate) struct MessagesResponse {
    content: Vec<ResponseBlock>,
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Other,
}

impl Anthropic {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            system: config.system_prompt.clone(),
            base_url: config.base_url.clone(),
        }
    }

    pub(crate) fn build_request<'a>(
        &'a self,
        history: &'a [Message],
        tools: &'a [Tool],
    ) -> MessagesRequest<'a> {
        let tools = tools
            .iter()
            .map(|t| AnthropicTool {
                name: &t.name,
                description: &t.description,
                input_schema: &t.input_schema,
            })
            .collect();

        let messages = history
            .iter()
            .map(|m| AnthropicMessage {
                role: match m.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                },
                content: m.content.iter().filter_map(request_block).collect(),
            })
            .filter(|m| !m.content.is_empty())
            .collect();

        MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: &self.system,
            tools,
            messages,
        }
    }
}

// Empty text blocks are rejected by the API, so they are dropped.
fn request_block(block: &ContentBlock) -> Option<RequestBlock<'_>> {
    match block {
        ContentBlock::Text { text } if text.is_empty() => None,
        ContentBlock::Text { text } => Some(RequestBlock::Text { text }),
        ContentBlock::ToolCall(call) => Some(RequestBlock::ToolUse {
            id: &call.id,
            name: &call.name,
            input: &call.input,
        }),
        ContentBlock::ToolResult(result) => Some(RequestBlock::ToolResult {
            tool_use_id: &result.tool_call_id,
            content: result.outcome.to_json().to_string(),
            is_error: result.outcome.is_error(),
        }),
    }
}

pub(crate) fn parse_response(response: MessagesResponse) -> ModelReply {
    let content = response
        .content
        .into_iter()
        .filter_map(|block| match block {
            ResponseBlock::Text { text } => Some(ContentBlock::Text { text }),
            ResponseBlock::ToolUse { id, name, input } => {
                Some(ContentBlock::ToolCall(ToolCall { id, name, input }))
            }
            ResponseBlock::Other => None,
        })
        .collect();

    let stop_reason = match response.stop_reason.as_deref() {
        None | Some("end_turn") | Some("stop_sequence") => StopReason::EndTurn,
        Some("tool_use") => StopReason::ToolUse,
        Some("max_tokens") => StopReason::MaxTokens,
        Some(other) => StopReason::Other(other.to_string()),
    };

    ModelReply {
        content,
        stop_reason,
    }
}

#[async_trait]
impl ChatProvider for Anthropic {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    async fn send(&self, history: &[Message], tools: &[Tool]) -> Result<ModelReply> {
        let body = self.build_request(history, tools);
        debug!(model = %self.model, messages = body.messages.len(), "querying anthropic");

        let request = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body);

        let response: MessagesResponse = post_json(request).await?;
        let reply = parse_response(response);
        debug!(stop_reason = ?reply.stop_reason, "anthropic replied");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProviderKind, Settings};
    use crate::ToolResult;
    use serde_json::json;
    use timekeeper_shared::ToolOutcome;

    fn provider() -> Anthropic {
        let config = Config::from_lookup(
            Settings {
                provider: ProviderKind::Anthropic,
                model: Some("claude-test".into()),
                max_tokens: Some(64),
            },
            |key| (key == "ANTHROPIC_API_KEY").then(|| "k".to_string()),
        )
        .unwrap();
        Anthropic::new(Client::new(), &config)
    }

    #[test]
    fn request_carries_tools_and_block_history() {
        let provider = provider();
        let tools = timekeeper_shared::get_tools();
        let history = vec![
            Message::user_text("What time is it in Tokyo?"),
            Message::assistant(vec![
                ContentBlock::Text { text: String::new() },
                ContentBlock::ToolCall(ToolCall {
                    id: "toolu_1".into(),
                    name: "get_current_time".into(),
                    input: json!({ "city": "Tokyo" }),
                }),
            ]),
            Message::tool_results(vec![ToolResult {
                tool_call_id: "toolu_1".into(),
                tool_name: "get_current_time".into(),
                outcome: ToolOutcome::error("boom"),
            }]),
        ];

        let body = serde_json::to_value(provider.build_request(&history, &tools)).unwrap();

        assert_eq!(body["model"], "claude-test");
        assert_eq!(body["max_tokens"], 64);
        assert!(body["system"].as_str().unwrap().contains("time zone assistant"));
        assert_eq!(body["tools"][0]["name"], "get_current_time");
        assert_eq!(body["tools"][0]["input_schema"]["type"], "object");

        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages[0], json!({
            "role": "user",
            "content": [{ "type": "text", "text": "What time is it in Tokyo?" }]
        }));
        assert_eq!(messages[1]["content"].as_array().unwrap().len(), 1);
        assert_eq!(messages[1]["content"][0], json!({
            "type": "tool_use", "id": "toolu_1", "name": "get_current_time", "input": { "city": "Tokyo" }
        }));
        assert_eq!(messages[2]["role"], "user");
        assert_eq!(messages[2]["content"][0]["type"], "tool_result");
        assert_eq!(messages[2]["content"][0]["tool_use_id"], "toolu_1");
        assert_eq!(messages[2]["content"][0]["is_error"], true);
        let payload: Value =
            serde_json::from_str(messages[2]["content"][0]["content"].as_str().unwrap()).unwrap();
        assert_eq!(payload, json!({ "status": "error", "error_message": "boom" }));
    }

    #[test]
    fn tools_are_omitted_when_none_registered() {
        let provider = provider();
        let history = vec![Message::user_text("hi")];
        let body = serde_json::to_value(provider.build_request(&history, &[])).unwrap();
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn parses_tool_use_response() {
        let raw = json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "content": [
                { "type": "text", "text": "Let me check." },
                { "type": "tool_use", "id": "toolu_a", "name": "get_current_time", "input": { "city": "London" } },
                { "type": "tool_use", "id": "toolu_b", "name": "get_current_time", "input": { "city": "Paris" } }
            ],
            "stop_reason": "tool_use"
        });

        let reply = parse_response(serde_json::from_value(raw).unwrap());

        assert_eq!(reply.stop_reason, StopReason::ToolUse);
        assert_eq!(reply.text(), "Let me check.");
        let ids: Vec<_> = reply.tool_calls().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["toolu_a", "toolu_b"]);
    }

    #[test]
    fn unknown_blocks_and_reasons_are_tolerated() {
        let raw = json!({
            "content": [
                { "type": "thinking", "thinking": "hmm", "signature": "x" },
                { "type": "text", "text": "It is noon." }
            ],
            "stop_reason": "pause_turn"
        });

        let reply = parse_response(serde_json::from_value(raw).unwrap());

        assert_eq!(reply.content.len(), 1);
        assert_eq!(reply.stop_reason, StopReason::Other("pause_turn".into()));
    }
}
