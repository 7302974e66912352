//! Google Gemini `generateContent` backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use timekeeper_shared::Tool;
use tracing::debug;

use super::{post_json, ChatProvider, ModelReply, StopReason};
use crate::config::Config;
use crate::error::{AgentError, Result};
use crate::{ContentBlock, Message, Role, ToolCall};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

pub struct Gemini {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    system: String,
    base_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<GeminiTools<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
enum RequestPart<'a> {
    Text(&'a str),
    FunctionCall { name: &'a str, args: &'a Value },
    FunctionResponse { name: &'a str, response: Value },
}

#[derive(Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTools<'a> {
    function_declarations: Vec<FunctionDeclaration<'a>>,
}

#[derive(Serialize)]
struct FunctionDeclaration<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    function_call: Option<FunctionCallPart>,
}

#[derive(Deserialize)]
struct FunctionCallPart {
    id: Option<String>,
    name: String,
    #[serde(default)]
    args: Value,
}

impl Gemini {
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
    ) -> GenerateContentRequest<'a> {
        let tools = if tools.is_empty() {
            vec![]
        } else {
            vec![GeminiTools {
                function_declarations: tools
                    .iter()
                    .map(|t| FunctionDeclaration {
                        name: &t.name,
                        description: &t.description,
                        parameters: &t.input_schema,
                    })
                    .collect(),
            }]
        };

        let contents = history
            .iter()
            .map(|m| GeminiContent {
                role: match m.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                },
                parts: m.content.iter().filter_map(request_part).collect(),
            })
            .filter(|c| !c.parts.is_empty())
            .collect();

        let system_instruction = (!self.system.is_empty()).then(|| SystemInstruction {
            parts: vec![RequestPart::Text(&self.system)],
        });

        GenerateContentRequest {
            contents,
            tools,
            system_instruction,
            generation_config: GenerationConfig {
                max_output_tokens: self.max_tokens,
            },
        }
    }
}

// Function responses are matched to calls by name; ids stay local.
fn request_part(block: &ContentBlock) -> Option<RequestPart<'_>> {
    match block {
        ContentBlock::Text { text } if text.is_empty() => None,
        ContentBlock::Text { text } => Some(RequestPart::Text(text)),
        ContentBlock::ToolCall(call) => Some(RequestPart::FunctionCall {
            name: &call.name,
            args: &call.input,
        }),
        ContentBlock::ToolResult(result) => Some(RequestPart::FunctionResponse {
            name: &result.tool_name,
            response: result.outcome.to_json(),
        }),
    }
}

pub(crate) fn parse_response(response: GenerateContentResponse) -> Result<ModelReply> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .map(|r| format!("prompt blocked ({})", r))
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(AgentError::InvalidResponse {
            provider: "gemini",
            message: reason,
        });
    };

    let mut content = Vec::new();
    for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
        if let Some(text) = part.text {
            content.push(ContentBlock::Text { text });
        }
        if let Some(call) = part.function_call {
            content.push(ContentBlock::ToolCall(ToolCall {
                id: call.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                name: call.name,
                input: if call.args.is_null() { Value::Object(Default::default()) } else { call.args },
            }));
        }
    }

    let has_calls = content.iter().any(|b| matches!(b, ContentBlock::ToolCall(_)));
    let stop_reason = match candidate.finish_reason.as_deref() {
        _ if has_calls => StopReason::ToolUse,
        None | Some("STOP") => StopReason::EndTurn,
        Some("MAX_TOKENS") => StopReason::MaxTokens,
        Some(other) => StopReason::Other(other.to_string()),
    };

    Ok(ModelReply {
        content,
        stop_reason,
    })
}

#[async_trait]
impl ChatProvider for Gemini {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn send(&self, history: &[Message], tools: &[Tool]) -> Result<ModelReply> {
        let body = self.build_request(history, tools);
        debug!(model = %self.model, contents = body.contents.len(), "querying gemini");

        // Key goes in a header so it never shows up in error URLs.
        let request = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&body);

        let response: GenerateContentResponse = post_json(request).await?;
        let reply = parse_response(response)?;
        debug!(stop_reason = ?reply.stop_reason, "gemini replied");
        Ok(reply)
    }
}
