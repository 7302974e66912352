use serde_json::Value;
use timekeeper_shared::events::AgentEvent;
use timekeeper_shared::{Tool, ToolOutcome};
use tracing::{debug, info, warn};

use crate::error::{AgentError, Result};
use crate::providers::ChatProvider;
use crate::{Message, ToolCall, ToolResult};

pub(crate) const DEFAULT_MAX_TOOL_ROUNDS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    AwaitingUserInput,
    QueryingModel,
    ToolRequested,
    ExecutingTool,
    RespondingToUser,
}

/// Executes the tools the model asks for.
pub trait ToolExecutor: Send + Sync {
    fn tools(&self) -> Vec<Tool>;

    fn execute(&self, name: &str, args: &Value) -> ToolOutcome;
}

/// Dispatches to the tools registered in `timekeeper_shared::tools`.
pub struct LocalTools;

impl ToolExecutor for LocalTools {
    fn tools(&self) -> Vec<Tool> {
        timekeeper_shared::get_tools()
    }

    fn execute(&self, name: &str, args: &Value) -> ToolOutcome {
        timekeeper_shared::use_tool(name, args)
    }
}

/// Owns the message history for one session and drives the
/// query → tool → re-query cycle for each user turn.
pub struct Conversation {
    provider: Box<dyn ChatProvider>,
    tools: Box<dyn ToolExecutor>,
    history: Vec<Message>,
    state: LoopState,
    max_tool_rounds: usize,
}

impl Conversation {
    pub fn new(provider: Box<dyn ChatProvider>, tools: Box<dyn ToolExecutor>) -> Self {
        Self {
            provider,
            tools,
            history: Vec::new(),
            state: LoopState::AwaitingUserInput,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds.max(1);
        self
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Answers one user turn and returns the model's final text.
    ///
    /// A failed turn leaves the history exactly as it was before the call, so
    /// the next request is never sent with a dangling tool call.
    pub async fn respond(
        &mut self,
        input: &str,
        mut on_event: impl FnMut(AgentEvent),
    ) -> Result<String> {
        let checkpoint = self.history.len();

        let result = self.run_turn(input, &mut on_event).await;
        if let Err(e) = &result {
            warn!(error = %e, "turn failed, discarding {} messages", self.history.len() - checkpoint);
            self.history.truncate(checkpoint);
        }

        self.transition(LoopState::AwaitingUserInput);
        result
    }

    async fn run_turn(
        &mut self,
        input: &str,
        on_event: &mut impl FnMut(AgentEvent),
    ) -> Result<String> {
        self.history.push(Message::user_text(input));
        let tools = self.tools.tools();
        let mut rounds = 0;

        loop {
            self.transition(LoopState::QueryingModel);
            let reply = self.provider.send(&self.history, &tools).await?;
            let calls: Vec<ToolCall> = reply.tool_calls().cloned().collect();
            let text = reply.text();

            if !reply.content.is_empty() {
                self.history.push(Message::assistant(reply.content));
            }

            if calls.is_empty() {
                self.transition(LoopState::RespondingToUser);
                on_event(AgentEvent::Response {
                    content: text.clone(),
                });
                return Ok(text);
            }

            rounds += 1;
            if rounds > self.max_tool_rounds {
                return Err(AgentError::ToolRoundLimit(self.max_tool_rounds));
            }

            self.transition(LoopState::ToolRequested);
            let results = self.execute_calls(calls, on_event);
            self.history.push(Message::tool_results(results));
        }
    }

    // Every call from one reply must be answered before the model is queried again.
    fn execute_calls(
        &mut self,
        calls: Vec<ToolCall>,
        on_event: &mut impl FnMut(AgentEvent),
    ) -> Vec<ToolResult> {
        let mut results = Vec::with_capacity(calls.len());

        for call in calls {
            on_event(AgentEvent::ToolCall {
                tool: call.name.clone(),
                args: call.input.clone(),
            });

            self.transition(LoopState::ExecutingTool);
            let outcome = self.tools.execute(&call.name, &call.input);
            info!(tool = %call.name, id = %call.id, error = outcome.is_error(), "tool executed");

            on_event(AgentEvent::ToolResult {
                tool: call.name.clone(),
                outcome: outcome.clone(),
            });
            self.transition(LoopState::ToolRequested);

            results.push(ToolResult {
                tool_call_id: call.id,
                tool_name: call.name,
                outcome,
            });
        }

        results
    }

    fn transition(&mut self, next: LoopState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "conversation state");
            self.state = next;
        }
    }
}
