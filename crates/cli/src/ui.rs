use anyhow::Result;
use std::io::{self, BufRead, Write};
use timekeeper_engine::Conversation;
use timekeeper_shared::events::AgentEvent;
use timekeeper_shared::tools::toolbelts::clock;

const QUIT_COMMANDS: [&str; 3] = ["quit", "exit", "q"];

#[derive(Debug, PartialEq, Eq)]
pub enum Command<'a> {
    Quit,
    Skip,
    Message(&'a str),
}

impl<'a> Command<'a> {
    pub fn parse(line: &'a str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            Command::Skip
        } else if QUIT_COMMANDS.iter().any(|q| line.eq_ignore_ascii_case(q)) {
            Command::Quit
        } else {
            Command::Message(line)
        }
    }
}

pub fn print_banner(out: &mut impl Write, provider: &str) -> io::Result<()> {
    let rule = "=".repeat(60);
    writeln!(out, "{}", rule)?;
    writeln!(out, "Time Zone Agent - Ask me about the current time anywhere!")?;
    writeln!(out, "{}", rule)?;
    writeln!(out, "Model provider: {}", provider)?;
    writeln!(out, "Available cities: {}", clock::available_cities().join(", "))?;
    writeln!(out, "\nType 'quit' or 'exit' to end the conversation.")?;
    writeln!(out, "{}\n", rule)
}

pub async fn single_message(
    conversation: &mut Conversation,
    message: &str,
    mut out: impl Write,
) -> Result<()> {
    conversation
        .respond(message, |event| handle_event(&mut out, &event))
        .await?;
    writeln!(out)?;
    Ok(())
}

/// Reads lines until a quit command or end of input. Failed turns are
/// reported and the loop keeps going.
pub async fn interactive_chat(
    conversation: &mut Conversation,
    input: impl BufRead,
    mut out: impl Write,
) -> Result<()> {
    print_banner(&mut out, conversation.provider_name())?;
    let mut lines = input.lines();

    loop {
        write!(out, "You: ")?;
        out.flush()?;

        let Some(line) = lines.next() else {
            writeln!(out, "\nGoodbye!")?;
            break;
        };
        // A line that is not UTF-8 has already been consumed, so the session can go on.
        let line = match line {
            Ok(line) => line,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                eprintln!("\nError: input was not valid UTF-8, line ignored\n");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        match Command::parse(&line) {
            Command::Quit => {
                writeln!(out, "\nGoodbye!")?;
                break;
            }
            Command::Skip => continue,
            Command::Message(text) => {
                let result = conversation
                    .respond(text, |event| handle_event(&mut out, &event))
                    .await;

                match result {
                    Ok(_) => writeln!(out)?,
                    Err(e) => eprintln!("\nError: {}\n", e),
                }
            }
        }
    }

    Ok(())
}

fn handle_event(out: &mut impl Write, event: &AgentEvent) {
    let written = match event {
        AgentEvent::ToolCall { tool, .. } => writeln!(out, "\n[Agent is using tool: {}]", tool),
        AgentEvent::ToolResult { outcome, .. } if outcome.is_error() => {
            writeln!(out, "   ✗ {}", outcome.summary())
        }
        AgentEvent::ToolResult { outcome, .. } => writeln!(out, "   ✓ {}", outcome.summary()),
        AgentEvent::Response { content } => writeln!(out, "\nAgent: {}", content),
    };
    written.and_then(|_| out.flush()).ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use timekeeper_engine::error::Result as AgentResult;
    use timekeeper_engine::providers::{ChatProvider, ModelReply, StopReason};
    use timekeeper_engine::{AgentError, ContentBlock, LocalTools, Message, ToolCall};
    use timekeeper_shared::Tool;

    struct FakeProvider {
        replies: Mutex<VecDeque<AgentResult<ModelReply>>>,
        queries: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ChatProvider for FakeProvider {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn send(&self, _history: &[Message], _tools: &[Tool]) -> AgentResult<ModelReply> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(text_reply("(unscripted)")))
        }
    }

    fn text_reply(text: &str) -> ModelReply {
        ModelReply {
            content: vec![ContentBlock::Text { text: text.into() }],
            stop_reason: StopReason::EndTurn,
        }
    }

    fn conversation(script: Vec<AgentResult<ModelReply>>) -> (Conversation, Arc<AtomicUsize>) {
        let queries = Arc::new(AtomicUsize::new(0));
        let provider = FakeProvider {
            replies: Mutex::new(script.into()),
            queries: queries.clone(),
        };
        (Conversation::new(Box::new(provider), Box::new(LocalTools)), queries)
    }

    async fn run(conversation: &mut Conversation, input: &str) -> String {
        let mut out = Vec::new();
        interactive_chat(conversation, Cursor::new(input.to_string()), &mut out)
            .await
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("  QUIT "), Command::Quit);
        assert_eq!(Command::parse("Exit"), Command::Quit);
        assert_eq!(Command::parse("q"), Command::Quit);
        assert_eq!(Command::parse("   "), Command::Skip);
        assert_eq!(Command::parse(" quitting time? "), Command::Message("quitting time?"));
    }

    #[tokio::test]
    async fn quit_keywords_end_the_session_without_querying() {
        for keyword in ["quit", "exit", "q", "QUIT"] {
            let (mut conversation, queries) = conversation(vec![]);

            let output = run(&mut conversation, &format!("{}\nWhat time is it?\n", keyword)).await;

            assert!(output.contains("Goodbye!"), "{output}");
            assert_eq!(queries.load(Ordering::SeqCst), 0, "queried after '{keyword}'");
            assert!(conversation.history().is_empty());
        }
    }

    #[tokio::test]
    async fn end_of_input_ends_the_session() {
        let (mut conversation, queries) = conversation(vec![]);

        let output = run(&mut conversation, "\n\n").await;

        assert!(output.contains("Goodbye!"));
        assert_eq!(queries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_utf8_line_is_skipped() {
        let (mut conversation, queries) = conversation(vec![Ok(text_reply("Still here."))]);
        let mut out = Vec::new();
        let input: &[u8] = b"\xff\xfe time?\nWhat time is it in Paris?\nquit\n";

        interactive_chat(&mut conversation, Cursor::new(input), &mut out)
            .await
            .unwrap();

        let output = String::from_utf8(out).unwrap();
        assert_eq!(queries.load(Ordering::SeqCst), 1);
        assert!(output.contains("Agent: Still here."));
        assert!(output.contains("Goodbye!"));
    }

    #[tokio::test]
    async fn tool_round_is_announced_and_answer_printed() {
        let (mut conversation, queries) = conversation(vec![
            Ok(ModelReply {
                content: vec![ContentBlock::ToolCall(ToolCall {
                    id: "toolu_1".into(),
                    name: "get_current_time".into(),
                    input: json!({ "city": "tokyo" }),
                })],
                stop_reason: StopReason::ToolUse,
            }),
            Ok(text_reply("It is evening in Tokyo.")),
        ]);

        let output = run(&mut conversation, "What time is it in Tokyo?\nq\n").await;

        assert_eq!(queries.load(Ordering::SeqCst), 2);
        assert!(output.contains("Available cities: New York, London"));
        assert!(output.contains("[Agent is using tool: get_current_time]"));
        assert!(output.contains("(Asia/Tokyo)"));
        assert!(output.contains("Agent: It is evening in Tokyo."));
    }

    #[tokio::test]
    async fn api_errors_do_not_end_the_session() {
        let (mut conversation, queries) = conversation(vec![
            Err(AgentError::Api { status: 500, message: "internal".into() }),
            Ok(text_reply("Back online.")),
        ]);

        let output = run(&mut conversation, "first\nsecond\nexit\n").await;

        assert_eq!(queries.load(Ordering::SeqCst), 2);
        assert!(output.contains("Agent: Back online."));
        assert!(output.contains("Goodbye!"));
        assert_eq!(conversation.history().len(), 2);
    }

    #[tokio::test]
    async fn single_message_prints_the_answer() {
        let (mut conversation, _) = conversation(vec![Ok(text_reply("Noon."))]);
        let mut out = Vec::new();

        single_message(&mut conversation, "time in London?", &mut out).await.unwrap();

        assert!(String::from_utf8(out).unwrap().contains("Agent: Noon."));
    }
}
