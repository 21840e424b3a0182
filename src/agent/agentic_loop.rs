//! Streaming tool-calling loop.
//!
//! Drives one user turn through engine ↔ tool round-trips: every engine
//! round is streamed, text fragments are forwarded as they arrive, and any
//! tool calls the round requested are executed in order before the next
//! round. The loop ends when a round requests no tools, when the engine
//! fails, or when the round bound is reached.
//!
//! A round's assistant turn and its tool turns are committed to the session
//! together once the round's tools have run, so a cancelled turn never
//! leaves tool calls without answers in the history.

use futures_util::StreamExt;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::config::AgentConfig;
use super::events::{StreamEvent, ToolUsage};
use super::executor::{ToolExecutor, parse_arguments};
use super::message::{ChatMessage, ChatRequest, EngineChunk, system_message};
use super::provider::LlmProvider;
use super::tool::{ToolCall, ToolRegistry};
use crate::error::AgentError;
use crate::session::{Session, SessionStore, Turn};

/// Everything a turn needs besides the session and the user's text.
pub struct LoopContext<'a> {
    /// Reasoning engine.
    pub provider: &'a dyn LlmProvider,
    /// Tools offered each round.
    pub registry: &'a ToolRegistry,
    /// Tool dispatcher.
    pub executor: &'a ToolExecutor,
    /// Model, limits and round bound.
    pub config: &'a AgentConfig,
    /// System framing sent ahead of the history.
    pub system_prompt: &'a str,
}

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// A round produced an answer without requesting tools.
    Answered,
    /// Every round requested tools; the partial answer stands.
    RoundLimit,
    /// The engine failed; an `error` event was emitted.
    EngineFailed,
}

/// Output of one engine round.
struct Round {
    text: String,
    calls: Vec<ToolCall>,
}

/// Runs one user turn against `session`, sending events to `events`.
///
/// Always finishes with a `done` event. Send failures are ignored: a
/// vanished consumer cancels the task driving this future.
pub async fn run_turn(
    ctx: &LoopContext<'_>,
    session: &mut Session,
    user_text: &str,
    events: &mpsc::Sender<StreamEvent>,
) -> TurnOutcome {
    SessionStore::append(session, Turn::user(user_text));

    let mut tools_used: Vec<ToolUsage> = Vec::new();
    let mut outcome = TurnOutcome::RoundLimit;

    for round in 0..ctx.config.max_tool_rounds {
        let request = build_request(ctx, session);
        let mut text = String::new();

        let result = stream_round(ctx, &request, &mut text, events).await;
        let round_out = match result {
            Ok(calls) => Round { text, calls },
            Err(e) => {
                warn!(round, error = %e, "engine round failed");
                if !text.is_empty() {
                    SessionStore::append(session, Turn::assistant(text, Vec::new()));
                }
                let _ = events
                    .send(StreamEvent::Error {
                        message: e.to_string(),
                    })
                    .await;
                outcome = TurnOutcome::EngineFailed;
                break;
            }
        };

        if round_out.calls.is_empty() {
            debug!(round, "engine produced a final answer");
            if round_out.text.is_empty() {
                warn!(round, "engine returned an empty answer");
            } else {
                SessionStore::append(session, Turn::assistant(round_out.text, Vec::new()));
            }
            outcome = TurnOutcome::Answered;
            break;
        }

        debug!(round, tool_count = round_out.calls.len(), "executing tool calls");

        let mut records = Vec::with_capacity(round_out.calls.len());
        for call in &round_out.calls {
            let tool_args = parse_arguments(&call.arguments).map_or_else(
                |_| Value::Object(serde_json::Map::new()),
                Value::Object,
            );
            let _ = events
                .send(StreamEvent::ToolStart {
                    tool_name: call.name.clone(),
                    tool_args: tool_args.clone(),
                })
                .await;

            debug!(tool = %call.name, label = %ctx.registry.label_for(&call.name), "running tool");
            let record = ctx.executor.execute(call).await;
            let success = record.status == crate::session::ToolCallStatus::Done;
            let error = record
                .result
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string);

            tools_used.push(ToolUsage::new(
                &call.name,
                tool_args,
                &record.result.to_string(),
            ));
            let _ = events
                .send(StreamEvent::ToolEnd {
                    tool_name: call.name.clone(),
                    success,
                    error: if success { None } else { error },
                })
                .await;
            records.push(record);
        }

        let answers: Vec<Turn> = records
            .iter()
            .map(|r| Turn::tool(r.id.clone(), r.result.clone()))
            .collect();
        SessionStore::append(session, Turn::assistant(round_out.text, records));
        for turn in answers {
            SessionStore::append(session, turn);
        }
    }

    if outcome == TurnOutcome::RoundLimit {
        warn!(
            max_tool_rounds = ctx.config.max_tool_rounds,
            "round bound reached, ending turn with partial answer"
        );
    }

    let _ = events
        .send(StreamEvent::Done {
            session_id: session.id().to_string(),
            tools_used: (!tools_used.is_empty()).then_some(tools_used),
        })
        .await;

    outcome
}

/// Streams one engine round, forwarding text as it arrives. Returns the
/// tool calls the round requested.
async fn stream_round(
    ctx: &LoopContext<'_>,
    request: &ChatRequest,
    text: &mut String,
    events: &mpsc::Sender<StreamEvent>,
) -> Result<Vec<ToolCall>, AgentError> {
    let timeout = ctx.config.timeout;
    let timed_out = || AgentError::Stream {
        message: format!("no response from engine within {}s", timeout.as_secs()),
    };

    let mut stream = tokio::time::timeout(timeout, ctx.provider.chat_stream(request))
        .await
        .map_err(|_| timed_out())??;

    let mut calls = Vec::new();
    while let Some(chunk) = tokio::time::timeout(timeout, stream.next())
        .await
        .map_err(|_| timed_out())?
    {
        match chunk? {
            EngineChunk::Text(fragment) => {
                if fragment.is_empty() {
                    continue;
                }
                text.push_str(&fragment);
                let _ = events.send(StreamEvent::text(fragment)).await;
            }
            EngineChunk::ToolCall(call) => calls.push(call),
        }
    }
    Ok(calls)
}

/// Projects the session history into an engine request.
pub fn build_request(ctx: &LoopContext<'_>, session: &Session) -> ChatRequest {
    let mut messages = Vec::with_capacity(session.turns().len() + 1);
    messages.push(system_message(ctx.system_prompt));
    messages.extend(session.turns().iter().map(turn_to_message));

    ChatRequest {
        model: ctx.config.model.clone(),
        messages,
        temperature: ctx.config.temperature,
        max_tokens: Some(ctx.config.max_tokens),
        tools: ctx.registry.descriptors().to_vec(),
    }
}

fn turn_to_message(turn: &Turn) -> ChatMessage {
    use super::message::{assistant_message, tool_message, user_message};
    use crate::session::TurnRole;

    let content = turn.content.as_text();
    match turn.role {
        TurnRole::User => user_message(&content),
        TurnRole::Assistant => {
            let calls = turn
                .tool_calls
                .iter()
                .map(|r| ToolCall {
                    id: r.id.clone(),
                    name: r.name.clone(),
                    arguments: Value::Object(r.arguments.clone()).to_string(),
                })
                .collect();
            assistant_message(&content, calls)
        }
        TurnRole::Tool => tool_message(turn.tool_call_id.as_deref().unwrap_or_default(), &content),
    }
}
