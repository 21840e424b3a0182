//! Scripted engine and adapter shared by the integration tests.

#![allow(dead_code, clippy::panic)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::StreamExt;
use openfda_chat::agent::{
    AgentConfig, ChatRequest, EngineChunk, EngineStream, LlmProvider, Orchestrator, PromptSet,
    Role, StreamEvent, ToolCall, ToolRegistry, TurnStream,
};
use openfda_chat::error::{AgentError, FdaError};
use openfda_chat::fda::{AdapterResponse, DataSource};
use serde_json::{Map, Value};

/// One item a scripted engine round yields.
#[derive(Debug, Clone)]
pub enum Step {
    Text(&'static str),
    Call(&'static str, &'static str),
    Fail(&'static str),
}

/// Engine whose output depends only on how many assistant rounds have run
/// since the last user message, so replays are deterministic.
///
/// Rounds past the end of the script repeat the last round.
pub struct ScriptedEngine {
    rounds: Vec<Vec<Step>>,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedEngine {
    pub fn new(rounds: Vec<Vec<Step>>) -> Self {
        Self {
            rounds,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| panic!("{e}")).len()
    }

    pub fn last_request(&self) -> ChatRequest {
        self.requests
            .lock()
            .unwrap_or_else(|e| panic!("{e}"))
            .last()
            .cloned()
            .unwrap_or_else(|| panic!("engine was never called"))
    }
}

fn rounds_since_user(request: &ChatRequest) -> usize {
    request
        .messages
        .iter()
        .rev()
        .take_while(|m| m.role != Role::User)
        .filter(|m| m.role == Role::Assistant)
        .count()
}

#[async_trait]
impl LlmProvider for ScriptedEngine {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn chat_stream(&self, request: &ChatRequest) -> Result<EngineStream, AgentError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| panic!("{e}"))
            .push(request.clone());

        let index = rounds_since_user(request).min(self.rounds.len().saturating_sub(1));
        let round = self.rounds.get(index).cloned().unwrap_or_default();
        let items: Vec<Result<EngineChunk, AgentError>> = round
            .into_iter()
            .enumerate()
            .map(|(i, step)| match step {
                Step::Text(text) => Ok(EngineChunk::Text(text.to_string())),
                Step::Call(name, args) => Ok(EngineChunk::ToolCall(ToolCall {
                    id: format!("call_{index}_{i}"),
                    name: name.to_string(),
                    arguments: args.to_string(),
                })),
                Step::Fail(message) => Err(AgentError::Stream {
                    message: message.to_string(),
                }),
            })
            .collect();
        Ok(futures_util::stream::iter(items).boxed())
    }

    async fn health_check(&self) -> Result<(), AgentError> {
        Ok(())
    }
}

/// Adapter that answers every tool with the same response and records
/// the calls it received.
pub struct ScriptedSource {
    response: AdapterResponse,
    pub calls: Mutex<Vec<(String, Map<String, Value>)>>,
}

impl ScriptedSource {
    pub fn new(response: AdapterResponse) -> Self {
        Self {
            response,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, Map<String, Value>)> {
        self.calls.lock().unwrap_or_else(|e| panic!("{e}")).clone()
    }
}

#[async_trait]
impl DataSource for ScriptedSource {
    async fn call(&self, tool: &str, args: &Map<String, Value>) -> AdapterResponse {
        self.calls
            .lock()
            .unwrap_or_else(|e| panic!("{e}"))
            .push((tool.to_string(), args.clone()));
        self.response.clone()
    }

    async fn health_check(&self) -> Result<(), FdaError> {
        if self.response.success {
            Ok(())
        } else {
            Err(FdaError::Timeout)
        }
    }
}

pub fn orchestrator(
    engine: Arc<ScriptedEngine>,
    source: Arc<ScriptedSource>,
    max_tool_rounds: usize,
) -> Orchestrator {
    let config = AgentConfig::builder()
        .api_key("test-key")
        .max_tool_rounds(max_tool_rounds)
        .build()
        .unwrap_or_else(|e| panic!("{e}"));
    Orchestrator::with_parts(
        engine,
        source,
        ToolRegistry::fda(),
        config,
        PromptSet::defaults(),
    )
}

pub async fn drain(stream: TurnStream) -> Vec<StreamEvent> {
    stream.collect().await
}

pub fn names(events: &[StreamEvent]) -> Vec<&'static str> {
    events.iter().map(StreamEvent::name).collect()
}
