//! `OpenAI` provider implementation using the `async-openai` crate.
//!
//! Supports any `OpenAI`-compatible API (`OpenAI`, Gemini's compatibility
//! endpoint, local proxies) via the base URL override in [`AgentConfig`].

use std::collections::{BTreeMap, VecDeque};

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionMessageToolCallChunk,
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessage, ChatCompletionRequestToolMessage,
    ChatCompletionRequestUserMessage, ChatCompletionResponseStream, ChatCompletionTool,
    ChatCompletionToolType, CreateChatCompletionRequest, CreateChatCompletionStreamResponse,
    FunctionCall, FunctionObject,
};
use async_trait::async_trait;
use futures_util::{StreamExt, stream};

use crate::agent::config::AgentConfig;
use crate::agent::message::{ChatMessage, ChatRequest, EngineChunk, Role};
use crate::agent::provider::{EngineStream, LlmProvider};
use crate::agent::tool::ToolCall;
use crate::error::AgentError;

/// `OpenAI`-compatible reasoning engine.
///
/// Wraps the `async-openai` client for streaming chat completions.
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
}

impl OpenAiProvider {
    /// Creates a new provider from agent configuration.
    #[must_use]
    pub fn new(config: &AgentConfig) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(&config.api_key);

        if let Some(ref base_url) = config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        Self {
            client: Client::with_config(openai_config),
        }
    }

    /// Converts our message type to the `OpenAI` SDK type.
    fn convert_message(msg: &ChatMessage) -> ChatCompletionRequestMessage {
        match msg.role {
            Role::System => {
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                    content: async_openai::types::ChatCompletionRequestSystemMessageContent::Text(
                        msg.content.clone(),
                    ),
                    name: None,
                })
            }
            Role::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: async_openai::types::ChatCompletionRequestUserMessageContent::Text(
                    msg.content.clone(),
                ),
                name: None,
            }),
            Role::Assistant => {
                let tool_calls = if msg.tool_calls.is_empty() {
                    None
                } else {
                    Some(
                        msg.tool_calls
                            .iter()
                            .map(|tc| ChatCompletionMessageToolCall {
                                id: tc.id.clone(),
                                r#type: ChatCompletionToolType::Function,
                                function: FunctionCall {
                                    name: tc.name.clone(),
                                    arguments: tc.arguments.clone(),
                                },
                            })
                            .collect(),
                    )
                };

                // An assistant message needs content or tool calls.
                let content = if msg.content.is_empty() && tool_calls.is_some() {
                    None
                } else {
                    Some(
                        async_openai::types::ChatCompletionRequestAssistantMessageContent::Text(
                            msg.content.clone(),
                        ),
                    )
                };

                #[allow(deprecated)]
                ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                    content,
                    name: None,
                    tool_calls,
                    refusal: None,
                    audio: None,
                    function_call: None,
                })
            }
            Role::Tool => ChatCompletionRequestMessage::Tool(ChatCompletionRequestToolMessage {
                content: async_openai::types::ChatCompletionRequestToolMessageContent::Text(
                    msg.content.clone(),
                ),
                tool_call_id: msg.tool_call_id.clone().unwrap_or_default(),
            }),
        }
    }

    /// Builds a streaming `OpenAI` chat completion request from our generic request.
    fn build_request(request: &ChatRequest) -> CreateChatCompletionRequest {
        let messages: Vec<_> = request.messages.iter().map(Self::convert_message).collect();

        let tools = if request.tools.is_empty() {
            None
        } else {
            Some(
                request
                    .tools
                    .iter()
                    .map(|td| ChatCompletionTool {
                        r#type: ChatCompletionToolType::Function,
                        function: FunctionObject {
                            name: td.name.clone(),
                            description: Some(td.description.clone()),
                            parameters: Some(td.parameters.clone()),
                            strict: None,
                        },
                    })
                    .collect(),
            )
        };

        CreateChatCompletionRequest {
            model: request.model.clone(),
            messages,
            temperature: request.temperature,
            max_completion_tokens: request.max_tokens,
            stream: Some(true),
            tools,
            ..Default::default()
        }
    }
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("client", &"<async-openai::Client>")
            .finish()
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn chat_stream(&self, request: &ChatRequest) -> Result<EngineStream, AgentError> {
        let openai_request = Self::build_request(request);

        let inner = self
            .client
            .chat()
            .create_stream(openai_request)
            .await
            .map_err(|e| AgentError::ApiRequest {
                message: e.to_string(),
                status: None,
            })?;

        let state = StreamState {
            inner,
            calls: ToolCallAccumulator::default(),
            pending: VecDeque::new(),
            finished: false,
        };

        let chunks = stream::unfold(state, |mut st| async move {
            loop {
                if let Some(item) = st.pending.pop_front() {
                    return Some((item, st));
                }
                if st.finished {
                    return None;
                }
                match st.inner.next().await {
                    Some(Ok(response)) => st.absorb(&response),
                    Some(Err(e)) => {
                        st.finished = true;
                        st.pending.push_back(Err(AgentError::Stream {
                            message: e.to_string(),
                        }));
                    }
                    None => {
                        st.finished = true;
                        match st.calls.finish() {
                            Ok(calls) => st
                                .pending
                                .extend(calls.into_iter().map(|c| Ok(EngineChunk::ToolCall(c)))),
                            Err(e) => st.pending.push_back(Err(e)),
                        }
                    }
                }
            }
        });

        Ok(Box::pin(chunks))
    }

    async fn health_check(&self) -> Result<(), AgentError> {
        self.client
            .models()
            .list()
            .await
            .map(|_| ())
            .map_err(|e| AgentError::ApiRequest {
                message: e.to_string(),
                status: None,
            })
    }
}

/// State threaded through the unfolded engine stream.
struct StreamState {
    inner: ChatCompletionResponseStream,
    calls: ToolCallAccumulator,
    pending: VecDeque<Result<EngineChunk, AgentError>>,
    finished: bool,
}

impl StreamState {
    fn absorb(&mut self, response: &CreateChatCompletionStreamResponse) {
        let Some(choice) = response.choices.first() else {
            return;
        };
        if let Some(fragments) = &choice.delta.tool_calls {
            for fragment in fragments {
                self.calls.push_chunk(fragment);
            }
        }
        if let Some(text) = &choice.delta.content
            && !text.is_empty()
        {
            self.pending.push_back(Ok(EngineChunk::Text(text.clone())));
        }
    }
}

// ---------------------------------------------------------------------------
// Tool-call fragment assembly
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct PartialCall {
    id: Option<String>,
    name: String,
    arguments: String,
}

/// Assembles tool calls that stream in as per-index fragments.
///
/// The first fragment for an index usually carries the id and name; later
/// fragments append argument text. Calls are released in index order once
/// the stream ends.
#[derive(Debug, Default)]
struct ToolCallAccumulator {
    calls: BTreeMap<u32, PartialCall>,
}

impl ToolCallAccumulator {
    fn push_chunk(&mut self, chunk: &ChatCompletionMessageToolCallChunk) {
        let (name, arguments) = chunk
            .function
            .as_ref()
            .map_or((None, None), |f| (f.name.as_deref(), f.arguments.as_deref()));
        self.push(chunk.index, chunk.id.as_deref(), name, arguments);
    }

    fn push(&mut self, index: u32, id: Option<&str>, name: Option<&str>, arguments: Option<&str>) {
        let entry = self.calls.entry(index).or_default();
        if let Some(id) = id.filter(|s| !s.is_empty()) {
            entry.id = Some(id.to_string());
        }
        if let Some(name) = name {
            entry.name.push_str(name);
        }
        if let Some(arguments) = arguments {
            entry.arguments.push_str(arguments);
        }
    }

    fn finish(&mut self) -> Result<Vec<ToolCall>, AgentError> {
        std::mem::take(&mut self.calls)
            .into_iter()
            .map(|(index, partial)| {
                if partial.name.is_empty() {
                    return Err(AgentError::MalformedResponse {
                        message: format!("tool call at index {index} has no function name"),
                    });
                }
                Ok(ToolCall {
                    id: partial.id.unwrap_or_else(|| format!("call_{index}")),
                    name: partial.name,
                    arguments: if partial.arguments.trim().is_empty() {
                        "{}".to_string()
                    } else {
                        partial.arguments
                    },
                })
            })
            .collect()
    }
}
