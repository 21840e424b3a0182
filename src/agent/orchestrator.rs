//! Orchestrator for streamed chat turns.
//!
//! Owns the long-lived collaborators (engine, tool registry, data source,
//! prompts) and turns `(session, user text)` into a lazy [`TurnStream`] of
//! [`StreamEvent`]s. Each turn runs on its own task; dropping the stream
//! cancels the task, which aborts the in-flight engine or adapter call and
//! releases the session.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::{Stream, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{Instrument, debug, error, info_span};

use super::agentic_loop::{LoopContext, run_turn};
use super::config::AgentConfig;
use super::events::{StreamEvent, ToolUsage};
use super::executor::ToolExecutor;
use super::prompt::PromptSet;
use super::provider::LlmProvider;
use super::tool::ToolRegistry;
use crate::error::AgentError;
use crate::fda::DataSource;
use crate::session::SessionLease;

/// Longest accepted user message, in bytes.
pub const MAX_MESSAGE_LEN: usize = 10_000;

/// Events buffered between the turn task and a slow consumer.
const EVENT_BUFFER: usize = 64;

/// `error` message sent when the turn task dies before finishing.
pub const TURN_ABORTED: &str = "internal error: the turn stopped unexpectedly";

/// Checks a user message before a turn starts.
///
/// # Errors
///
/// Returns [`AgentError::Orchestration`] if the message is blank or longer
/// than [`MAX_MESSAGE_LEN`] bytes.
pub fn validate_message(message: &str) -> Result<(), AgentError> {
    if message.trim().is_empty() {
        return Err(AgentError::Orchestration {
            message: "Message cannot be empty".to_string(),
        });
    }
    if message.len() > MAX_MESSAGE_LEN {
        return Err(AgentError::Orchestration {
            message: format!(
                "Message exceeds maximum length ({} bytes, max {MAX_MESSAGE_LEN})",
                message.len()
            ),
        });
    }
    Ok(())
}

/// Runs chat turns against a reasoning engine and a data source.
///
/// Cheap to clone; clones share the same collaborators.
#[derive(Clone)]
pub struct Orchestrator {
    provider: Arc<dyn LlmProvider>,
    registry: Arc<ToolRegistry>,
    executor: ToolExecutor,
    config: Arc<AgentConfig>,
    prompts: Arc<PromptSet>,
}

impl Orchestrator {
    /// Creates an orchestrator offering the openFDA tool catalogue.
    ///
    /// Loads the system prompt from [`AgentConfig::prompt_dir`], falling
    /// back to the compiled-in default.
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        data_source: Arc<dyn DataSource>,
        config: AgentConfig,
    ) -> Self {
        let prompts = PromptSet::load(config.prompt_dir.as_deref());
        Self::with_parts(provider, data_source, ToolRegistry::fda(), config, prompts)
    }

    /// Creates an orchestrator from explicit parts.
    pub fn with_parts(
        provider: Arc<dyn LlmProvider>,
        data_source: Arc<dyn DataSource>,
        registry: ToolRegistry,
        config: AgentConfig,
        prompts: PromptSet,
    ) -> Self {
        let registry = Arc::new(registry);
        Self {
            executor: ToolExecutor::new(data_source, Arc::clone(&registry)),
            provider,
            registry,
            config: Arc::new(config),
            prompts: Arc::new(prompts),
        }
    }

    /// The reasoning engine.
    #[must_use]
    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    /// The tools offered to the engine.
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Starts a turn and returns its event stream.
    ///
    /// The user message is appended to `session` immediately when the task
    /// starts; the session stays locked until the stream finishes or is
    /// dropped. Must be called inside a Tokio runtime.
    #[must_use]
    pub fn handle_turn(&self, mut session: SessionLease, user_text: String) -> TurnStream {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let cancel = CancellationToken::new();
        let cancelled = cancel.clone();
        let this = self.clone();
        let session_id = session.id().to_string();
        let span = info_span!("turn", %session_id);
        let turn_tx = tx.clone();

        let worker = tokio::spawn(
            async move {
                let ctx = LoopContext {
                    provider: this.provider.as_ref(),
                    registry: &this.registry,
                    executor: &this.executor,
                    config: &this.config,
                    system_prompt: &this.prompts.system,
                };
                tokio::select! {
                    () = cancelled.cancelled() => debug!("turn cancelled by client"),
                    outcome = run_turn(&ctx, &mut session, &user_text, &turn_tx) => {
                        debug!(?outcome, "turn finished");
                    }
                }
            }
            .instrument(span.clone()),
        );

        // A task that dies mid-turn still ends the stream with error and done.
        tokio::spawn(
            async move {
                if let Err(e) = worker.await {
                    error!(error = %e, "turn task failed");
                    let _ = tx
                        .send(StreamEvent::Error {
                            message: TURN_ABORTED.to_string(),
                        })
                        .await;
                    let _ = tx
                        .send(StreamEvent::Done {
                            session_id,
                            tools_used: None,
                        })
                        .await;
                }
            }
            .instrument(span),
        );

        TurnStream {
            events: ReceiverStream::new(rx),
            _cancel_on_drop: cancel.drop_guard(),
        }
    }

    /// Runs a turn to completion and collects its events.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Stream`] if the engine failed; partial text
    /// is still stored in the session.
    pub async fn complete_turn(
        &self,
        session: SessionLease,
        user_text: String,
    ) -> Result<TurnReply, AgentError> {
        TurnReply::collect(self.handle_turn(session, user_text)).await
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("provider", &self.provider.name())
            .field("tools", &self.registry.len())
            .field("model", &self.config.model)
            .field("max_tool_rounds", &self.config.max_tool_rounds)
            .finish_non_exhaustive()
    }
}

/// Lazy stream of events for one turn.
///
/// Dropping it before the end cancels the turn.
pub struct TurnStream {
    events: ReceiverStream<StreamEvent>,
    _cancel_on_drop: DropGuard,
}

impl Stream for TurnStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.poll_next_unpin(cx)
    }
}

/// A finished turn, as returned by the non-streaming endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnReply {
    /// Full answer text.
    pub response: String,
    /// Session the turn ran in.
    pub session_id: String,
    /// Lookups run during the turn; `null` when none ran.
    pub tools_used: Option<Vec<ToolUsage>>,
}

impl TurnReply {
    /// Drains a turn stream into a reply.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Stream`] carrying the message of the first
    /// `error` event, or [`AgentError::TurnAborted`] if the stream ended
    /// without `done`.
    pub async fn collect<S>(mut events: S) -> Result<Self, AgentError>
    where
        S: Stream<Item = StreamEvent> + Unpin,
    {
        let mut response = String::new();
        let mut failure = None;
        let mut finished = None;

        while let Some(event) = events.next().await {
            match event {
                StreamEvent::TextDelta { text } => response.push_str(&text),
                StreamEvent::Error { message } => {
                    failure.get_or_insert(message);
                }
                StreamEvent::Done {
                    session_id,
                    tools_used,
                } => finished = Some((session_id, tools_used)),
                StreamEvent::ToolStart { .. } | StreamEvent::ToolEnd { .. } => {}
            }
        }

        if let Some(message) = failure {
            return Err(AgentError::Stream { message });
        }
        let (session_id, tools_used) = finished.ok_or_else(|| AgentError::TurnAborted {
            message: "turn ended without a done event".to_string(),
        })?;
        Ok(Self {
            response,
            session_id,
            tools_used,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::message::{ChatRequest, EngineChunk};
    use crate::agent::provider::EngineStream;
    use crate::error::FdaError;
    use crate::fda::AdapterResponse;
    use crate::session::SessionStore;

    use async_trait::async_trait;
    use serde_json::{Map, Value};
    use test_case::test_case;

    struct EchoProvider;

    #[async_trait]
    impl LlmProvider for EchoProvider {
        fn name(&self) -> &'static str {
            "echo"
        }

        async fn chat_stream(&self, request: &ChatRequest) -> Result<EngineStream, AgentError> {
            let last = request
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            Ok(Box::pin(futures_util::stream::iter(vec![Ok(
                EngineChunk::Text(format!("echo: {last}")),
            )])))
        }

        async fn health_check(&self) -> Result<(), AgentError> {
            Ok(())
        }
    }

    /// Never yields, so the turn hangs until cancelled.
    struct StalledProvider;

    #[async_trait]
    impl LlmProvider for StalledProvider {
        fn name(&self) -> &'static str {
            "stalled"
        }

        async fn chat_stream(&self, _request: &ChatRequest) -> Result<EngineStream, AgentError> {
            Ok(Box::pin(futures_util::stream::pending()))
        }

        async fn health_check(&self) -> Result<(), AgentError> {
            Ok(())
        }
    }

    /// Panics instead of answering.
    struct PanickingProvider;

    #[async_trait]
    impl LlmProvider for PanickingProvider {
        fn name(&self) -> &'static str {
            "panicking"
        }

        async fn chat_stream(&self, _request: &ChatRequest) -> Result<EngineStream, AgentError> {
            panic!("engine client bug");
        }

        async fn health_check(&self) -> Result<(), AgentError> {
            Ok(())
        }
    }

    /// Asks for one label lookup on every round.
    struct LookupProvider;

    #[async_trait]
    impl LlmProvider for LookupProvider {
        fn name(&self) -> &'static str {
            "lookup"
        }

        async fn chat_stream(&self, _request: &ChatRequest) -> Result<EngineStream, AgentError> {
            Ok(Box::pin(futures_util::stream::iter(vec![Ok(
                EngineChunk::ToolCall(crate::agent::tool::ToolCall {
                    id: "call_0".to_string(),
                    name: "get_drug_label".to_string(),
                    arguments: r#"{"term":"Lisinopril"}"#.to_string(),
                }),
            )])))
        }

        async fn health_check(&self) -> Result<(), AgentError> {
            Ok(())
        }
    }

    /// Never answers a lookup.
    struct HangingSource;

    #[async_trait]
    impl DataSource for HangingSource {
        async fn call(&self, _tool: &str, _args: &Map<String, Value>) -> AdapterResponse {
            futures_util::future::pending().await
        }

        async fn health_check(&self) -> Result<(), FdaError> {
            Ok(())
        }
    }

    struct NoSource;

    #[async_trait]
    impl DataSource for NoSource {
        async fn call(&self, _tool: &str, _args: &Map<String, Value>) -> AdapterResponse {
            AdapterResponse::failure("offline")
        }

        async fn health_check(&self) -> Result<(), FdaError> {
            Err(FdaError::Timeout)
        }
    }

    fn orchestrator(provider: Arc<dyn LlmProvider>) -> Orchestrator {
        orchestrator_with(provider, Arc::new(NoSource))
    }

    fn orchestrator_with(provider: Arc<dyn LlmProvider>, source: Arc<dyn DataSource>) -> Orchestrator {
        let config = AgentConfig::builder()
            .api_key("test")
            .build()
            .unwrap_or_else(|_| unreachable!());
        Orchestrator::with_parts(
            provider,
            source,
            ToolRegistry::fda(),
            config,
            PromptSet::defaults(),
        )
    }

    #[test_case("" ; "empty")]
    #[test_case("   \n" ; "whitespace")]
    fn test_blank_message_rejected(message: &str) {
        assert!(validate_message(message).is_err());
    }

    #[test]
    fn test_message_length_limit() {
        assert!(validate_message(&"a".repeat(MAX_MESSAGE_LEN)).is_ok());
        assert!(validate_message(&"a".repeat(MAX_MESSAGE_LEN + 1)).is_err());
    }

    #[tokio::test]
    async fn test_complete_turn_collects_text() {
        let orch = orchestrator(Arc::new(EchoProvider));
        let store = SessionStore::new();
        let lease = store
            .get_or_create(Some("s1"))
            .unwrap_or_else(|e| panic!("{e}"));
        let reply = orch
            .complete_turn(lease, "hello".to_string())
            .await
            .unwrap_or_else(|e| panic!("turn failed: {e}"));
        assert_eq!(reply.response, "echo: hello");
        assert_eq!(reply.session_id, "s1");
        assert!(reply.tools_used.is_none());
    }

    #[tokio::test]
    async fn test_dropping_stream_releases_session() {
        let orch = orchestrator(Arc::new(StalledProvider));
        let store = SessionStore::new();
        let lease = store
            .get_or_create(Some("s1"))
            .unwrap_or_else(|e| panic!("{e}"));
        let stream = orch.handle_turn(lease, "hello".to_string());
        tokio::task::yield_now().await;
        assert!(store.get_or_create(Some("s1")).is_err());

        drop(stream);
        assert!(
            wait_for_release(&store, "s1").await,
            "session still locked after the stream was dropped"
        );
    }

    async fn wait_for_release(store: &SessionStore, id: &str) -> bool {
        for _ in 0..100 {
            if store.get_or_create(Some(id)).is_ok() {
                return true;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        false
    }

    #[tokio::test]
    async fn test_dropping_stream_during_lookup_releases_session() {
        let orch = orchestrator_with(Arc::new(LookupProvider), Arc::new(HangingSource));
        let store = SessionStore::new();
        let lease = store
            .get_or_create(Some("s1"))
            .unwrap_or_else(|e| panic!("{e}"));
        let mut stream = orch.handle_turn(lease, "Is Lisinopril safe?".to_string());

        match stream.next().await {
            Some(StreamEvent::ToolStart { tool_name, .. }) => assert_eq!(tool_name, "get_drug_label"),
            other => panic!("expected tool_start, got {other:?}"),
        }
        assert!(store.get_or_create(Some("s1")).is_err());

        drop(stream);
        assert!(
            wait_for_release(&store, "s1").await,
            "session still locked after the stream was dropped mid-lookup"
        );
    }

    #[tokio::test]
    async fn test_task_failure_ends_with_error_then_done() {
        let orch = orchestrator(Arc::new(PanickingProvider));
        let store = SessionStore::new();
        let lease = store
            .get_or_create(Some("s1"))
            .unwrap_or_else(|e| panic!("{e}"));
        let events: Vec<StreamEvent> = orch.handle_turn(lease, "hello".to_string()).collect().await;

        let names: Vec<&str> = events.iter().map(StreamEvent::name).collect();
        assert_eq!(names, vec!["error", "done"]);
        assert!(matches!(
            &events[0],
            StreamEvent::Error { message } if message == TURN_ABORTED
        ));
        assert!(wait_for_release(&store, "s1").await);
    }

    #[tokio::test]
    async fn test_collect_without_done_is_aborted() {
        let events = futures_util::stream::iter(vec![StreamEvent::text("partial")]);
        let err = TurnReply::collect(events)
            .await
            .err()
            .unwrap_or_else(|| panic!("expected failure"));
        assert!(matches!(err, AgentError::TurnAborted { .. }));
    }

    #[tokio::test]
    async fn test_collect_reports_engine_failure() {
        let events = futures_util::stream::iter(vec![
            StreamEvent::text("partial"),
            StreamEvent::Error {
                message: "quota exceeded".to_string(),
            },
            StreamEvent::Done {
                session_id: "s1".to_string(),
                tools_used: None,
            },
        ]);
        let err = TurnReply::collect(events)
            .await
            .err()
            .unwrap_or_else(|| panic!("expected failure"));
        assert!(err.to_string().contains("quota exceeded"));
    }
}
