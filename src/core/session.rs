//! Conversation orchestration.
//!
//! [`ChatSession`] owns the transcript and serializes sends: one request
//! in flight at a time, guarded by a single `pending` flag. Mutations
//! are synchronous; the network call happens between [`ChatSession::begin_submit`]
//! and [`ChatSession::finish_submit`], either inline (see [`ChatSession::submit`])
//! or on a spawned task whose completion message returns through a
//! channel. The user turn is appended before the request is issued and
//! is kept even when the request fails — history only ever grows within
//! a conversation.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::api::{ApiError, ChatApi, ChatMessage, ChatRequest};
use crate::core::capabilities::CapabilityRegistry;
use crate::core::constants::{BASE_INSTRUCTION, MAX_TOKENS, TEMPERATURE};
use crate::core::message::{Message, Role};
use crate::core::store::{keys, SettingsStore, StoreError};

#[derive(Debug)]
pub enum SessionError {
    /// No primary API key is available; nothing was sent or recorded.
    MissingApiKey,
    /// A request is already in flight for this session.
    Busy,
    /// The request was issued and failed; the user turn stays in the
    /// transcript.
    Request(ApiError),
    Store(StoreError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::MissingApiKey => {
                write!(f, "No API key is set. Add one in the Settings tab.")
            }
            SessionError::Busy => write!(f, "A request is already in flight."),
            SessionError::Request(err) => write!(f, "failed to send message: {err}"),
            SessionError::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SessionError::Request(err) => Some(err),
            SessionError::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        SessionError::Store(err)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The exchange completed and the assistant turn was appended.
    Replied,
    /// Empty input, silently ignored.
    Ignored,
}

/// Snapshot of an accepted send, ready to be carried onto a task.
///
/// The generation ties the eventual completion back to the conversation
/// it was issued for; a reset in between makes it stale.
pub struct PendingRequest {
    pub api_key: String,
    pub request: ChatRequest,
    generation: u64,
}

impl PendingRequest {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

pub struct ChatSession {
    store: Arc<dyn SettingsStore>,
    backend: Arc<dyn ChatApi>,
    capabilities: CapabilityRegistry,
    model: String,
    transcript: Vec<Message>,
    pending: bool,
    next_id: u64,
    generation: u64,
}

impl ChatSession {
    pub fn new(
        store: Arc<dyn SettingsStore>,
        backend: Arc<dyn ChatApi>,
        capabilities: CapabilityRegistry,
        model: impl Into<String>,
    ) -> Self {
        Self {
            store,
            backend,
            capabilities,
            model: model.into(),
            transcript: Vec::new(),
            pending: false,
            next_id: 0,
            generation: 0,
        }
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Handle to the transport, for running a send on a spawned task.
    pub fn backend(&self) -> Arc<dyn ChatApi> {
        Arc::clone(&self.backend)
    }

    pub fn capabilities(&self) -> &CapabilityRegistry {
        &self.capabilities
    }

    pub fn capabilities_mut(&mut self) -> &mut CapabilityRegistry {
        &mut self.capabilities
    }

    /// Instruction text prefixed to every outbound request.
    pub fn system_directive(&self) -> String {
        let enabled = self.capabilities.enabled_summaries();
        if enabled.is_empty() {
            return BASE_INSTRUCTION.to_string();
        }
        let clauses: Vec<String> = enabled
            .iter()
            .map(|(name, summary)| format!("{name} ({summary})"))
            .collect();
        format!(
            "{BASE_INSTRUCTION} You have access to the following tools: {}.",
            clauses.join(", ")
        )
    }

    /// Validate a send and commit its user turn.
    ///
    /// Returns `Ok(None)` for trimmed-empty input. On acceptance the
    /// user message is already appended, `pending` is set, and the
    /// returned snapshot holds the complete outbound payload: system
    /// directive first, then the full transcript oldest-first, ending
    /// with the new user turn.
    pub fn begin_submit(&mut self, text: &str) -> Result<Option<PendingRequest>, SessionError> {
        let api_key = self
            .store
            .get(keys::API_KEY)?
            .ok_or(SessionError::MissingApiKey)?;

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        if self.pending {
            return Err(SessionError::Busy);
        }

        let directive = self.system_directive();
        self.push_message(Role::User, trimmed);
        self.pending = true;

        let mut messages = Vec::with_capacity(self.transcript.len() + 1);
        messages.push(ChatMessage {
            role: "system".to_string(),
            content: directive,
        });
        for msg in &self.transcript {
            messages.push(ChatMessage {
                role: msg.role.as_str().to_string(),
                content: msg.content.clone(),
            });
        }

        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        };
        tracing::debug!(
            turn = self.transcript.len(),
            generation = self.generation,
            "send accepted"
        );

        Ok(Some(PendingRequest {
            api_key,
            request,
            generation: self.generation,
        }))
    }

    /// Apply the outcome of an in-flight request.
    ///
    /// Returns `None` when the completion is stale (the conversation
    /// was reset after the request went out); the reply is discarded
    /// and nothing changes. Otherwise clears `pending` and either
    /// appends the assistant turn or reports the failure — the user
    /// turn is never rolled back.
    pub fn finish_submit(
        &mut self,
        generation: u64,
        result: Result<String, ApiError>,
    ) -> Option<Result<(), SessionError>> {
        if generation != self.generation {
            tracing::debug!(generation, "dropping completion for a reset conversation");
            return None;
        }

        self.pending = false;
        match result {
            Ok(content) => {
                self.push_message(Role::Assistant, content);
                Some(Ok(()))
            }
            Err(err) => {
                tracing::error!(error = %err, "chat request failed");
                Some(Err(SessionError::Request(err)))
            }
        }
    }

    /// Send one message and wait for the reply.
    pub async fn submit(&mut self, text: &str) -> Result<SubmitOutcome, SessionError> {
        let Some(pending) = self.begin_submit(text)? else {
            return Ok(SubmitOutcome::Ignored);
        };

        let backend = Arc::clone(&self.backend);
        let result = backend
            .complete(&pending.api_key, &pending.request)
            .await;

        match self.finish_submit(pending.generation, result) {
            Some(Ok(())) => Ok(SubmitOutcome::Replied),
            Some(Err(err)) => Err(err),
            None => Ok(SubmitOutcome::Ignored),
        }
    }

    /// Start a new conversation.
    ///
    /// Clears the transcript and invalidates any in-flight request; its
    /// eventual completion will be dropped by [`ChatSession::finish_submit`].
    /// Stores and capability state are untouched.
    pub fn reset(&mut self) {
        self.transcript.clear();
        self.pending = false;
        self.generation += 1;
        tracing::info!(generation = self.generation, "conversation reset");
    }

    fn push_message(&mut self, role: Role, content: impl Into<String>) -> &Message {
        self.next_id += 1;
        let message = Message::new(self.next_id.to_string(), role, content);
        self.transcript.push(message);
        self.transcript.last().expect("just pushed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct StubApi {
        replies: Mutex<VecDeque<Result<String, ApiError>>>,
        requests: Mutex<Vec<serde_json::Value>>,
    }

    impl StubApi {
        fn scripted(replies: Vec<Result<String, ApiError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn recorded(&self) -> Vec<serde_json::Value> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatApi for StubApi {
        async fn complete(
            &self,
            api_key: &str,
            request: &ChatRequest,
        ) -> Result<String, ApiError> {
            self.requests.lock().unwrap().push(serde_json::json!({
                "api_key": api_key,
                "body": serde_json::to_value(request).unwrap(),
            }));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ApiError::MalformedResponse("unscripted call".to_string())))
        }
    }

    fn http_500() -> ApiError {
        ApiError::Status {
            status: reqwest::StatusCode::INTERNAL_SERVER_ERROR,
            detail: "boom".to_string(),
        }
    }

    fn session_with(
        replies: Vec<Result<String, ApiError>>,
    ) -> (ChatSession, Arc<MemoryStore>, Arc<StubApi>) {
        let store = Arc::new(MemoryStore::new());
        store.set(keys::API_KEY, "sk-test").unwrap();
        let backend = StubApi::scripted(replies);
        let capabilities =
            CapabilityRegistry::load(Arc::clone(&store) as Arc<dyn SettingsStore>).unwrap();
        let session = ChatSession::new(
            Arc::clone(&store) as Arc<dyn SettingsStore>,
            Arc::clone(&backend) as Arc<dyn ChatApi>,
            capabilities,
            "gpt-4o-mini",
        );
        (session, store, backend)
    }

    #[tokio::test]
    async fn empty_input_is_silently_ignored() {
        let (mut session, _store, backend) = session_with(vec![]);
        let outcome = session.submit("   \n ").await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Ignored);
        assert!(session.transcript().is_empty());
        assert!(backend.recorded().is_empty());
    }

    #[tokio::test]
    async fn missing_key_blocks_the_send_entirely() {
        let (mut session, store, backend) = session_with(vec![Ok("never".to_string())]);
        store.remove(keys::API_KEY).unwrap();

        let err = session.submit("hello").await.unwrap_err();
        assert!(matches!(err, SessionError::MissingApiKey));
        assert!(session.transcript().is_empty());
        assert!(backend.recorded().is_empty());
        assert!(!session.is_pending());
    }

    #[tokio::test]
    async fn successful_turn_appends_user_then_assistant() {
        let (mut session, _store, _backend) = session_with(vec![Ok("Hello".to_string())]);

        let outcome = session.submit("  hi there  ").await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Replied);

        let transcript = session.transcript();
        assert_eq!(transcript.len(), 2);
        assert!(transcript[0].is_user());
        assert_eq!(transcript[0].content, "hi there");
        assert!(transcript[1].is_assistant());
        assert_eq!(transcript[1].content, "Hello");
        assert_ne!(transcript[0].id, transcript[1].id);
        assert!(!session.is_pending());
    }

    #[tokio::test]
    async fn failed_request_keeps_the_user_turn() {
        let (mut session, _store, _backend) =
            session_with(vec![Err(http_500()), Ok("recovered".to_string())]);

        let err = session.submit("first try").await.unwrap_err();
        assert!(matches!(err, SessionError::Request(ApiError::Status { .. })));

        // No rollback: the user turn stays, no assistant turn was added.
        assert_eq!(session.transcript().len(), 1);
        assert!(session.transcript()[0].is_user());
        assert!(!session.is_pending());

        // A manual resend goes through and appends to the same history.
        session.submit("second try").await.unwrap();
        assert_eq!(session.transcript().len(), 3);
    }

    #[tokio::test]
    async fn transport_failures_are_request_errors() {
        let (mut session, _store, _backend) = session_with(vec![Err(
            ApiError::MalformedResponse("no choices".to_string()),
        )]);
        let err = session.submit("hi").await.unwrap_err();
        assert!(matches!(err, SessionError::Request(_)));
        assert_eq!(session.transcript().len(), 1);
    }

    #[test]
    fn a_second_submit_while_pending_is_rejected() {
        let (mut session, _store, _backend) = session_with(vec![]);

        let pending = session.begin_submit("one").unwrap().unwrap();
        assert!(session.is_pending());
        assert!(matches!(
            session.begin_submit("two"),
            Err(SessionError::Busy)
        ));
        // The rejected submit must not have touched the transcript.
        assert_eq!(session.transcript().len(), 1);

        session
            .finish_submit(pending.generation(), Ok("done".to_string()))
            .unwrap()
            .unwrap();
        assert!(session.begin_submit("three").unwrap().is_some());
    }

    #[tokio::test]
    async fn payload_carries_directive_history_and_fixed_parameters() {
        let (mut session, _store, backend) =
            session_with(vec![Ok("four".to_string()), Ok("eight".to_string())]);
        session
            .capabilities_mut()
            .set_enabled("calculator", true)
            .unwrap();

        session.submit("2+2?").await.unwrap();
        session.submit("4+4?").await.unwrap();

        let recorded = backend.recorded();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0]["api_key"], "sk-test");

        let first = &recorded[0]["body"];
        assert_eq!(first["model"], "gpt-4o-mini");
        assert_eq!(first["max_tokens"], 1000);
        assert!((first["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
        assert_eq!(first["messages"][0]["role"], "system");
        assert_eq!(
            first["messages"][0]["content"],
            "You are a helpful AI assistant. You have access to the following tools: \
             Calculator (mathematical operations)."
        );
        assert_eq!(first["messages"][1]["role"], "user");
        assert_eq!(first["messages"][1]["content"], "2+2?");

        // Second request replays the full history, oldest first.
        let second = &recorded[1]["body"]["messages"];
        let roles: Vec<&str> = second
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["role"].as_str().unwrap())
            .collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(second[2]["content"], "four");
        assert_eq!(second[3]["content"], "4+4?");
    }

    #[test]
    fn directive_is_bare_when_nothing_is_enabled() {
        let (session, _store, _backend) = session_with(vec![]);
        assert_eq!(session.system_directive(), BASE_INSTRUCTION);
    }

    #[tokio::test]
    async fn key_is_read_on_every_send() {
        let (mut session, store, _backend) = session_with(vec![Ok("hi".to_string())]);
        session.submit("hello").await.unwrap();

        store.remove(keys::API_KEY).unwrap();
        let err = session.submit("again").await.unwrap_err();
        assert!(matches!(err, SessionError::MissingApiKey));
        // Only the successful exchange is recorded.
        assert_eq!(session.transcript().len(), 2);
    }

    #[tokio::test]
    async fn reset_clears_history_and_discards_late_replies() {
        let (mut session, _store, _backend) =
            session_with(vec![Ok("kept".to_string()), Ok("fresh".to_string())]);
        session.submit("hello").await.unwrap();
        assert_eq!(session.transcript().len(), 2);

        let pending = session.begin_submit("in flight").unwrap().unwrap();
        session.reset();
        assert!(session.transcript().is_empty());
        assert!(!session.is_pending());

        // The stale completion is dropped, not appended.
        assert!(session
            .finish_submit(pending.generation(), Ok("late".to_string()))
            .is_none());
        assert!(session.transcript().is_empty());

        // A fresh conversation contains only its own turns.
        session.submit("fresh start").await.unwrap();
        let transcript = session.transcript();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[0].content, "fresh start");
        assert_eq!(transcript[1].content, "fresh");
    }
}
