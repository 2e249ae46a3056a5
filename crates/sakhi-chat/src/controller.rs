//! Conversation controller: sequences user turns through the transport.
//!
//! Owns the session state, the message log and the pending-input fields a
//! front end edits. Submissions are neither queued nor cancelled: two turns
//! in flight resolve in arrival order, and the reply that lands last becomes
//! the session's previous response.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::broadcast;

use sakhi_core::config::ChatConfig;
use sakhi_core::events::ConversationEvent;
use sakhi_core::types::{AttachmentInfo, ChatMessage, FileRef, Turn, TurnContent};

use crate::log::MessageLog;
use crate::normalizer::normalize;
use crate::session::SessionState;
use crate::transport::{ChatTransport, TurnReply, TurnRequest};

/// Capacity of the event broadcast channel.
const EVENT_CAPACITY: usize = 256;

/// Result of one submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Blank input without a file; nothing was sent or logged.
    Rejected,
    /// The service answered; `session` is the state after recording the reply.
    Replied {
        display_text: String,
        session: SessionState,
    },
    /// The round trip failed; the apology was logged and `session` is unchanged.
    Failed { session: SessionState },
}

/// Mutable state of one conversation.
struct Conversation {
    session: SessionState,
    log: MessageLog,
    loading: bool,
    input: String,
    selected_doc_type: Option<String>,
}

/// Orchestrates user turns, transport calls, normalization and session
/// continuity for a single conversation.
pub struct ConversationController<T> {
    transport: T,
    config: ChatConfig,
    state: Mutex<Conversation>,
    events: broadcast::Sender<ConversationEvent>,
}

impl<T: ChatTransport> ConversationController<T> {
    /// Start a conversation and log the configured greeting.
    pub fn new(transport: T, config: ChatConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let mut log = MessageLog::new();
        log.push(ChatMessage::assistant(config.greeting.clone()));
        let session = SessionState::new();
        tracing::info!(session_id = %session.session_id(), "Conversation started");

        Self {
            transport,
            config,
            state: Mutex::new(Conversation {
                session,
                log,
                loading: false,
                input: String::new(),
                selected_doc_type: None,
            }),
            events,
        }
    }

    /// Receive every state change from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ConversationEvent> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Snapshot of the session state.
    pub fn session(&self) -> SessionState {
        self.lock().session.clone()
    }

    /// Snapshot of the log.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.lock().log.entries().to_vec()
    }

    /// Text of the newest assistant entry.
    pub fn last_assistant_text(&self) -> Option<String> {
        self.lock().log.last_assistant().map(|m| m.text.clone())
    }

    /// Whether a submission is awaiting its reply.
    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    /// Pending user input.
    pub fn input(&self) -> String {
        self.lock().input.clone()
    }

    pub fn set_input(&self, text: impl Into<String>) {
        self.lock().input = text.into();
    }

    /// Choose the category attached to the next uploaded file.
    pub fn select_document_type(&self, doc_type: impl Into<String>) {
        self.lock().selected_doc_type = Some(doc_type.into());
    }

    pub fn selected_document_type(&self) -> Option<String> {
        self.lock().selected_doc_type.clone()
    }

    /// Send the pending input, or `file` with the selected document type.
    pub async fn send(&self, file: Option<FileRef>) -> SubmitOutcome {
        let turn = {
            let conv = self.lock();
            match file {
                Some(file) => Turn::user_file(file, conv.selected_doc_type.clone()),
                None => Turn::user_text(conv.input.clone()),
            }
        };
        self.submit(turn).await
    }

    /// Canned reply: fill the input with `text` and send it.
    pub async fn quick_reply(&self, text: impl Into<String>) -> SubmitOutcome {
        self.set_input(text);
        self.send(None).await
    }

    /// Submit one user turn and record the outcome.
    pub async fn submit(&self, turn: Turn) -> SubmitOutcome {
        if turn.is_blank() {
            tracing::debug!("Ignoring blank submission");
            return SubmitOutcome::Rejected;
        }

        let request = {
            let mut conv = self.lock();
            let request = self.build_request(&turn, &conv.session);
            let entry = self.user_entry(&turn);
            conv.log.push(entry.clone());
            conv.input.clear();
            conv.loading = true;
            self.emit(ConversationEvent::MessageAppended { message: entry });
            self.emit(ConversationEvent::LoadingChanged { loading: true });
            self.emit(ConversationEvent::ScrollRequested);
            request
        };

        let session_id = request.session_id.clone();
        let has_file = request.file.is_some();
        tracing::debug!(session_id = %session_id, has_file, "Sending turn");

        let result = self.transport.send_turn(request).await;

        let mut conv = self.lock();
        let outcome = match result {
            Ok(TurnReply { response, mode }) => {
                let display_text = normalize(response);
                tracing::info!(
                    session_id = %session_id,
                    mode = mode.as_deref().unwrap_or(""),
                    reply_len = display_text.len(),
                    "Assistant reply received"
                );
                let entry = ChatMessage::assistant(display_text.clone());
                conv.log.push(entry.clone());
                conv.session.record_reply(display_text.clone(), mode);
                self.emit(ConversationEvent::MessageAppended { message: entry });
                SubmitOutcome::Replied {
                    display_text,
                    session: conv.session.clone(),
                }
            }
            Err(e) => {
                tracing::error!(session_id = %session_id, error = %e, "Chat request failed");
                let entry = ChatMessage::assistant(self.config.apology_message.clone());
                conv.log.push(entry.clone());
                self.emit(ConversationEvent::MessageAppended { message: entry });
                SubmitOutcome::Failed {
                    session: conv.session.clone(),
                }
            }
        };
        conv.loading = false;
        self.emit(ConversationEvent::LoadingChanged { loading: false });
        self.emit(ConversationEvent::ScrollRequested);
        outcome
    }

    /// Start over: new session id, empty log, no previous reply, then the
    /// reset acknowledgement.
    pub fn reset(&self) {
        let mut conv = self.lock();
        conv.session = conv.session.renewed();
        conv.log = MessageLog::new();
        conv.loading = false;

        let ack = ChatMessage::assistant(self.config.reset_message.clone());
        conv.log.push(ack.clone());

        tracing::info!(session_id = %conv.session.session_id(), "Session reset");
        self.emit(ConversationEvent::SessionReset {
            session_id: conv.session.session_id().clone(),
            timestamp: Utc::now(),
        });
        self.emit(ConversationEvent::LoadingChanged { loading: false });
        self.emit(ConversationEvent::MessageAppended { message: ack });
        self.emit(ConversationEvent::ScrollRequested);
    }

    // -- Private helpers --

    fn build_request(&self, turn: &Turn, session: &SessionState) -> TurnRequest {
        let file = turn.file().cloned();
        let message = match &turn.content {
            TurnContent::Text(text) => text.clone(),
            TurnContent::File(_) => self.config.upload_marker.clone(),
        };
        let doc_type = if file.is_some() {
            non_empty(turn.doc_type.as_deref())
        } else {
            None
        };

        TurnRequest {
            message,
            session_id: session.session_id().clone(),
            previous_response: non_empty(session.previous_response()),
            previous_mode: non_empty(session.previous_mode()),
            file,
            doc_type,
        }
    }

    fn user_entry(&self, turn: &Turn) -> ChatMessage {
        match &turn.content {
            TurnContent::Text(text) => ChatMessage::user(text.clone()),
            TurnContent::File(file) => {
                let doc_type = turn.doc_type.clone().unwrap_or_default();
                ChatMessage::user(format!("Uploaded: {} ({})", file.name, doc_type))
                    .with_attachment(AttachmentInfo {
                        file_name: file.name.clone(),
                        doc_type: turn.doc_type.clone(),
                    })
            }
        }
    }

    fn emit(&self, event: ConversationEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn lock(&self) -> MutexGuard<'_, Conversation> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|s| !s.is_empty()).map(str::to_string)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::{HashMap, VecDeque};
    use std::sync::Arc;

    use sakhi_core::types::Author;
    use serde_json::json;
    use tokio::sync::oneshot;

    use crate::error::TransportError;

    // ---- Test transports ----

    /// Replies from a queue and records every request.
    #[derive(Default)]
    struct ScriptedTransport {
        replies: Mutex<VecDeque<Result<TurnReply, TransportError>>>,
        requests: Mutex<Vec<TurnRequest>>,
    }

    impl ScriptedTransport {
        fn with(replies: Vec<Result<TurnReply, TransportError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<TurnRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl ChatTransport for ScriptedTransport {
        async fn send_turn(&self, request: TurnRequest) -> Result<TurnReply, TransportError> {
            self.requests.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError::Request("no scripted reply".into())))
        }
    }

    impl ChatTransport for Arc<ScriptedTransport> {
        async fn send_turn(&self, request: TurnRequest) -> Result<TurnReply, TransportError> {
            self.as_ref().send_turn(request).await
        }
    }

    /// Holds each request until the test releases its gate.
    #[derive(Default)]
    struct GatedTransport {
        gates: Mutex<HashMap<String, oneshot::Receiver<Result<TurnReply, TransportError>>>>,
    }

    impl GatedTransport {
        fn gate(&self, message: &str) -> oneshot::Sender<Result<TurnReply, TransportError>> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().unwrap().insert(message.to_string(), rx);
            tx
        }
    }

    impl ChatTransport for GatedTransport {
        async fn send_turn(&self, request: TurnRequest) -> Result<TurnReply, TransportError> {
            let gate = self.gates.lock().unwrap().remove(&request.message);
            match gate {
                Some(rx) => rx
                    .await
                    .unwrap_or_else(|_| Err(TransportError::Request("gate dropped".into()))),
                None => Err(TransportError::Request("no gate".into())),
            }
        }
    }

    // ---- Helpers ----

    fn config() -> ChatConfig {
        ChatConfig {
            greeting: "Welcome".to_string(),
            reset_message: "Session reset".to_string(),
            apology_message: "Sorry, something went wrong".to_string(),
            ..ChatConfig::default()
        }
    }

    fn reply(response: serde_json::Value, mode: &str) -> Result<TurnReply, TransportError> {
        Ok(TurnReply::new(response, Some(mode)))
    }

    fn texts(controller: &ConversationController<impl ChatTransport>) -> Vec<String> {
        controller.messages().into_iter().map(|m| m.text).collect()
    }

    async fn wait_for_len<T: ChatTransport>(controller: &ConversationController<T>, len: usize) {
        while controller.messages().len() < len {
            tokio::task::yield_now().await;
        }
    }

    // ---- Construction ----

    #[test]
    fn test_new_controller_logs_greeting() {
        let controller = ConversationController::new(ScriptedTransport::default(), config());
        assert_eq!(texts(&controller), vec!["Welcome"]);
        assert_eq!(controller.messages()[0].author, Author::Assistant);
        assert!(!controller.is_loading());
        assert!(controller.session().previous_response().is_none());
    }

    // ---- Validation ----

    #[tokio::test]
    async fn test_blank_submission_rejected_silently() {
        let transport = Arc::new(ScriptedTransport::default());
        let controller = ConversationController::new(Arc::clone(&transport), config());
        let mut events = controller.subscribe();

        controller.set_input("   \n ");
        let outcome = controller.send(None).await;

        assert_eq!(outcome, SubmitOutcome::Rejected);
        assert!(transport.requests().is_empty());
        assert_eq!(controller.messages().len(), 1);
        assert!(events.try_recv().is_err());
        assert_eq!(controller.input(), "   \n ");
    }

    // ---- Success path ----

    #[tokio::test]
    async fn test_successful_turn_records_reply() {
        let transport = Arc::new(ScriptedTransport::with(vec![reply(
            json!({"response": {"response": "You are eligible"}}),
            "eligible",
        )]));
        let controller = ConversationController::new(Arc::clone(&transport), config());

        controller.set_input("Am I eligible?");
        let outcome = controller.send(None).await;

        match outcome {
            SubmitOutcome::Replied {
                display_text,
                session,
            } => {
                assert_eq!(display_text, r#"{"response":"You are eligible"}"#);
                assert_eq!(session.previous_mode(), Some("eligible"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(
            texts(&controller),
            vec![
                "Welcome",
                "Am I eligible?",
                r#"{"response":"You are eligible"}"#
            ]
        );
        assert!(controller.input().is_empty());
        assert!(!controller.is_loading());
    }

    #[tokio::test]
    async fn test_one_user_and_one_reply_entry_per_submission() {
        let transport = ScriptedTransport::with(vec![
            reply(json!("first"), "eligible"),
            reply(json!("second"), "eligible"),
        ]);
        let controller = ConversationController::new(transport, config());

        controller.submit(Turn::user_text("a")).await;
        assert_eq!(controller.messages().len(), 3);
        controller.submit(Turn::user_text("b")).await;
        assert_eq!(controller.messages().len(), 5);

        let authors: Vec<Author> = controller.messages().iter().map(|m| m.author).collect();
        assert_eq!(
            authors,
            vec![
                Author::Assistant,
                Author::User,
                Author::Assistant,
                Author::User,
                Author::Assistant
            ]
        );
    }

    // ---- Request construction ----

    #[tokio::test]
    async fn test_first_request_omits_previous_fields() {
        let transport = Arc::new(ScriptedTransport::with(vec![reply(json!("hi"), "eligible")]));
        let controller = ConversationController::new(Arc::clone(&transport), config());

        controller.submit(Turn::user_text("hello")).await;

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.message, "hello");
        assert_eq!(&request.session_id, controller.session().session_id());
        assert!(request.previous_response.is_none());
        assert!(request.previous_mode.is_none());
        assert!(request.file.is_none());
        assert!(request.doc_type.is_none());
    }

    #[tokio::test]
    async fn test_second_request_carries_previous_reply() {
        let transport = Arc::new(ScriptedTransport::with(vec![
            reply(json!(r#"{"message":"Kindly give your full name."}"#), "form_filling"),
            reply(json!("Thank you"), "form_filling"),
        ]));
        let controller = ConversationController::new(Arc::clone(&transport), config());

        controller.submit(Turn::user_text("apply")).await;
        controller.submit(Turn::user_text("Asha Patil")).await;

        let requests = transport.requests();
        assert_eq!(
            requests[1].previous_response.as_deref(),
            Some("Kindly give your full name.")
        );
        assert_eq!(requests[1].previous_mode.as_deref(), Some("form_filling"));
        assert_eq!(requests[0].session_id, requests[1].session_id);
    }

    #[tokio::test]
    async fn test_empty_previous_reply_not_sent() {
        let transport = Arc::new(ScriptedTransport::with(vec![
            reply(json!(""), ""),
            reply(json!("ok"), "eligible"),
        ]));
        let controller = ConversationController::new(Arc::clone(&transport), config());

        controller.submit(Turn::user_text("one")).await;
        assert_eq!(controller.session().previous_response(), Some(""));
        controller.submit(Turn::user_text("two")).await;

        let requests = transport.requests();
        assert!(requests[1].previous_response.is_none());
        assert!(requests[1].previous_mode.is_none());
    }

    #[tokio::test]
    async fn test_file_upload_uses_marker_and_doc_type() {
        let transport = Arc::new(ScriptedTransport::with(vec![reply(
            json!("Document received"),
            "form_filling",
        )]));
        let controller = ConversationController::new(Arc::clone(&transport), config());

        controller.set_input("typed but not sent");
        controller.select_document_type("Aadhaar Card");
        let file = FileRef::new("aadhaar.pdf", vec![0x25, 0x50, 0x44, 0x46]);
        controller.send(Some(file.clone())).await;

        let requests = transport.requests();
        assert_eq!(requests[0].message, "Uploaded document");
        assert_eq!(requests[0].file.as_ref(), Some(&file));
        assert_eq!(requests[0].doc_type.as_deref(), Some("Aadhaar Card"));

        let entry = &controller.messages()[1];
        assert_eq!(entry.text, "Uploaded: aadhaar.pdf (Aadhaar Card)");
        assert_eq!(
            entry.attachment,
            Some(AttachmentInfo {
                file_name: "aadhaar.pdf".to_string(),
                doc_type: Some("Aadhaar Card".to_string()),
            })
        );
        assert!(controller.input().is_empty());
    }

    #[tokio::test]
    async fn test_text_turn_never_sends_doc_type() {
        let transport = Arc::new(ScriptedTransport::with(vec![reply(json!("ok"), "eligible")]));
        let controller = ConversationController::new(Arc::clone(&transport), config());

        controller.select_document_type("Ration Card");
        controller.set_input("status?");
        controller.send(None).await;

        assert!(transport.requests()[0].doc_type.is_none());
    }

    // ---- Failure path ----

    #[tokio::test]
    async fn test_failure_logs_apology_and_keeps_context() {
        let transport = ScriptedTransport::with(vec![
            reply(json!("Select your language"), "form_filling"),
            Err(TransportError::Status { status: 500 }),
        ]);
        let controller = ConversationController::new(transport, config());

        controller.submit(Turn::user_text("apply")).await;
        let before = controller.session();

        let outcome = controller.submit(Turn::user_text("Marathi")).await;

        assert_eq!(
            outcome,
            SubmitOutcome::Failed {
                session: before.clone()
            }
        );
        assert_eq!(controller.session(), before);
        assert_eq!(
            controller.messages().last().map(|m| m.text.clone()),
            Some("Sorry, something went wrong".to_string())
        );
        assert!(!controller.is_loading());
    }

    #[tokio::test]
    async fn test_conversation_usable_after_failure() {
        let transport = ScriptedTransport::with(vec![
            Err(TransportError::Request("connection refused".into())),
            reply(json!("back online"), "eligible"),
        ]);
        let controller = ConversationController::new(transport, config());

        controller.submit(Turn::user_text("one")).await;
        let outcome = controller.submit(Turn::user_text("two")).await;

        assert!(matches!(outcome, SubmitOutcome::Replied { .. }));
        assert_eq!(controller.session().previous_response(), Some("back online"));
    }

    // ---- Loading & events ----

    #[tokio::test]
    async fn test_loading_visible_while_in_flight() {
        let transport = GatedTransport::default();
        let gate = transport.gate("slow");
        let controller = Arc::new(ConversationController::new(transport, config()));

        let c = Arc::clone(&controller);
        let handle = tokio::spawn(async move { c.submit(Turn::user_text("slow")).await });
        wait_for_len(&*controller, 2).await;
        assert!(controller.is_loading());

        gate.send(reply(json!("done"), "eligible")).unwrap();
        handle.await.unwrap();
        assert!(!controller.is_loading());
    }

    #[tokio::test]
    async fn test_events_emitted_in_order() {
        let transport = ScriptedTransport::with(vec![reply(json!("hi"), "eligible")]);
        let controller = ConversationController::new(transport, config());
        let mut events = controller.subscribe();

        controller.submit(Turn::user_text("hello")).await;

        let mut kinds = Vec::new();
        while let Ok(event) = events.try_recv() {
            kinds.push(event.kind());
        }
        assert_eq!(
            kinds,
            vec![
                "message_appended",
                "loading_changed",
                "scroll_requested",
                "message_appended",
                "loading_changed",
                "scroll_requested"
            ]
        );
    }

    // ---- Concurrency ----

    #[tokio::test]
    async fn test_concurrent_submissions_last_arrival_wins() {
        let transport = GatedTransport::default();
        let gate_first = transport.gate("first");
        let gate_second = transport.gate("second");
        let controller = Arc::new(ConversationController::new(transport, config()));

        let c1 = Arc::clone(&controller);
        let h1 = tokio::spawn(async move { c1.submit(Turn::user_text("first")).await });
        wait_for_len(&*controller, 2).await;

        let c2 = Arc::clone(&controller);
        let h2 = tokio::spawn(async move { c2.submit(Turn::user_text("second")).await });
        wait_for_len(&*controller, 3).await;

        gate_second
            .send(reply(json!("reply to second"), "eligible"))
            .unwrap();
        h2.await.unwrap();
        gate_first
            .send(reply(json!("reply to first"), "post_application"))
            .unwrap();
        h1.await.unwrap();

        assert_eq!(
            texts(&*controller),
            vec![
                "Welcome",
                "first",
                "second",
                "reply to second",
                "reply to first"
            ]
        );
        let session = controller.session();
        assert_eq!(session.previous_response(), Some("reply to first"));
        assert_eq!(session.previous_mode(), Some("post_application"));
    }

    // ---- Reset ----

    #[tokio::test]
    async fn test_reset_starts_fresh_session() {
        let transport = ScriptedTransport::with(vec![reply(json!("hi"), "eligible")]);
        let controller = ConversationController::new(transport, config());
        controller.submit(Turn::user_text("hello")).await;
        let old_id = controller.session().session_id().clone();

        controller.reset();

        assert_eq!(texts(&controller), vec!["Session reset"]);
        let session = controller.session();
        assert_ne!(session.session_id(), &old_id);
        assert!(session.previous_response().is_none());
        assert!(session.previous_mode().is_none());
        assert!(!controller.is_loading());
    }

    #[test]
    fn test_reset_twice_changes_id_each_time() {
        let controller = ConversationController::new(ScriptedTransport::default(), config());
        let first = controller.session().session_id().clone();
        controller.reset();
        let second = controller.session().session_id().clone();
        controller.reset();
        let third = controller.session().session_id().clone();
        assert_ne!(first, second);
        assert_ne!(second, third);
        assert_eq!(controller.messages().len(), 1);
    }

    #[test]
    fn test_reset_emits_session_reset() {
        let controller = ConversationController::new(ScriptedTransport::default(), config());
        let mut events = controller.subscribe();
        controller.reset();
        let first = events.try_recv().unwrap();
        match first {
            ConversationEvent::SessionReset { session_id, .. } => {
                assert_eq!(&session_id, controller.session().session_id());
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    // ---- Quick replies ----

    #[tokio::test]
    async fn test_quick_reply_goes_through_send() {
        let transport = Arc::new(ScriptedTransport::with(vec![reply(json!("ok"), "eligible")]));
        let controller = ConversationController::new(Arc::clone(&transport), config());

        let outcome = controller.quick_reply("मला अर्ज करायचा आहे").await;

        assert!(matches!(outcome, SubmitOutcome::Replied { .. }));
        assert_eq!(transport.requests()[0].message, "मला अर्ज करायचा आहे");
        assert_eq!(controller.messages()[1].text, "मला अर्ज करायचा आहे");
        assert!(controller.input().is_empty());
    }

    #[tokio::test]
    async fn test_blank_quick_reply_rejected() {
        let controller = ConversationController::new(ScriptedTransport::default(), config());
        assert_eq!(controller.quick_reply("  ").await, SubmitOutcome::Rejected);
        assert_eq!(controller.messages().len(), 1);
    }

    #[test]
    fn test_last_assistant_text() {
        let controller = ConversationController::new(ScriptedTransport::default(), config());
        assert_eq!(controller.last_assistant_text().as_deref(), Some("Welcome"));
    }
}
