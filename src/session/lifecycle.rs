//! Request lifecycle: busy gate, cancellation, one-slot queue.
//!
//! A [`Session`] owns one conversation. At most one upstream call is open
//! at any time; the in-flight request is the session's *active* request and
//! the session is busy exactly while one exists.
//!
//! # Flow
//!
//! 1. [`Session::start`] resolves slash commands, consults the approval
//!    gate, clears the tool ledger (and the team registry in team mode),
//!    appends the user turn plus an empty streaming assistant turn, and
//!    spawns the consumer task.
//! 2. The consumer opens the upstream call, feeds every chunk through the
//!    frame decoder and classifier, and applies the events in arrival order
//!    under the session lock.
//! 3. Natural end of stream, a terminal event, a transport failure, or
//!    [`Session::cancel`] *finalizes* the request. Finalization is keyed by
//!    request id under the lock: the first caller freezes the assistant turn,
//!    every later attempt (and every late event) sees a stale id and does
//!    nothing.
//! 4. In the same critical section the queued message, if any, is taken and
//!    started, so a queued slot is dispatched exactly once.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use futures_util::StreamExt;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::GlobalConfig;
use crate::driver::{AgentBackend, AgentRequest, RequestOptions, WireMessage};
use crate::mode::ExecutionMode;
use crate::models::agent::{AgentEntry, AgentLogEntry, AgentLogKind};
use crate::models::message::{Message, Phase, Role};
use crate::models::tool::PendingToolCall;
use crate::session::accumulator::ConversationAccumulator;
use crate::session::hooks::{Approval, ApprovalGate, CommandOutcome, CommandResolver};
use crate::session::ledger::{FileChangeSink, NullSink, ToolCallLedger};
use crate::session::team::AgentTeamRegistry;
use crate::stream::classifier::{classify, route, Route};
use crate::stream::codec::{FrameDecoder, MAX_LINE_BYTES};
use crate::stream::event::StreamEvent;
use crate::{AppError, Result};

/// Capacity of the [`SessionUpdate`] broadcast channel.
const UPDATE_CAPACITY: usize = 256;

// ── Public types ──────────────────────────────────────────────────────────────

/// Static per-session settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Model forwarded as `options.model`.
    pub model: String,
    /// Working directory forwarded as `options.cwd`.
    pub cwd: PathBuf,
    /// Initial execution mode.
    pub mode: ExecutionMode,
    /// Frame decoder line limit.
    pub max_line_bytes: usize,
}

impl SessionOptions {
    /// Options with defaults for everything but the working directory.
    #[must_use]
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            model: "default".into(),
            cwd: cwd.into(),
            mode: ExecutionMode::default(),
            max_line_bytes: MAX_LINE_BYTES,
        }
    }

    /// Options taken from the global configuration.
    #[must_use]
    pub fn from_config(config: &GlobalConfig) -> Self {
        Self {
            model: config.upstream.model.clone(),
            cwd: config.workspace_root.clone(),
            mode: config.default_mode,
            max_line_bytes: config.stream.max_line_bytes,
        }
    }
}

/// How a request ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Stream ended or a terminal event arrived.
    Completed,
    /// The caller cancelled.
    Cancelled,
    /// The stream broke after it was opened.
    Failed(String),
    /// The upstream call could not be opened.
    TransportFailed(String),
}

/// Change notifications for observers of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// The transcript changed (new turn or new streaming text).
    TranscriptChanged,
    /// The sub-agent registry changed.
    AgentsChanged,
    /// A request was finalized.
    RequestFinished {
        /// Finalized request.
        request_id: String,
        /// How it ended.
        outcome: RequestOutcome,
    },
    /// A queued message was overwritten by a newer one and will never run.
    QueueDiscarded {
        /// Text of the discarded message.
        text: String,
    },
}

/// Result of [`Session::start`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// An upstream call was opened.
    Started {
        /// Identifier of the new request.
        request_id: String,
    },
    /// The command resolver answered locally; nothing was sent.
    Replied,
}

/// Result of [`Session::enqueue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// The session was busy; the message now occupies the queue slot.
    Queued {
        /// Previously queued message that was overwritten.
        replaced: Option<String>,
    },
    /// The session was idle; the message was started immediately.
    Dispatched(StartOutcome),
}

/// Owned view of a session at one instant.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    /// Transcript, oldest first.
    pub transcript: Vec<Message>,
    /// Sub-agents of the current or last team run.
    pub agents: Vec<AgentEntry>,
    /// Unresolved tool calls of the active request.
    pub pending_tools: Vec<PendingToolCall>,
    /// Current execution mode.
    pub mode: ExecutionMode,
    /// Whether a request is in flight.
    pub busy: bool,
    /// Message waiting in the queue slot.
    pub queued: Option<String>,
    /// Phase of the active request, or the final phase of the last one.
    pub phase: Phase,
    /// Latest progress narration of the active request.
    pub status: Option<String>,
    /// Outcome of the last finalized request.
    pub last_outcome: Option<RequestOutcome>,
}

// ── Builder ───────────────────────────────────────────────────────────────────

/// Assembles a [`Session`] with its collaborators.
pub struct SessionBuilder {
    options: SessionOptions,
    backend: Arc<dyn AgentBackend>,
    sink: Arc<dyn FileChangeSink>,
    resolver: Option<Arc<dyn CommandResolver>>,
    gate: Option<Arc<dyn ApprovalGate>>,
}

impl SessionBuilder {
    /// Start building a session that talks to `backend`.
    #[must_use]
    pub fn new(options: SessionOptions, backend: Arc<dyn AgentBackend>) -> Self {
        Self {
            options,
            backend,
            sink: Arc::new(NullSink),
            resolver: None,
            gate: None,
        }
    }

    /// Receiver of file-change notifications.
    #[must_use]
    pub fn file_sink(mut self, sink: Arc<dyn FileChangeSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Slash-command resolver run first in every start.
    #[must_use]
    pub fn command_resolver(mut self, resolver: Arc<dyn CommandResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Gate consulted before every upstream call.
    #[must_use]
    pub fn approval_gate(mut self, gate: Arc<dyn ApprovalGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Finish building. Must run inside a tokio runtime, which hosts the
    /// consumer tasks.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] when called outside a tokio runtime.
    pub fn build(self) -> Result<Session> {
        let runtime = Handle::try_current()
            .map_err(|err| AppError::Config(format!("session requires a tokio runtime: {err}")))?;
        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);
        let (busy, _) = watch::channel(false);

        let state = SessionState {
            mode: self.options.mode,
            queued: None,
            transcript: Vec::new(),
            history: Vec::new(),
            ledger: ToolCallLedger::new(self.options.cwd.clone(), self.sink),
            team: AgentTeamRegistry::new(),
            active: None,
            last_phase: Phase::Idle,
            last_outcome: None,
        };

        Ok(Session {
            inner: Arc::new(Inner {
                options: self.options,
                backend: self.backend,
                resolver: self.resolver,
                gate: self.gate,
                runtime,
                state: Mutex::new(state),
                updates,
                busy,
            }),
        })
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

/// Handle to one conversation. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

struct Inner {
    options: SessionOptions,
    backend: Arc<dyn AgentBackend>,
    resolver: Option<Arc<dyn CommandResolver>>,
    gate: Option<Arc<dyn ApprovalGate>>,
    runtime: Handle,
    state: Mutex<SessionState>,
    updates: broadcast::Sender<SessionUpdate>,
    busy: watch::Sender<bool>,
}

struct SessionState {
    mode: ExecutionMode,
    queued: Option<String>,
    transcript: Vec<Message>,
    history: Vec<WireMessage>,
    ledger: ToolCallLedger,
    team: AgentTeamRegistry,
    active: Option<ActiveRequest>,
    last_phase: Phase,
    last_outcome: Option<RequestOutcome>,
}

struct ActiveRequest {
    id: String,
    message_index: usize,
    cancel: CancellationToken,
    accumulator: ConversationAccumulator,
}

/// A prepared upstream call waiting to be spawned.
struct Ticket {
    request_id: String,
    request: AgentRequest,
    cancel: CancellationToken,
}

enum Prepared {
    Request(Ticket),
    Replied,
}

enum Finish {
    Completed,
    Cancelled,
    Failed(String),
    TransportFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

#[derive(Default)]
struct Changes {
    transcript: bool,
    agents: bool,
    terminal: bool,
}

impl Session {
    /// Start building a session.
    #[must_use]
    pub fn builder(options: SessionOptions, backend: Arc<dyn AgentBackend>) -> SessionBuilder {
        SessionBuilder::new(options, backend)
    }

    /// Start a request for `text`.
    ///
    /// # Errors
    ///
    /// - [`AppError::Busy`] if a request is already in flight.
    /// - [`AppError::Denied`] if the approval gate refuses the request.
    pub fn start(&self, text: impl Into<String>) -> Result<StartOutcome> {
        let prepared = {
            let mut state = self.lock();
            let prepared = self.start_locked(&mut state, text.into())?;
            self.publish_busy(&state);
            prepared
        };
        Ok(self.launch(prepared))
    }

    /// Cancel the in-flight request.
    ///
    /// Freezes the assistant turn with the cancellation marker and then
    /// dispatches the queued message, if any. Returns `false` (and does
    /// nothing) when no request is in flight or it was already finalized.
    pub fn cancel(&self) -> bool {
        let next = {
            let mut state = self.lock();
            let Some(request_id) = state.active.as_ref().map(|a| a.id.clone()) else {
                debug!("session: cancel while idle ignored");
                return false;
            };
            if !self.finalize_locked(&mut state, &request_id, Finish::Cancelled) {
                return false;
            }
            let next = self.drain_locked(&mut state);
            self.publish_busy(&state);
            next
        };
        if let Some(prepared) = next {
            self.launch(prepared);
        }
        true
    }

    /// Submit `text`, queueing it if a request is in flight.
    ///
    /// The queue holds a single message: a newer message overwrites the
    /// older one, which is reported in the outcome and as
    /// [`SessionUpdate::QueueDiscarded`].
    ///
    /// # Errors
    ///
    /// Same as [`Session::start`] when the session is idle.
    pub fn enqueue(&self, text: impl Into<String>) -> Result<EnqueueOutcome> {
        let text = text.into();
        let prepared = {
            let mut state = self.lock();
            if state.active.is_some() {
                let replaced = state.queued.replace(text);
                if let Some(old) = &replaced {
                    info!(discarded_len = old.len(), "session: queued message overwritten");
                    self.emit(SessionUpdate::QueueDiscarded { text: old.clone() });
                } else {
                    debug!("session: message queued");
                }
                return Ok(EnqueueOutcome::Queued { replaced });
            }
            let prepared = self.start_locked(&mut state, text)?;
            self.publish_busy(&state);
            prepared
        };
        Ok(EnqueueOutcome::Dispatched(self.launch(prepared)))
    }

    /// Dispatch the queued message if the session is idle.
    ///
    /// Finalization already drains the queue, so this only does work when
    /// a caller needs to retry a drain; repeated calls never dispatch the
    /// same message twice.
    pub fn on_busy_cleared(&self) -> Option<StartOutcome> {
        let next = {
            let mut state = self.lock();
            if state.active.is_some() {
                return None;
            }
            let next = self.drain_locked(&mut state);
            self.publish_busy(&state);
            next
        };
        next.map(|prepared| self.launch(prepared))
    }

    /// Switch execution mode.
    ///
    /// Any actual change clears the team registry.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::ModeLocked`] while a request is in flight.
    pub fn set_mode(&self, mode: ExecutionMode) -> Result<()> {
        let mut state = self.lock();
        if state.active.is_some() {
            return Err(AppError::ModeLocked(format!(
                "cannot switch to {mode} while a request is in flight"
            )));
        }
        if state.mode != mode {
            info!(from = %state.mode, to = %mode, "session: mode switched");
            state.mode = mode;
            if !state.team.is_empty() {
                state.team.clear();
                self.emit(SessionUpdate::AgentsChanged);
            }
        }
        Ok(())
    }

    /// Current execution mode.
    #[must_use]
    pub fn mode(&self) -> ExecutionMode {
        self.lock().mode
    }

    /// Whether a request is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.lock().active.is_some()
    }

    /// Owned copy of the session state.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock();
        let (phase, status) = match &state.active {
            Some(active) => (
                active.accumulator.phase(state.ledger.pending_count()),
                active.accumulator.status().map(str::to_owned),
            ),
            None => (state.last_phase, None),
        };
        SessionSnapshot {
            transcript: state.transcript.clone(),
            agents: state.team.entries().to_vec(),
            pending_tools: state.ledger.pending().to_vec(),
            mode: state.mode,
            busy: state.active.is_some(),
            queued: state.queued.clone(),
            phase,
            status,
            last_outcome: state.last_outcome.clone(),
        }
    }

    /// Transcript, oldest first.
    #[must_use]
    pub fn transcript(&self) -> Vec<Message> {
        self.lock().transcript.clone()
    }

    /// Subscribe to change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.inner.updates.subscribe()
    }

    /// Wait until no request is in flight and the queue is empty.
    pub async fn wait_idle(&self) {
        let mut rx = self.inner.busy.subscribe();
        // The sender lives in `self.inner`, so the channel cannot close here.
        let _ = rx.wait_for(|busy| !*busy).await;
    }

    // ── Locked helpers ────────────────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        // Every critical section leaves the state consistent, so a panic
        // elsewhere does not invalidate it.
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, update: SessionUpdate) {
        // No subscribers is fine.
        let _ = self.inner.updates.send(update);
    }

    fn publish_busy(&self, state: &SessionState) {
        let busy = state.active.is_some();
        self.inner.busy.send_if_modified(|current| {
            let changed = *current != busy;
            *current = busy;
            changed
        });
    }

    fn start_locked(&self, state: &mut SessionState, text: String) -> Result<Prepared> {
        if state.active.is_some() {
            return Err(AppError::Busy(
                "a request is already in flight; enqueue instead".into(),
            ));
        }

        let text = match &self.inner.resolver {
            Some(resolver) => match resolver.resolve(&text) {
                CommandOutcome::Forward(forwarded) => forwarded,
                CommandOutcome::Reply(reply) => {
                    debug!("session: command handled locally");
                    state.transcript.push(Message::new(Role::User, text));
                    state.transcript.push(Message::new(Role::System, reply));
                    self.emit(SessionUpdate::TranscriptChanged);
                    return Ok(Prepared::Replied);
                }
            },
            None => text,
        };

        let request = self.build_request(state, &text);
        if let Some(gate) = &self.inner.gate {
            if let Approval::Deny(reason) = gate.review(&request) {
                warn!(reason = reason.as_str(), "session: request denied by approval gate");
                return Err(AppError::Denied(reason));
            }
        }

        state.ledger.clear();
        if state.mode == ExecutionMode::Team && !state.team.is_empty() {
            state.team.clear();
            self.emit(SessionUpdate::AgentsChanged);
        }

        let prompt = Message::new(Role::User, text);
        state.history.push(WireMessage::from(&prompt));
        state.transcript.push(prompt);
        state.transcript.push(Message::streaming_assistant());

        let request_id = Uuid::new_v4().to_string();
        let cancel = CancellationToken::new();
        state.active = Some(ActiveRequest {
            id: request_id.clone(),
            message_index: state.transcript.len() - 1,
            cancel: cancel.clone(),
            accumulator: ConversationAccumulator::new(),
        });
        info!(request_id = request_id.as_str(), mode = %state.mode, "session: request started");
        self.emit(SessionUpdate::TranscriptChanged);

        Ok(Prepared::Request(Ticket {
            request_id,
            request,
            cancel,
        }))
    }

    /// Prior turns as the upstream saw them, followed by `text`.
    fn build_request(&self, state: &SessionState, text: &str) -> AgentRequest {
        let mut messages = state.history.clone();
        messages.push(WireMessage {
            role: Role::User,
            content: text.to_owned(),
        });

        AgentRequest {
            messages,
            options: RequestOptions {
                model: self.inner.options.model.clone(),
                cwd: self.inner.options.cwd.clone(),
                mode: state.mode,
            },
        }
    }

    /// Take the queued message and start it. Caller must hold the lock and
    /// have checked that no request is active.
    fn drain_locked(&self, state: &mut SessionState) -> Option<Prepared> {
        let text = state.queued.take()?;
        debug!("session: dispatching queued message");
        match self.start_locked(state, text) {
            Ok(prepared) => Some(prepared),
            Err(err) => {
                warn!(error = %err, "session: queued message could not be started");
                None
            }
        }
    }

    /// Freeze the active request if it is still `request_id`.
    ///
    /// Returns `false` when the request was already finalized.
    fn finalize_locked(&self, state: &mut SessionState, request_id: &str, finish: Finish) -> bool {
        if state.active.as_ref().map(|a| a.id.as_str()) != Some(request_id) {
            debug!(request_id, "session: request already finalized");
            return false;
        }
        let Some(mut active) = state.active.take() else {
            return false;
        };
        active.cancel.cancel();

        let (frozen, outcome) = match finish {
            Finish::Completed => (active.accumulator.finish(), RequestOutcome::Completed),
            Finish::Cancelled => (active.accumulator.cancel(), RequestOutcome::Cancelled),
            Finish::Failed(err) => (
                active.accumulator.fail(&err),
                RequestOutcome::Failed(err),
            ),
            Finish::TransportFailed(err) => (
                active.accumulator.fail(&err),
                RequestOutcome::TransportFailed(err),
            ),
        };

        if let Some(message) = state.transcript.get_mut(active.message_index) {
            if let Some(content) = frozen {
                message.content = content;
            }
            message.is_streaming = false;
        }
        if let Some(reply) = active.accumulator.reply() {
            state.history.push(WireMessage {
                role: Role::Assistant,
                content: reply.to_owned(),
            });
        }
        if outcome == RequestOutcome::Completed && state.mode == ExecutionMode::Team {
            let summary = state.team.summary();
            info!(
                complete = summary.complete,
                failed = summary.failed,
                unfinished = summary.unfinished,
                "session: team run finished"
            );
            state
                .transcript
                .push(Message::new(Role::System, summary.to_string()));
        }

        state.last_phase = active.accumulator.phase(0);
        state.last_outcome = Some(outcome.clone());
        state.ledger.clear();

        info!(request_id, ?outcome, "session: request finalized");
        self.emit(SessionUpdate::TranscriptChanged);
        self.emit(SessionUpdate::RequestFinished {
            request_id: request_id.to_owned(),
            outcome,
        });
        true
    }

    /// Finalize and drain in one critical section.
    fn settle(&self, request_id: &str, finish: Finish) {
        let next = {
            let mut state = self.lock();
            if !self.finalize_locked(&mut state, request_id, finish) {
                return;
            }
            let next = self.drain_locked(&mut state);
            self.publish_busy(&state);
            next
        };
        if let Some(prepared) = next {
            self.launch(prepared);
        }
    }

    fn launch(&self, prepared: Prepared) -> StartOutcome {
        match prepared {
            Prepared::Replied => StartOutcome::Replied,
            Prepared::Request(ticket) => {
                let request_id = ticket.request_id.clone();
                let span = info_span!("request", request_id = request_id.as_str());
                self.inner
                    .runtime
                    .spawn(self.clone().drive(ticket).instrument(span));
                StartOutcome::Started { request_id }
            }
        }
    }

    // ── Consumer task ─────────────────────────────────────────────────────────

    async fn drive(self, ticket: Ticket) {
        let Ticket {
            request_id,
            request,
            cancel,
        } = ticket;
        let backend = Arc::clone(&self.inner.backend);

        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("consumer: cancelled before upstream answered");
                return;
            }
            opened = backend.open(request) => opened,
        };

        let mut stream = match opened {
            Ok(stream) => stream,
            Err(err) => {
                warn!(error = %err, "consumer: upstream call failed to open");
                self.settle(&request_id, Finish::TransportFailed(err.to_string()));
                return;
            }
        };

        let mut decoder = FrameDecoder::with_max_line_bytes(self.inner.options.max_line_bytes);
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("consumer: cancellation received, stopping");
                    return;
                }
                chunk = stream.next() => match chunk {
                    Some(Ok(bytes)) => {
                        if self.dispatch(&request_id, decoder.push(&bytes)) == Flow::Stop {
                            return;
                        }
                    }
                    Some(Err(err)) => {
                        warn!(error = %err, "consumer: stream failed");
                        self.settle(&request_id, Finish::Failed(err.to_string()));
                        return;
                    }
                    None => {
                        debug!("consumer: end of stream");
                        if self.dispatch(&request_id, decoder.finish()) == Flow::Continue {
                            self.settle(&request_id, Finish::Completed);
                        }
                        return;
                    }
                }
            }
        }
    }

    /// Apply one chunk's records in order. Returns `Stop` once the request
    /// is no longer active.
    fn dispatch(&self, request_id: &str, records: Vec<Value>) -> Flow {
        let events: Vec<StreamEvent> = records.into_iter().filter_map(classify).collect();

        let mut changes = Changes::default();
        let mut flow = Flow::Continue;
        {
            let mut state = self.lock();
            if state.active.as_ref().map(|a| a.id.as_str()) != Some(request_id) {
                debug!(request_id, "consumer: request no longer active, dropping chunk");
                return Flow::Stop;
            }
            for event in events {
                apply_event(&mut state, event, &mut changes);
                if changes.terminal {
                    flow = Flow::Stop;
                    break;
                }
            }
        }

        if changes.agents {
            self.emit(SessionUpdate::AgentsChanged);
        }
        if changes.transcript {
            self.emit(SessionUpdate::TranscriptChanged);
        }
        if changes.terminal {
            self.settle(request_id, Finish::Completed);
        }
        flow
    }
}

// ── Event application ────────────────────────────────────────────────────────

/// Apply one event to the active request. Caller holds the lock and has
/// checked the request is active.
fn apply_event(state: &mut SessionState, event: StreamEvent, changes: &mut Changes) {
    let kind = event.kind();
    match route(&event, state.mode) {
        Route::Conversation => apply_conversation(state, event, changes),
        Route::Ledger => apply_ledger(state, event),
        Route::Team => apply_team(state, event, changes),
        Route::Terminal => changes.terminal = true,
        Route::Drop => debug!(kind, mode = %state.mode, "session: event dropped"),
    }
}

fn apply_conversation(state: &mut SessionState, event: StreamEvent, changes: &mut Changes) {
    let Some(active) = state.active.as_mut() else {
        return;
    };
    let accumulator = &mut active.accumulator;
    match event {
        StreamEvent::Thinking { content } => accumulator.on_thinking(&content),
        StreamEvent::Status { content }
        | StreamEvent::PmStatus { content }
        | StreamEvent::System { content } => accumulator.on_status(&content),
        StreamEvent::Text { content }
        | StreamEvent::Result { content }
        | StreamEvent::PmText { content } => {
            if accumulator.on_text(&content) {
                if let Some(message) = state.transcript.get_mut(active.message_index) {
                    message.content = content;
                }
                changes.transcript = true;
            }
        }
        StreamEvent::Error { content } => {
            warn!(error = content.as_str(), "session: upstream reported an error");
            accumulator.on_error(&content);
        }
        _ => {}
    }
}

fn apply_ledger(state: &mut SessionState, event: StreamEvent) {
    match event {
        StreamEvent::Tool { name, input, id } | StreamEvent::PmTool { name, input, id } => {
            debug!(tool_use_id = id.as_str(), tool = name.as_str(), "session: tool started");
            state.ledger.register(&id, &name, input);
        }
        StreamEvent::ToolResult {
            tool_use_id,
            content,
            is_error,
        } => {
            state.ledger.resolve(&tool_use_id, &content, is_error);
        }
        _ => {}
    }
}

fn apply_team(state: &mut SessionState, event: StreamEvent, changes: &mut Changes) {
    let now = Utc::now();
    let team = &mut state.team;
    let changed = match event {
        StreamEvent::AgentSpawn { agent } => {
            info!(
                agent_id = agent.id.as_str(),
                role = agent.role.as_str(),
                "session: agent spawned"
            );
            team.add_entry(agent, now)
        }
        StreamEvent::AgentStatus {
            agent_id,
            status,
            progress,
        } => team.update_status(&agent_id, status, progress, now),
        StreamEvent::AgentLog { agent_id, log } => {
            team.append_log(&agent_id, AgentLogEntry::new(AgentLogKind::Text, log))
        }
        StreamEvent::AgentTool {
            agent_id,
            name,
            input,
            id: _,
        } => {
            if state.ledger.notify_mutation(&name, &input) {
                debug!(
                    agent_id = agent_id.as_str(),
                    tool = name.as_str(),
                    "session: sub-agent file change published"
                );
            }
            team.append_log(
                &agent_id,
                AgentLogEntry::new(AgentLogKind::Tool, describe_tool(&name, &input)),
            )
        }
        StreamEvent::AgentToolResult {
            agent_id,
            content,
            is_error,
            ..
        } => {
            let content = if is_error {
                format!("error: {content}")
            } else {
                content
            };
            team.append_log(&agent_id, AgentLogEntry::new(AgentLogKind::ToolResult, content))
        }
        _ => false,
    };
    changes.agents |= changed;
}

/// One-line description of a tool call for an agent log.
fn describe_tool(name: &str, input: &Value) -> String {
    let target = ["file_path", "path", "command", "pattern", "url"]
        .iter()
        .find_map(|key| input.get(*key).and_then(Value::as_str));
    match target {
        Some(target) => format!("{name}: {target}"),
        None => name.to_owned(),
    }
}
