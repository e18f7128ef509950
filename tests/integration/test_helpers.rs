//! Shared test helpers for session-level integration tests.
//!
//! Provides a scripted [`AgentBackend`] whose upstream calls are driven by
//! the test one chunk at a time, plus small waiting utilities so individual
//! test modules can focus on behaviour rather than timing.

use std::collections::VecDeque;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;

use agent_relay::driver::{AgentBackend, AgentRequest, ByteStream};
use agent_relay::mode::ExecutionMode;
use agent_relay::models::message::Message;
use agent_relay::session::{RequestOutcome, Session, SessionOptions, SessionUpdate};
use agent_relay::{AppError, Result};

/// Upper bound for any single wait in these tests.
pub const WAIT: Duration = Duration::from_secs(5);

/// Working directory handed to every test session.
pub const CWD: &str = "/work";

/// What the next upstream call does.
enum Script {
    /// Fail to open with a transport error.
    Fail(String),
    /// Never answer.
    Hang,
    /// Answer with whatever the paired [`Feed`] sends.
    Stream(mpsc::UnboundedReceiver<Result<Bytes>>),
}

/// Sending half of a scripted upstream response body.
pub struct Feed {
    tx: mpsc::UnboundedSender<Result<Bytes>>,
}

impl Feed {
    /// Send one event as a single `data:` line.
    pub fn event(&self, event: &Value) {
        self.raw(&sse(event));
    }

    /// Send raw body bytes as one chunk.
    pub fn raw(&self, text: &str) {
        // The consumer may already have stopped reading.
        let _ = self.tx.send(Ok(Bytes::copy_from_slice(text.as_bytes())));
    }

    /// Break the body with a stream error.
    pub fn fail(&self, message: &str) {
        let _ = self.tx.send(Err(AppError::Stream(message.into())));
    }

    /// End the body.
    pub fn close(self) {}
}

/// Backend that replays queued scripts, one per upstream call, and records
/// every request it receives.
#[derive(Default)]
pub struct ScriptedBackend {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<AgentRequest>>,
}

impl ScriptedBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a streamed response and return its feed.
    pub fn stream(&self) -> Feed {
        let (tx, rx) = mpsc::unbounded_channel();
        self.push(Script::Stream(rx));
        Feed { tx }
    }

    /// Queue a call that never answers.
    pub fn hang(&self) {
        self.push(Script::Hang);
    }

    /// Queue a call that fails to open.
    pub fn fail(&self, message: &str) {
        self.push(Script::Fail(message.into()));
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<AgentRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn push(&self, script: Script) {
        self.scripts.lock().unwrap().push_back(script);
    }
}

impl AgentBackend for ScriptedBackend {
    fn open(
        &self,
        request: AgentRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ByteStream>> + Send + '_>> {
        Box::pin(async move {
            self.requests.lock().unwrap().push(request);
            let script = self.scripts.lock().unwrap().pop_front();
            match script {
                None => Err(AppError::Transport("no scripted response left".into())),
                Some(Script::Fail(message)) => Err(AppError::Transport(message)),
                Some(Script::Hang) => std::future::pending().await,
                Some(Script::Stream(rx)) => {
                    let body = futures_util::stream::unfold(rx, |mut rx| async move {
                        rx.recv().await.map(|chunk| (chunk, rx))
                    });
                    Ok(Box::pin(body) as ByteStream)
                }
            }
        })
    }
}

/// Format one event as an upstream body line.
pub fn sse(event: &Value) -> String {
    format!("data: {event}\n")
}

/// Session in `mode` backed by `backend`.
pub fn session(backend: &Arc<ScriptedBackend>, mode: ExecutionMode) -> Session {
    let mut options = SessionOptions::new(PathBuf::from(CWD));
    options.mode = mode;
    Session::builder(options, Arc::clone(backend) as Arc<dyn AgentBackend>)
        .build()
        .expect("session builds inside a runtime")
}

/// Wait for the next `RequestFinished` update.
pub async fn next_finish(
    updates: &mut broadcast::Receiver<SessionUpdate>,
) -> (String, RequestOutcome) {
    tokio::time::timeout(WAIT, async {
        loop {
            match updates.recv().await {
                Ok(SessionUpdate::RequestFinished {
                    request_id,
                    outcome,
                }) => return (request_id, outcome),
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => panic!("session update channel closed"),
            }
        }
    })
    .await
    .expect("request should finish in time")
}

/// Drain every update already delivered.
pub fn drain_updates(updates: &mut broadcast::Receiver<SessionUpdate>) -> Vec<SessionUpdate> {
    let mut out = Vec::new();
    while let Ok(update) = updates.try_recv() {
        out.push(update);
    }
    out
}

/// Poll `check` until it holds.
pub async fn wait_until(what: &str, mut check: impl FnMut() -> bool) {
    let waited = tokio::time::timeout(WAIT, async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "timed out waiting for {what}");
}

/// Content of the most recent transcript entry.
pub fn last_content(session: &Session) -> String {
    session
        .transcript()
        .last()
        .map(|m: &Message| m.content.clone())
        .unwrap_or_default()
}
