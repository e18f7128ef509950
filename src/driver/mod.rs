//! Upstream agent backend abstraction.
//!
//! The [`AgentBackend`] trait decouples the session core from how the
//! streaming call is made. The core only needs a byte stream of
//! marker-prefixed event lines; headers, routing, and authentication are
//! the backend's concern.

pub mod http;

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;
use serde::{Deserialize, Serialize};

use crate::mode::ExecutionMode;
use crate::models::message::{Message, Role};
use crate::Result;

/// Raw response body of an upstream call.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// One prior turn forwarded to the upstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireMessage {
    /// Author of the turn.
    pub role: Role,
    /// Turn text.
    pub content: String,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
        }
    }
}

/// Execution options forwarded with every request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestOptions {
    /// Model identifier.
    pub model: String,
    /// Working directory of the agent.
    pub cwd: PathBuf,
    /// Execution mode.
    pub mode: ExecutionMode,
}

/// Body of an upstream call: conversation so far plus options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentRequest {
    /// Conversation turns, oldest first; the last one is the new request.
    pub messages: Vec<WireMessage>,
    /// Execution options.
    pub options: RequestOptions,
}

impl AgentRequest {
    /// Text of the newest user turn.
    #[must_use]
    pub fn prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

/// Opens cancellable streaming calls to the upstream agent.
///
/// Dropping the returned future or stream must abort the call; the session
/// relies on this for cancellation.
pub trait AgentBackend: Send + Sync {
    /// Send `request` and return the response body as a byte stream.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Transport`](crate::AppError::Transport) if the
    /// call cannot be made or the upstream answers with a non-success
    /// status.
    fn open(
        &self,
        request: AgentRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ByteStream>> + Send + '_>>;
}
