//! Pending tool-call tracking and file-change side effects.
//!
//! [`ToolCallLedger`] correlates `tool` events with their later
//! `tool_result` by invocation id. For the two mutating tool kinds
//! (`Write`, `Edit`) it publishes a [`FileChange`] twice: optimistically when
//! the call starts, because a matching result is never guaranteed, and
//! again when the result arrives. Receivers must be idempotent.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;

use crate::models::tool::{file_change_for, FileChange, PendingToolCall};

/// Default capacity of a [`BroadcastSink`] channel.
pub const DEFAULT_SINK_CAPACITY: usize = 256;

/// Fire-and-forget receiver of file-change notifications.
pub trait FileChangeSink: Send + Sync {
    /// Publish one notification. Must not block.
    fn publish(&self, change: FileChange);
}

/// Sink that discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl FileChangeSink for NullSink {
    fn publish(&self, _change: FileChange) {}
}

/// Sink backed by a [`broadcast`] channel so any number of subsystems can
/// subscribe.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<FileChange>,
}

impl BroadcastSink {
    /// Create a sink with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to notifications published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<FileChange> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new(DEFAULT_SINK_CAPACITY)
    }
}

impl FileChangeSink for BroadcastSink {
    fn publish(&self, change: FileChange) {
        if self.tx.send(change).is_err() {
            debug!("file change sink: no subscribers, notification dropped");
        }
    }
}

/// Table of tool calls that started but have not produced a result.
pub struct ToolCallLedger {
    cwd: PathBuf,
    pending: Vec<PendingToolCall>,
    sink: Arc<dyn FileChangeSink>,
}

impl ToolCallLedger {
    /// Empty ledger resolving relative paths against `cwd`.
    #[must_use]
    pub fn new(cwd: PathBuf, sink: Arc<dyn FileChangeSink>) -> Self {
        Self {
            cwd,
            pending: Vec::new(),
            sink,
        }
    }

    /// Open an entry for a started tool call.
    ///
    /// Publishes the optimistic notification for mutating tools. A repeated
    /// id is ignored and returns `false`.
    pub fn register(&mut self, id: &str, name: &str, input: Value) -> bool {
        if self.pending.iter().any(|call| call.id == id) {
            debug!(tool_use_id = id, "ledger: duplicate tool id ignored");
            return false;
        }

        self.publish(name, &input);
        self.pending.push(PendingToolCall {
            id: id.to_owned(),
            name: name.to_owned(),
            input,
        });
        true
    }

    /// Close the entry matching `tool_use_id`.
    ///
    /// Publishes the authoritative notification for mutating tools. An
    /// unknown id is a no-op and returns `None`.
    pub fn resolve(
        &mut self,
        tool_use_id: &str,
        content: &str,
        is_error: bool,
    ) -> Option<PendingToolCall> {
        let Some(index) = self.pending.iter().position(|call| call.id == tool_use_id) else {
            debug!(tool_use_id, "ledger: result without matching tool, ignored");
            return None;
        };

        let call = self.pending.remove(index);
        debug!(
            tool_use_id,
            tool = call.name.as_str(),
            is_error,
            result_len = content.len(),
            "ledger: tool resolved"
        );
        self.publish(&call.name, &call.input);
        Some(call)
    }

    /// Publish a notification for a mutating tool without tracking it.
    ///
    /// Returns `true` if a notification was published.
    #[must_use]
    pub fn notify_mutation(&self, name: &str, input: &Value) -> bool {
        self.publish(name, input)
    }

    /// Unresolved calls in start order.
    #[must_use]
    pub fn pending(&self) -> &[PendingToolCall] {
        &self.pending
    }

    /// Number of unresolved calls.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    fn publish(&self, name: &str, input: &Value) -> bool {
        match file_change_for(name, input, &self.cwd) {
            Some(change) => {
                self.sink.publish(change);
                true
            }
            None => false,
        }
    }
}
