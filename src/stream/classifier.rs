//! Event classification and routing.
//!
//! [`classify`] turns a decoded record into a [`StreamEvent`]; [`route`]
//! decides which single consumer handles it under the current
//! [`ExecutionMode`]. Both are pure.
//!
//! Routing table:
//!
//! | Event                                   | quick          | team           |
//! |-----------------------------------------|----------------|----------------|
//! | `thinking`, `status`, `system`          | Conversation   | Conversation   |
//! | `text`, `result`, `error`               | Conversation   | Conversation   |
//! | `tool`, `tool_result`                   | Ledger         | Ledger         |
//! | `pm_text`, `pm_status`                  | dropped        | Conversation   |
//! | `pm_tool`                               | dropped        | Ledger         |
//! | `agent_*`                               | dropped        | Team           |
//! | `done`                                  | Terminal       | Terminal       |
//! | `orchestrator_complete`                 | dropped        | Terminal       |
//! | unknown                                 | dropped        | dropped        |
//!
//! Coordinator (`pm_*`) and sub-agent (`agent_*`) traffic never share a
//! consumer.

use serde_json::Value;
use tracing::{debug, warn};

use crate::mode::ExecutionMode;
use crate::stream::event::StreamEvent;
use crate::Result;

/// Consumer selected for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Updates the in-flight transcript entry.
    Conversation,
    /// Opens or resolves a pending tool call.
    Ledger,
    /// Updates the sub-agent registry.
    Team,
    /// Ends the request.
    Terminal,
    /// Ignored.
    Drop,
}

/// Decode a record into a typed event.
///
/// Unknown kinds decode to `Ok(None)`.
///
/// # Errors
///
/// Returns [`crate::AppError::Protocol`] for a known kind whose required fields are
/// missing or mistyped.
pub fn decode(record: Value) -> Result<Option<StreamEvent>> {
    match serde_json::from_value::<StreamEvent>(record)? {
        StreamEvent::Unknown => Ok(None),
        event => Ok(Some(event)),
    }
}

/// Decode a record, skipping anything that is not a usable event.
///
/// Unknown kinds are dropped silently; invalid records are logged at `WARN`.
#[must_use]
pub fn classify(record: Value) -> Option<StreamEvent> {
    let kind = record
        .get("type")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .unwrap_or_default();

    match decode(record) {
        Ok(Some(event)) => Some(event),
        Ok(None) => {
            debug!(kind, "classifier: skipping unknown event kind");
            None
        }
        Err(err) => {
            warn!(kind, error = %err, "classifier: invalid event, skipping");
            None
        }
    }
}

/// Select the consumer for `event` under `mode`.
#[must_use]
pub fn route(event: &StreamEvent, mode: ExecutionMode) -> Route {
    let team = mode == ExecutionMode::Team;
    match event {
        StreamEvent::Thinking { .. }
        | StreamEvent::Status { .. }
        | StreamEvent::System { .. }
        | StreamEvent::Text { .. }
        | StreamEvent::Result { .. }
        | StreamEvent::Error { .. } => Route::Conversation,

        StreamEvent::Tool { .. } | StreamEvent::ToolResult { .. } => Route::Ledger,

        StreamEvent::PmText { .. } | StreamEvent::PmStatus { .. } if team => Route::Conversation,
        StreamEvent::PmTool { .. } if team => Route::Ledger,

        StreamEvent::AgentSpawn { .. }
        | StreamEvent::AgentStatus { .. }
        | StreamEvent::AgentLog { .. }
        | StreamEvent::AgentTool { .. }
        | StreamEvent::AgentToolResult { .. }
            if team =>
        {
            Route::Team
        }

        StreamEvent::Done { .. } => Route::Terminal,
        StreamEvent::OrchestratorComplete { .. } if team => Route::Terminal,

        _ => Route::Drop,
    }
}
