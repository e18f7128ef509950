//! Per-request transcript accumulation.
//!
//! A [`ConversationAccumulator`] owns the visible text of one in-flight
//! assistant entry. The upstream always resends the full text, so `text`
//! and `result` events replace the buffer instead of appending to it.
//!
//! The visible [`Phase`] is derived on demand, highest priority first:
//! answer text received → `Responding`; unresolved tool call → `ToolActive`;
//! reasoning received → `Thinking`; otherwise `Idle`. Once one of the
//! terminal transitions ([`finish`](ConversationAccumulator::finish),
//! [`cancel`](ConversationAccumulator::cancel),
//! [`fail`](ConversationAccumulator::fail)) has run, the accumulator is
//! frozen and every later transition or update is ignored.

use crate::models::message::Phase;

/// Frozen text of a request that ended without producing any answer.
pub const NO_RESPONSE_TEXT: &str = "No response was generated.";

/// Marker appended to partial text when the caller cancels.
pub const CANCELLED_MARKER: &str = "[Request cancelled]";

/// Accumulates one request's stream into its transcript text.
#[derive(Debug, Clone, Default)]
pub struct ConversationAccumulator {
    content: String,
    thinking: String,
    status: Option<String>,
    last_error: Option<String>,
    terminal: Option<Phase>,
    reply_len: usize,
}

impl ConversationAccumulator {
    /// Fresh accumulator for a new request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a reasoning fragment.
    pub fn on_thinking(&mut self, content: &str) {
        if self.is_frozen() || content.is_empty() {
            return;
        }
        if !self.thinking.is_empty() {
            self.thinking.push('\n');
        }
        self.thinking.push_str(content);
    }

    /// Record the latest progress narration.
    pub fn on_status(&mut self, content: &str) {
        if self.is_frozen() {
            return;
        }
        self.status = Some(content.to_owned());
    }

    /// Replace the answer text. Returns `true` if the visible text changed.
    pub fn on_text(&mut self, content: &str) -> bool {
        if self.is_frozen() || self.content == content {
            return false;
        }
        content.clone_into(&mut self.content);
        true
    }

    /// Remember an upstream error; the request keeps streaming.
    pub fn on_error(&mut self, message: &str) {
        if self.is_frozen() {
            return;
        }
        self.last_error = Some(message.to_owned());
    }

    /// Current visible phase given the number of unresolved tool calls.
    #[must_use]
    pub fn phase(&self, pending_tools: usize) -> Phase {
        if let Some(terminal) = self.terminal {
            terminal
        } else if !self.content.is_empty() {
            Phase::Responding
        } else if pending_tools > 0 {
            Phase::ToolActive
        } else if !self.thinking.is_empty() {
            Phase::Thinking
        } else {
            Phase::Idle
        }
    }

    /// Freeze after the stream ended normally.
    ///
    /// Without any answer text the frozen content is the last upstream error
    /// (phase `Errored`) or [`NO_RESPONSE_TEXT`] (phase `Done`). Returns
    /// `None` if already frozen.
    pub fn finish(&mut self) -> Option<String> {
        if self.is_frozen() {
            return None;
        }
        self.reply_len = self.content.len();
        if self.content.is_empty() {
            if let Some(err) = self.last_error.take() {
                self.terminal = Some(Phase::Errored);
                self.content = format!("Error: {err}");
            } else {
                self.terminal = Some(Phase::Done);
                NO_RESPONSE_TEXT.clone_into(&mut self.content);
            }
        } else {
            self.terminal = Some(Phase::Done);
        }
        Some(self.content.clone())
    }

    /// Freeze after the caller cancelled, appending [`CANCELLED_MARKER`].
    ///
    /// Returns `None` if already frozen.
    pub fn cancel(&mut self) -> Option<String> {
        if self.is_frozen() {
            return None;
        }
        self.reply_len = self.content.len();
        self.terminal = Some(Phase::Cancelled);
        if self.content.is_empty() {
            CANCELLED_MARKER.clone_into(&mut self.content);
        } else {
            self.content.push_str("\n\n");
            self.content.push_str(CANCELLED_MARKER);
        }
        Some(self.content.clone())
    }

    /// Freeze after a transport failure with a user-visible error line.
    ///
    /// Returns `None` if already frozen.
    pub fn fail(&mut self, error: &str) -> Option<String> {
        if self.is_frozen() {
            return None;
        }
        self.reply_len = self.content.len();
        self.terminal = Some(Phase::Errored);
        if !self.content.is_empty() {
            self.content.push_str("\n\n");
        }
        self.content.push_str("Error: ");
        self.content.push_str(error);
        Some(self.content.clone())
    }

    /// Whether a terminal transition already happened.
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.terminal.is_some()
    }

    /// Current answer text.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Answer text written by the upstream, without any locally added
    /// marker, sentinel or error line. `None` if the upstream sent none.
    #[must_use]
    pub fn reply(&self) -> Option<&str> {
        let reply = if self.is_frozen() {
            self.content.get(..self.reply_len).unwrap_or_default()
        } else {
            self.content.as_str()
        };
        (!reply.is_empty()).then_some(reply)
    }

    /// Reasoning received so far, newline-joined.
    #[must_use]
    pub fn thinking(&self) -> &str {
        &self.thinking
    }

    /// Latest progress narration.
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }
}
