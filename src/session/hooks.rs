//! Extension points consulted while a request is being started.
//!
//! Both hooks are synchronous and run under the session lock, so they must
//! not block.

use crate::driver::AgentRequest;

/// Result of running caller input through a [`CommandResolver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Send this text upstream (possibly rewritten).
    Forward(String),
    /// Handled locally; record this reply and open no upstream call.
    Reply(String),
}

/// Slash-command resolver invoked before anything else in `start()`.
pub trait CommandResolver: Send + Sync {
    /// Inspect `input` and decide whether it goes upstream.
    fn resolve(&self, input: &str) -> CommandOutcome;
}

/// Decision returned by an [`ApprovalGate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Approval {
    /// Open the upstream call.
    Allow,
    /// Refuse the request with a reason.
    Deny(String),
}

/// Gate consulted right before the upstream call is opened.
pub trait ApprovalGate: Send + Sync {
    /// Review the request that is about to be sent.
    fn review(&self, request: &AgentRequest) -> Approval;
}
