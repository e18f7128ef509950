//! Session orchestration.
//!
//! Covers the per-request transcript accumulator, the pending tool-call
//! ledger, the team-mode sub-agent registry, and the request lifecycle
//! that ties them to one upstream stream at a time.

pub mod accumulator;
pub mod hooks;
pub mod ledger;
pub mod lifecycle;
pub mod team;

pub use lifecycle::{
    EnqueueOutcome, RequestOutcome, Session, SessionBuilder, SessionOptions, SessionSnapshot,
    SessionUpdate, StartOutcome,
};
