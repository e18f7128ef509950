//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// The upstream call could not be opened or answered with a
    /// non-success status.
    Transport(String),
    /// The upstream byte stream failed after it was opened.
    Stream(String),
    /// A record could not be decoded into a known event.
    Protocol(String),
    /// A request is already in flight for this session.
    Busy(String),
    /// The execution mode cannot change while a request is in flight.
    ModeLocked(String),
    /// The approval gate refused to let the request proceed.
    Denied(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Transport(msg) => write!(f, "transport: {msg}"),
            Self::Stream(msg) => write!(f, "stream: {msg}"),
            Self::Protocol(msg) => write!(f, "protocol: {msg}"),
            Self::Busy(msg) => write!(f, "busy: {msg}"),
            Self::ModeLocked(msg) => write!(f, "mode locked: {msg}"),
            Self::Denied(msg) => write!(f, "denied: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Protocol(format!("malformed json: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Stream(format!("io: {err}"))
    }
}
