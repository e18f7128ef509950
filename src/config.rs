//! Global configuration parsing and validation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::mode::ExecutionMode;
use crate::stream::codec::MAX_LINE_BYTES;
use crate::{AppError, Result};

/// Connection settings for the upstream agent endpoint.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct UpstreamConfig {
    /// Streaming endpoint that accepts the request body and answers with
    /// marker-prefixed event lines.
    pub url: String,
    /// Model identifier forwarded as `options.model`.
    #[serde(default = "default_model")]
    pub model: String,
    /// Connection establishment timeout. The stream itself is never timed
    /// out here; the upstream owns its heartbeat behaviour.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

/// Frame decoding limits.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct StreamConfig {
    /// Longest accepted line; longer lines are discarded.
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            max_line_bytes: default_max_line_bytes(),
        }
    }
}

fn default_model() -> String {
    "default".into()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_max_line_bytes() -> usize {
    MAX_LINE_BYTES
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Project directory forwarded as `options.cwd`; relative file paths in
    /// tool inputs are resolved against it.
    pub workspace_root: PathBuf,
    /// Mode a fresh session starts in.
    #[serde(default)]
    pub default_mode: ExecutionMode,
    /// Upstream endpoint settings.
    pub upstream: UpstreamConfig,
    /// Frame decoding limits.
    #[serde(default)]
    pub stream: StreamConfig,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and normalize paths.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Replace the workspace root, canonicalising the new path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the path does not exist.
    pub fn set_workspace_root(&mut self, root: impl AsRef<Path>) -> Result<()> {
        self.workspace_root = root
            .as_ref()
            .canonicalize()
            .map_err(|err| AppError::Config(format!("invalid workspace override: {err}")))?;
        Ok(())
    }

    /// Connect timeout as a [`Duration`].
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream.connect_timeout_seconds)
    }

    fn validate(&mut self) -> Result<()> {
        let url = self.upstream.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(AppError::Config(format!(
                "upstream.url must be an http(s) URL, got '{url}'"
            )));
        }

        if self.upstream.model.trim().is_empty() {
            return Err(AppError::Config("upstream.model must not be empty".into()));
        }

        if self.stream.max_line_bytes == 0 {
            return Err(AppError::Config(
                "stream.max_line_bytes must be greater than zero".into(),
            ));
        }

        let canonical_root = self
            .workspace_root
            .canonicalize()
            .map_err(|err| AppError::Config(format!("workspace_root invalid: {err}")))?;
        self.workspace_root = canonical_root;

        Ok(())
    }
}
