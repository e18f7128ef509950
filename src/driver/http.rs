//! HTTP implementation of [`AgentBackend`].
//!
//! POSTs the [`AgentRequest`] as JSON and exposes the streamed response
//! body. No retries are attempted.

use std::future::Future;
use std::pin::Pin;

use futures_util::StreamExt;
use tracing::{debug, warn};

use crate::config::GlobalConfig;
use crate::driver::{AgentBackend, AgentRequest, ByteStream};
use crate::{AppError, Result};

/// Longest slice of an error body kept in the error message.
const MAX_ERROR_BODY: usize = 512;

/// Streaming HTTP backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    url: String,
}

impl HttpBackend {
    /// Build a backend for the configured upstream endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Config`] if the HTTP client cannot be built.
    pub fn from_config(config: &GlobalConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|err| AppError::Config(format!("failed to build http client: {err}")))?;
        Ok(Self::with_client(client, config.upstream.url.clone()))
    }

    /// Build a backend from an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

impl AgentBackend for HttpBackend {
    fn open(
        &self,
        request: AgentRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ByteStream>> + Send + '_>> {
        Box::pin(async move {
            debug!(
                url = self.url.as_str(),
                mode = %request.options.mode,
                "http backend: opening stream"
            );

            let response = self
                .client
                .post(&self.url)
                .header(reqwest::header::ACCEPT, "text/event-stream")
                .json(&request)
                .send()
                .await
                .map_err(|err| AppError::Transport(format!("request failed: {err}")))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let body: String = body.chars().take(MAX_ERROR_BODY).collect();
                warn!(%status, "http backend: upstream rejected request");
                return Err(AppError::Transport(format!("status {status}: {body}")));
            }

            let stream = response
                .bytes_stream()
                .map(|chunk| chunk.map_err(|err| AppError::Stream(err.to_string())));
            Ok(Box::pin(stream) as ByteStream)
        })
    }
}
