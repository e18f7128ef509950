//! Line framing for upstream event streams.
//!
//! The upstream answers with newline-delimited text. Lines of interest
//! carry the [`RECORD_MARKER`] prefix followed by one JSON object; every
//! other line (comments, keep-alives, `event:` fields, blank separators)
//! is ignored.
//!
//! [`FrameCodec`] wraps [`tokio_util::codec::LinesCodec`] with a maximum
//! line length so a misbehaving upstream cannot make us buffer an
//! unterminated line forever. [`FrameDecoder`] drives the codec over
//! arbitrarily chunked input, keeping the incomplete trailing line between
//! chunks.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut decoder = FrameDecoder::new();
//! for chunk in chunks {
//!     for record in decoder.push(&chunk) {
//!         handle(record);
//!     }
//! }
//! for record in decoder.finish() {
//!     handle(record);
//! }
//! ```

use bytes::BytesMut;
use serde_json::Value;
use tokio_util::codec::{Decoder, LinesCodec, LinesCodecError};
use tracing::{debug, warn};

use crate::{AppError, Result};

/// Maximum line length accepted by default: 1 MiB.
pub const MAX_LINE_BYTES: usize = 1_048_576;

/// Prefix that marks a line as an event record.
pub const RECORD_MARKER: &str = "data:";

/// Payload some upstreams send to mark the end of the stream.
const DONE_SENTINEL: &str = "[DONE]";

/// Decoder yielding one parsed JSON object per record line.
///
/// Malformed payloads, over-long lines, and invalid UTF-8 are logged and
/// skipped; decoding always continues with the next line.
#[derive(Debug)]
pub struct FrameCodec(LinesCodec);

impl FrameCodec {
    /// Create a codec with the default [`MAX_LINE_BYTES`] limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_line_bytes(MAX_LINE_BYTES)
    }

    /// Create a codec with a custom line limit.
    #[must_use]
    pub fn with_max_line_bytes(max: usize) -> Self {
        Self(LinesCodec::new_with_max_length(max))
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = Value;
    type Error = AppError;

    /// Decode the next record from `src`.
    ///
    /// Returns `Ok(None)` once `src` holds no further complete line.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        loop {
            match self.0.decode(src) {
                Ok(Some(line)) => {
                    if let Some(record) = parse_record(&line) {
                        return Ok(Some(record));
                    }
                }
                Ok(None) => return Ok(None),
                Err(err) => log_codec_error(&err),
            }
        }
    }

    /// Decode the remaining bytes when the stream ends.
    ///
    /// An unterminated trailing line is kept only if its payload is
    /// complete, valid JSON.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        loop {
            match self.0.decode_eof(src) {
                Ok(Some(line)) => {
                    if let Some(record) = parse_record(&line) {
                        return Ok(Some(record));
                    }
                }
                Ok(None) => return Ok(None),
                Err(err) => log_codec_error(&err),
            }
        }
    }
}

/// Incremental decoder over an arbitrarily chunked byte stream.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    codec: FrameCodec,
    buffer: BytesMut,
}

impl FrameDecoder {
    /// Decoder with the default line limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoder with a custom line limit.
    #[must_use]
    pub fn with_max_line_bytes(max: usize) -> Self {
        Self {
            codec: FrameCodec::with_max_line_bytes(max),
            buffer: BytesMut::new(),
        }
    }

    /// Feed one chunk and return every record it completed, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Value> {
        self.buffer.extend_from_slice(chunk);
        let mut records = Vec::new();
        while let Ok(Some(record)) = self.codec.decode(&mut self.buffer) {
            records.push(record);
        }
        records
    }

    /// Flush the buffered tail at end of stream.
    pub fn finish(&mut self) -> Vec<Value> {
        let mut records = Vec::new();
        while let Ok(Some(record)) = self.codec.decode_eof(&mut self.buffer) {
            records.push(record);
        }
        self.buffer.clear();
        records
    }

    /// Bytes currently held back waiting for a line terminator.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

/// Extract the JSON payload of a single line.
///
/// Returns `None` for lines without the marker, for the `[DONE]` sentinel,
/// and for payloads that are not a JSON object.
#[must_use]
pub fn parse_record(line: &str) -> Option<Value> {
    let payload = line.strip_prefix(RECORD_MARKER)?;
    let payload = payload.strip_prefix(' ').unwrap_or(payload).trim_end();

    if payload.is_empty() || payload == DONE_SENTINEL {
        return None;
    }

    match serde_json::from_str::<Value>(payload) {
        Ok(value @ Value::Object(_)) => Some(value),
        Ok(_) => {
            debug!("frame decoder: skipping non-object record");
            None
        }
        Err(err) => {
            warn!(error = %err, raw_line = payload, "frame decoder: malformed record, skipping");
            None
        }
    }
}

// ── Private helper ────────────────────────────────────────────────────────────

fn log_codec_error(err: &LinesCodecError) {
    match err {
        LinesCodecError::MaxLineLengthExceeded => {
            warn!("frame decoder: line exceeded length limit, discarding");
        }
        LinesCodecError::Io(io_err) => {
            warn!(error = %io_err, "frame decoder: undecodable line, skipping");
        }
    }
}
