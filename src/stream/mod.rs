//! Upstream event stream handling.
//!
//! - `codec`: [`LinesCodec`](tokio_util::codec::LinesCodec)-based framing of
//!   marker-prefixed JSON records.
//! - `event`: the closed set of typed [`StreamEvent`](event::StreamEvent)s.
//! - `classifier`: record → event decoding and per-mode routing.

pub mod classifier;
pub mod codec;
pub mod event;
