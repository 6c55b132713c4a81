//! # Streaming Decode Pipeline
//!
//! The session-side half of the decode stack: frame dispatch, sample
//! format conversion, and the seekable session facade.
//!
//! ## Architecture
//!
//! ```text
//! FrameSource → DecodeSession → FrameDispatcher → LayerDecoder
//!                    │                                  │
//!                    │          per-channel floats  ←───┘
//!                    ▼
//!              scratch buffer → SampleConverter → caller bytes
//! ```
//!
//! [`DecodeSession`] pulls one frame at a time, [`FrameDispatcher`]
//! routes it to the pooled decoder for its layer and interleaves the
//! result into the session's scratch buffer, and the session drains that
//! buffer into the caller's output through [`SampleConverter`], tracking
//! how much remains for the next call.

mod dispatcher;
mod sample_converter;
mod stream;

pub use dispatcher::FrameDispatcher;
pub use sample_converter::SampleConverter;
pub use stream::DecodeSession;
