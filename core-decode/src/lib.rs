//! # Decode Session Core
//!
//! Streaming, seekable audio decoding: turns a sequence of compressed
//! frames into PCM samples on demand.
//!
//! ## Overview
//!
//! This crate owns the session layer of the decode stack:
//!
//! - A byte/sample-accurate read cursor over the decoded stream
//! - A reusable one-frame scratch buffer shared across calls
//! - Lazy per-layer decoder pooling with seek-aware state invalidation
//! - Frame-boundary seeking with pre-roll resynchronization
//! - Output in 32-bit float, 16-bit signed, or 8-bit unsigned samples
//!
//! Bitstream framing and the per-layer codec math are not implemented
//! here; they plug in through the [`traits::FrameSource`],
//! [`traits::LayerDecoder`], and [`traits::LayerDecoderFactory`] seams.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use core_decode::{DecodeSession, SampleFormat};
//! use core_decode::traits::{FrameSource, LayerDecoderFactory};
//!
//! fn play(
//!     source: Box<dyn FrameSource>,
//!     factory: Box<dyn LayerDecoderFactory>,
//! ) -> core_decode::Result<()> {
//!     let session = DecodeSession::new(source, factory)?;
//!
//!     let mut pcm = vec![0u8; 9216];
//!     loop {
//!         let n = session.read(&mut pcm, SampleFormat::F32)?;
//!         if n == 0 {
//!             break; // stream exhausted
//!         }
//!         // feed pcm[..n] to the audio device
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Threading Model
//!
//! A session is `Send + Sync`; every read and seek runs under one
//! internal lock, so calls from different threads serialize rather than
//! corrupt shared decode state. There are no background threads and no
//! async suspension points.

pub mod config;
pub mod error;
pub mod session;
pub mod traits;

pub use config::SessionConfig;
pub use error::{DecodeError, Result};
pub use session::{DecodeSession, FrameDispatcher, SampleConverter};
pub use traits::{
    ChannelMode, EqualizerProfile, Frame, FrameSource, LayerDecoder, LayerDecoderFactory,
    LayerKind, SampleFormat, StereoMode, EQ_BANDS, MAX_CHANNELS, MAX_SAMPLES_PER_FRAME,
};
