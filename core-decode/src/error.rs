//! # Decode Error Types
//!
//! Error types for decode session operations.

use crate::traits::{LayerKind, SampleFormat};
use thiserror::Error;

/// Errors that can occur while decoding or seeking a stream.
#[derive(Error, Debug)]
pub enum DecodeError {
    // ========================================================================
    // Usage Errors
    // ========================================================================
    /// Seeking was requested on a stream that does not support it.
    #[error("Seeking not supported")]
    SeekNotSupported,

    /// Seek target lies outside the stream.
    #[error("Seek target out of range: byte position {0}")]
    SeekOutOfRange(u64),

    /// Destination buffer cannot hold the worst-case output of one frame.
    #[error("Output buffer too small: needed {needed} samples, got {available}")]
    BufferTooSmall {
        /// Samples the current frame produces.
        needed: usize,
        /// Samples the destination can hold.
        available: usize,
    },

    /// Destination byte length is not a whole number of samples.
    #[error("Output length {length} is not aligned to {format:?} samples")]
    MisalignedBuffer {
        /// Byte length of the destination buffer.
        length: usize,
        /// Requested output sample format.
        format: SampleFormat,
    },

    // ========================================================================
    // Stream Errors (recoverable inside the read loop)
    // ========================================================================
    /// Frame is flagged corrupt or failed to parse cleanly.
    #[error("Corrupted frame")]
    CorruptedFrame,

    /// No decoder could be created for the frame's layer.
    #[error("Unsupported layer: {0:?}")]
    UnsupportedLayer(LayerKind),

    /// A layer decoder reported an internal failure.
    #[error("Decoder fault: {0}")]
    DecoderFault(String),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Session configuration failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Stream metadata is unusable (zero sample rate, too many channels, ...).
    #[error("Unsupported stream format: {0}")]
    InvalidFormat(String),
}

impl DecodeError {
    /// Returns `true` if the read loop may discard the offending frame,
    /// reset decoder state, and continue with the next frame.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DecodeError::CorruptedFrame
                | DecodeError::UnsupportedLayer(_)
                | DecodeError::DecoderFault(_)
        )
    }

    /// Returns `true` if this error indicates caller misuse rather than bad
    /// stream data.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            DecodeError::SeekNotSupported
                | DecodeError::BufferTooSmall { .. }
                | DecodeError::MisalignedBuffer { .. }
                | DecodeError::InvalidConfig(_)
        )
    }
}

/// Result type for decode session operations.
pub type Result<T> = std::result::Result<T, DecodeError>;
