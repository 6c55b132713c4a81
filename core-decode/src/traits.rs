//! # Core Decode Traits
//!
//! This module defines the abstractions the decode session is built on.
//! The session itself owns no bitstream parsing and no codec math; both
//! arrive through the trait seams declared here:
//!
//! - [`FrameSource`] locates frame boundaries in the raw byte stream and
//!   hands out one parsed [`Frame`] at a time.
//! - [`LayerDecoder`] turns one frame into per-channel float samples for
//!   one codec layer, carrying filter/reservoir state between calls.
//! - [`LayerDecoderFactory`] constructs decoders on first use of a layer,
//!   so the session can keep one live instance per layer kind.
//!
//! ## Threading Model
//!
//! All collaborator traits are `Send`: the session wraps them in its own
//! mutex and may be shared across threads. Calls into them are always
//! serialized by that lock; implementations do not need interior
//! synchronization of their own.

use crate::error::{DecodeError, Result};
use serde::{Deserialize, Serialize};

// ============================================================================
// Stream Limits
// ============================================================================

/// Most samples a single frame of any supported layer produces per channel.
pub const MAX_SAMPLES_PER_FRAME: usize = 1152;

/// Most channels a decodable stream carries.
pub const MAX_CHANNELS: usize = 2;

/// Number of frequency bands an equalizer profile covers.
pub const EQ_BANDS: usize = 32;

// ============================================================================
// Header Metadata Types
// ============================================================================

/// Codec layer a frame was encoded with.
///
/// Each layer has its own decoding algorithm; the session keeps at most one
/// live decoder per kind and routes frames by this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    /// Layer I (384 samples per frame).
    LayerI,
    /// Layer II (1152 samples per frame).
    LayerII,
    /// Layer III (576 or 1152 samples per frame, carries a bit reservoir).
    LayerIII,
}

impl LayerKind {
    /// Slot index into the session's fixed decoder table.
    pub const fn index(self) -> usize {
        match self {
            LayerKind::LayerI => 0,
            LayerKind::LayerII => 1,
            LayerKind::LayerIII => 2,
        }
    }
}

/// Channel layout a frame was encoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelMode {
    /// Single channel.
    Mono,
    /// Two independent channels.
    Stereo,
    /// Two channels sharing high-band data.
    JointStereo,
    /// Two unrelated mono programs in one stream.
    DualChannel,
}

impl ChannelMode {
    /// Returns `true` for single-channel frames.
    pub fn is_mono(&self) -> bool {
        matches!(self, ChannelMode::Mono)
    }

    /// Number of channels this mode carries.
    pub fn channel_count(&self) -> u16 {
        if self.is_mono() {
            1
        } else {
            2
        }
    }
}

// ============================================================================
// Output Shaping Types
// ============================================================================

/// Policy for collapsing two source channels into the decoded output.
///
/// Reduction modes change the *signal* in each channel, not the shape of
/// the output: a non-mono frame always decodes to an interleaved
/// two-channel buffer, with both slots carrying the reduced signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StereoMode {
    /// Decode both channels as-is.
    #[default]
    Both,
    /// Both output channels carry the left channel.
    LeftOnly,
    /// Both output channels carry the right channel.
    RightOnly,
    /// Both output channels carry the average of left and right.
    DownmixToMono,
}

/// Byte layout of the samples a read call produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleFormat {
    /// 32-bit float, little-endian, the decoder's native output.
    F32,
    /// 16-bit signed integer, little-endian.
    S16,
    /// 8-bit unsigned integer.
    U8,
}

impl SampleFormat {
    /// Bytes one sample occupies in this format.
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            SampleFormat::F32 => 4,
            SampleFormat::S16 => 2,
            SampleFormat::U8 => 1,
        }
    }
}

/// Per-band gain profile applied inside the layer decoders.
///
/// Gains are stored as linear factors; [`EqualizerProfile::from_db`]
/// derives each factor from a decibel value as `2^(db/6)`, so +6 dB
/// doubles a band and -6 dB halves it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqualizerProfile {
    factors: [f32; EQ_BANDS],
}

impl EqualizerProfile {
    /// Build a profile from one decibel value per band.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::InvalidConfig`] unless exactly [`EQ_BANDS`]
    /// values are given.
    pub fn from_db(db: &[f32]) -> Result<Self> {
        if db.len() != EQ_BANDS {
            return Err(DecodeError::InvalidConfig(format!(
                "equalizer requires {EQ_BANDS} bands, got {}",
                db.len()
            )));
        }
        let mut factors = [1.0f32; EQ_BANDS];
        for (factor, &db) in factors.iter_mut().zip(db) {
            *factor = (db / 6.0).exp2();
        }
        Ok(Self { factors })
    }

    /// Unity-gain profile.
    pub fn flat() -> Self {
        Self {
            factors: [1.0; EQ_BANDS],
        }
    }

    /// Linear gain factor for one band; bands past the end are unity.
    pub fn factor(&self, band: usize) -> f32 {
        self.factors.get(band).copied().unwrap_or(1.0)
    }

    /// All linear gain factors.
    pub fn factors(&self) -> &[f32; EQ_BANDS] {
        &self.factors
    }
}

impl Default for EqualizerProfile {
    fn default() -> Self {
        Self::flat()
    }
}

// ============================================================================
// Collaborator Traits
// ============================================================================

/// One parsed, decodable unit of compressed audio.
///
/// A frame is handed out by a [`FrameSource`], consumed exactly once by
/// exactly one decode call, and released via [`Frame::clear_buffer`]
/// afterwards. The session guarantees the release runs on every exit
/// path, including failed decodes; a frame is never reused after release.
pub trait Frame {
    /// Codec layer this frame was encoded with.
    fn layer(&self) -> LayerKind;

    /// Sample rate of this frame in Hz.
    fn sample_rate(&self) -> u32;

    /// Channel layout of this frame.
    fn channel_mode(&self) -> ChannelMode;

    /// Samples this frame decodes to, per channel.
    fn sample_count(&self) -> usize;

    /// Returns `true` if the framer flagged this frame as damaged.
    fn is_corrupted(&self) -> bool;

    /// Read the next `count` bits (at most 32) from the frame payload.
    ///
    /// This is the sequential bit-consumption view layer decoders parse
    /// the payload through. Returns `None` once the payload is exhausted.
    fn read_bits(&mut self, count: u32) -> Option<u32>;

    /// Rewind the bit cursor to the start of the payload.
    fn reset(&mut self);

    /// Release the frame's backing storage. Called exactly once, after
    /// decode; the frame must not be used afterwards.
    fn clear_buffer(&mut self);
}

/// Supplies parsed frames, in order, from a byte stream.
///
/// A source is forward-only; [`FrameSource::seek_to`] (when supported)
/// repositions it to a frame boundary at or before a target sample index.
pub trait FrameSource: Send {
    /// Advance to and return the next frame, or `None` at end of stream.
    fn next_frame(&mut self) -> Option<Box<dyn Frame>>;

    /// Seek to the frame boundary at or immediately before `sample_index`
    /// (a per-channel sample count from the start of the stream).
    ///
    /// Returns the sample index of the boundary actually reached, or
    /// `None` if the source is non-seekable or the index is out of range.
    fn seek_to(&mut self, sample_index: u64) -> Option<u64>;

    /// Sample rate of the stream in Hz.
    fn sample_rate(&self) -> u32;

    /// Channel count of the stream.
    fn channel_count(&self) -> u16;

    /// Total samples per channel, if the container declares it.
    fn total_sample_count(&self) -> Option<u64>;

    /// Returns `true` if [`FrameSource::seek_to`] can succeed.
    fn can_seek(&self) -> bool;

    /// Sample contribution of the stream's very first frame.
    ///
    /// The first frame may be irregular (shorter or longer than the rest)
    /// and seek arithmetic must account for it separately.
    fn first_frame_sample_count(&self) -> u32;
}

/// Decodes frames of one codec layer into float samples.
///
/// A decoder is stateful: synthesis filter and reservoir memory carry
/// across calls and make consecutive decodes continuous. That memory is
/// only valid along an unbroken frame sequence; the session calls
/// [`LayerDecoder::reset_for_seek`] whenever continuity breaks.
pub trait LayerDecoder: Send {
    /// Decode one frame into `ch0` (and `ch1` for non-mono frames).
    ///
    /// Both slices hold at least [`MAX_SAMPLES_PER_FRAME`] samples. When a
    /// reduction mode is active, both channel buffers must carry the
    /// reduced signal. Returns the number of samples produced per channel.
    fn decode_frame(
        &mut self,
        frame: &mut dyn Frame,
        ch0: &mut [f32],
        ch1: &mut [f32],
    ) -> Result<usize>;

    /// Install the gain profile applied during subsequent decodes.
    /// `None` restores a flat response.
    fn set_equalizer(&mut self, profile: Option<&EqualizerProfile>);

    /// Select the stereo-reduction policy for subsequent decodes.
    fn set_stereo_mode(&mut self, mode: StereoMode);

    /// Discard filter and reservoir memory after a continuity break.
    fn reset_for_seek(&mut self);
}

/// Creates layer decoders on first use of a layer kind.
///
/// The session keeps the created instance alive for its own lifetime, so
/// a factory is consulted at most once per layer per session.
pub trait LayerDecoderFactory: Send {
    /// Construct a decoder for `layer`.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::UnsupportedLayer`] if this factory cannot
    /// decode the given layer.
    fn make(&self, layer: LayerKind) -> Result<Box<dyn LayerDecoder>>;
}

// ============================================================================
// Tests
// ============================================================================
