//! # Frame Dispatch
//!
//! Routes parsed frames to the matching layer decoder and assembles the
//! decoded channels into an interleaved float buffer.

use crate::error::{DecodeError, Result};
use crate::traits::{
    EqualizerProfile, Frame, LayerDecoder, LayerDecoderFactory, StereoMode, MAX_SAMPLES_PER_FRAME,
};
use tracing::trace;

/// Number of decoder slots, one per [`crate::traits::LayerKind`].
const LAYER_SLOTS: usize = 3;

/// Translates one frame into interleaved float samples.
///
/// The dispatcher owns a fixed table of at most one decoder per layer
/// kind. Slots fill lazily through the factory on first use of a layer
/// and stay alive for the dispatcher's lifetime; a seek only invalidates
/// their internal filter memory via [`FrameDispatcher::reset_all`].
///
/// ## Output shape
///
/// Mono frames produce `sample_count` samples. Non-mono frames always
/// produce `2 * sample_count` interleaved left/right samples, including
/// under [`StereoMode::LeftOnly`], [`StereoMode::RightOnly`], and
/// [`StereoMode::DownmixToMono`], where both slots of each pair carry the
/// same reduced value. Callers depend on the stereo-shaped buffer, so the
/// redundant second channel is part of the contract.
pub struct FrameDispatcher {
    factory: Box<dyn LayerDecoderFactory>,
    decoders: [Option<Box<dyn LayerDecoder>>; LAYER_SLOTS],
    equalizer: Option<EqualizerProfile>,
    stereo_mode: StereoMode,
    // Per-channel decode scratch, reused across calls.
    ch0: Vec<f32>,
    ch1: Vec<f32>,
}

impl FrameDispatcher {
    /// Create a dispatcher with an empty decoder table.
    pub fn new(factory: Box<dyn LayerDecoderFactory>) -> Self {
        Self {
            factory,
            decoders: [None, None, None],
            equalizer: None,
            stereo_mode: StereoMode::default(),
            ch0: vec![0.0; MAX_SAMPLES_PER_FRAME],
            ch1: vec![0.0; MAX_SAMPLES_PER_FRAME],
        }
    }

    /// Decode `frame` into `dest` starting at `dest_offset`.
    ///
    /// The destination must hold the frame's full output (one or two
    /// channels of `sample_count` samples) past the offset; a short
    /// destination is a fatal [`DecodeError::BufferTooSmall`], never
    /// retried. Returns the number of samples written.
    ///
    /// # Errors
    ///
    /// Recoverable stream errors ([`DecodeError::CorruptedFrame`],
    /// [`DecodeError::UnsupportedLayer`], [`DecodeError::DecoderFault`])
    /// leave the frame undecoded; the caller decides whether to skip it.
    pub fn decode_frame(
        &mut self,
        frame: &mut dyn Frame,
        dest: &mut [f32],
        dest_offset: usize,
    ) -> Result<usize> {
        let mono = frame.channel_mode().is_mono();
        let channels = if mono { 1 } else { 2 };
        let sample_count = frame.sample_count().min(MAX_SAMPLES_PER_FRAME);

        let needed = channels * sample_count;
        let available = dest.len().saturating_sub(dest_offset);
        if available < needed {
            return Err(DecodeError::BufferTooSmall { needed, available });
        }

        if frame.is_corrupted() {
            return Err(DecodeError::CorruptedFrame);
        }

        frame.reset();

        let slot = frame.layer().index();
        if self.decoders[slot].is_none() {
            trace!(layer = ?frame.layer(), "creating layer decoder");
            self.decoders[slot] = Some(self.factory.make(frame.layer())?);
        }
        let Some(decoder) = self.decoders[slot].as_mut() else {
            return Err(DecodeError::UnsupportedLayer(frame.layer()));
        };

        // Output shaping may have changed since the last frame; push the
        // current settings before every decode.
        decoder.set_equalizer(self.equalizer.as_ref());
        decoder.set_stereo_mode(self.stereo_mode);

        let produced = decoder
            .decode_frame(frame, &mut self.ch0, &mut self.ch1)?
            .min(sample_count);

        let out = &mut dest[dest_offset..];
        if mono {
            out[..produced].copy_from_slice(&self.ch0[..produced]);
            Ok(produced)
        } else {
            for i in 0..produced {
                out[2 * i] = self.ch0[i];
                out[2 * i + 1] = self.ch1[i];
            }
            Ok(produced * 2)
        }
    }

    /// Invalidate every live decoder's filter memory without discarding
    /// the pooled instances. Called whenever decode continuity breaks.
    pub fn reset_all(&mut self) {
        for decoder in self.decoders.iter_mut().flatten() {
            decoder.reset_for_seek();
        }
    }

    /// Install the gain profile pushed into decoders on each decode.
    pub fn set_equalizer(&mut self, profile: Option<EqualizerProfile>) {
        self.equalizer = profile;
    }

    /// Current stereo-reduction policy.
    pub fn stereo_mode(&self) -> StereoMode {
        self.stereo_mode
    }

    /// Select the stereo-reduction policy pushed into decoders on each
    /// decode.
    pub fn set_stereo_mode(&mut self, mode: StereoMode) {
        self.stereo_mode = mode;
    }
}
