//! # Decode Session
//!
//! The stateful, seekable read cursor over an unbounded decoded stream.

use crate::config::SessionConfig;
use crate::error::{DecodeError, Result};
use crate::session::dispatcher::FrameDispatcher;
use crate::session::sample_converter::SampleConverter;
use crate::traits::{
    EqualizerProfile, Frame, FrameSource, LayerDecoderFactory, SampleFormat, StereoMode,
    MAX_CHANNELS, MAX_SAMPLES_PER_FRAME,
};
use parking_lot::Mutex;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Bytes one sample occupies in the canonical position unit.
///
/// Positions and seek targets are always expressed as if every sample
/// were a 4-byte float, regardless of the output format a read requests.
const BYTES_PER_SAMPLE: u64 = 4;

/// Streaming, seekable decode session over a compressed audio stream.
///
/// A session pulls frames from a [`FrameSource`], decodes them through a
/// pooled set of layer decoders, and serves the resulting PCM bytes
/// through [`DecodeSession::read`] in one of three sample formats. When
/// the source supports it, [`DecodeSession::seek`] repositions the cursor
/// to a frame boundary and resynchronizes decoder state.
///
/// ## Thread Safety
///
/// All methods take `&self`; a single internal mutex serializes reads and
/// seeks against each other (and against themselves), so a session can be
/// shared across threads. Both operations mutate multi-step session state
/// and must never interleave.
///
/// ## Buffering
///
/// Decoded samples land in a fixed-capacity scratch buffer sized for one
/// frame of the largest supported layer; a read drains it before pulling
/// the next frame, and leftover samples stay buffered for the next call.
pub struct DecodeSession {
    sample_rate: u32,
    channel_count: u16,
    can_seek: bool,
    first_frame_samples: u32,
    total_samples: Option<u64>,
    inner: Mutex<SessionInner>,
}

struct SessionInner {
    source: Box<dyn FrameSource>,
    dispatcher: FrameDispatcher,
    /// Decoded-but-unconsumed samples live in
    /// `scratch[scratch_offset..scratch_len]`.
    scratch: Vec<f32>,
    scratch_offset: usize,
    scratch_len: usize,
    /// Emitted output bytes in the canonical 4-byte unit.
    position: u64,
    end_of_stream: bool,
}

/// Releases a frame's backing storage when dropped, so the release also
/// runs when decode fails.
struct FrameRelease(Box<dyn Frame>);

impl FrameRelease {
    fn new(frame: Box<dyn Frame>) -> Self {
        Self(frame)
    }

    fn as_mut(&mut self) -> &mut dyn Frame {
        self.0.as_mut()
    }
}

impl Drop for FrameRelease {
    fn drop(&mut self) {
        self.0.clear_buffer();
    }
}

impl std::fmt::Debug for DecodeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodeSession")
            .field("sample_rate", &self.sample_rate)
            .field("channel_count", &self.channel_count)
            .field("can_seek", &self.can_seek)
            .field("total_samples", &self.total_samples)
            .finish_non_exhaustive()
    }
}

impl DecodeSession {
    /// Create a session with default configuration.
    pub fn new(
        source: Box<dyn FrameSource>,
        factory: Box<dyn LayerDecoderFactory>,
    ) -> Result<Self> {
        Self::with_config(source, factory, SessionConfig::default())
    }

    /// Create a session with the given output-shaping configuration.
    ///
    /// Stream metadata is validated here, once: a stream whose frames the
    /// scratch buffer could not hold is rejected at construction rather
    /// than mid-read.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::InvalidConfig`] for a bad configuration and
    /// [`DecodeError::InvalidFormat`] for unusable stream metadata.
    #[instrument(skip_all)]
    pub fn with_config(
        source: Box<dyn FrameSource>,
        factory: Box<dyn LayerDecoderFactory>,
        config: SessionConfig,
    ) -> Result<Self> {
        config.validate().map_err(DecodeError::InvalidConfig)?;

        let sample_rate = source.sample_rate();
        if sample_rate == 0 {
            return Err(DecodeError::InvalidFormat(
                "stream reports a sample rate of zero".to_string(),
            ));
        }

        let channel_count = source.channel_count();
        if channel_count == 0 || channel_count as usize > MAX_CHANNELS {
            return Err(DecodeError::InvalidFormat(format!(
                "unsupported channel count: {channel_count}"
            )));
        }

        let mut dispatcher = FrameDispatcher::new(factory);
        dispatcher.set_stereo_mode(config.stereo_mode);
        if let Some(db) = &config.equalizer_db {
            dispatcher.set_equalizer(Some(EqualizerProfile::from_db(db)?));
        }

        info!(
            sample_rate,
            channel_count,
            can_seek = source.can_seek(),
            "decode session ready"
        );

        Ok(Self {
            sample_rate,
            channel_count,
            can_seek: source.can_seek(),
            first_frame_samples: source.first_frame_sample_count(),
            total_samples: source.total_sample_count(),
            inner: Mutex::new(SessionInner {
                source,
                dispatcher,
                scratch: vec![0.0; MAX_SAMPLES_PER_FRAME * MAX_CHANNELS],
                scratch_offset: 0,
                scratch_len: 0,
                position: 0,
                end_of_stream: false,
            }),
        })
    }

    /// Fill `dest` with decoded samples in the requested format.
    ///
    /// Returns the number of bytes written. A short count (possibly zero)
    /// means the stream is exhausted; once exhausted, every further read
    /// returns zero until a [`DecodeSession::seek`] reactivates the
    /// session. Frames that fail to decode are skipped, with decoder
    /// state resynchronized, and never surface as read errors.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::MisalignedBuffer`] if `dest.len()` is not a
    /// whole number of samples for `format`.
    #[instrument(level = "trace", skip(self, dest), fields(bytes = dest.len()))]
    pub fn read(&self, dest: &mut [u8], format: SampleFormat) -> Result<usize> {
        let width = format.bytes_per_sample();
        if dest.len() % width != 0 {
            return Err(DecodeError::MisalignedBuffer {
                length: dest.len(),
                format,
            });
        }

        let mut inner = self.inner.lock();
        let inner = &mut *inner;

        let mut transferred = 0;
        while transferred < dest.len() {
            // Drain whatever the scratch buffer still holds.
            if inner.scratch_offset < inner.scratch_len {
                let want = (dest.len() - transferred) / width;
                let take = want.min(inner.scratch_len - inner.scratch_offset);
                let samples = &inner.scratch[inner.scratch_offset..inner.scratch_offset + take];
                let written = SampleConverter::write_samples(
                    samples,
                    &mut dest[transferred..transferred + take * width],
                    format,
                );
                inner.scratch_offset += take;
                inner.position += take as u64 * BYTES_PER_SAMPLE;
                transferred += written;
                continue;
            }

            if inner.end_of_stream {
                break;
            }

            // Refill: pull and decode the next frame.
            let Some(frame) = inner.source.next_frame() else {
                debug!(position = inner.position, "frame source exhausted");
                inner.end_of_stream = true;
                break;
            };
            let mut frame = FrameRelease::new(frame);
            match inner
                .dispatcher
                .decode_frame(frame.as_mut(), &mut inner.scratch, 0)
            {
                Ok(samples) => {
                    inner.scratch_offset = 0;
                    inner.scratch_len = samples;
                }
                Err(err) if err.is_recoverable() => {
                    // Poisoned filter state must not leak into the next
                    // frame's decode.
                    warn!(error = %err, "skipping undecodable frame");
                    inner.dispatcher.reset_all();
                }
                Err(err) => return Err(err),
            }
        }

        Ok(transferred)
    }

    /// Move the read cursor to `target`, a byte position in the canonical
    /// 4-byte-per-sample unit.
    ///
    /// The cursor lands on the frame boundary at or before the target.
    /// When the landing frame is not the stream's first, the preceding
    /// frame is decoded and discarded so carried decoder state (e.g. a
    /// bit reservoir) re-primes; output immediately after such a seek is
    /// not guaranteed bit-exact against a linear decode.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::SeekNotSupported`] for non-seekable sources
    /// and [`DecodeError::SeekOutOfRange`] if the source cannot reach the
    /// target; a failed seek leaves the session state untouched.
    #[instrument(level = "debug", skip(self))]
    pub fn seek(&self, target: u64) -> Result<()> {
        let mut inner = self.inner.lock();
        let inner = &mut *inner;

        if !self.can_seek {
            return Err(DecodeError::SeekNotSupported);
        }

        let unit = BYTES_PER_SAMPLE * u64::from(self.channel_count);
        let samples = target / unit;

        // Land on the frame before the target so carried decoder state can
        // re-prime, unless the target is inside the first frame. The first
        // frame may be irregular, so its sample count is used as-is.
        let first = u64::from(self.first_frame_samples);
        let (request, sample_offset) = if samples >= first {
            (samples - first, first)
        } else {
            (samples, 0)
        };

        let Some(mut reached) = inner.source.seek_to(request) else {
            return Err(DecodeError::SeekOutOfRange(target));
        };

        // Continuity is broken from here on.
        inner.dispatcher.reset_all();

        if sample_offset != 0 {
            // Pre-roll: decode the preceding frame and throw the output
            // away. Failures only cost resynchronization quality.
            if let Some(frame) = inner.source.next_frame() {
                let mut frame = FrameRelease::new(frame);
                if let Err(err) =
                    inner
                        .dispatcher
                        .decode_frame(frame.as_mut(), &mut inner.scratch, 0)
                {
                    debug!(error = %err, "pre-roll decode failed");
                }
            }
            reached += sample_offset;
        }

        inner.position = reached * unit;
        inner.scratch_offset = 0;
        inner.scratch_len = 0;
        inner.end_of_stream = false;

        debug!(position = inner.position, "seek complete");
        Ok(())
    }

    /// Current read position as emitted bytes in the canonical
    /// 4-byte-per-sample unit, across all channels.
    pub fn position(&self) -> u64 {
        self.inner.lock().position
    }

    /// Seek to an absolute byte position. Equivalent to
    /// [`DecodeSession::seek`].
    pub fn set_position(&self, position: u64) -> Result<()> {
        self.seek(position)
    }

    /// Current read position as stream time.
    pub fn time(&self) -> Duration {
        let bytes_per_second =
            BYTES_PER_SAMPLE * u64::from(self.channel_count) * u64::from(self.sample_rate);
        Duration::from_secs_f64(self.position() as f64 / bytes_per_second as f64)
    }

    /// Seek to an absolute stream time.
    pub fn set_time(&self, time: Duration) -> Result<()> {
        let samples = (time.as_secs_f64() * f64::from(self.sample_rate)) as u64;
        self.seek(samples * BYTES_PER_SAMPLE * u64::from(self.channel_count))
    }

    /// Total stream duration, if the source declares its length.
    pub fn duration(&self) -> Option<Duration> {
        self.total_samples
            .map(|samples| Duration::from_secs_f64(samples as f64 / f64::from(self.sample_rate)))
    }

    /// Sample rate of the stream in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count of the stream.
    pub fn channel_count(&self) -> u16 {
        self.channel_count
    }

    /// Returns `true` if [`DecodeSession::seek`] can succeed.
    pub fn can_seek(&self) -> bool {
        self.can_seek
    }

    /// Total samples per channel, if the source declares its length.
    pub fn total_sample_count(&self) -> Option<u64> {
        self.total_samples
    }

    /// Install a gain profile applied during subsequent decodes; `None`
    /// restores a flat response.
    pub fn set_equalizer(&self, profile: Option<EqualizerProfile>) {
        self.inner.lock().dispatcher.set_equalizer(profile);
    }

    /// Current stereo-reduction policy.
    pub fn stereo_mode(&self) -> StereoMode {
        self.inner.lock().dispatcher.stereo_mode()
    }

    /// Select the stereo-reduction policy for subsequent decodes.
    pub fn set_stereo_mode(&self, mode: StereoMode) {
        self.inner.lock().dispatcher.set_stereo_mode(mode);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::traits::{LayerDecoder, LayerKind};

    struct NoopFactory;

    impl LayerDecoderFactory for NoopFactory {
        fn make(&self, layer: LayerKind) -> Result<Box<dyn LayerDecoder>> {
            Err(DecodeError::UnsupportedLayer(layer))
        }
    }

    struct MetadataOnlySource {
        sample_rate: u32,
        channel_count: u16,
    }

    impl FrameSource for MetadataOnlySource {
        fn next_frame(&mut self) -> Option<Box<dyn Frame>> {
            None
        }
        fn seek_to(&mut self, _sample_index: u64) -> Option<u64> {
            None
        }
        fn sample_rate(&self) -> u32 {
            self.sample_rate
        }
        fn channel_count(&self) -> u16 {
            self.channel_count
        }
        fn total_sample_count(&self) -> Option<u64> {
            None
        }
        fn can_seek(&self) -> bool {
            false
        }
        fn first_frame_sample_count(&self) -> u32 {
            1152
        }
    }

    #[test]
    fn construction_rejects_zero_sample_rate() {
        let source = MetadataOnlySource {
            sample_rate: 0,
            channel_count: 2,
        };
        let err = DecodeSession::new(Box::new(source), Box::new(NoopFactory)).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidFormat(_)));
    }

    #[test]
    fn construction_rejects_excess_channels() {
        let source = MetadataOnlySource {
            sample_rate: 44100,
            channel_count: 6,
        };
        let err = DecodeSession::new(Box::new(source), Box::new(NoopFactory)).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidFormat(_)));
    }

    #[test]
    fn construction_rejects_bad_equalizer_config() {
        let source = MetadataOnlySource {
            sample_rate: 44100,
            channel_count: 2,
        };
        let config = SessionConfig::default().with_equalizer_db(vec![0.0; 4]);
        let err = DecodeSession::with_config(Box::new(source), Box::new(NoopFactory), config)
            .unwrap_err();
        assert!(matches!(err, DecodeError::InvalidConfig(_)));
        assert!(err.is_usage_error());
    }
}
