//! Audio file decoding via Symphonia.
//!
//! Uploads arrive as an in-memory byte payload plus the original filename.
//! The extension is only a hint: Symphonia probes the container itself.
//! Opus tracks, which Symphonia can demux but not decode, go through
//! [`crate::OpusPacketDecoder`].

use std::borrow::Cow;
use std::io::Cursor;

use decibel_error::{AudioError, AudioErrorKind};
use derive_getters::Getters;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, CODEC_TYPE_OPUS, CodecParameters, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, Packet};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, instrument, warn};

use crate::AudioResult;
use crate::opus_stream::{OPUS_SAMPLE_RATE, OpusPacketDecoder, parse_opus_head};

/// Fully decoded clip.
///
/// Samples are interleaved `f64` in `[-1, 1]`, so the buffer reads as
/// `frames × channels`.
#[derive(Debug, Clone, PartialEq, Getters)]
pub struct DecodedAudio {
    /// Interleaved samples.
    samples: Vec<f64>,
    /// Sample rate in Hz.
    sample_rate: u32,
    /// Number of interleaved channels.
    channels: usize,
}

impl DecodedAudio {
    /// Build a clip from already-decoded interleaved samples.
    pub fn from_interleaved(
        samples: Vec<f64>,
        sample_rate: u32,
        channels: usize,
    ) -> AudioResult<Self> {
        if channels == 0 {
            return Err(AudioError::new(AudioErrorKind::Decode(
                "channel count is zero".to_string(),
            )));
        }
        if samples.is_empty() {
            return Err(AudioError::new(AudioErrorKind::Empty));
        }
        Ok(Self {
            samples,
            sample_rate,
            channels,
        })
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    /// Clip length in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Mono reduction: the plain mean of each frame's channels.
    pub fn mono(&self) -> Cow<'_, [f64]> {
        if self.channels == 1 {
            return Cow::Borrowed(&self.samples);
        }
        let channels = self.channels as f64;
        Cow::Owned(
            self.samples
                .chunks_exact(self.channels)
                .map(|frame| frame.iter().sum::<f64>() / channels)
                .collect(),
        )
    }
}

/// Decode an uploaded file.
///
/// Opus tracks are decoded with libopus; everything else with Symphonia.
///
/// # Errors
///
/// - `UnsupportedFormat` when no demuxer or codec matches the payload
/// - `NoAudioTrack` when the container holds no audio
/// - `Decode` when the stream is corrupt beyond single packets
/// - `Empty` when nothing decodes
#[instrument(skip(bytes), fields(size = bytes.len()))]
pub fn decode(bytes: Vec<u8>, filename: &str) -> AudioResult<DecodedAudio> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension(filename) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AudioError::new(AudioErrorKind::UnsupportedFormat(e.to_string())))?;
    let mut reader = probed.format;

    let track = reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AudioError::new(AudioErrorKind::NoAudioTrack))?;
    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let audio = if codec_params.codec == CODEC_TYPE_OPUS {
        decode_opus_track(reader.as_mut(), track_id, &codec_params)?
    } else {
        decode_track(reader.as_mut(), track_id, &codec_params)?
    };
    debug!(
        sample_rate = audio.sample_rate,
        channels = audio.channels,
        frames = audio.frames(),
        "Decoded audio clip"
    );
    Ok(audio)
}

/// Next packet belonging to `track_id`, or `None` at end of stream.
fn next_track_packet(reader: &mut dyn FormatReader, track_id: u32) -> AudioResult<Option<Packet>> {
    loop {
        match reader.next_packet() {
            Ok(packet) if packet.track_id() == track_id => return Ok(Some(packet)),
            Ok(_) => continue,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        }
    }
}

fn decode_track(
    reader: &mut dyn FormatReader,
    track_id: u32,
    codec_params: &CodecParameters,
) -> AudioResult<DecodedAudio> {
    let mut decoder = symphonia::default::get_codecs()
        .make(codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::new(AudioErrorKind::UnsupportedFormat(e.to_string())))?;

    let mut sample_rate = codec_params.sample_rate;
    let mut channels = codec_params.channels.map(|c| c.count());
    let mut samples: Vec<f64> = Vec::new();

    while let Some(packet) = next_track_packet(reader, track_id)? {
        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(msg)) => {
                warn!(error = %msg, "Skipping corrupted audio packet");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        let num_frames = decoded.frames();
        if num_frames == 0 {
            continue;
        }
        sample_rate.get_or_insert(spec.rate);
        channels.get_or_insert(spec.channels.count());

        let mut sample_buf = SampleBuffer::<f64>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        samples.extend_from_slice(sample_buf.samples());
    }

    let sample_rate = sample_rate
        .ok_or_else(|| AudioError::new(AudioErrorKind::Decode("no sample rate".to_string())))?;
    let channels = channels
        .ok_or_else(|| AudioError::new(AudioErrorKind::Decode("no channel layout".to_string())))?;

    DecodedAudio::from_interleaved(samples, sample_rate, channels)
}

/// Decode an Opus track at 48 kHz.
///
/// Channel count and pre-skip come from the `OpusHead` header when the
/// demuxer passes it along, otherwise from the track parameters.
fn decode_opus_track(
    reader: &mut dyn FormatReader,
    track_id: u32,
    codec_params: &CodecParameters,
) -> AudioResult<DecodedAudio> {
    let (channels, pre_skip) = codec_params
        .extra_data
        .as_deref()
        .and_then(parse_opus_head)
        .unwrap_or_else(|| {
            (
                codec_params.channels.map_or(1, |c| c.count()),
                codec_params.delay.unwrap_or(0),
            )
        });
    let mut decoder = OpusPacketDecoder::new(channels, pre_skip)?;
    debug!(channels, pre_skip, "Decoding Opus track");

    let mut samples: Vec<f64> = Vec::new();
    while let Some(packet) = next_track_packet(reader, track_id)? {
        if let Err(e) = decoder.decode_packet(packet.buf(), &mut samples) {
            warn!(error = %e, "Skipping corrupted Opus packet");
        }
    }

    DecodedAudio::from_interleaved(samples, OPUS_SAMPLE_RATE, decoder.channels())
}

fn extension(filename: &str) -> Option<&str> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_is_last_dot_segment() {
        assert_eq!(extension("voice-message.ogg"), Some("ogg"));
        assert_eq!(extension("take.2.final.flac"), Some("flac"));
        assert_eq!(extension("README"), None);
        assert_eq!(extension("trailing."), None);
    }

    #[test]
    fn mono_averages_channels() {
        let audio = DecodedAudio::from_interleaved(vec![1.0, 0.0, -0.5, -0.5], 8_000, 2)
            .expect("valid buffer");
        assert_eq!(audio.frames(), 2);
        assert_eq!(audio.mono(), vec![0.5, -0.5]);
    }
}
