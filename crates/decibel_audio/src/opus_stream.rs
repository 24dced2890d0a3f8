//! Opus packet decoding through libopus.
//!
//! Symphonia demuxes Ogg/Opus (Discord voice messages) but has no Opus codec,
//! so the packets of an Opus track are handed to libopus instead.

use decibel_error::{AudioError, AudioErrorKind};
use opus::{Channels, Decoder};

use crate::AudioResult;

/// Opus streams always decode at 48 kHz.
pub const OPUS_SAMPLE_RATE: u32 = 48_000;

/// Longest Opus packet: 120 ms at 48 kHz.
const MAX_PACKET_FRAMES: usize = 5_760;

/// Channel count and pre-skip read from an `OpusHead` identification header.
pub fn parse_opus_head(head: &[u8]) -> Option<(usize, u32)> {
    if head.len() < 19 || !head.starts_with(b"OpusHead") {
        return None;
    }
    let channels = usize::from(head[9]);
    let pre_skip = u32::from(u16::from_le_bytes([head[10], head[11]]));
    Some((channels, pre_skip))
}

/// Stateful decoder for the packets of one Opus stream.
///
/// The first `pre_skip` frames are encoder priming and are dropped.
pub struct OpusPacketDecoder {
    decoder: Decoder,
    channels: usize,
    skip: usize,
    buffer: Vec<f32>,
}

impl std::fmt::Debug for OpusPacketDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpusPacketDecoder")
            .field("channels", &self.channels)
            .field("skip", &self.skip)
            .finish_non_exhaustive()
    }
}

impl OpusPacketDecoder {
    /// Decoder for a mono or stereo stream.
    ///
    /// # Errors
    ///
    /// `UnsupportedFormat` for multichannel (surround) streams.
    pub fn new(channels: usize, pre_skip: u32) -> AudioResult<Self> {
        let layout = match channels {
            1 => Channels::Mono,
            2 => Channels::Stereo,
            n => {
                return Err(AudioError::new(AudioErrorKind::UnsupportedFormat(format!(
                    "{n}-channel Opus"
                ))));
            }
        };
        Ok(Self {
            decoder: Decoder::new(OPUS_SAMPLE_RATE, layout)?,
            channels,
            skip: pre_skip as usize,
            buffer: vec![0.0; MAX_PACKET_FRAMES * channels],
        })
    }

    /// Interleaved channels produced per frame.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Decode one packet and append its interleaved samples to `out`.
    ///
    /// Returns the number of frames appended.
    pub fn decode_packet(&mut self, packet: &[u8], out: &mut Vec<f64>) -> AudioResult<usize> {
        let frames = self.decoder.decode_float(packet, &mut self.buffer, false)?;
        let skipped = frames.min(self.skip);
        self.skip -= skipped;
        out.extend(
            self.buffer[skipped * self.channels..frames * self.channels]
                .iter()
                .map(|&sample| f64::from(sample)),
        );
        Ok(frames - skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head(channels: u8, pre_skip: u16) -> Vec<u8> {
        let mut head = b"OpusHead".to_vec();
        head.push(1);
        head.push(channels);
        head.extend_from_slice(&pre_skip.to_le_bytes());
        head.extend_from_slice(&48_000u32.to_le_bytes());
        head.extend_from_slice(&0i16.to_le_bytes());
        head.push(0);
        head
    }

    #[test]
    fn opus_head_fields() {
        assert_eq!(parse_opus_head(&head(2, 312)), Some((2, 312)));
        assert_eq!(parse_opus_head(&head(1, 3_840)), Some((1, 3_840)));
        assert_eq!(parse_opus_head(b"OpusTags\0\0\0\0\0\0\0\0\0\0\0"), None);
        assert_eq!(parse_opus_head(b"OpusHead"), None);
    }

    #[test]
    fn surround_streams_are_unsupported() {
        let err = OpusPacketDecoder::new(6, 0).unwrap_err();
        assert!(matches!(err.kind, AudioErrorKind::UnsupportedFormat(_)));
    }
}
