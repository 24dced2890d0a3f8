//! Everything the bot posts back for one decoded clip.

use derive_getters::Getters;
use tracing::instrument;

use crate::{AudioResult, DecodedAudio, LoudnessReport, WaveformStyle, analyze, render_waveform};

/// Waveform image plus loudness for one clip.
#[derive(Debug, Clone, Getters)]
pub struct ClipReport {
    /// Encoded PNG.
    waveform_png: Vec<u8>,
    /// Measurements.
    loudness: LoudnessReport,
    /// Reply text.
    text: String,
}

impl ClipReport {
    /// Render and measure a decoded clip.
    ///
    /// Rendering failures propagate; a missing LUFS value does not.
    #[instrument(skip(audio, style), fields(frames = audio.frames(), channels = *audio.channels()))]
    pub fn build(
        audio: &DecodedAudio,
        color: [u8; 3],
        style: &WaveformStyle,
        verbose: bool,
    ) -> AudioResult<Self> {
        let mono = audio.mono();
        let sample_rate = *audio.sample_rate();
        let waveform_png = render_waveform(&mono, sample_rate, color, style)?;
        let loudness = analyze(&mono, sample_rate);
        Ok(Self {
            waveform_png,
            text: loudness.display(verbose),
            loudness,
        })
    }

    /// Split into PNG bytes, measurements and reply text.
    pub fn into_parts(self) -> (Vec<u8>, LoudnessReport, String) {
        (self.waveform_png, self.loudness, self.text)
    }
}
