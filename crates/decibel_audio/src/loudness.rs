//! Peak and integrated loudness (ITU-R BS.1770 / EBU R128).

use decibel_error::{AudioError, AudioErrorKind};
use ebur128::{EbuR128, Mode};
use tracing::{debug, instrument};

use crate::AudioResult;

/// Length of one gating block. Clips shorter than this cannot be measured.
pub const GATING_BLOCK_SECONDS: f64 = 0.4;

/// Loudness of one clip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoudnessReport {
    /// Largest absolute sample value.
    pub peak: f64,
    /// Integrated loudness in LUFS, `None` when it could not be measured.
    pub integrated_lufs: Option<f64>,
}

impl LoudnessReport {
    /// Text shown to the user under the waveform.
    ///
    /// `verbose` appends the peak amplitude to a successful measurement.
    pub fn display(&self, verbose: bool) -> String {
        match (self.integrated_lufs, verbose) {
            (Some(lufs), false) => format!("**Integrated Loudness:** {lufs:.2} LUFS"),
            (Some(lufs), true) => format!(
                "**Integrated Loudness:** {lufs:.2} LUFS, max_loudness={:.2}",
                self.peak
            ),
            (None, _) => format!("**Peak Amplitude:** {:.2}", self.peak),
        }
    }
}

/// Largest absolute sample value, `0.0` for an empty slice.
pub fn peak_amplitude(mono: &[f64]) -> f64 {
    mono.iter().fold(0.0_f64, |peak, s| peak.max(s.abs()))
}

/// Integrated loudness of a mono buffer.
///
/// # Errors
///
/// `MeasurementUnavailable` when the clip is shorter than one gating block,
/// the meter rejects the sample rate, or every block is gated out (silence).
pub fn integrated_loudness(mono: &[f64], sample_rate: u32) -> AudioResult<f64> {
    let unavailable =
        |reason: String| AudioError::new(AudioErrorKind::MeasurementUnavailable(reason));

    if sample_rate == 0 {
        return Err(unavailable("sample rate is zero".to_string()));
    }
    let min_frames = (GATING_BLOCK_SECONDS * sample_rate as f64).ceil() as usize;
    if mono.len() < min_frames {
        return Err(unavailable(format!(
            "clip has {} frames, at least {} are needed",
            mono.len(),
            min_frames
        )));
    }

    let mut meter =
        EbuR128::new(1, sample_rate, Mode::I).map_err(|e| unavailable(e.to_string()))?;
    meter
        .add_frames_f64(mono)
        .map_err(|e| unavailable(e.to_string()))?;
    let lufs = meter
        .loudness_global()
        .map_err(|e| unavailable(e.to_string()))?;

    if !lufs.is_finite() {
        return Err(unavailable("all blocks fell below the gate".to_string()));
    }
    Ok(lufs)
}

/// Measure a clip, falling back to peak-only when LUFS is unavailable.
#[instrument(skip(mono), fields(frames = mono.len()))]
pub fn analyze(mono: &[f64], sample_rate: u32) -> LoudnessReport {
    let peak = peak_amplitude(mono);
    let integrated_lufs = match integrated_loudness(mono, sample_rate) {
        Ok(lufs) => {
            debug!(lufs, peak, "Measured integrated loudness");
            Some(lufs)
        }
        Err(e) => {
            debug!(error = %e, peak, "Reporting peak amplitude only");
            None
        }
    };
    LoudnessReport {
        peak,
        integrated_lufs,
    }
}
