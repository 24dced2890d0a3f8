//! Audio processing for Decibel.
//!
//! Turns an uploaded audio file into the two things the bot replies with:
//! a waveform PNG and a loudness line.
//!
//! - [`decode`] reads any container Symphonia understands into normalized
//!   `f64` samples, including Ogg/Opus voice messages
//! - [`analyze`] measures peak amplitude and BS.1770 integrated loudness
//! - [`render_waveform`] draws the amplitude envelope with a MM:SS time axis
//! - [`ClipReport`] runs rendering and metering together for one clip
//!
//! # Example
//!
//! ```rust,ignore
//! use decibel_audio::{ClipReport, WaveformStyle, decode};
//!
//! let audio = decode(bytes, "voice.wav")?;
//! let report = ClipReport::build(&audio, [243, 123, 104], &WaveformStyle::default(), false)?;
//! println!("{}", report.text());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod canvas;
mod clip;
mod decoder;
mod loudness;
mod opus_stream;
mod waveform;

pub use clip::ClipReport;
pub use decoder::{DecodedAudio, decode};
pub use loudness::{
    GATING_BLOCK_SECONDS, LoudnessReport, analyze, integrated_loudness, peak_amplitude,
};
pub use opus_stream::{OPUS_SAMPLE_RATE, OpusPacketDecoder, parse_opus_head};
pub use waveform::{WaveformStyle, format_timestamp, render_waveform, tick_step};

use decibel_error::AudioError;

/// Result type for audio operations.
pub type AudioResult<T> = Result<T, AudioError>;
