//! Audio processing error types.

/// Audio error conditions.
///
/// `MeasurementUnavailable` is not a failure from the user's point of view:
/// the analyzer recovers from it by reporting peak amplitude only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum AudioErrorKind {
    /// Container or codec not recognized
    #[display("Unsupported audio format: {}", _0)]
    UnsupportedFormat(String),
    /// Container holds no decodable audio track
    #[display("No audio track found")]
    NoAudioTrack,
    /// Stream is corrupt or could not be decoded
    #[display("Audio decode failed: {}", _0)]
    Decode(String),
    /// Stream decoded to zero frames
    #[display("Audio stream contains no samples")]
    Empty,
    /// Integrated loudness cannot be measured for this clip
    #[display("Loudness measurement unavailable: {}", _0)]
    MeasurementUnavailable(String),
    /// Waveform could not be drawn
    #[display("Waveform render failed: {}", _0)]
    Render(String),
    /// Rendered image could not be encoded
    #[display("Image encoding failed: {}", _0)]
    Encode(String),
}

/// Audio error with source location tracking.
///
/// # Examples
///
/// ```
/// use decibel_error::{AudioError, AudioErrorKind};
///
/// let err = AudioError::new(AudioErrorKind::Empty);
/// assert!(format!("{}", err).contains("no samples"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Audio Error: {} at line {} in {}", kind, line, file)]
pub struct AudioError {
    /// The kind of error that occurred
    pub kind: AudioErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl AudioError {
    /// Create a new AudioError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: AudioErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// True for the errors that mean "this upload is not usable audio".
    pub fn is_decode_failure(&self) -> bool {
        matches!(
            self.kind,
            AudioErrorKind::UnsupportedFormat(_)
                | AudioErrorKind::NoAudioTrack
                | AudioErrorKind::Decode(_)
                | AudioErrorKind::Empty
        )
    }
}

#[cfg(feature = "audio")]
impl From<symphonia::core::errors::Error> for AudioError {
    #[track_caller]
    fn from(err: symphonia::core::errors::Error) -> Self {
        use symphonia::core::errors::Error as SymphoniaError;
        match err {
            SymphoniaError::Unsupported(what) => {
                AudioError::new(AudioErrorKind::UnsupportedFormat(what.to_string()))
            }
            other => AudioError::new(AudioErrorKind::Decode(other.to_string())),
        }
    }
}

#[cfg(feature = "audio")]
impl From<image::ImageError> for AudioError {
    #[track_caller]
    fn from(err: image::ImageError) -> Self {
        AudioError::new(AudioErrorKind::Encode(err.to_string()))
    }
}

#[cfg(feature = "audio")]
impl From<opus::Error> for AudioError {
    #[track_caller]
    fn from(err: opus::Error) -> Self {
        AudioError::new(AudioErrorKind::Decode(format!("opus: {err}")))
    }
}
