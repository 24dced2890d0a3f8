//! Top-level error wrapper types.

use crate::{AudioError, ConfigError, DatabaseError};

/// Every error a Decibel crate can surface to the binary.
///
/// # Examples
///
/// ```
/// use decibel_error::{ConfigError, DecibelError};
///
/// let err: DecibelError = ConfigError::new("missing token").into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum DecibelErrorKind {
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Database error
    #[from(DatabaseError)]
    Database(DatabaseError),
    /// Audio decoding, metering or rendering error
    #[from(AudioError)]
    Audio(AudioError),
}

/// Decibel error with kind discrimination.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Decibel Error: {}", _0)]
pub struct DecibelError(Box<DecibelErrorKind>);

impl DecibelError {
    /// Create a new error from a kind.
    pub fn new(kind: DecibelErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &DecibelErrorKind {
        &self.0
    }
}

impl<T> From<T> for DecibelError
where
    T: Into<DecibelErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Decibel operations.
pub type DecibelResult<T> = std::result::Result<T, DecibelError>;
