//! Discord-specific error types.

use decibel_error::{AudioError, DatabaseError};
use derive_getters::Getters;

/// Discord error variants.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, derive_more::Display)]
pub enum DiscordErrorKind {
    /// Serenity API error (e.g., HTTP error, gateway error, rate limit).
    #[display("Serenity API error: {_0}")]
    SerenityError(String),

    /// Store operation failed.
    #[display("Database error: {_0}")]
    DatabaseError(String),

    /// Clip could not be decoded, measured or rendered.
    #[display("Audio error: {_0}")]
    AudioError(String),

    /// A blocking worker panicked or was cancelled.
    #[display("Background task failed: {_0}")]
    TaskFailed(String),

    /// Channel not found by ID.
    #[display("Channel not found: {_0}")]
    ChannelNotFound(u64),

    /// Slash command name with no registered handler.
    #[display("Unknown command: {_0}")]
    UnknownCommand(String),

    /// Slash command option missing or of the wrong type.
    #[display("Invalid command option: {_0}")]
    InvalidOption(String),

    /// Connection to Discord gateway failed.
    #[display("Connection failed: {_0}")]
    ConnectionFailed(String),
}

/// Discord error with source location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error, Getters)]
#[display("Discord Error: {} at line {} in {}", kind, line, file)]
pub struct DiscordError {
    kind: DiscordErrorKind,
    line: u32,
    file: &'static str,
}

impl DiscordError {
    /// Create a new DiscordError with automatic location tracking.
    ///
    /// # Example
    /// ```
    /// use decibel_discord::{DiscordError, DiscordErrorKind};
    ///
    /// let err = DiscordError::new(DiscordErrorKind::UnknownCommand("ping".into()));
    /// assert!(err.to_string().contains("ping"));
    /// ```
    #[track_caller]
    pub fn new(kind: DiscordErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

/// Result type for Discord operations.
pub type DiscordResult<T> = Result<T, DiscordError>;

impl From<serenity::Error> for DiscordError {
    #[track_caller]
    fn from(err: serenity::Error) -> Self {
        DiscordError::new(DiscordErrorKind::SerenityError(err.to_string()))
    }
}

impl From<DatabaseError> for DiscordError {
    #[track_caller]
    fn from(err: DatabaseError) -> Self {
        DiscordError::new(DiscordErrorKind::DatabaseError(err.to_string()))
    }
}

impl From<AudioError> for DiscordError {
    #[track_caller]
    fn from(err: AudioError) -> Self {
        DiscordError::new(DiscordErrorKind::AudioError(err.to_string()))
    }
}

impl From<tokio::task::JoinError> for DiscordError {
    #[track_caller]
    fn from(err: tokio::task::JoinError) -> Self {
        DiscordError::new(DiscordErrorKind::TaskFailed(err.to_string()))
    }
}
