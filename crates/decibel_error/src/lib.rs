//! Error types for the Decibel bot.
//!
//! This crate provides the foundation error types used throughout the Decibel workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use decibel_error::{ConfigError, DecibelResult};
//!
//! fn load() -> DecibelResult<String> {
//!     Err(ConfigError::new("BOT_TOKEN is not set"))?
//! }
//!
//! assert!(load().is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod audio;
mod config;
mod database;
mod error;

pub use audio::{AudioError, AudioErrorKind};
pub use config::ConfigError;
pub use database::{DatabaseError, DatabaseErrorKind};
pub use error::{DecibelError, DecibelErrorKind, DecibelResult};
