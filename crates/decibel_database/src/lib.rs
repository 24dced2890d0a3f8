//! SQLite persistence for Decibel.
//!
//! One [`Store`] owns a single connection behind an async mutex and exposes
//! every operation the bot needs:
//!
//! - guild and channel registration, with per-channel palette rotation
//! - the per-guild active channel set that restricts where clips are handled
//! - the loudness leaderboard, which keeps only each user's loudest clip
//!
//! # Example
//!
//! ```no_run
//! use decibel_database::{NewGuild, Store};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Store::open("bot.db")?;
//! store.upsert_guild(&NewGuild::new(1, "Loud Club")).await?;
//! # Ok(())
//! # }
//! ```

mod connection;
mod models;
mod store;

pub mod schema;

pub use connection::{SCHEMA, open_connection, open_in_memory};
pub use models::{
    ChannelRow, GuildRow, LeaderboardEntry, NewChannel, NewGuild, NewLoudnessRecord, RankedEntry,
    StoreSnapshot, UserRow,
};
pub use store::{Store, to_db_id};

use decibel_error::DatabaseError;

/// Result type for database operations.
pub type DatabaseResult<T> = Result<T, DatabaseError>;
