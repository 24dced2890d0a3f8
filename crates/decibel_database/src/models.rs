//! Row and insert types for the store tables.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Double, Text, Timestamp};
use serde::Serialize;

use crate::schema::{channels, guilds, loudness_leaderboard, users};

/// Database row for the guilds table.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize)]
#[diesel(table_name = guilds)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct GuildRow {
    /// Discord guild snowflake.
    pub guild_id: i64,
    /// Display name; empty until the guild itself is seen.
    pub guild_name: String,
}

/// Insertable guild.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = guilds)]
pub struct NewGuild {
    pub guild_id: i64,
    pub guild_name: String,
}

impl NewGuild {
    /// Build from a snowflake and name.
    pub fn new(guild_id: i64, guild_name: impl Into<String>) -> Self {
        Self {
            guild_id,
            guild_name: guild_name.into(),
        }
    }
}

/// Database row for the channels table.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize)]
#[diesel(table_name = channels)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ChannelRow {
    pub channel_id: i64,
    pub guild_id: i64,
    pub channel_name: String,
    /// Palette index the next clip in this channel will use.
    pub color_index: i32,
}

/// Insertable channel. `color_index` is left to its column default.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = channels)]
pub struct NewChannel {
    pub channel_id: i64,
    pub guild_id: i64,
    pub channel_name: String,
}

impl NewChannel {
    /// Build from snowflakes and the channel name.
    pub fn new(channel_id: i64, guild_id: i64, channel_name: impl Into<String>) -> Self {
        Self {
            channel_id,
            guild_id,
            channel_name: channel_name.into(),
        }
    }
}

/// Database row for the users table.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable, Serialize)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserRow {
    pub user_id: i64,
    pub username: String,
}

/// A measured clip offered to the leaderboard.
#[derive(Debug, Clone)]
pub struct NewLoudnessRecord {
    pub guild_id: i64,
    pub user_id: i64,
    /// Display name, refreshed on every submission.
    pub username: String,
    pub loudness_lufs: f64,
    /// Jump link to the message that carried the clip.
    pub message_url: String,
    pub recorded_at: NaiveDateTime,
}

/// One user's best clip in one guild.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize)]
#[diesel(table_name = loudness_leaderboard)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct LeaderboardEntry {
    pub guild_id: i64,
    pub user_id: i64,
    pub loudness_lufs: f64,
    pub message_url: String,
    pub recorded_at: NaiveDateTime,
}

/// A leaderboard entry with its dense rank (1 is loudest).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    pub rank: i64,
    pub entry: LeaderboardEntry,
}

/// Raw result of the rank window query.
#[derive(Debug, QueryableByName)]
pub(crate) struct RankRow {
    #[diesel(sql_type = BigInt)]
    pub guild_id: i64,
    #[diesel(sql_type = BigInt)]
    pub user_id: i64,
    #[diesel(sql_type = Double)]
    pub loudness_lufs: f64,
    #[diesel(sql_type = Text)]
    pub message_url: String,
    #[diesel(sql_type = Timestamp)]
    pub recorded_at: NaiveDateTime,
    #[diesel(sql_type = BigInt)]
    pub position: i64,
}

impl From<RankRow> for RankedEntry {
    fn from(row: RankRow) -> Self {
        Self {
            rank: row.position,
            entry: LeaderboardEntry {
                guild_id: row.guild_id,
                user_id: row.user_id,
                loudness_lufs: row.loudness_lufs,
                message_url: row.message_url,
                recorded_at: row.recorded_at,
            },
        }
    }
}

/// Full contents of every table, ordered by key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreSnapshot {
    pub guilds: Vec<GuildRow>,
    pub channels: Vec<ChannelRow>,
    pub active_channels: Vec<i64>,
    pub users: Vec<UserRow>,
    pub leaderboard: Vec<LeaderboardEntry>,
}
