//! The bot's state store.

use std::path::Path;
use std::sync::Arc;

use decibel_error::{DatabaseError, DatabaseErrorKind};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Double, Text, Timestamp};
use diesel::sqlite::SqliteConnection;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::models::{
    ChannelRow, GuildRow, LeaderboardEntry, NewChannel, NewGuild, NewLoudnessRecord, RankRow,
    RankedEntry, StoreSnapshot, UserRow,
};
use crate::schema::{active_channels, channels, guilds, loudness_leaderboard, users};
use crate::{DatabaseResult, open_connection, open_in_memory};

/// Keeps a user's row only when the new clip is strictly louder.
const RECORD_LOUDNESS: &str = "\
INSERT INTO loudness_leaderboard (guild_id, user_id, loudness_lufs, message_url, timestamp)
VALUES (?, ?, ?, ?, ?)
ON CONFLICT (guild_id, user_id) DO UPDATE SET
    loudness_lufs = excluded.loudness_lufs,
    message_url = excluded.message_url,
    timestamp = excluded.timestamp
WHERE excluded.loudness_lufs > loudness_leaderboard.loudness_lufs";

const RANK_IN_GUILD: &str = "\
SELECT guild_id, user_id, loudness_lufs, message_url, recorded_at, position FROM (
    SELECT guild_id, user_id, loudness_lufs, message_url, timestamp AS recorded_at,
           DENSE_RANK() OVER (ORDER BY loudness_lufs DESC) AS position
    FROM loudness_leaderboard
    WHERE guild_id = ?
) WHERE user_id = ?";

/// Convert a Discord snowflake to the signed form stored in SQLite.
///
/// Snowflakes fit in 63 bits, so the cast is lossless.
pub fn to_db_id(id: u64) -> i64 {
    id as i64
}

/// SQLite-backed store for guilds, channels, active channels and the
/// loudness leaderboard.
///
/// All operations serialize on one connection. Multi-statement operations
/// run inside an immediate transaction, so concurrent handlers never observe
/// or produce a half-applied update.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<SqliteConnection>>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}

impl Store {
    /// Wrap an already configured connection.
    pub fn new(conn: SqliteConnection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Open (or create) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> DatabaseResult<Self> {
        open_connection(path.as_ref()).map(Self::new)
    }

    /// A fresh in-memory store, used by tests.
    pub fn in_memory() -> DatabaseResult<Self> {
        open_in_memory().map(Self::new)
    }

    // ============================================================================
    // Guilds and channels
    // ============================================================================

    /// Insert a guild or refresh its name.
    #[instrument(skip(self), fields(guild_id = guild.guild_id))]
    pub async fn upsert_guild(&self, guild: &NewGuild) -> DatabaseResult<()> {
        let mut conn = self.conn.lock().await;

        diesel::insert_into(guilds::table)
            .values(guild)
            .on_conflict(guilds::guild_id)
            .do_update()
            .set(guilds::guild_name.eq(&guild.guild_name))
            .execute(&mut *conn)
            .map_err(DatabaseError::from)?;
        Ok(())
    }

    /// Remove a guild together with its channels, active channels and
    /// leaderboard rows. Users are kept.
    ///
    /// Returns whether the guild existed.
    #[instrument(skip(self))]
    pub async fn delete_guild(&self, guild_id: i64) -> DatabaseResult<bool> {
        let mut conn = self.conn.lock().await;

        let deleted = diesel::delete(guilds::table.find(guild_id))
            .execute(&mut *conn)
            .map_err(DatabaseError::from)?;
        debug!(deleted, "Deleted guild");
        Ok(deleted > 0)
    }

    /// Insert a channel or refresh its name, keeping its palette index.
    ///
    /// A placeholder guild row is created when the guild is not yet known.
    #[instrument(skip(self), fields(channel_id = channel.channel_id, guild_id = channel.guild_id))]
    pub async fn upsert_channel(&self, channel: &NewChannel) -> DatabaseResult<()> {
        let mut conn = self.conn.lock().await;
        conn.immediate_transaction::<_, DatabaseError, _>(|conn| upsert_channel_in(conn, channel))
    }

    /// Palette index for the next clip in `channel`, advancing the stored
    /// index to the following color.
    ///
    /// The channel is registered first if needed. Consecutive calls for one
    /// channel cycle through `0..palette_size`.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when `palette_size` is zero.
    #[instrument(skip(self), fields(channel_id = channel.channel_id))]
    pub async fn next_color_index(
        &self,
        channel: &NewChannel,
        palette_size: usize,
    ) -> DatabaseResult<usize> {
        if palette_size == 0 {
            return Err(DatabaseError::new(DatabaseErrorKind::InvalidArgument(
                "palette must contain at least one color".to_string(),
            )));
        }
        let mut conn = self.conn.lock().await;

        conn.immediate_transaction::<_, DatabaseError, _>(|conn| {
            upsert_channel_in(conn, channel)?;
            let stored: i32 = channels::table
                .find(channel.channel_id)
                .select(channels::color_index)
                .first(conn)?;
            let current = usize::try_from(stored).unwrap_or(0) % palette_size;
            let next = (current + 1) % palette_size;
            diesel::update(channels::table.find(channel.channel_id))
                .set(channels::color_index.eq(next as i32))
                .execute(conn)?;
            debug!(current, next, "Advanced channel color");
            Ok(current)
        })
    }

    // ============================================================================
    // Active channels
    // ============================================================================

    /// Whether clips posted in `channel_id` should be handled.
    ///
    /// A guild with no active channels handles clips everywhere; otherwise only
    /// its active channels are handled.
    #[instrument(skip(self))]
    pub async fn is_active_channel(&self, guild_id: i64, channel_id: i64) -> DatabaseResult<bool> {
        let mut conn = self.conn.lock().await;

        let restricted: i64 = active_channels::table
            .inner_join(channels::table)
            .filter(channels::guild_id.eq(guild_id))
            .count()
            .get_result(&mut *conn)
            .map_err(DatabaseError::from)?;
        if restricted == 0 {
            return Ok(true);
        }

        let listed: i64 = active_channels::table
            .inner_join(channels::table)
            .filter(channels::guild_id.eq(guild_id))
            .filter(active_channels::channel_id.eq(channel_id))
            .count()
            .get_result(&mut *conn)
            .map_err(DatabaseError::from)?;
        Ok(listed > 0)
    }

    /// Add a channel to its guild's active set. Adding twice is a no-op.
    #[instrument(skip(self), fields(channel_id = channel.channel_id, guild_id = channel.guild_id))]
    pub async fn set_active_channel(&self, channel: &NewChannel) -> DatabaseResult<()> {
        let mut conn = self.conn.lock().await;

        conn.immediate_transaction::<_, DatabaseError, _>(|conn| {
            upsert_channel_in(conn, channel)?;
            diesel::insert_or_ignore_into(active_channels::table)
                .values(active_channels::channel_id.eq(channel.channel_id))
                .execute(conn)?;
            Ok(())
        })
    }

    /// Remove a channel from the active set. Returns whether it was listed.
    #[instrument(skip(self))]
    pub async fn remove_active_channel(&self, channel_id: i64) -> DatabaseResult<bool> {
        let mut conn = self.conn.lock().await;

        let removed = diesel::delete(active_channels::table.find(channel_id))
            .execute(&mut *conn)
            .map_err(DatabaseError::from)?;
        Ok(removed > 0)
    }

    /// Empty a guild's active set. Returns the number of channels removed.
    #[instrument(skip(self))]
    pub async fn clear_active_channels(&self, guild_id: i64) -> DatabaseResult<usize> {
        let mut conn = self.conn.lock().await;

        let in_guild = channels::table
            .filter(channels::guild_id.eq(guild_id))
            .select(channels::channel_id);
        diesel::delete(active_channels::table.filter(active_channels::channel_id.eq_any(in_guild)))
            .execute(&mut *conn)
            .map_err(DatabaseError::from)
    }

    /// Active channel ids of a guild, ascending.
    #[instrument(skip(self))]
    pub async fn list_active_channels(&self, guild_id: i64) -> DatabaseResult<Vec<i64>> {
        let mut conn = self.conn.lock().await;

        active_channels::table
            .inner_join(channels::table)
            .filter(channels::guild_id.eq(guild_id))
            .select(active_channels::channel_id)
            .order(active_channels::channel_id.asc())
            .load(&mut *conn)
            .map_err(DatabaseError::from)
    }

    // ============================================================================
    // Leaderboard
    // ============================================================================

    /// Offer a measured clip to the leaderboard.
    ///
    /// The user row is created or renamed. The guild's leaderboard row for the
    /// user is written only if none exists or the new clip is strictly louder;
    /// ties keep the earlier clip. Returns whether the row was written.
    #[instrument(
        skip(self, record),
        fields(guild_id = record.guild_id, user_id = record.user_id, lufs = record.loudness_lufs)
    )]
    pub async fn record_loudness(&self, record: &NewLoudnessRecord) -> DatabaseResult<bool> {
        let mut conn = self.conn.lock().await;

        let written = conn.immediate_transaction::<_, DatabaseError, _>(|conn| {
            ensure_guild_in(conn, record.guild_id)?;
            let user = UserRow {
                user_id: record.user_id,
                username: record.username.clone(),
            };
            diesel::insert_into(users::table)
                .values(&user)
                .on_conflict(users::user_id)
                .do_update()
                .set(users::username.eq(&user.username))
                .execute(conn)?;

            diesel::sql_query(RECORD_LOUDNESS)
                .bind::<BigInt, _>(record.guild_id)
                .bind::<BigInt, _>(record.user_id)
                .bind::<Double, _>(record.loudness_lufs)
                .bind::<Text, _>(&record.message_url)
                .bind::<Timestamp, _>(record.recorded_at)
                .execute(conn)
                .map_err(DatabaseError::from)
        })?;
        debug!(new_best = written > 0, "Recorded loudness");
        Ok(written > 0)
    }

    /// One page of a guild's leaderboard, loudest first. Equal loudness is
    /// ordered by the earlier clip.
    #[instrument(skip(self))]
    pub async fn leaderboard(
        &self,
        guild_id: i64,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<LeaderboardEntry>> {
        let mut conn = self.conn.lock().await;

        loudness_leaderboard::table
            .filter(loudness_leaderboard::guild_id.eq(guild_id))
            .order((
                loudness_leaderboard::loudness_lufs.desc(),
                loudness_leaderboard::recorded_at.asc(),
            ))
            .limit(limit)
            .offset(offset)
            .select(LeaderboardEntry::as_select())
            .load(&mut *conn)
            .map_err(DatabaseError::from)
    }

    /// Number of users on a guild's leaderboard.
    #[instrument(skip(self))]
    pub async fn leaderboard_len(&self, guild_id: i64) -> DatabaseResult<i64> {
        let mut conn = self.conn.lock().await;

        loudness_leaderboard::table
            .filter(loudness_leaderboard::guild_id.eq(guild_id))
            .count()
            .get_result(&mut *conn)
            .map_err(DatabaseError::from)
    }

    /// A user's entry and dense rank within a guild, if they have one.
    #[instrument(skip(self))]
    pub async fn rank(&self, guild_id: i64, user_id: i64) -> DatabaseResult<Option<RankedEntry>> {
        let mut conn = self.conn.lock().await;

        let row: Option<RankRow> = diesel::sql_query(RANK_IN_GUILD)
            .bind::<BigInt, _>(guild_id)
            .bind::<BigInt, _>(user_id)
            .get_result(&mut *conn)
            .optional()
            .map_err(DatabaseError::from)?;
        Ok(row.map(RankedEntry::from))
    }

    // ============================================================================
    // Inspection
    // ============================================================================

    /// Every row of every table, ordered by primary key.
    #[instrument(skip(self))]
    pub async fn snapshot(&self) -> DatabaseResult<StoreSnapshot> {
        let mut conn = self.conn.lock().await;
        let conn = &mut *conn;

        Ok(StoreSnapshot {
            guilds: guilds::table
                .order(guilds::guild_id)
                .select(GuildRow::as_select())
                .load(conn)?,
            channels: channels::table
                .order(channels::channel_id)
                .select(ChannelRow::as_select())
                .load(conn)?,
            active_channels: active_channels::table
                .order(active_channels::channel_id)
                .select(active_channels::channel_id)
                .load(conn)?,
            users: users::table
                .order(users::user_id)
                .select(UserRow::as_select())
                .load(conn)?,
            leaderboard: loudness_leaderboard::table
                .order((loudness_leaderboard::guild_id, loudness_leaderboard::user_id))
                .select(LeaderboardEntry::as_select())
                .load(conn)?,
        })
    }
}

fn ensure_guild_in(conn: &mut SqliteConnection, guild_id: i64) -> DatabaseResult<()> {
    diesel::insert_or_ignore_into(guilds::table)
        .values(&NewGuild::new(guild_id, ""))
        .execute(conn)?;
    Ok(())
}

fn upsert_channel_in(conn: &mut SqliteConnection, channel: &NewChannel) -> DatabaseResult<()> {
    ensure_guild_in(conn, channel.guild_id)?;
    diesel::insert_into(channels::table)
        .values(channel)
        .on_conflict(channels::channel_id)
        .do_update()
        .set(channels::channel_name.eq(&channel.channel_name))
        .execute(conn)?;
    Ok(())
}
