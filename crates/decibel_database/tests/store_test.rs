//! Tests for the SQLite store against in-memory and on-disk databases.

use chrono::{NaiveDate, NaiveDateTime};
use decibel_database::{NewChannel, NewGuild, NewLoudnessRecord, Store};
use decibel_error::DatabaseErrorKind;

const GUILD: i64 = 100;
const OTHER_GUILD: i64 = 200;

fn at(hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .and_then(|d| d.and_hms_opt(hour, minute, 0))
        .expect("valid test timestamp")
}

fn clip(guild_id: i64, user_id: i64, lufs: f64, url: &str, recorded_at: NaiveDateTime) -> NewLoudnessRecord {
    NewLoudnessRecord {
        guild_id,
        user_id,
        username: format!("user{user_id}"),
        loudness_lufs: lufs,
        message_url: url.to_string(),
        recorded_at,
    }
}

#[tokio::test]
async fn test_color_rotation_cycles_palette() -> Result<(), Box<dyn std::error::Error>> {
    let store = Store::in_memory()?;
    let channel = NewChannel::new(1, GUILD, "clips");

    let mut seen = Vec::new();
    for _ in 0..4 {
        seen.push(store.next_color_index(&channel, 3).await?);
    }
    assert_eq!(seen, vec![0, 1, 2, 0]);
    Ok(())
}

#[tokio::test]
async fn test_color_rotation_is_per_channel() -> Result<(), Box<dyn std::error::Error>> {
    let store = Store::in_memory()?;
    let first = NewChannel::new(1, GUILD, "first");
    let second = NewChannel::new(2, GUILD, "second");

    assert_eq!(store.next_color_index(&first, 3).await?, 0);
    assert_eq!(store.next_color_index(&first, 3).await?, 1);
    assert_eq!(store.next_color_index(&second, 3).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_color_index_wraps_when_palette_shrinks() -> Result<(), Box<dyn std::error::Error>> {
    let store = Store::in_memory()?;
    let channel = NewChannel::new(1, GUILD, "clips");

    for _ in 0..4 {
        store.next_color_index(&channel, 5).await?;
    }
    // Stored index is 4, out of range for a two-color palette.
    assert_eq!(store.next_color_index(&channel, 2).await?, 0);
    assert_eq!(store.next_color_index(&channel, 2).await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_empty_palette_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let store = Store::in_memory()?;
    let err = store
        .next_color_index(&NewChannel::new(1, GUILD, "clips"), 0)
        .await
        .unwrap_err();
    assert!(matches!(err.kind, DatabaseErrorKind::InvalidArgument(_)));
    Ok(())
}

#[tokio::test]
async fn test_concurrent_posts_get_distinct_colors() -> Result<(), Box<dyn std::error::Error>> {
    let store = Store::in_memory()?;
    let channel = NewChannel::new(1, GUILD, "clips");

    let mut tasks = Vec::new();
    for _ in 0..6 {
        let store = store.clone();
        let channel = channel.clone();
        tasks.push(tokio::spawn(async move {
            store.next_color_index(&channel, 6).await
        }));
    }
    let mut seen = Vec::new();
    for task in tasks {
        seen.push(task.await??);
    }
    seen.sort_unstable();
    assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);
    Ok(())
}

#[tokio::test]
async fn test_channel_upsert_keeps_color_and_renames() -> Result<(), Box<dyn std::error::Error>> {
    let store = Store::in_memory()?;
    store.next_color_index(&NewChannel::new(1, GUILD, "old"), 3).await?;
    store.upsert_channel(&NewChannel::new(1, GUILD, "new")).await?;

    let snapshot = store.snapshot().await?;
    assert_eq!(snapshot.channels.len(), 1);
    assert_eq!(snapshot.channels[0].channel_name, "new");
    assert_eq!(snapshot.channels[0].color_index, 1);
    // The guild row is created on demand.
    assert_eq!(snapshot.guilds.len(), 1);
    assert_eq!(snapshot.guilds[0].guild_name, "");
    Ok(())
}

#[tokio::test]
async fn test_empty_active_set_allows_every_channel() -> Result<(), Box<dyn std::error::Error>> {
    let store = Store::in_memory()?;
    assert!(store.is_active_channel(GUILD, 1).await?);
    assert!(store.is_active_channel(GUILD, 2).await?);
    Ok(())
}

#[tokio::test]
async fn test_adding_channel_restricts_others() -> Result<(), Box<dyn std::error::Error>> {
    let store = Store::in_memory()?;
    store.set_active_channel(&NewChannel::new(1, GUILD, "a")).await?;

    assert!(store.is_active_channel(GUILD, 1).await?);
    assert!(!store.is_active_channel(GUILD, 2).await?);
    // Other guilds are unaffected.
    assert!(store.is_active_channel(OTHER_GUILD, 3).await?);
    Ok(())
}

#[tokio::test]
async fn test_active_channel_add_remove_clear() -> Result<(), Box<dyn std::error::Error>> {
    let store = Store::in_memory()?;
    store.set_active_channel(&NewChannel::new(3, GUILD, "c")).await?;
    store.set_active_channel(&NewChannel::new(1, GUILD, "a")).await?;
    store.set_active_channel(&NewChannel::new(1, GUILD, "a")).await?;
    store.set_active_channel(&NewChannel::new(9, OTHER_GUILD, "z")).await?;

    assert_eq!(store.list_active_channels(GUILD).await?, vec![1, 3]);

    assert!(store.remove_active_channel(3).await?);
    assert!(!store.remove_active_channel(3).await?);
    assert_eq!(store.list_active_channels(GUILD).await?, vec![1]);

    assert_eq!(store.clear_active_channels(GUILD).await?, 1);
    assert!(store.list_active_channels(GUILD).await?.is_empty());
    assert!(store.is_active_channel(GUILD, 3).await?);
    assert_eq!(store.list_active_channels(OTHER_GUILD).await?, vec![9]);
    Ok(())
}

#[tokio::test]
async fn test_record_keeps_loudest_clip() -> Result<(), Box<dyn std::error::Error>> {
    let store = Store::in_memory()?;

    assert!(store.record_loudness(&clip(GUILD, 7, -10.0, "https://first", at(10, 0))).await?);
    assert!(store.record_loudness(&clip(GUILD, 7, -5.0, "https://second", at(10, 5))).await?);
    assert!(!store.record_loudness(&clip(GUILD, 7, -12.0, "https://third", at(10, 9))).await?);

    let board = store.leaderboard(GUILD, 10, 0).await?;
    assert_eq!(board.len(), 1);
    assert_eq!(board[0].loudness_lufs, -5.0);
    assert_eq!(board[0].message_url, "https://second");
    assert_eq!(board[0].recorded_at, at(10, 5));
    Ok(())
}

#[tokio::test]
async fn test_equal_loudness_keeps_earlier_clip() -> Result<(), Box<dyn std::error::Error>> {
    let store = Store::in_memory()?;
    store.record_loudness(&clip(GUILD, 7, -8.0, "https://first", at(9, 0))).await?;
    assert!(!store.record_loudness(&clip(GUILD, 7, -8.0, "https://again", at(9, 1))).await?);

    let board = store.leaderboard(GUILD, 10, 0).await?;
    assert_eq!(board[0].message_url, "https://first");
    Ok(())
}

#[tokio::test]
async fn test_record_refreshes_username() -> Result<(), Box<dyn std::error::Error>> {
    let store = Store::in_memory()?;
    store.record_loudness(&clip(GUILD, 7, -8.0, "https://a", at(9, 0))).await?;
    let mut renamed = clip(OTHER_GUILD, 7, -20.0, "https://b", at(9, 1));
    renamed.username = "renamed".to_string();
    store.record_loudness(&renamed).await?;

    let snapshot = store.snapshot().await?;
    assert_eq!(snapshot.users.len(), 1);
    assert_eq!(snapshot.users[0].username, "renamed");
    assert_eq!(snapshot.leaderboard.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_leaderboard_sorted_and_paginated() -> Result<(), Box<dyn std::error::Error>> {
    let store = Store::in_memory()?;
    store.record_loudness(&clip(GUILD, 1, -20.0, "https://1", at(8, 0))).await?;
    store.record_loudness(&clip(GUILD, 2, -3.0, "https://2", at(8, 1))).await?;
    store.record_loudness(&clip(GUILD, 3, -11.0, "https://3", at(8, 2))).await?;
    store.record_loudness(&clip(GUILD, 4, -11.0, "https://4", at(7, 0))).await?;
    store.record_loudness(&clip(OTHER_GUILD, 5, 0.0, "https://5", at(8, 3))).await?;

    let board = store.leaderboard(GUILD, 10, 0).await?;
    let users: Vec<i64> = board.iter().map(|e| e.user_id).collect();
    // Ties go to the earlier clip.
    assert_eq!(users, vec![2, 4, 3, 1]);
    assert!(board.windows(2).all(|w| w[0].loudness_lufs >= w[1].loudness_lufs));

    let page: Vec<i64> = store
        .leaderboard(GUILD, 2, 2)
        .await?
        .iter()
        .map(|e| e.user_id)
        .collect();
    assert_eq!(page, vec![3, 1]);
    assert_eq!(store.leaderboard_len(GUILD).await?, 4);
    Ok(())
}

#[tokio::test]
async fn test_rank_is_dense() -> Result<(), Box<dyn std::error::Error>> {
    let store = Store::in_memory()?;
    store.record_loudness(&clip(GUILD, 1, -3.0, "https://1", at(8, 0))).await?;
    store.record_loudness(&clip(GUILD, 2, -7.0, "https://2", at(8, 1))).await?;
    store.record_loudness(&clip(GUILD, 3, -7.0, "https://3", at(8, 2))).await?;
    store.record_loudness(&clip(GUILD, 4, -9.0, "https://4", at(8, 3))).await?;

    let ranks = [
        store.rank(GUILD, 1).await?.map(|r| r.rank),
        store.rank(GUILD, 2).await?.map(|r| r.rank),
        store.rank(GUILD, 3).await?.map(|r| r.rank),
        store.rank(GUILD, 4).await?.map(|r| r.rank),
    ];
    assert_eq!(ranks, [Some(1), Some(2), Some(2), Some(3)]);

    let fourth = store.rank(GUILD, 4).await?.ok_or("missing rank")?;
    assert_eq!(fourth.entry.message_url, "https://4");
    assert_eq!(fourth.entry.recorded_at, at(8, 3));
    assert!(store.rank(GUILD, 99).await?.is_none());
    assert!(store.rank(OTHER_GUILD, 1).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_guild_upsert_and_cascading_delete() -> Result<(), Box<dyn std::error::Error>> {
    let store = Store::in_memory()?;
    store.upsert_guild(&NewGuild::new(GUILD, "Loud Club")).await?;
    store.upsert_guild(&NewGuild::new(GUILD, "Louder Club")).await?;
    store.set_active_channel(&NewChannel::new(1, GUILD, "a")).await?;
    store.record_loudness(&clip(GUILD, 7, -4.0, "https://a", at(9, 0))).await?;
    store.record_loudness(&clip(OTHER_GUILD, 7, -6.0, "https://b", at(9, 0))).await?;

    let before = store.snapshot().await?;
    let guild = before
        .guilds
        .iter()
        .find(|g| g.guild_id == GUILD)
        .ok_or("guild missing")?;
    assert_eq!(guild.guild_name, "Louder Club");

    assert!(store.delete_guild(GUILD).await?);
    assert!(!store.delete_guild(GUILD).await?);

    let after = store.snapshot().await?;
    assert!(after.guilds.iter().all(|g| g.guild_id != GUILD));
    assert!(after.channels.is_empty());
    assert!(after.active_channels.is_empty());
    assert_eq!(after.leaderboard.len(), 1);
    assert_eq!(after.leaderboard[0].guild_id, OTHER_GUILD);
    assert_eq!(after.users.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_file_store_persists_between_opens() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::temp_dir().join(format!("decibel-store-{}.db", std::process::id()));
    let _ = std::fs::remove_file(&path);

    {
        let store = Store::open(&path)?;
        store.record_loudness(&clip(GUILD, 7, -6.5, "https://kept", at(12, 0))).await?;
    }
    {
        // Reopening must not re-run the schema script.
        let store = Store::open(&path)?;
        let board = store.leaderboard(GUILD, 10, 0).await?;
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].message_url, "https://kept");
    }

    std::fs::remove_file(&path)?;
    Ok(())
}
