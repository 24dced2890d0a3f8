//! Tests for the snapshot text dump.

use chrono::NaiveDate;
use decibel::dump::render_snapshot;
use decibel_database::{NewChannel, NewGuild, NewLoudnessRecord, Store};

#[tokio::test]
async fn test_dump_lists_every_table() -> Result<(), Box<dyn std::error::Error>> {
    let store = Store::in_memory()?;
    store.upsert_guild(&NewGuild::new(1, "Loud Club")).await?;
    store.set_active_channel(&NewChannel::new(10, 1, "clips")).await?;
    store
        .record_loudness(&NewLoudnessRecord {
            guild_id: 1,
            user_id: 42,
            username: "alice".to_string(),
            loudness_lufs: -7.126,
            message_url: "https://discord.com/channels/1/10/99".to_string(),
            recorded_at: NaiveDate::from_ymd_opt(2024, 5, 4)
                .and_then(|d| d.and_hms_opt(12, 30, 0))
                .ok_or("bad date")?,
        })
        .await?;

    let text = render_snapshot(&store.snapshot().await?);

    assert!(text.starts_with("guilds (1 rows)\n  1 \"Loud Club\"\n"));
    assert!(text.contains("channels (1 rows)\n  10 guild=1 \"clips\" color_index=0\n"));
    assert!(text.contains("active_channels (1 rows)\n  10\n"));
    assert!(text.contains("users (1 rows)\n  42 \"alice\"\n"));
    assert!(text.contains(
        "guild=1 user=42 -7.13 LUFS 2024-05-04 12:30:00 https://discord.com/channels/1/10/99"
    ));
    Ok(())
}

#[tokio::test]
async fn test_dump_of_empty_store() -> Result<(), Box<dyn std::error::Error>> {
    let text = render_snapshot(&Store::in_memory()?.snapshot().await?);
    assert_eq!(
        text,
        "guilds (0 rows)\n\nchannels (0 rows)\n\nactive_channels (0 rows)\n\nusers (0 rows)\n\nloudness_leaderboard (0 rows)\n"
    );
    Ok(())
}
