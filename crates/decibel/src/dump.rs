//! Plain-text rendering of a store snapshot for `decibel-dump`.

use std::fmt::Write;

use decibel_database::StoreSnapshot;

/// Render every table, one section per table.
pub fn render_snapshot(snapshot: &StoreSnapshot) -> String {
    let mut out = String::new();

    section(&mut out, "guilds", snapshot.guilds.len());
    for g in &snapshot.guilds {
        let _ = writeln!(out, "  {} {:?}", g.guild_id, g.guild_name);
    }

    section(&mut out, "channels", snapshot.channels.len());
    for c in &snapshot.channels {
        let _ = writeln!(
            out,
            "  {} guild={} {:?} color_index={}",
            c.channel_id, c.guild_id, c.channel_name, c.color_index
        );
    }

    section(&mut out, "active_channels", snapshot.active_channels.len());
    for id in &snapshot.active_channels {
        let _ = writeln!(out, "  {id}");
    }

    section(&mut out, "users", snapshot.users.len());
    for u in &snapshot.users {
        let _ = writeln!(out, "  {} {:?}", u.user_id, u.username);
    }

    section(&mut out, "loudness_leaderboard", snapshot.leaderboard.len());
    for e in &snapshot.leaderboard {
        let _ = writeln!(
            out,
            "  guild={} user={} {:.2} LUFS {} {}",
            e.guild_id, e.user_id, e.loudness_lufs, e.recorded_at, e.message_url
        );
    }

    out
}

fn section(out: &mut String, table: &str, rows: usize) {
    if !out.is_empty() {
        out.push('\n');
    }
    let _ = writeln!(out, "{table} ({rows} rows)");
}
