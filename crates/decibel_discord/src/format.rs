//! Reply text for clips and slash commands.

/// Reply when a clip cannot be decoded or rendered.
pub const CLIP_FAILURE: &str = "Sorry, I couldn't read that audio file.";

/// Reply to a guild-only command used elsewhere.
pub const GUILD_ONLY: &str = "This command can only be used in a server.";

/// Reply to a non-administrator using an administrator command.
pub const ADMIN_ONLY: &str = "You must be an administrator to use this command.";

/// Reply when a command handler fails.
pub const COMMAND_FAILURE: &str = "Something went wrong while running this command.";

/// Longest message content Discord accepts, in characters.
pub const MESSAGE_LIMIT: usize = 2000;

/// One leaderboard row ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardLine {
    /// 1-based position over the whole leaderboard.
    pub position: usize,
    /// Member display name; empty when the member cannot be found.
    pub name: String,
    pub lufs: f64,
    pub url: String,
}

/// Render one leaderboard page.
///
/// `page` is 1-based. The page footer is only shown when there is more than
/// one page.
pub fn leaderboard_text(lines: &[LeaderboardLine], page: u32, pages: u32) -> String {
    if lines.is_empty() {
        return if pages == 0 {
            "No clips have been measured in this server yet.".to_string()
        } else {
            format!("There is no page {page}; the leaderboard has {pages}.")
        };
    }

    let mut text = String::from("Loudness leaderboard:");
    for line in lines {
        text.push_str(&format!(
            "\n{} - {}: {:.2} LUFS ({})",
            line.position, line.name, line.lufs, line.url
        ));
    }
    if pages > 1 {
        text.push_str(&format!("\nPage {page}/{pages}"));
    }
    text
}

/// `/rank` reply for a user with an entry.
pub fn rank_text(name: &str, rank: i64, lufs: f64, url: &str) -> String {
    format!("{name} is #{rank} on the loudness leaderboard with {lufs:.2} LUFS ({url})")
}

/// `/rank` reply for a user without an entry.
pub fn unranked_text(name: &str) -> String {
    format!("{name} has no entry on the loudness leaderboard yet.")
}

/// `/active-channels list` reply from channel mentions.
pub fn active_channels_text(mentions: &[String]) -> String {
    if mentions.is_empty() {
        "This server has no active channels.".to_string()
    } else {
        format!("Active channels:\n{}", mentions.join("\n"))
    }
}

/// `(limit, offset)` of a 1-based page. Page 0 is treated as page 1.
pub fn page_window(page: u32, page_size: u32) -> (i64, i64) {
    let size = i64::from(page_size.max(1));
    (size, i64::from(page.max(1) - 1) * size)
}

/// Number of pages needed for `total` entries.
pub fn page_count(total: i64, page_size: u32) -> u32 {
    let size = i64::from(page_size.max(1));
    u32::try_from((total.max(0) + size - 1) / size).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(position: usize, name: &str, lufs: f64) -> LeaderboardLine {
        LeaderboardLine {
            position,
            name: name.to_string(),
            lufs,
            url: format!("https://discord.com/channels/1/2/{position}"),
        }
    }

    #[test]
    fn leaderboard_lists_entries_in_order() {
        let text = leaderboard_text(&[line(1, "alice", -4.256), line(2, "", -11.0)], 1, 1);
        assert_eq!(
            text,
            "Loudness leaderboard:\n\
             1 - alice: -4.26 LUFS (https://discord.com/channels/1/2/1)\n\
             2 - : -11.00 LUFS (https://discord.com/channels/1/2/2)"
        );
    }

    #[test]
    fn leaderboard_footer_only_with_several_pages() {
        let text = leaderboard_text(&[line(11, "bob", -9.0)], 2, 3);
        assert!(text.starts_with("Loudness leaderboard:\n11 - bob"));
        assert!(text.ends_with("\nPage 2/3"));
    }

    #[test]
    fn largest_page_fits_one_message() {
        let lines: Vec<LeaderboardLine> = (0..crate::config::MAX_LEADERBOARD_PAGE_SIZE as usize)
            .map(|i| LeaderboardLine {
                position: 999_990 + i,
                name: "W".repeat(32),
                lufs: -100.0,
                url: format!(
                    "https://discord.com/channels/{id}/{id}/{id}",
                    id = 1_234_567_890_123_456_789_u64
                ),
            })
            .collect();
        let text = leaderboard_text(&lines, 99_999, 99_999);
        assert!(text.chars().count() <= MESSAGE_LIMIT, "{} chars", text.chars().count());
    }

    #[test]
    fn empty_leaderboard_messages() {
        assert_eq!(
            leaderboard_text(&[], 1, 0),
            "No clips have been measured in this server yet."
        );
        assert_eq!(
            leaderboard_text(&[], 5, 2),
            "There is no page 5; the leaderboard has 2."
        );
    }

    #[test]
    fn paging_arithmetic() {
        assert_eq!(page_window(1, 10), (10, 0));
        assert_eq!(page_window(3, 10), (10, 20));
        assert_eq!(page_window(0, 10), (10, 0));
        assert_eq!(page_count(0, 10), 0);
        assert_eq!(page_count(10, 10), 1);
        assert_eq!(page_count(11, 10), 2);
    }

    #[test]
    fn active_channel_listing() {
        assert_eq!(active_channels_text(&[]), "This server has no active channels.");
        assert_eq!(
            active_channels_text(&["<#1>".to_string(), "<#2>".to_string()]),
            "Active channels:\n<#1>\n<#2>"
        );
    }

    #[test]
    fn rank_replies() {
        assert_eq!(
            rank_text("carol", 2, -6.5, "https://x"),
            "carol is #2 on the loudness leaderboard with -6.50 LUFS (https://x)"
        );
        assert!(unranked_text("dave").starts_with("dave has no entry"));
    }
}
