//! Discord front end for Decibel.
//!
//! Watches guild channels for audio attachments and replies with a waveform
//! image and loudness measurement, records each member's loudest clip on a
//! per-guild leaderboard and exposes slash commands:
//!
//! - `/active-channels add|remove|clear|list` restricts where clips are handled
//! - `/leaderboard [page]` shows the loudest clips in the server
//! - `/rank [user]` shows one member's place

mod client;
mod commands;
mod config;
mod error;
mod format;
mod handler;

pub use client::DecibelBot;
pub use commands::{
    ActiveChannelsAction, ActiveChannelsCommand, CommandName, CommandReply, CommandTable,
    LeaderboardCommand, RankCommand, SlashCommand,
};
pub use config::{ClipSettings, DecibelConfig, MAX_LEADERBOARD_PAGE_SIZE};
pub use error::{DiscordError, DiscordErrorKind, DiscordResult};
pub use format::{
    LeaderboardLine, MESSAGE_LIMIT, active_channels_text, leaderboard_text, page_count, page_window, rank_text,
    unranked_text,
};
pub use handler::{
    ClipSubmission, DecibelHandler, WAVEFORM_FILENAME, first_audio_attachment,
    is_audio_content_type,
};
