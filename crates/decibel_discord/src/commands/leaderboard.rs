//! `/leaderboard [page]`

use std::sync::Arc;

use async_trait::async_trait;
use decibel_database::{Store, to_db_id};
use serenity::all::{
    CommandInteraction, CommandOptionType, Context, CreateCommand, CreateCommandOption, GuildId,
    ResolvedValue,
};
use tracing::{debug, instrument};

use super::{CommandName, CommandReply, SlashCommand, member_name};
use crate::DiscordResult;
use crate::format::{LeaderboardLine, leaderboard_text, page_count, page_window};

/// Shows one page of the guild's loudness leaderboard.
pub struct LeaderboardCommand {
    store: Arc<Store>,
    page_size: u32,
}

impl LeaderboardCommand {
    pub fn new(store: Arc<Store>, page_size: u32) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
        }
    }
}

#[async_trait]
impl SlashCommand for LeaderboardCommand {
    fn name(&self) -> CommandName {
        CommandName::Leaderboard
    }

    fn definition(&self) -> CreateCommand {
        CreateCommand::new(self.name().to_string())
            .description("View the loudness leaderboard")
            .add_option(
                CreateCommandOption::new(CommandOptionType::Integer, "page", "Page number")
                    .min_int_value(1)
                    .required(false),
            )
    }

    #[instrument(skip(self, ctx, command))]
    async fn run(
        &self,
        ctx: &Context,
        command: &CommandInteraction,
        guild_id: GuildId,
    ) -> DiscordResult<CommandReply> {
        let requested = command
            .data
            .options()
            .iter()
            .find_map(|option| match option.value {
                ResolvedValue::Integer(page) if option.name == "page" => Some(page),
                _ => None,
            })
            .unwrap_or(1);
        let page = u32::try_from(requested.max(1)).unwrap_or(u32::MAX);

        let db_guild = to_db_id(guild_id.get());
        let pages = page_count(self.store.leaderboard_len(db_guild).await?, self.page_size);
        let (limit, offset) = page_window(page, self.page_size);
        let entries = self.store.leaderboard(db_guild, limit, offset).await?;
        debug!(page, pages, entries = entries.len(), "Loaded leaderboard page");

        let mut lines = Vec::with_capacity(entries.len());
        for (i, entry) in entries.into_iter().enumerate() {
            lines.push(LeaderboardLine {
                position: offset as usize + i + 1,
                name: member_name(ctx, guild_id, entry.user_id).await,
                lufs: entry.loudness_lufs,
                url: entry.message_url,
            });
        }
        Ok(CommandReply::public(leaderboard_text(&lines, page, pages)))
    }
}
