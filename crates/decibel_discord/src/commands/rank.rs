//! `/rank [user]`

use std::sync::Arc;

use async_trait::async_trait;
use decibel_database::{Store, to_db_id};
use serenity::all::{
    CommandInteraction, CommandOptionType, Context, CreateCommand, CreateCommandOption, GuildId,
    ResolvedValue, User,
};
use tracing::instrument;

use super::{CommandName, CommandReply, SlashCommand, member_name};
use crate::DiscordResult;
use crate::format::{rank_text, unranked_text};

/// Shows a member's dense rank and best clip.
pub struct RankCommand {
    store: Arc<Store>,
}

impl RankCommand {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SlashCommand for RankCommand {
    fn name(&self) -> CommandName {
        CommandName::Rank
    }

    fn definition(&self) -> CreateCommand {
        CreateCommand::new(self.name().to_string())
            .description("Show a member's place on the loudness leaderboard")
            .add_option(
                CreateCommandOption::new(
                    CommandOptionType::User,
                    "user",
                    "Member to look up (defaults to you)",
                )
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
        let options = command.data.options();
        let user: &User = options
            .iter()
            .find_map(|option| match option.value {
                ResolvedValue::User(user, _) if option.name == "user" => Some(user),
                _ => None,
            })
            .unwrap_or(&command.user);

        let mut name = member_name(ctx, guild_id, to_db_id(user.id.get())).await;
        if name.is_empty() {
            name = user.name.clone();
        }

        let ranked = self
            .store
            .rank(to_db_id(guild_id.get()), to_db_id(user.id.get()))
            .await?;
        Ok(CommandReply::public(match ranked {
            Some(ranked) => rank_text(
                &name,
                ranked.rank,
                ranked.entry.loudness_lufs,
                &ranked.entry.message_url,
            ),
            None => unranked_text(&name),
        }))
    }
}
