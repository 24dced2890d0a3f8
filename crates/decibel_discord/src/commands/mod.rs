//! Slash commands.
//!
//! Every command implements [`SlashCommand`]. A [`CommandTable`] is built once
//! at startup, registers the command definitions with Discord and routes each
//! invocation to its handler by name.

mod active_channels;
mod leaderboard;
mod rank;

pub use active_channels::{ActiveChannelsAction, ActiveChannelsCommand};
pub use leaderboard::LeaderboardCommand;
pub use rank::RankCommand;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use decibel_database::Store;
use serenity::all::{
    CommandInteraction, Context, CreateAllowedMentions, CreateCommand, CreateInteractionResponse,
    CreateInteractionResponseMessage, GuildId, UserId,
};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use tracing::{debug, error, info, instrument, warn};

use crate::format::{ADMIN_ONLY, COMMAND_FAILURE, GUILD_ONLY};
use crate::{DiscordError, DiscordErrorKind, DiscordResult};

/// Top-level slash command names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum CommandName {
    /// `/active-channels`
    ActiveChannels,
    /// `/leaderboard`
    Leaderboard,
    /// `/rank`
    Rank,
}

/// Text sent back for an invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    pub content: String,
    /// Visible only to the invoking user.
    pub ephemeral: bool,
}

impl CommandReply {
    /// Reply visible to the whole channel.
    pub fn public(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: false,
        }
    }

    /// Reply visible only to the invoking user.
    pub fn ephemeral(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ephemeral: true,
        }
    }

    /// Standard rejection for non-administrators.
    pub fn admin_only() -> Self {
        Self::ephemeral(ADMIN_ONLY)
    }
}

/// A guild-only slash command.
#[async_trait]
pub trait SlashCommand: Send + Sync {
    /// Command name as registered with Discord.
    fn name(&self) -> CommandName;

    /// Registration payload.
    fn definition(&self) -> CreateCommand;

    /// Handle one invocation inside `guild_id`.
    ///
    /// Errors are logged by the table and answered with a generic message.
    async fn run(
        &self,
        ctx: &Context,
        command: &CommandInteraction,
        guild_id: GuildId,
    ) -> DiscordResult<CommandReply>;
}

/// Name → handler routing for slash commands.
#[derive(Clone, Default)]
pub struct CommandTable {
    commands: HashMap<CommandName, Arc<dyn SlashCommand>>,
}

impl CommandTable {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The bot's full command set.
    pub fn standard(store: Arc<Store>, leaderboard_page_size: u32) -> Self {
        let mut table = Self::new();
        table
            .register(ActiveChannelsCommand::new(store.clone()))
            .register(LeaderboardCommand::new(store.clone(), leaderboard_page_size))
            .register(RankCommand::new(store));
        table
    }

    /// Add a command, replacing any previous one with the same name.
    pub fn register<C: SlashCommand + 'static>(&mut self, command: C) -> &mut Self {
        let name = command.name();
        info!(command = %name, "Registering slash command");
        self.commands.insert(name, Arc::new(command));
        self
    }

    /// Handler for a command name.
    ///
    /// # Errors
    ///
    /// `UnknownCommand` when no handler is registered under `name`.
    pub fn get(&self, name: &str) -> DiscordResult<&Arc<dyn SlashCommand>> {
        name.parse::<CommandName>()
            .ok()
            .and_then(|name| self.commands.get(&name))
            .ok_or_else(|| DiscordError::new(DiscordErrorKind::UnknownCommand(name.to_string())))
    }

    /// Registered command names.
    pub fn names(&self) -> Vec<CommandName> {
        let mut names: Vec<CommandName> = self.commands.keys().copied().collect();
        names.sort_by_key(|name| name.as_ref().to_string());
        names
    }

    /// Registration payloads for every command.
    pub fn definitions(&self) -> Vec<CreateCommand> {
        self.names()
            .into_iter()
            .filter_map(|name| self.commands.get(&name))
            .map(|command| command.definition())
            .collect()
    }

    /// Run the handler for `command` and send its reply.
    ///
    /// Invocations outside a guild, unknown names and handler errors are
    /// answered ephemerally.
    #[instrument(
        skip(self, ctx, command),
        fields(command = %command.data.name, user_id = %command.user.id, guild_id = ?command.guild_id)
    )]
    pub async fn dispatch(&self, ctx: &Context, command: &CommandInteraction) -> DiscordResult<()> {
        let reply = match (command.guild_id, self.get(&command.data.name)) {
            (None, _) => CommandReply::ephemeral(GUILD_ONLY),
            (Some(_), Err(e)) => {
                warn!(error = %e, "No handler registered for command");
                CommandReply::ephemeral(COMMAND_FAILURE)
            }
            (Some(guild_id), Ok(handler)) => match handler.run(ctx, command, guild_id).await {
                Ok(reply) => reply,
                Err(e) => {
                    error!(error = %e, "Slash command failed");
                    CommandReply::ephemeral(COMMAND_FAILURE)
                }
            },
        };
        respond(ctx, command, reply).await
    }
}

async fn respond(ctx: &Context, command: &CommandInteraction, reply: CommandReply) -> DiscordResult<()> {
    let message = CreateInteractionResponseMessage::new()
        .content(reply.content)
        .ephemeral(reply.ephemeral)
        .allowed_mentions(CreateAllowedMentions::new());
    command
        .create_response(&ctx.http, CreateInteractionResponse::Message(message))
        .await
        .map_err(|e| DiscordError::new(DiscordErrorKind::SerenityError(format!(
            "Failed to answer /{}: {e}",
            command.data.name
        ))))
}

/// Whether the invoking member has the Administrator permission.
pub(crate) fn is_administrator(command: &CommandInteraction) -> bool {
    command
        .member
        .as_ref()
        .and_then(|member| member.permissions)
        .is_some_and(|permissions| permissions.administrator())
}

/// Display name of a guild member, or an empty string if the lookup fails.
pub(crate) async fn member_name(ctx: &Context, guild_id: GuildId, user_id: i64) -> String {
    match guild_id.member(ctx, UserId::new(user_id as u64)).await {
        Ok(member) => member.display_name().to_string(),
        Err(e) => {
            debug!(user_id, error = %e, "Member lookup failed");
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn command_names_are_kebab_case() {
        let names: Vec<String> = CommandName::iter().map(|n| n.to_string()).collect();
        assert_eq!(names, vec!["active-channels", "leaderboard", "rank"]);
        assert_eq!("active-channels".parse::<CommandName>().ok(), Some(CommandName::ActiveChannels));
        assert!("ping".parse::<CommandName>().is_err());
    }
}
