//! `/active-channels add | remove | clear | list`

use std::sync::Arc;

use async_trait::async_trait;
use decibel_database::{NewChannel, Store, to_db_id};
use serenity::all::{
    Channel, ChannelId, ChannelType, CommandInteraction, CommandOptionType, Context,
    CreateCommand, CreateCommandOption, GuildId, Mentionable, PartialChannel, ResolvedOption,
    ResolvedValue,
};
use strum::{Display, EnumString};
use tracing::{debug, info, instrument};

use super::{CommandName, CommandReply, SlashCommand, is_administrator};
use crate::format::active_channels_text;
use crate::{DiscordError, DiscordErrorKind, DiscordResult};

/// `/active-channels` subcommands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ActiveChannelsAction {
    Add,
    Remove,
    Clear,
    List,
}

impl ActiveChannelsAction {
    /// Whether the action changes the active set.
    pub fn requires_administrator(self) -> bool {
        !matches!(self, Self::List)
    }
}

/// Manages the set of channels whose clips are handled.
pub struct ActiveChannelsCommand {
    store: Arc<Store>,
}

impl ActiveChannelsCommand {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    async fn add(&self, channel: &TargetChannel, guild_id: GuildId) -> DiscordResult<CommandReply> {
        self.store
            .set_active_channel(&NewChannel::new(
                to_db_id(channel.id.get()),
                to_db_id(guild_id.get()),
                channel.name.clone(),
            ))
            .await?;
        info!(channel_id = %channel.id, "Added active channel");
        Ok(CommandReply::public(format!(
            "Added {} to active channels.",
            channel.id.mention()
        )))
    }

    async fn remove(&self, channel: &TargetChannel) -> DiscordResult<CommandReply> {
        let removed = self
            .store
            .remove_active_channel(to_db_id(channel.id.get()))
            .await?;
        info!(channel_id = %channel.id, removed, "Removed active channel");
        Ok(CommandReply::public(if removed {
            format!("Removed {} from active channels.", channel.id.mention())
        } else {
            format!("{} was not an active channel.", channel.id.mention())
        }))
    }

    async fn clear(&self, guild_id: GuildId) -> DiscordResult<CommandReply> {
        let cleared = self
            .store
            .clear_active_channels(to_db_id(guild_id.get()))
            .await?;
        info!(cleared, "Cleared active channels");
        Ok(CommandReply::public("Cleared all active channels."))
    }

    /// Lists the active set, dropping channels that no longer exist.
    async fn list(&self, ctx: &Context, guild_id: GuildId) -> DiscordResult<CommandReply> {
        let stored = self
            .store
            .list_active_channels(to_db_id(guild_id.get()))
            .await?;
        if stored.is_empty() {
            return Ok(CommandReply::public(active_channels_text(&[])));
        }

        let existing = guild_id.channels(&ctx.http).await?;
        let mut mentions = Vec::with_capacity(stored.len());
        for id in stored {
            let channel_id = ChannelId::new(id as u64);
            if existing.contains_key(&channel_id) {
                mentions.push(channel_id.mention().to_string());
            } else {
                debug!(channel_id = id, "Pruning deleted active channel");
                self.store.remove_active_channel(id).await?;
            }
        }
        Ok(CommandReply::public(active_channels_text(&mentions)))
    }
}

#[async_trait]
impl SlashCommand for ActiveChannelsCommand {
    fn name(&self) -> CommandName {
        CommandName::ActiveChannels
    }

    fn definition(&self) -> CreateCommand {
        let subcommand = |action: ActiveChannelsAction, description: &str| {
            CreateCommandOption::new(
                CommandOptionType::SubCommand,
                action.to_string(),
                description,
            )
        };
        CreateCommand::new(self.name().to_string())
            .description("Manage the channels where audio clips are measured")
            .add_option(
                subcommand(ActiveChannelsAction::Add, "Add a channel to the active list")
                    .add_sub_option(channel_option()),
            )
            .add_option(
                subcommand(ActiveChannelsAction::Remove, "Remove a channel from the active list")
                    .add_sub_option(channel_option()),
            )
            .add_option(subcommand(
                ActiveChannelsAction::Clear,
                "Remove all channels from the active list",
            ))
            .add_option(subcommand(
                ActiveChannelsAction::List,
                "List all channels on the active list",
            ))
    }

    #[instrument(skip(self, ctx, command))]
    async fn run(
        &self,
        ctx: &Context,
        command: &CommandInteraction,
        guild_id: GuildId,
    ) -> DiscordResult<CommandReply> {
        let options = command.data.options();
        let Some(ResolvedOption {
            name,
            value: ResolvedValue::SubCommand(sub_options),
            ..
        }) = options.first()
        else {
            return Err(DiscordError::new(DiscordErrorKind::InvalidOption(
                "missing subcommand".to_string(),
            )));
        };
        let action: ActiveChannelsAction = name.parse().map_err(|_| {
            DiscordError::new(DiscordErrorKind::InvalidOption(format!(
                "unknown subcommand {name}"
            )))
        })?;

        if action.requires_administrator() && !is_administrator(command) {
            info!(%action, user_id = %command.user.id, "Rejected non-administrator");
            return Ok(CommandReply::admin_only());
        }

        match action {
            ActiveChannelsAction::Clear => self.clear(guild_id).await,
            ActiveChannelsAction::List => self.list(ctx, guild_id).await,
            ActiveChannelsAction::Add | ActiveChannelsAction::Remove => {
                let channel = target_channel(ctx, command, channel_argument(sub_options)).await?;
                if channel.kind != ChannelType::Text {
                    return Ok(CommandReply::ephemeral(format!(
                        "Error: {} is not a text channel.",
                        channel.id.mention()
                    )));
                }
                if action == ActiveChannelsAction::Add {
                    self.add(&channel, guild_id).await
                } else {
                    self.remove(&channel).await
                }
            }
        }
    }
}

fn channel_option() -> CreateCommandOption {
    CreateCommandOption::new(
        CommandOptionType::Channel,
        "channel",
        "Text channel (defaults to this one)",
    )
    .channel_types(vec![ChannelType::Text])
    .required(false)
}

fn channel_argument<'a>(options: &[ResolvedOption<'a>]) -> Option<&'a PartialChannel> {
    options.iter().find_map(|option| match option.value {
        ResolvedValue::Channel(channel) if option.name == "channel" => Some(channel),
        _ => None,
    })
}

struct TargetChannel {
    id: ChannelId,
    name: String,
    kind: ChannelType,
}

impl From<&PartialChannel> for TargetChannel {
    fn from(channel: &PartialChannel) -> Self {
        Self {
            id: channel.id,
            name: channel.name.clone().unwrap_or_default(),
            kind: channel.kind,
        }
    }
}

/// The channel named by the option, else the one the command was used in.
async fn target_channel(
    ctx: &Context,
    command: &CommandInteraction,
    argument: Option<&PartialChannel>,
) -> DiscordResult<TargetChannel> {
    if let Some(channel) = argument.or(command.channel.as_ref()) {
        return Ok(TargetChannel::from(channel));
    }
    match command.channel_id.to_channel(ctx).await? {
        Channel::Guild(channel) => Ok(TargetChannel {
            id: channel.id,
            name: channel.name,
            kind: channel.kind,
        }),
        _ => Err(DiscordError::new(DiscordErrorKind::ChannelNotFound(
            command.channel_id.get(),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_list_is_open_to_everyone() {
        assert!(ActiveChannelsAction::Add.requires_administrator());
        assert!(ActiveChannelsAction::Remove.requires_administrator());
        assert!(ActiveChannelsAction::Clear.requires_administrator());
        assert!(!ActiveChannelsAction::List.requires_administrator());
    }

    #[test]
    fn subcommand_names_parse() {
        assert_eq!("add".parse::<ActiveChannelsAction>().ok(), Some(ActiveChannelsAction::Add));
        assert_eq!(ActiveChannelsAction::Clear.to_string(), "clear");
        assert!("purge".parse::<ActiveChannelsAction>().is_err());
    }
}
