//! Discord client setup and lifecycle.

use std::sync::Arc;

use decibel_database::Store;
use serenity::Client;
use serenity::all::GuildId;
use tracing::{info, instrument};

use crate::commands::CommandTable;
use crate::handler::DecibelHandler;
use crate::{DecibelConfig, DiscordError, DiscordErrorKind};

/// The Decibel Discord bot.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use decibel_database::Store;
/// use decibel_discord::{DecibelBot, DecibelConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DecibelConfig::load(None)?;
///     let store = Arc::new(Store::open(&config.database_path)?);
///
///     let mut bot = DecibelBot::new(&config, store).await?;
///     bot.start().await?;
///     Ok(())
/// }
/// ```
pub struct DecibelBot {
    client: Client,
    commands: Arc<CommandTable>,
}

impl DecibelBot {
    /// Build the serenity client around a shared store.
    ///
    /// # Errors
    /// Returns an error if the Serenity client fails to initialize.
    #[instrument(skip_all, fields(token_len = config.bot_token.len()))]
    pub async fn new(config: &DecibelConfig, store: Arc<Store>) -> Result<Self, DiscordError> {
        info!("Initializing Decibel Discord bot");

        let commands = Arc::new(CommandTable::standard(
            store.clone(),
            config.leaderboard_page_size,
        ));
        let handler = DecibelHandler::new(
            store,
            commands.clone(),
            config.clip_settings(),
            config.test_guild_id.map(GuildId::new),
        );
        let intents = DecibelHandler::intents();

        info!("Building Serenity client with intents: {:?}", intents);

        let client = Client::builder(&config.bot_token, intents)
            .event_handler(handler)
            .await
            .map_err(|e| {
                DiscordError::new(DiscordErrorKind::ConnectionFailed(format!(
                    "Failed to build client: {}",
                    e
                )))
            })?;

        Ok(Self { client, commands })
    }

    /// Connect and handle events until the client shuts down.
    ///
    /// # Errors
    /// Returns an error if the client fails to start or hits a fatal gateway error.
    #[instrument(skip(self))]
    pub async fn start(&mut self) -> Result<(), DiscordError> {
        info!(commands = ?self.commands.names(), "Starting Discord bot");

        self.client.start().await.map_err(|e| {
            DiscordError::new(DiscordErrorKind::ConnectionFailed(format!(
                "Client error: {}",
                e
            )))
        })
    }
}
