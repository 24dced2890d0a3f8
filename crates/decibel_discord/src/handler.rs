//! Serenity event handler.
//!
//! Keeps the guild table in sync with the guilds the bot is in, turns audio
//! attachments into waveform replies and routes slash commands to the
//! [`CommandTable`].

use std::sync::Arc;

use chrono::NaiveDateTime;
use decibel_audio::{ClipReport, LoudnessReport, decode};
use decibel_database::{NewChannel, NewGuild, NewLoudnessRecord, Store, to_db_id};
use serenity::all::{
    Attachment, Channel, ChannelType, Command, Context, CreateAllowedMentions, CreateAttachment,
    CreateMessage, EventHandler, GatewayIntents, Guild, GuildChannel, GuildId, Interaction,
    Message, PartialGuild, Ready, UnavailableGuild,
};
use serenity::async_trait;
use serenity::http::GuildPagination;
use tracing::{debug, error, info, instrument, warn};

use crate::commands::CommandTable;
use crate::config::ClipSettings;
use crate::format::CLIP_FAILURE;
use crate::DiscordResult;

/// File name of the waveform image attached to replies.
pub const WAVEFORM_FILENAME: &str = "audio-waveform.png";

/// Reaction added to a clip once it is accepted for processing.
const ACCEPTED_REACTION: char = '🔥';

/// Most guilds Discord returns for one guild list request.
const GUILD_PAGE_LIMIT: u64 = 200;

/// Whether an attachment's declared content type is audio.
pub fn is_audio_content_type(content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.to_ascii_lowercase().contains("audio"))
}

/// First attachment declared as audio.
pub fn first_audio_attachment(attachments: &[Attachment]) -> Option<&Attachment> {
    attachments
        .iter()
        .find(|a| is_audio_content_type(a.content_type.as_deref()))
}

/// Cursor for the next guild list request, or `None` after the last page.
fn next_guild_cursor(page_len: usize, last: Option<GuildId>) -> Option<GuildId> {
    if (page_len as u64) < GUILD_PAGE_LIMIT {
        return None;
    }
    last
}

/// Where and by whom a clip was posted.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipSubmission {
    pub guild_id: i64,
    pub user_id: i64,
    /// Account name of the author.
    pub username: String,
    /// Jump link to the message.
    pub message_url: String,
    pub posted_at: NaiveDateTime,
}

impl ClipSubmission {
    /// Details of a message posted in `guild_id`.
    pub fn from_message(msg: &Message, guild_id: GuildId) -> Self {
        Self {
            guild_id: to_db_id(guild_id.get()),
            user_id: to_db_id(msg.author.id.get()),
            username: msg.author.name.clone(),
            message_url: msg.link(),
            posted_at: msg.timestamp.naive_utc(),
        }
    }

    /// Leaderboard candidate for this clip.
    ///
    /// Clips without an integrated loudness value never reach the leaderboard.
    pub fn into_record(self, loudness: &LoudnessReport) -> Option<NewLoudnessRecord> {
        let loudness_lufs = loudness.integrated_lufs?;
        Some(NewLoudnessRecord {
            guild_id: self.guild_id,
            user_id: self.user_id,
            username: self.username,
            loudness_lufs,
            message_url: self.message_url,
            recorded_at: self.posted_at,
        })
    }
}

/// Event handler for the Decibel bot.
pub struct DecibelHandler {
    store: Arc<Store>,
    commands: Arc<CommandTable>,
    clips: Arc<ClipSettings>,
    test_guild_id: Option<GuildId>,
}

impl DecibelHandler {
    /// Create a handler sharing the store and command table.
    pub fn new(
        store: Arc<Store>,
        commands: Arc<CommandTable>,
        clips: ClipSettings,
        test_guild_id: Option<GuildId>,
    ) -> Self {
        Self {
            store,
            commands,
            clips: Arc::new(clips),
            test_guild_id,
        }
    }

    /// Gateway intents the handler needs.
    pub fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT
    }

    /// Register slash commands with the test guild, then globally.
    async fn register_commands(&self, ctx: &Context) {
        let definitions = self.commands.definitions();

        if let Some(guild_id) = self.test_guild_id {
            match guild_id.set_commands(&ctx.http, definitions.clone()).await {
                Ok(registered) => {
                    info!(guild_id = %guild_id, count = registered.len(), "Registered test guild commands")
                }
                Err(e) => error!(guild_id = %guild_id, error = %e, "Failed to register test guild commands"),
            }
        }

        match Command::set_global_commands(&ctx.http, definitions).await {
            Ok(registered) => info!(count = registered.len(), "Registered global commands"),
            Err(e) => error!(error = %e, "Failed to register global commands"),
        }
    }

    /// Record every guild the bot is in, one page of the guild list at a time.
    async fn store_all_guilds(&self, ctx: &Context) -> DiscordResult<usize> {
        let mut after = None;
        let mut stored = 0;
        loop {
            let page = ctx
                .http
                .get_guilds(after.map(GuildPagination::After), Some(GUILD_PAGE_LIMIT))
                .await?;
            for guild in &page {
                self.store_guild(guild.id, &guild.name).await;
            }
            stored += page.len();
            match next_guild_cursor(page.len(), page.last().map(|guild| guild.id)) {
                Some(cursor) => after = Some(cursor),
                None => return Ok(stored),
            }
        }
    }

    async fn store_guild(&self, guild_id: GuildId, name: &str) {
        match self
            .store
            .upsert_guild(&NewGuild::new(to_db_id(guild_id.get()), name))
            .await
        {
            Ok(()) => debug!(guild_id = %guild_id, guild_name = %name, "Stored guild"),
            Err(e) => error!(guild_id = %guild_id, error = %e, "Failed to store guild"),
        }
    }

    /// Accept or ignore an audio attachment, then process it.
    ///
    /// Processing failures are answered with a generic reply; only failures to
    /// reach Discord or the store before processing starts are returned.
    #[instrument(
        skip_all,
        fields(
            message_id = %msg.id,
            channel_id = %msg.channel_id,
            guild_id = %guild_id,
            user_id = %msg.author.id,
            filename = %attachment.filename,
        )
    )]
    async fn handle_clip(
        &self,
        ctx: &Context,
        msg: &Message,
        guild_id: GuildId,
        attachment: &Attachment,
    ) -> DiscordResult<()> {
        let channel = match msg.channel(ctx).await? {
            Channel::Guild(channel) if channel.kind == ChannelType::Text => channel,
            _ => {
                debug!("Ignoring clip outside a text channel");
                return Ok(());
            }
        };

        let active = self
            .store
            .is_active_channel(to_db_id(guild_id.get()), to_db_id(channel.id.get()))
            .await?;
        if !active {
            debug!("Ignoring clip in inactive channel");
            return Ok(());
        }

        if let Err(e) = msg.react(ctx, ACCEPTED_REACTION).await {
            warn!(error = %e, "Failed to react to clip");
        }

        if let Err(e) = self.process_clip(ctx, msg, &channel, attachment).await {
            error!(error = %e, "Failed to process clip");
            reply(ctx, msg, CLIP_FAILURE.to_string(), None).await?;
        }
        Ok(())
    }

    async fn process_clip(
        &self,
        ctx: &Context,
        msg: &Message,
        channel: &GuildChannel,
        attachment: &Attachment,
    ) -> DiscordResult<()> {
        let bytes = attachment.download().await?;
        let filename = attachment.filename.clone();
        let audio = tokio::task::spawn_blocking(move || decode(bytes, &filename)).await??;

        let new_channel = NewChannel::new(
            to_db_id(channel.id.get()),
            to_db_id(channel.guild_id.get()),
            channel.name.clone(),
        );
        let color_index = self
            .store
            .next_color_index(&new_channel, self.clips.palette.len())
            .await?;
        let color = self.clips.color(color_index);

        let clips = Arc::clone(&self.clips);
        let report = tokio::task::spawn_blocking(move || {
            ClipReport::build(&audio, color, &clips.style, clips.verbose)
        })
        .await??;
        let (png, loudness, text) = report.into_parts();

        let submission = ClipSubmission::from_message(msg, channel.guild_id);
        if let Some(record) = submission.into_record(&loudness) {
            let new_best = self.store.record_loudness(&record).await?;
            info!(lufs = record.loudness_lufs, new_best, color_index, "Measured clip");
        } else {
            info!(peak = loudness.peak, color_index, "Clip too short or silent for LUFS");
        }

        reply(ctx, msg, text, Some(png)).await
    }
}

/// Reply to `msg` without pinging its author.
async fn reply(ctx: &Context, msg: &Message, text: String, png: Option<Vec<u8>>) -> DiscordResult<()> {
    let mut builder = CreateMessage::new()
        .content(text)
        .reference_message(msg)
        .allowed_mentions(CreateAllowedMentions::new().replied_user(false));
    if let Some(png) = png {
        builder = builder.add_file(CreateAttachment::bytes(png, WAVEFORM_FILENAME));
    }
    msg.channel_id.send_message(&ctx.http, builder).await?;
    Ok(())
}

#[async_trait]
impl EventHandler for DecibelHandler {
    /// Register commands and record every guild the bot is in.
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(
            bot_user = %ready.user.name,
            bot_id = %ready.user.id,
            guilds = ready.guilds.len(),
            "Bot connected to Discord"
        );

        self.register_commands(&ctx).await;

        match self.store_all_guilds(&ctx).await {
            Ok(count) => debug!(count, "Stored joined guilds"),
            Err(e) => error!(error = %e, "Failed to list guilds"),
        }
        info!("Ready");
    }

    /// Called when a guild becomes available or the bot joins one.
    async fn guild_create(&self, _ctx: Context, guild: Guild, is_new: Option<bool>) {
        info!(guild_id = %guild.id, guild_name = %guild.name, ?is_new, "Guild available");
        self.store_guild(guild.id, &guild.name).await;
    }

    async fn guild_update(&self, _ctx: Context, _old: Option<Guild>, new: PartialGuild) {
        self.store_guild(new.id, &new.name).await;
    }

    /// Forget a guild the bot left. Outages also arrive here and are ignored.
    async fn guild_delete(&self, _ctx: Context, incomplete: UnavailableGuild, _full: Option<Guild>) {
        if incomplete.unavailable {
            warn!(guild_id = %incomplete.id, "Guild unavailable");
            return;
        }

        info!(guild_id = %incomplete.id, "Left guild");
        if let Err(e) = self.store.delete_guild(to_db_id(incomplete.id.get())).await {
            error!(guild_id = %incomplete.id, error = %e, "Failed to delete guild");
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot || msg.author.id == ctx.cache.current_user().id {
            return;
        }
        let Some(guild_id) = msg.guild_id else {
            return;
        };
        let Some(attachment) = first_audio_attachment(&msg.attachments) else {
            return;
        };

        if let Err(e) = self.handle_clip(&ctx, &msg, guild_id, attachment).await {
            error!(message_id = %msg.id, error = %e, "Failed to handle audio attachment");
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::Command(command) = interaction {
            if let Err(e) = self.commands.dispatch(&ctx, &command).await {
                error!(command = %command.data.name, error = %e, "Failed to answer slash command");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use decibel_audio::analyze;

    fn attachment(id: u64, filename: &str, content_type: Option<&str>) -> Attachment {
        let mut json = serde_json::json!({
            "id": id.to_string(),
            "filename": filename,
            "size": 1024,
            "url": format!("https://cdn.discordapp.com/attachments/1/{id}/{filename}"),
            "proxy_url": format!("https://media.discordapp.net/attachments/1/{id}/{filename}"),
        });
        if let Some(content_type) = content_type {
            json["content_type"] = content_type.into();
        }
        serde_json::from_value(json).expect("valid attachment")
    }

    fn submission() -> ClipSubmission {
        ClipSubmission {
            guild_id: 7,
            user_id: 42,
            username: "shouty".to_string(),
            message_url: "https://discord.com/channels/7/8/9".to_string(),
            posted_at: chrono::DateTime::from_timestamp(1_700_000_000, 0)
                .expect("valid timestamp")
                .naive_utc(),
        }
    }

    fn sine(amplitude: f64, seconds: f64) -> Vec<f64> {
        let rate = 48_000.0;
        (0..(seconds * rate) as usize)
            .map(|i| amplitude * (2.0 * std::f64::consts::PI * 1_000.0 * i as f64 / rate).sin())
            .collect()
    }

    #[test]
    fn first_audio_attachment_skips_other_files() {
        let attachments = vec![
            attachment(1, "cover.png", Some("image/png")),
            attachment(2, "notes.txt", None),
            attachment(3, "take-1.mp3", Some("audio/mpeg")),
            attachment(4, "take-2.wav", Some("audio/wav")),
        ];
        let picked = first_audio_attachment(&attachments).expect("an audio attachment");
        assert_eq!(picked.filename, "take-1.mp3");

        assert!(first_audio_attachment(&attachments[..2]).is_none());
        assert!(first_audio_attachment(&[]).is_none());
    }

    #[test]
    fn measured_clip_becomes_a_record() {
        let loudness = analyze(&sine(0.5, 2.0), 48_000);
        let lufs = loudness.integrated_lufs.expect("sine is measurable");

        let record = submission().into_record(&loudness).expect("record");
        assert_eq!(record.guild_id, 7);
        assert_eq!(record.user_id, 42);
        assert_eq!(record.username, "shouty");
        assert_eq!(record.loudness_lufs, lufs);
        assert_eq!(record.message_url, "https://discord.com/channels/7/8/9");
        assert_eq!(record.recorded_at, submission().posted_at);
    }

    #[test]
    fn unmeasured_clips_stay_off_the_leaderboard() {
        let silent = analyze(&vec![0.0; 48_000], 48_000);
        assert_eq!(silent.integrated_lufs, None);
        assert!(submission().into_record(&silent).is_none());

        let short = analyze(&sine(0.9, 0.2), 48_000);
        assert_eq!(short.integrated_lufs, None);
        assert!(short.peak > 0.8);
        assert!(submission().into_record(&short).is_none());
    }

    #[test]
    fn guild_listing_stops_on_a_short_page() {
        let last = Some(GuildId::new(99));
        assert_eq!(next_guild_cursor(200, last), last);
        assert_eq!(next_guild_cursor(199, last), None);
        assert_eq!(next_guild_cursor(0, None), None);
    }

    #[test]
    fn audio_content_types() {
        assert!(is_audio_content_type(Some("audio/mpeg")));
        assert!(is_audio_content_type(Some("audio/ogg; codecs=opus")));
        assert!(is_audio_content_type(Some("Audio/WAV")));
        assert!(!is_audio_content_type(Some("video/mp4")));
        assert!(!is_audio_content_type(Some("image/png")));
        assert!(!is_audio_content_type(None));
    }
}
