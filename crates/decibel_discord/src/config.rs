//! Bot configuration.
//!
//! Sources, lowest precedence first:
//! 1. Bundled defaults (`defaults.toml`)
//! 2. `./decibel.toml`, or the file given on the command line
//! 3. `DECIBEL_*` environment variables (e.g. `DECIBEL_DATABASE_PATH`)
//! 4. `BOT_TOKEN` and `TEST_GUILD_ID`

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use decibel_audio::WaveformStyle;
use decibel_error::ConfigError;
use serde::Deserialize;
use tracing::{debug, instrument};

const DEFAULT_CONFIG: &str = include_str!("../defaults.toml");

/// Largest leaderboard page that still fits one Discord message when every
/// row carries a 32-character name and a full jump link.
pub const MAX_LEADERBOARD_PAGE_SIZE: u32 = 12;

/// Runtime settings for the bot.
#[derive(Clone, PartialEq, Deserialize)]
pub struct DecibelConfig {
    /// Discord bot token.
    pub bot_token: String,
    /// Guild that receives slash commands immediately at startup.
    #[serde(default)]
    pub test_guild_id: Option<u64>,
    /// SQLite database file.
    pub database_path: PathBuf,
    /// Waveform colors, cycled per channel.
    pub palette: Vec<[u8; 3]>,
    /// Entries per leaderboard page.
    pub leaderboard_page_size: u32,
    /// Include the peak amplitude in every loudness reply.
    pub verbose_loudness: bool,
}

impl std::fmt::Debug for DecibelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecibelConfig")
            .field("bot_token", &"<redacted>")
            .field("test_guild_id", &self.test_guild_id)
            .field("database_path", &self.database_path)
            .field("palette", &self.palette)
            .field("leaderboard_page_size", &self.leaderboard_page_size)
            .field("verbose_loudness", &self.verbose_loudness)
            .finish()
    }
}

impl DecibelConfig {
    /// Load from every source, reading the process environment.
    ///
    /// `path` replaces the optional `./decibel.toml` and must exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let env: HashMap<String, String> = std::env::vars().collect();
        Self::load_with_env(path, &env)
    }

    /// Load with an explicit environment instead of the process one.
    #[instrument(skip(env))]
    pub fn load_with_env(
        path: Option<&Path>,
        env: &HashMap<String, String>,
    ) -> Result<Self, ConfigError> {
        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

        builder = match path {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name("decibel").required(false)),
        };

        builder = builder.add_source(
            Environment::with_prefix("DECIBEL")
                .try_parsing(true)
                .source(Some(env.clone().into_iter().collect())),
        );

        let token = non_empty(env, "BOT_TOKEN");
        let test_guild_id = non_empty(env, "TEST_GUILD_ID")
            .map(|raw| {
                raw.trim().parse::<u64>().map_err(|e| {
                    ConfigError::new(format!("TEST_GUILD_ID is not a guild id ({raw}): {e}"))
                })
            })
            .transpose()?;

        let mut config: Self = builder
            .set_override_option("bot_token", token)
            .and_then(|b| b.build())
            .map_err(|e| ConfigError::new(format!("Failed to build configuration: {e}")))?
            .try_deserialize()
            .map_err(|e| ConfigError::new(format!("Failed to parse configuration: {e}")))?;

        if test_guild_id.is_some() {
            config.test_guild_id = test_guild_id;
        }
        config.validate()?;
        debug!(config = ?config, "Loaded configuration");
        Ok(config)
    }

    /// Check the settings the bot cannot start without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot_token.trim().is_empty() {
            return Err(ConfigError::new(
                "bot token is not set (BOT_TOKEN or bot_token)",
            ));
        }
        if self.test_guild_id == Some(0) {
            return Err(ConfigError::new("test_guild_id must be a guild id, not 0"));
        }
        if self.palette.is_empty() {
            return Err(ConfigError::new("palette must contain at least one color"));
        }
        if self.leaderboard_page_size == 0 {
            return Err(ConfigError::new("leaderboard_page_size must be at least 1"));
        }
        if self.leaderboard_page_size > MAX_LEADERBOARD_PAGE_SIZE {
            return Err(ConfigError::new(format!(
                "leaderboard_page_size must be at most {MAX_LEADERBOARD_PAGE_SIZE}, got {}",
                self.leaderboard_page_size
            )));
        }
        Ok(())
    }

    /// Settings the clip pipeline needs.
    pub fn clip_settings(&self) -> ClipSettings {
        ClipSettings {
            palette: self.palette.clone(),
            style: WaveformStyle::default(),
            verbose: self.verbose_loudness,
        }
    }
}

/// How clips are rendered and reported.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipSettings {
    /// Non-empty color rotation.
    pub palette: Vec<[u8; 3]>,
    /// Image size and fixed colors.
    pub style: WaveformStyle,
    /// Append the peak amplitude to the loudness text.
    pub verbose: bool,
}

impl ClipSettings {
    /// Palette color for a rotation index.
    pub fn color(&self, index: usize) -> [u8; 3] {
        self.palette
            .get(index % self.palette.len().max(1))
            .copied()
            .unwrap_or([255, 255, 255])
    }
}

fn non_empty(env: &HashMap<String, String>, key: &str) -> Option<String> {
    env.get(key).filter(|v| !v.trim().is_empty()).cloned()
}
