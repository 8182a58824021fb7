use crate::starboard::DEFAULT_STAR_EMOJI;
use color_eyre::eyre::{Result, WrapErr};
use serde::{Deserialize, Serialize};
use serde_with::{DurationSeconds, serde_as};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Process wide settings. Per guild starboard settings live in the database instead.
#[serde_as]
#[derive(Deserialize, Serialize, Debug, PartialEq)]
pub struct Config {
    /// The emoji that counts as a vote.
    ///
    /// Either a unicode emoji or a custom one written as `<:name:id>`.
    #[serde(default = "get_default_star_emoji")]
    pub star_emoji: String,
    /// Where the database lives. Only read at startup, changing it needs a restart.
    #[serde(default = "get_default_db_path")]
    pub db_path: PathBuf,
    /// How long a user has to wait between `/starboard show` uses.
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "get_default_show_cooldown")]
    pub show_cooldown: Duration,
    /// Register commands in this guild only (instant), instead of globally.
    pub guild_id: Option<u64>,
    /// The help text for the bot. `/help`
    pub help_text: Option<Arc<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            star_emoji: get_default_star_emoji(),
            db_path: get_default_db_path(),
            show_cooldown: get_default_show_cooldown(),
            guild_id: None,
            help_text: None,
        }
    }
}

impl Config {
    /// Fetches the config from the config file.
    pub fn create_from_file(config_path: impl AsRef<Path>) -> Result<Config> {
        let file = std::fs::read_to_string(config_path).wrap_err("Could not read config file")?;

        toml::from_str(&file).wrap_err("Could not parse config file")
    }

    /// Reloads the config file, keeping the current config if the new one is broken.
    pub fn reload(&mut self, config_path: impl AsRef<Path>) {
        match Config::create_from_file(config_path) {
            Ok(config) => *self = config,
            Err(e) => tracing::error!("Keeping old config: {:?}", e),
        }
    }
}

fn get_default_star_emoji() -> String {
    DEFAULT_STAR_EMOJI.to_owned()
}

fn get_default_db_path() -> PathBuf {
    PathBuf::from("starboard.db")
}

const fn get_default_show_cooldown() -> Duration {
    Duration::from_secs(10)
}
