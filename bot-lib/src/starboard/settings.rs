use bot_db::starboard::StarboardConfig;
use poise::serenity_prelude::{ChannelId, GuildId};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("The threshold has to be at least 1.")]
    ZeroThreshold,
    #[error("Invalid max age `{0}`! Say something like '7d' or '12h'.")]
    InvalidMaxAge(String),
    #[error("The max age has to be longer than nothing.")]
    ZeroMaxAge,
}

/// What a moderator asked to change. Unset fields keep their current (or default) value.
#[derive(Debug, Clone, Default)]
pub struct ConfigUpdate {
    pub threshold: Option<u64>,
    pub max_age: Option<String>,
    pub is_locked: Option<bool>,
}

impl ConfigUpdate {
    /// Produces the config to store, always pointing at `channel_id`.
    pub fn apply(
        self,
        guild_id: GuildId,
        current: Option<StarboardConfig>,
        channel_id: ChannelId,
    ) -> Result<StarboardConfig, SettingsError> {
        let mut config = current.unwrap_or_else(|| StarboardConfig::new(guild_id, channel_id));
        config.channel_id = channel_id;

        if let Some(threshold) = self.threshold {
            if threshold == 0 {
                return Err(SettingsError::ZeroThreshold);
            }

            config.threshold = threshold;
        }

        if let Some(max_age) = self.max_age {
            config.max_age = parse_max_age(&max_age)?;
        }

        if let Some(is_locked) = self.is_locked {
            config.is_locked = is_locked;
        }

        Ok(config)
    }
}

pub fn parse_max_age(text: &str) -> Result<Duration, SettingsError> {
    let max_age = humantime::parse_duration(text.trim())
        .map_err(|_| SettingsError::InvalidMaxAge(text.to_owned()))?;

    if max_age.is_zero() {
        return Err(SettingsError::ZeroMaxAge);
    }

    Ok(max_age)
}

pub fn format_max_age(max_age: Duration) -> String {
    humantime::format_duration(max_age).to_string()
}

#[cfg(test)]
mod test {
    use super::*;
    use bot_db::starboard::{DEFAULT_MAX_AGE, DEFAULT_THRESHOLD};

    fn guild() -> GuildId {
        GuildId::new(1)
    }

    #[test]
    fn new_config_uses_defaults() {
        let config = ConfigUpdate::default()
            .apply(guild(), None, ChannelId::new(5))
            .unwrap();

        assert_eq!(config.channel_id, ChannelId::new(5));
        assert_eq!(config.threshold, DEFAULT_THRESHOLD);
        assert_eq!(config.max_age, DEFAULT_MAX_AGE);
        assert!(!config.is_locked);
    }

    #[test]
    fn update_only_touches_given_fields() {
        let mut current = StarboardConfig::new(guild(), ChannelId::new(5));
        current.threshold = 3;
        current.is_locked = true;

        let config = ConfigUpdate {
            max_age: Some("2days".to_owned()),
            ..Default::default()
        }
        .apply(guild(), Some(current), ChannelId::new(6))
        .unwrap();

        assert_eq!(config.channel_id, ChannelId::new(6));
        assert_eq!(config.threshold, 3);
        assert!(config.is_locked);
        assert_eq!(config.max_age, Duration::from_secs(2 * 24 * 60 * 60));
    }

    #[test]
    fn rejects_bad_values() {
        let zero = ConfigUpdate {
            threshold: Some(0),
            ..Default::default()
        };
        assert_eq!(
            zero.apply(guild(), None, ChannelId::new(5)),
            Err(SettingsError::ZeroThreshold)
        );

        let garbage = ConfigUpdate {
            max_age: Some("a fortnight".to_owned()),
            ..Default::default()
        };
        assert_eq!(
            garbage.apply(guild(), None, ChannelId::new(5)),
            Err(SettingsError::InvalidMaxAge("a fortnight".to_owned()))
        );

        assert_eq!(parse_max_age("0s"), Err(SettingsError::ZeroMaxAge));
    }

    #[test]
    fn max_age_round_trips_through_text() {
        let max_age = parse_max_age("7d").unwrap();

        assert_eq!(max_age, DEFAULT_MAX_AGE);
        assert_eq!(format_max_age(max_age), "7days");
    }
}
