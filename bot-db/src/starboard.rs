use crate::{BotDb, ReadWriteTree, StoreError};
use chrono::{DateTime, Utc};
use color_eyre::eyre::Result;
use poise::serenity_prelude::{ChannelId, GuildId, MessageId, UserId};
use serde::{Deserialize, Serialize};
use sled::Tree;
use std::time::Duration;

pub const DEFAULT_THRESHOLD: u64 = 5;
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(60 * 60 * 24 * 7);

/// Per guild starboard settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StarboardConfig {
    pub guild_id: GuildId,
    /// Where reposts go. Unique across guilds.
    pub channel_id: ChannelId,
    /// Distinct reactors (excluding the author) needed to post.
    pub threshold: u64,
    /// No new reposts or updates happen while locked.
    pub is_locked: bool,
    /// Messages older than this when they first reach the threshold are skipped.
    pub max_age: Duration,
}

impl StarboardConfig {
    pub fn new(guild_id: GuildId, channel_id: ChannelId) -> Self {
        Self {
            guild_id,
            channel_id,
            threshold: DEFAULT_THRESHOLD,
            is_locked: false,
            max_age: DEFAULT_MAX_AGE,
        }
    }
}

/// One tracked original message and the repost that mirrors it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StarboardEntry {
    pub id: u64,
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub bot_message_id: MessageId,
    pub author_id: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewStarboardEntry {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub bot_message_id: MessageId,
    pub author_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(StarboardEntry),
    /// Someone else tracked the message first; this is their entry.
    AlreadyTracked(StarboardEntry),
}

#[derive(Serialize, Deserialize)]
struct StoredConfig {
    guild_id: u64,
    channel_id: u64,
    threshold: u64,
    is_locked: bool,
    max_age_secs: u64,
}

impl From<&StarboardConfig> for StoredConfig {
    fn from(config: &StarboardConfig) -> Self {
        Self {
            guild_id: config.guild_id.get(),
            channel_id: config.channel_id.get(),
            threshold: config.threshold,
            is_locked: config.is_locked,
            max_age_secs: config.max_age.as_secs(),
        }
    }
}

impl From<StoredConfig> for StarboardConfig {
    fn from(stored: StoredConfig) -> Self {
        Self {
            guild_id: GuildId::new(stored.guild_id),
            channel_id: ChannelId::new(stored.channel_id),
            threshold: stored.threshold,
            is_locked: stored.is_locked,
            max_age: Duration::from_secs(stored.max_age_secs),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct StoredEntry {
    id: u64,
    guild_id: u64,
    channel_id: u64,
    message_id: u64,
    bot_message_id: u64,
    author_id: u64,
    created_at_millis: i64,
}

impl From<StoredEntry> for StarboardEntry {
    fn from(stored: StoredEntry) -> Self {
        Self {
            id: stored.id,
            guild_id: GuildId::new(stored.guild_id),
            channel_id: ChannelId::new(stored.channel_id),
            message_id: MessageId::new(stored.message_id),
            bot_message_id: MessageId::new(stored.bot_message_id),
            author_id: UserId::new(stored.author_id),
            created_at: DateTime::from_timestamp_millis(stored.created_at_millis)
                .unwrap_or_default(),
        }
    }
}

/// `(guild, message)` so that one guild's rows share a key prefix.
type EntryKey = (u64, u64);

/// Starboard tables: configs by guild, entries by original message, and an index from
/// repost id back to the original message.
#[derive(Clone)]
pub struct StarboardDb {
    db: BotDb,
    configs: Tree,
    entries: Tree,
    reposts: Tree,
}

impl StarboardDb {
    pub fn new(db: &BotDb) -> Result<Self> {
        Ok(Self {
            db: db.clone(),
            configs: db.open_tree("starboard_configs")?,
            entries: db.open_tree("starboard_entries")?,
            reposts: db.open_tree("starboard_reposts")?,
        })
    }

    pub fn config(&self, guild_id: GuildId) -> Result<Option<StarboardConfig>, StoreError> {
        Ok(self
            .configs
            .typed_get::<u64, StoredConfig>(&guild_id.get())?
            .map(StarboardConfig::from))
    }

    pub fn save_config(&self, config: &StarboardConfig) -> Result<(), StoreError> {
        let conflict = self
            .configs
            .typed_values::<StoredConfig>()
            .find(|other| {
                other.channel_id == config.channel_id.get()
                    && other.guild_id != config.guild_id.get()
            });

        if let Some(other) = conflict {
            return Err(StoreError::ChannelInUse {
                channel_id: other.channel_id,
                guild_id: other.guild_id,
            });
        }

        self.configs
            .typed_insert(&config.guild_id.get(), &StoredConfig::from(config))
    }

    pub fn entry(
        &self,
        guild_id: GuildId,
        message_id: MessageId,
    ) -> Result<Option<StarboardEntry>, StoreError> {
        let key: EntryKey = (guild_id.get(), message_id.get());

        Ok(self
            .entries
            .typed_get::<EntryKey, StoredEntry>(&key)?
            .map(StarboardEntry::from))
    }

    pub fn entry_by_repost(
        &self,
        guild_id: GuildId,
        bot_message_id: MessageId,
    ) -> Result<Option<StarboardEntry>, StoreError> {
        let key: EntryKey = (guild_id.get(), bot_message_id.get());

        let Some(message_id) = self.reposts.typed_get::<EntryKey, u64>(&key)? else {
            return Ok(None);
        };

        self.entry(guild_id, MessageId::new(message_id))
    }

    /// Inserts the entry unless the message is already tracked.
    pub fn insert_entry(&self, new: NewStarboardEntry) -> Result<InsertOutcome, StoreError> {
        let key = bincode::serialize::<EntryKey>(&(new.guild_id.get(), new.message_id.get()))?;
        let stored = StoredEntry {
            id: self.db.generate_id()?,
            guild_id: new.guild_id.get(),
            channel_id: new.channel_id.get(),
            message_id: new.message_id.get(),
            bot_message_id: new.bot_message_id.get(),
            author_id: new.author_id.get(),
            created_at_millis: Utc::now().timestamp_millis(),
        };
        let value = bincode::serialize(&stored)?;

        match self
            .entries
            .compare_and_swap(key, None as Option<&[u8]>, Some(value))?
        {
            Ok(()) => {
                self.reposts.typed_insert::<EntryKey, u64>(
                    &(new.guild_id.get(), new.bot_message_id.get()),
                    &new.message_id.get(),
                )?;

                Ok(InsertOutcome::Inserted(stored.into()))
            }
            Err(swap_error) => match swap_error.current {
                Some(current) => {
                    let existing = bincode::deserialize::<StoredEntry>(&current)?;

                    Ok(InsertOutcome::AlreadyTracked(existing.into()))
                }
                // Removed again in between, try once more.
                None => self.insert_entry(new),
            },
        }
    }

    /// Removing an untracked message is not an error, it returns `None`.
    pub fn remove_entry(
        &self,
        guild_id: GuildId,
        message_id: MessageId,
    ) -> Result<Option<StarboardEntry>, StoreError> {
        let key: EntryKey = (guild_id.get(), message_id.get());

        let Some(removed) = self.entries.typed_remove::<EntryKey, StoredEntry>(&key)? else {
            return Ok(None);
        };

        self.reposts
            .typed_remove::<EntryKey, u64>(&(removed.guild_id, removed.bot_message_id))?;

        Ok(Some(removed.into()))
    }

    pub fn count_entries(&self, guild_id: GuildId) -> Result<usize, StoreError> {
        let prefix = bincode::serialize(&guild_id.get())?;

        let mut count = 0;
        for row in self.entries.scan_prefix(prefix) {
            row?;
            count += 1;
        }

        Ok(count)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn db() -> StarboardDb {
        StarboardDb::new(&BotDb::temporary().unwrap()).unwrap()
    }

    fn new_entry(guild: u64, message: u64, repost: u64) -> NewStarboardEntry {
        NewStarboardEntry {
            guild_id: GuildId::new(guild),
            channel_id: ChannelId::new(10),
            message_id: MessageId::new(message),
            bot_message_id: MessageId::new(repost),
            author_id: UserId::new(7),
        }
    }

    #[test]
    fn config_is_saved_and_replaced() {
        let db = db();
        let guild = GuildId::new(1);

        assert_eq!(db.config(guild).unwrap(), None);

        let mut config = StarboardConfig::new(guild, ChannelId::new(100));
        db.save_config(&config).unwrap();
        assert_eq!(db.config(guild).unwrap(), Some(config.clone()));

        config.threshold = 3;
        config.is_locked = true;
        config.max_age = Duration::from_secs(3600);
        db.save_config(&config).unwrap();

        let stored = db.config(guild).unwrap().unwrap();
        assert_eq!(stored.threshold, 3);
        assert!(stored.is_locked);
        assert_eq!(stored.max_age, Duration::from_secs(3600));
    }

    #[test]
    fn starboard_channel_is_unique_across_guilds() {
        let db = db();

        db.save_config(&StarboardConfig::new(GuildId::new(1), ChannelId::new(100)))
            .unwrap();

        let error = db
            .save_config(&StarboardConfig::new(GuildId::new(2), ChannelId::new(100)))
            .unwrap_err();

        assert!(matches!(
            error,
            StoreError::ChannelInUse {
                channel_id: 100,
                guild_id: 1
            }
        ));

        // Re-saving the same guild with its own channel is fine.
        db.save_config(&StarboardConfig::new(GuildId::new(1), ChannelId::new(100)))
            .unwrap();
    }

    #[test]
    fn second_insert_reports_existing_entry() {
        let db = db();

        let InsertOutcome::Inserted(first) = db.insert_entry(new_entry(1, 50, 500)).unwrap()
        else {
            panic!("first insert should succeed");
        };

        let outcome = db.insert_entry(new_entry(1, 50, 501)).unwrap();
        assert_eq!(outcome, InsertOutcome::AlreadyTracked(first.clone()));

        assert_eq!(
            db.entry_by_repost(GuildId::new(1), MessageId::new(500)).unwrap(),
            Some(first)
        );
        assert_eq!(
            db.entry_by_repost(GuildId::new(1), MessageId::new(501)).unwrap(),
            None
        );
    }

    #[test]
    fn remove_is_idempotent() {
        let db = db();
        db.insert_entry(new_entry(1, 50, 500)).unwrap();

        let removed = db
            .remove_entry(GuildId::new(1), MessageId::new(50))
            .unwrap();
        assert_eq!(removed.map(|entry| entry.bot_message_id), Some(MessageId::new(500)));

        assert_eq!(
            db.remove_entry(GuildId::new(1), MessageId::new(50)).unwrap(),
            None
        );
        assert_eq!(
            db.entry_by_repost(GuildId::new(1), MessageId::new(500)).unwrap(),
            None
        );
    }

    #[test]
    fn entries_are_counted_per_guild() {
        let db = db();
        db.insert_entry(new_entry(1, 50, 500)).unwrap();
        db.insert_entry(new_entry(1, 51, 501)).unwrap();
        db.insert_entry(new_entry(2, 50, 502)).unwrap();

        assert_eq!(db.count_entries(GuildId::new(1)).unwrap(), 2);
        assert_eq!(db.count_entries(GuildId::new(2)).unwrap(), 1);
        assert_eq!(db.count_entries(GuildId::new(3)).unwrap(), 0);
    }
}
