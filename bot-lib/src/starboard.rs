mod gateway;
mod render;
mod settings;

pub use gateway::{
    GatewayError, SerenityGateway, StarAttachment, StarAuthor, StarMessage, StarboardGateway,
};
pub use render::{EmbedField, StarEmbed, render_repost};
pub use settings::{ConfigUpdate, SettingsError, format_max_age, parse_max_age};

use ahash::AHashSet;
use bot_db::starboard::{
    InsertOutcome, NewStarboardEntry, StarboardConfig, StarboardDb, StarboardEntry,
};
use bot_traits::ForwardRefToTracing;
use chrono::{TimeDelta, Utc};
use color_eyre::eyre::Result;
use itertools::Itertools;
use poise::serenity_prelude::{ChannelId, GuildId, MessageId, UserId};

pub const DEFAULT_STAR_EMOJI: &str = "⭐";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionChange {
    Added,
    Removed,
}

/// A reaction add or remove, already narrowed down to a guild message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionEvent {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub user_id: UserId,
    pub emoji: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StarboardOutcome {
    /// Nothing to do: not configured, locked, wrong emoji, or the message could not be read.
    Ignored,
    Posted(MessageId),
    Updated { count: u64 },
    Removed,
    /// Untracked and staying that way.
    Unchanged { count: u64 },
}

/// Distinct voters across the original and its repost, never counting the author.
pub fn count_votes(
    author_id: UserId,
    original_reactors: impl IntoIterator<Item = UserId>,
    repost_reactors: impl IntoIterator<Item = UserId>,
) -> u64 {
    original_reactors
        .into_iter()
        .chain(repost_reactors)
        .filter(|user| *user != author_id)
        .collect::<AHashSet<_>>()
        .len() as u64
}

fn log_gateway_error(context: &str, error: &GatewayError) {
    match error {
        GatewayError::NotFound | GatewayError::Forbidden => {
            tracing::warn!("{context}: {error}")
        }
        GatewayError::Other(report) => tracing::error!("{context}: {report:?}"),
    }
}

/// Decides whether a message gets reposted, has its repost updated, or loses it.
///
/// Nothing is cached: every event re-reads the config and entry from the store and the
/// reactions from the chat, so a missed or reordered event is corrected by the next one.
pub struct StarboardEngine<G> {
    db: StarboardDb,
    gateway: G,
}

impl<G: StarboardGateway> StarboardEngine<G> {
    pub fn new(db: StarboardDb, gateway: G) -> Self {
        Self { db, gateway }
    }

    pub fn db(&self) -> &StarboardDb {
        &self.db
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    #[tracing::instrument(
        level = "debug",
        skip(self, event, star_emoji),
        fields(guild = %event.guild_id, message = %event.message_id)
    )]
    pub async fn handle_reaction(
        &self,
        event: &ReactionEvent,
        star_emoji: &str,
        change: ReactionChange,
    ) -> Result<StarboardOutcome> {
        if event.emoji != star_emoji || event.user_id == self.gateway.current_user_id() {
            return Ok(StarboardOutcome::Ignored);
        }

        let Some(config) = self.active_config(event.guild_id)? else {
            return Ok(StarboardOutcome::Ignored);
        };

        self.reconcile(&config, event.channel_id, event.message_id, star_emoji, change)
            .await
    }

    /// Reactions were cleared from a message.
    ///
    /// `cleared_emoji` is the emoji that was purged, or `None` when every reaction was removed.
    #[tracing::instrument(level = "debug", skip(self, star_emoji))]
    pub async fn handle_reactions_cleared(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        message_id: MessageId,
        cleared_emoji: Option<&str>,
        star_emoji: &str,
    ) -> Result<StarboardOutcome> {
        if cleared_emoji.is_some_and(|emoji| emoji != star_emoji) {
            return Ok(StarboardOutcome::Ignored);
        }

        let Some(config) = self.active_config(guild_id)? else {
            return Ok(StarboardOutcome::Ignored);
        };

        self.reconcile(
            &config,
            channel_id,
            message_id,
            star_emoji,
            ReactionChange::Removed,
        )
        .await
    }

    /// Deleting an untracked message, or one already cleaned up, is a no-op.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn handle_message_delete(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> Result<StarboardOutcome> {
        let Some(config) = self.db.config(guild_id)? else {
            return Ok(StarboardOutcome::Ignored);
        };

        if channel_id == config.channel_id {
            let Some(entry) = self.db.entry_by_repost(guild_id, message_id)? else {
                return Ok(StarboardOutcome::Ignored);
            };

            self.db.remove_entry(guild_id, entry.message_id)?;
            tracing::info!("Repost of {} was deleted, untracking", entry.message_id);

            return Ok(StarboardOutcome::Removed);
        }

        let Some(entry) = self.db.remove_entry(guild_id, message_id)? else {
            return Ok(StarboardOutcome::Ignored);
        };

        self.delete_repost(&config, &entry).await;
        tracing::info!("Original {} was deleted, removed its repost", message_id);

        Ok(StarboardOutcome::Removed)
    }

    /// Returns how many tracked messages were cleaned up.
    pub async fn handle_bulk_delete(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        message_ids: &[MessageId],
    ) -> Result<usize> {
        let mut removed = 0;

        for message_id in message_ids.iter().unique() {
            if self
                .handle_message_delete(guild_id, channel_id, *message_id)
                .await?
                == StarboardOutcome::Removed
            {
                removed += 1;
            }
        }

        Ok(removed)
    }

    fn active_config(&self, guild_id: GuildId) -> Result<Option<StarboardConfig>> {
        Ok(self
            .db
            .config(guild_id)?
            .filter(|config| !config.is_locked))
    }

    async fn reconcile(
        &self,
        config: &StarboardConfig,
        channel_id: ChannelId,
        message_id: MessageId,
        star_emoji: &str,
        change: ReactionChange,
    ) -> Result<StarboardOutcome> {
        let guild_id = config.guild_id;

        // Both copies are watched, a vote on the repost counts for the original.
        let mut entry = if channel_id == config.channel_id {
            match self.db.entry_by_repost(guild_id, message_id)? {
                Some(entry) => Some(entry),
                None => return Ok(StarboardOutcome::Ignored),
            }
        } else {
            self.db.entry(guild_id, message_id)?
        };

        let (origin_channel, origin_message) = entry
            .as_ref()
            .map_or((channel_id, message_id), |entry| {
                (entry.channel_id, entry.message_id)
            });

        let original = match self
            .gateway
            .fetch_message(guild_id, origin_channel, origin_message)
            .await
        {
            Ok(original) => original,
            Err(GatewayError::NotFound) => {
                let Some(entry) = entry else {
                    tracing::debug!("Message {} is gone, ignoring", origin_message);
                    return Ok(StarboardOutcome::Ignored);
                };

                self.remove(config, &entry).await?;
                return Ok(StarboardOutcome::Removed);
            }
            Err(e) => {
                log_gateway_error("Failed to fetch starred message", &e);
                return Ok(StarboardOutcome::Ignored);
            }
        };

        if original.author.id == self.gateway.current_user_id() {
            return Ok(StarboardOutcome::Ignored);
        }

        let repost_reactors = async {
            match &entry {
                Some(entry) => self
                    .gateway
                    .reactors(config.channel_id, entry.bot_message_id, star_emoji)
                    .await
                    .map(Some),
                None => Ok(None),
            }
        };

        let (original_reactors, repost_reactors) = futures::join!(
            self.gateway
                .reactors(original.channel_id, original.id, star_emoji),
            repost_reactors
        );

        let original_reactors = match original_reactors {
            Ok(reactors) => reactors,
            Err(e) => {
                log_gateway_error("Failed to fetch reactions on original", &e);
                return Ok(StarboardOutcome::Ignored);
            }
        };

        let repost_reactors = match repost_reactors {
            Ok(reactors) => reactors.unwrap_or_default(),
            Err(GatewayError::NotFound) => {
                if let Some(stale) = entry.take() {
                    self.db.remove_entry(guild_id, stale.message_id)?;
                    tracing::info!("Repost of {} vanished, untracking", stale.message_id);
                }

                Vec::new()
            }
            Err(e) => {
                log_gateway_error("Failed to fetch reactions on repost", &e);
                return Ok(StarboardOutcome::Ignored);
            }
        };

        let count = count_votes(original.author.id, original_reactors, repost_reactors);

        match entry {
            Some(entry) if count < config.threshold => {
                self.remove(config, &entry).await?;
                tracing::info!(
                    "{} dropped to {count} votes, removed from the starboard",
                    entry.message_id
                );

                Ok(StarboardOutcome::Removed)
            }
            Some(entry) => self.update(config, &entry, &original, count, star_emoji).await,
            None if change == ReactionChange::Removed || count < config.threshold => {
                Ok(StarboardOutcome::Unchanged { count })
            }
            None if is_too_old(config, &original) => {
                tracing::debug!("{} is older than the max age, not posting", original.id);
                Ok(StarboardOutcome::Ignored)
            }
            None => self.post(config, &original, count, star_emoji).await,
        }
    }

    async fn post(
        &self,
        config: &StarboardConfig,
        original: &StarMessage,
        count: u64,
        star_emoji: &str,
    ) -> Result<StarboardOutcome> {
        let embed = render_repost(original, count, star_emoji, config.threshold);

        let bot_message_id = match self.gateway.send_repost(config.channel_id, &embed).await {
            Ok(bot_message_id) => bot_message_id,
            Err(e) => {
                log_gateway_error("Failed to send repost", &e);
                return Ok(StarboardOutcome::Ignored);
            }
        };

        let inserted = self.db.insert_entry(NewStarboardEntry {
            guild_id: config.guild_id,
            channel_id: original.channel_id,
            message_id: original.id,
            bot_message_id,
            author_id: original.author.id,
        });

        let existing = match inserted {
            Ok(InsertOutcome::Inserted(entry)) => {
                tracing::info!(
                    "Reposted {} with {count} votes as {}",
                    entry.message_id,
                    entry.bot_message_id
                );

                return Ok(StarboardOutcome::Posted(bot_message_id));
            }
            Ok(InsertOutcome::AlreadyTracked(existing)) => existing,
            Err(e) => {
                self.gateway
                    .delete_message(config.channel_id, bot_message_id)
                    .await
                    .trace_warn_ok("Failed to delete untracked repost");

                return Err(e.into());
            }
        };

        // Another event crossed the threshold first, keep its repost and drop ours.
        self.gateway
            .delete_message(config.channel_id, bot_message_id)
            .await
            .trace_warn_ok("Failed to delete duplicate repost");

        self.update(config, &existing, original, count, star_emoji)
            .await
    }

    async fn update(
        &self,
        config: &StarboardConfig,
        entry: &StarboardEntry,
        original: &StarMessage,
        count: u64,
        star_emoji: &str,
    ) -> Result<StarboardOutcome> {
        let embed = render_repost(original, count, star_emoji, config.threshold);

        match self
            .gateway
            .edit_repost(config.channel_id, entry.bot_message_id, &embed)
            .await
        {
            Ok(()) => Ok(StarboardOutcome::Updated { count }),
            Err(GatewayError::NotFound) => {
                self.db.remove_entry(entry.guild_id, entry.message_id)?;
                tracing::info!("Repost of {} vanished, untracking", entry.message_id);

                Ok(StarboardOutcome::Removed)
            }
            Err(e) => {
                log_gateway_error("Failed to edit repost", &e);
                Ok(StarboardOutcome::Ignored)
            }
        }
    }

    async fn remove(&self, config: &StarboardConfig, entry: &StarboardEntry) -> Result<()> {
        self.delete_repost(config, entry).await;
        self.db.remove_entry(entry.guild_id, entry.message_id)?;

        Ok(())
    }

    /// Best effort, a repost that is already gone is fine.
    async fn delete_repost(&self, config: &StarboardConfig, entry: &StarboardEntry) {
        match self
            .gateway
            .delete_message(config.channel_id, entry.bot_message_id)
            .await
        {
            Ok(()) | Err(GatewayError::NotFound) => {}
            Err(e) => log_gateway_error("Failed to delete repost", &e),
        }
    }
}

fn is_too_old(config: &StarboardConfig, original: &StarMessage) -> bool {
    let age = Utc::now().signed_duration_since(original.timestamp);

    TimeDelta::from_std(config.max_age).is_ok_and(|max_age| age > max_age)
}
