use chrono::{DateTime, Utc};
use poise::serenity_prelude::{ChannelId, GuildId, MessageId};

pub trait GetRelativeTimestamp {
    fn discord_relative_timestamp(&self) -> String;
}

impl GetRelativeTimestamp for DateTime<Utc> {
    fn discord_relative_timestamp(&self) -> String {
        format!("<t:{}:R>", self.timestamp())
    }
}

pub fn message_link(guild_id: GuildId, channel_id: ChannelId, message_id: MessageId) -> String {
    format!("https://discord.com/channels/{guild_id}/{channel_id}/{message_id}")
}
