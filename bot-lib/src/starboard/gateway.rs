use super::render::StarEmbed;
use crate::{CloneableCtx, utils::message_link};
use chrono::{DateTime, Utc};
use poise::serenity_prelude::{
    self as serenity, CacheHttp, Channel, ChannelId, CreateEmbed, CreateEmbedAuthor,
    CreateMessage, EditMessage, GuildId, Message, MessageId, ReactionType, User, UserId,
};

const REACTORS_PAGE_SIZE: u8 = 100;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("not found")]
    NotFound,
    #[error("missing permissions")]
    Forbidden,
    #[error(transparent)]
    Other(#[from] color_eyre::Report),
}

impl GatewayError {
    /// The http statuses the starboard reacts to, anything else is unexpected.
    fn from_status(status: u16) -> Option<Self> {
        match status {
            404 => Some(GatewayError::NotFound),
            403 => Some(GatewayError::Forbidden),
            _ => None,
        }
    }
}

impl From<serenity::Error> for GatewayError {
    fn from(error: serenity::Error) -> Self {
        let status = match &error {
            serenity::Error::Http(http_error) => http_error.status_code(),
            _ => None,
        };

        status
            .and_then(|status| GatewayError::from_status(status.as_u16()))
            .unwrap_or_else(|| GatewayError::Other(error.into()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StarAuthor {
    pub id: UserId,
    pub display_name: String,
    pub avatar_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StarAttachment {
    pub url: String,
    pub filename: String,
    pub content_type: Option<String>,
}

/// What the starboard needs to know about a message, independent of the client library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StarMessage {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub guild_id: GuildId,
    pub author: StarAuthor,
    pub content: String,
    pub attachments: Vec<StarAttachment>,
    pub timestamp: DateTime<Utc>,
    pub channel_name: Option<String>,
    pub channel_nsfw: bool,
}

impl StarMessage {
    pub fn link(&self) -> String {
        message_link(self.guild_id, self.channel_id, self.id)
    }
}

/// The chat platform, as seen by the starboard.
pub trait StarboardGateway {
    fn current_user_id(&self) -> UserId;

    async fn fetch_message(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> Result<StarMessage, GatewayError>;

    /// Every user that reacted to the message with `emoji`.
    async fn reactors(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        emoji: &str,
    ) -> Result<Vec<UserId>, GatewayError>;

    async fn send_repost(
        &self,
        channel_id: ChannelId,
        embed: &StarEmbed,
    ) -> Result<MessageId, GatewayError>;

    async fn edit_repost(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        embed: &StarEmbed,
    ) -> Result<(), GatewayError>;

    async fn delete_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> Result<(), GatewayError>;
}

/// The real gateway, backed by serenity's http client and cache.
#[derive(Clone)]
pub struct SerenityGateway {
    ctx: CloneableCtx,
    bot_id: UserId,
}

impl SerenityGateway {
    pub fn new(ctx: impl Into<CloneableCtx>, bot_id: UserId) -> Self {
        Self {
            ctx: ctx.into(),
            bot_id,
        }
    }

    /// Messages fetched over http carry no guild id, so the caller supplies it.
    async fn to_star_message(&self, guild_id: GuildId, message: Message) -> StarMessage {
        let (channel_name, channel_nsfw) = match message.channel_id.to_channel(&self.ctx).await {
            Ok(Channel::Guild(channel)) => (Some(channel.name), channel.nsfw),
            Ok(_) => (None, false),
            Err(e) => {
                tracing::debug!("Could not resolve channel {}: {:?}", message.channel_id, e);
                (None, false)
            }
        };

        // Gateway messages carry the member, http fetched ones don't.
        let nick = match message.member.as_ref().and_then(|member| member.nick.clone()) {
            Some(nick) => Some(nick),
            None => message.author.nick_in(&self.ctx, guild_id).await,
        };
        let display_name = author_display_name(&message.author, nick);

        StarMessage {
            id: message.id,
            channel_id: message.channel_id,
            guild_id,
            author: StarAuthor {
                id: message.author.id,
                display_name,
                avatar_url: message.author.face(),
            },
            content: message.content,
            attachments: message
                .attachments
                .into_iter()
                .map(|attachment| StarAttachment {
                    url: attachment.url,
                    filename: attachment.filename,
                    content_type: attachment.content_type,
                })
                .collect(),
            timestamp: DateTime::from_timestamp(message.timestamp.unix_timestamp(), 0)
                .unwrap_or_default(),
            channel_name,
            channel_nsfw,
        }
    }
}

/// The guild nickname wins over the global display name.
fn author_display_name(author: &User, nick: Option<String>) -> String {
    nick.unwrap_or_else(|| author.display_name().to_owned())
}

impl StarboardGateway for SerenityGateway {
    fn current_user_id(&self) -> UserId {
        self.bot_id
    }

    async fn fetch_message(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> Result<StarMessage, GatewayError> {
        let message = channel_id.message(&self.ctx, message_id).await?;

        Ok(self.to_star_message(guild_id, message).await)
    }

    async fn reactors(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        emoji: &str,
    ) -> Result<Vec<UserId>, GatewayError> {
        let reaction_type = ReactionType::try_from(emoji).map_err(|e| {
            GatewayError::Other(color_eyre::eyre::eyre!(
                "Invalid star emoji `{emoji}`: {e:?}"
            ))
        })?;

        let mut users = Vec::new();
        let mut after = None;

        loop {
            let page = channel_id
                .reaction_users(
                    self.ctx.http(),
                    message_id,
                    reaction_type.clone(),
                    Some(REACTORS_PAGE_SIZE),
                    after,
                )
                .await?;

            let page_len = page.len();
            after = page.last().map(|user| user.id);
            users.extend(page.into_iter().map(|user| user.id));

            if page_len < usize::from(REACTORS_PAGE_SIZE) {
                break;
            }
        }

        Ok(users)
    }

    async fn send_repost(
        &self,
        channel_id: ChannelId,
        embed: &StarEmbed,
    ) -> Result<MessageId, GatewayError> {
        let message = channel_id
            .send_message(&self.ctx, CreateMessage::new().embed(embed.into()))
            .await?;

        Ok(message.id)
    }

    async fn edit_repost(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
        embed: &StarEmbed,
    ) -> Result<(), GatewayError> {
        channel_id
            .edit_message(&self.ctx, message_id, EditMessage::new().embed(embed.into()))
            .await?;

        Ok(())
    }

    async fn delete_message(
        &self,
        channel_id: ChannelId,
        message_id: MessageId,
    ) -> Result<(), GatewayError> {
        channel_id
            .delete_message(self.ctx.http(), message_id)
            .await
            .map_err(GatewayError::from)
    }
}

impl From<&StarEmbed> for CreateEmbed {
    fn from(embed: &StarEmbed) -> Self {
        let author = CreateEmbedAuthor::new(&embed.author_name).icon_url(&embed.author_icon_url);

        let created = CreateEmbed::new()
            .author(author)
            .description(&embed.description)
            .colour(embed.colour)
            .fields(
                embed
                    .fields
                    .iter()
                    .map(|field| (field.name.clone(), field.value.clone(), field.inline)),
            );

        let created = match &embed.image_url {
            Some(url) => created.image(url),
            None => created,
        };

        match serenity::Timestamp::from_unix_timestamp(embed.timestamp.timestamp()) {
            Ok(timestamp) => created.timestamp(timestamp),
            Err(_) => created,
        }
    }
}
