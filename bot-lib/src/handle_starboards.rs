use crate::{
    data::State,
    starboard::{ReactionChange, ReactionEvent, StarboardOutcome},
};
use color_eyre::eyre::Result;
use poise::serenity_prelude::{ChannelId, GuildId, MessageId, Reaction, ReactionType};

pub async fn handle_starboard_reaction(
    data: State,
    reaction: &Reaction,
    change: ReactionChange,
) -> Result<()> {
    let (Some(guild_id), Some(user_id)) = (reaction.guild_id, reaction.user_id) else {
        return Ok(());
    };

    let event = ReactionEvent {
        guild_id,
        channel_id: reaction.channel_id,
        message_id: reaction.message_id,
        user_id,
        emoji: reaction.emoji.to_string(),
    };

    let star_emoji = data.star_emoji().await;
    let outcome = data
        .starboard
        .handle_reaction(&event, &star_emoji, change)
        .await?;

    if outcome != StarboardOutcome::Ignored {
        tracing::debug!("{:?} on {} -> {:?}", change, reaction.message_id, outcome);
    }

    Ok(())
}

/// Covers both "remove all reactions" (`emoji` is `None`) and "remove all of one emoji".
pub async fn handle_starboard_reactions_cleared(
    data: State,
    guild_id: Option<GuildId>,
    channel_id: ChannelId,
    message_id: MessageId,
    emoji: Option<&ReactionType>,
) -> Result<()> {
    let Some(guild_id) = guild_id else {
        return Ok(());
    };

    let cleared_emoji = emoji.map(ToString::to_string);
    let star_emoji = data.star_emoji().await;
    data.starboard
        .handle_reactions_cleared(
            guild_id,
            channel_id,
            message_id,
            cleared_emoji.as_deref(),
            &star_emoji,
        )
        .await?;

    Ok(())
}

pub async fn handle_starboard_deletes(
    data: State,
    guild_id: Option<GuildId>,
    channel_id: ChannelId,
    message_ids: &[MessageId],
) -> Result<()> {
    let Some(guild_id) = guild_id else {
        return Ok(());
    };

    let removed = data
        .starboard
        .handle_bulk_delete(guild_id, channel_id, message_ids)
        .await?;

    if removed > 0 {
        tracing::info!("Cleaned up {removed} starboard entries after deletion");
    }

    Ok(())
}
