use crate::{
    data::State,
    handle_starboards::{
        handle_starboard_deletes, handle_starboard_reaction, handle_starboard_reactions_cleared,
    },
    starboard::ReactionChange,
};
use bot_traits::ForwardRefToTracing;
use color_eyre::eyre::Result;
use poise::serenity_prelude as serenity;

/// Maps gateway events to the handlers interested in them.
///
/// Every handler swallows (and logs) its own errors so one bad event never stops the rest.
pub async fn event_handler(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    data: State,
) -> Result<()> {
    match event {
        serenity::FullEvent::ReactionAdd { add_reaction } => {
            handle_starboard_reaction(data, add_reaction, ReactionChange::Added)
                .await
                .trace_err_ok();
        }
        serenity::FullEvent::ReactionRemove { removed_reaction } => {
            handle_starboard_reaction(data, removed_reaction, ReactionChange::Removed)
                .await
                .trace_err_ok();
        }
        serenity::FullEvent::ReactionRemoveAll {
            channel_id,
            removed_from_message_id,
        } => {
            let guild_id = channel_guild(ctx, *channel_id);

            handle_starboard_reactions_cleared(
                data,
                guild_id,
                *channel_id,
                *removed_from_message_id,
                None,
            )
            .await
            .trace_err_ok();
        }
        serenity::FullEvent::ReactionRemoveEmoji { removed_reactions } => {
            handle_starboard_reactions_cleared(
                data,
                removed_reactions.guild_id,
                removed_reactions.channel_id,
                removed_reactions.message_id,
                Some(&removed_reactions.emoji),
            )
            .await
            .trace_err_ok();
        }
        serenity::FullEvent::MessageDelete {
            channel_id,
            deleted_message_id,
            guild_id,
        } => {
            handle_starboard_deletes(data, *guild_id, *channel_id, &[*deleted_message_id])
                .await
                .trace_err_ok();
        }
        serenity::FullEvent::MessageDeleteBulk {
            channel_id,
            multiple_deleted_messages_ids,
            guild_id,
        } => {
            handle_starboard_deletes(data, *guild_id, *channel_id, multiple_deleted_messages_ids)
                .await
                .trace_err_ok();
        }
        serenity::FullEvent::Ratelimit { data } => {
            tracing::warn!("Ratelimited: {:?}", data);
        }
        _ => {}
    };

    Ok(())
}

/// `ReactionRemoveAll` carries no guild id, so look the channel up in the cache.
fn channel_guild(
    ctx: &serenity::Context,
    channel_id: serenity::ChannelId,
) -> Option<serenity::GuildId> {
    ctx.cache
        .guilds()
        .into_iter()
        .find(|guild_id| {
            ctx.cache
                .guild(*guild_id)
                .is_some_and(|guild| guild.channels.contains_key(&channel_id))
        })
}
