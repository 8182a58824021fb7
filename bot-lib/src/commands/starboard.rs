use crate::{
    SayThenDelete,
    data::PoiseContext,
    starboard::{ConfigUpdate, format_max_age},
    utils::{GetRelativeTimestamp, message_link},
};
use bot_db::{StoreError, starboard::StarboardConfig};
use color_eyre::eyre::{OptionExt, Result};
use poise::serenity_prelude::{ChannelType, GuildChannel, Mentionable, MessageId};

const NOT_CONFIGURED: &str =
    "This server has no starboard yet. Set one up with `/starboard configure`.";

#[poise::command(
    slash_command,
    guild_only,
    subcommands("configure", "info", "lock", "unlock", "show"),
    subcommand_required
)]
pub async fn starboard(_ctx: PoiseContext<'_>) -> Result<()> {
    Ok(())
}

/// Set the starboard channel, and optionally the vote threshold, max message age and lock.
#[poise::command(
    slash_command,
    guild_only,
    ephemeral = true,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn configure(
    ctx: PoiseContext<'_>,
    #[description = "Where starred messages get reposted"]
    #[channel_types("Text", "News")]
    channel: GuildChannel,
    #[description = "How many stars a message needs (default 5)"]
    #[min = 1]
    threshold: Option<u64>,
    #[description = "Older messages are not reposted, like '7d' or '12h' (default 7d)"]
    max_age: Option<String>,
    #[description = "Stop posting and updating reposts"] locked: Option<bool>,
) -> Result<()> {
    let guild_id = ctx.guild_id().ok_or_eyre("No guild ID?")?;

    if channel.guild_id != guild_id || !matches!(channel.kind, ChannelType::Text | ChannelType::News)
    {
        ctx.say("That channel can't be a starboard, pick a text channel from this server.")
            .await?;
        return Ok(());
    }

    let db = ctx.data().starboard.db();
    let update = ConfigUpdate {
        threshold,
        max_age,
        is_locked: locked,
    };

    let config = match update.apply(guild_id, db.config(guild_id)?, channel.id) {
        Ok(config) => config,
        Err(e) => {
            ctx.say(e.to_string()).await?;
            return Ok(());
        }
    };

    match db.save_config(&config) {
        Ok(()) => {}
        Err(StoreError::ChannelInUse { .. }) => {
            ctx.say("That channel is already another server's starboard.")
                .await?;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }

    tracing::info!(
        "{} configured the starboard of {}: {:?}",
        ctx.author().tag(),
        guild_id,
        config
    );

    ctx.say(format!("Starboard updated!\n{}", describe(&config, None)))
        .await?;

    Ok(())
}

/// Show how the starboard is set up.
#[poise::command(slash_command, guild_only, ephemeral = true)]
pub async fn info(ctx: PoiseContext<'_>) -> Result<()> {
    let guild_id = ctx.guild_id().ok_or_eyre("No guild ID?")?;
    let db = ctx.data().starboard.db();

    let Some(config) = db.config(guild_id)? else {
        ctx.say(NOT_CONFIGURED).await?;
        return Ok(());
    };

    let tracked = db.count_entries(guild_id)?;

    ctx.say(describe(&config, Some(tracked))).await?;

    Ok(())
}

/// Stop the starboard from posting or updating anything.
#[poise::command(
    slash_command,
    guild_only,
    ephemeral = true,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn lock(ctx: PoiseContext<'_>) -> Result<()> {
    set_locked(ctx, true).await
}

/// Let the starboard post and update again.
#[poise::command(
    slash_command,
    guild_only,
    ephemeral = true,
    required_permissions = "MANAGE_GUILD"
)]
pub async fn unlock(ctx: PoiseContext<'_>) -> Result<()> {
    set_locked(ctx, false).await
}

async fn set_locked(ctx: PoiseContext<'_>, is_locked: bool) -> Result<()> {
    let guild_id = ctx.guild_id().ok_or_eyre("No guild ID?")?;
    let db = ctx.data().starboard.db();

    let Some(mut config) = db.config(guild_id)? else {
        ctx.say(NOT_CONFIGURED).await?;
        return Ok(());
    };

    if config.is_locked == is_locked {
        ctx.say(if is_locked {
            "The starboard is already locked."
        } else {
            "The starboard isn't locked."
        })
        .await?;
        return Ok(());
    }

    config.is_locked = is_locked;
    db.save_config(&config)?;

    tracing::info!(
        "{} {} the starboard of {}",
        ctx.author().tag(),
        if is_locked { "locked" } else { "unlocked" },
        guild_id
    );

    ctx.say(if is_locked {
        "Starboard locked, nothing will be posted or updated."
    } else {
        "Starboard unlocked!"
    })
    .await?;

    Ok(())
}

/// Find the repost of a message (or the original of a repost).
#[poise::command(slash_command, guild_only, ephemeral = true)]
pub async fn show(
    ctx: PoiseContext<'_>,
    #[description = "The id of the message"] message_id: String,
) -> Result<()> {
    let period = ctx.data().show_cooldown().await;
    if let Err(remaining) = ctx.data().show_cooldowns.try_acquire(ctx.author().id, period) {
        ctx.say(format!(
            "Slow down! Try again in {}s.",
            remaining.as_secs() + 1
        ))
        .await?;
        return Ok(());
    }

    let Some(message_id) = parse_message_id(&message_id) else {
        ctx.say("That's not a message id.").await?;
        return Ok(());
    };

    let guild_id = ctx.guild_id().ok_or_eyre("No guild ID?")?;
    let db = ctx.data().starboard.db();

    let Some(config) = db.config(guild_id)? else {
        ctx.say(NOT_CONFIGURED).await?;
        return Ok(());
    };

    let entry = match db.entry(guild_id, message_id)? {
        Some(entry) => Some(entry),
        None => db.entry_by_repost(guild_id, message_id)?,
    };

    let Some(entry) = entry else {
        ctx.say("That message isn't on the starboard.").await?;
        return Ok(());
    };

    ctx.say_then_delete(format!(
        "{}'s message made it to the starboard {}\nOriginal: {}\nRepost: {}",
        entry.author_id.mention(),
        entry.created_at.discord_relative_timestamp(),
        message_link(guild_id, entry.channel_id, entry.message_id),
        message_link(guild_id, config.channel_id, entry.bot_message_id),
    ))
    .await?;

    Ok(())
}

fn parse_message_id(text: &str) -> Option<MessageId> {
    // Accept a full message link too, the id is the last segment.
    let id = text.trim().rsplit('/').next()?;

    id.parse::<u64>()
        .ok()
        .filter(|id| *id != 0)
        .map(MessageId::new)
}

fn describe(config: &StarboardConfig, tracked: Option<usize>) -> String {
    let mut description = format!(
        "Channel: {}\nThreshold: {}\nMax age: {}\nLocked: {}",
        config.channel_id.mention(),
        config.threshold,
        format_max_age(config.max_age),
        if config.is_locked { "yes" } else { "no" },
    );

    if let Some(tracked) = tracked {
        description.push_str(&format!("\nTracked messages: {tracked}"));
    }

    description
}
