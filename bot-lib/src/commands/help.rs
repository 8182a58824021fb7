use crate::data::PoiseContext;
use color_eyre::eyre::Result;

const DEFAULT_HELP_TEXT: &str = "\
React to a message with the star emoji. Once enough people do, it gets reposted to the starboard.
`/starboard info` shows how this server's starboard is set up.
`/starboard show` finds the repost of a message.
Moderators can use `/starboard configure`, `/starboard lock` and `/starboard unlock`.";

#[poise::command(slash_command, prefix_command)]
pub async fn help(ctx: PoiseContext<'_>) -> Result<()> {
    let help_text = ctx.data().config.read().await.help_text.clone();

    match help_text {
        Some(help_text) => {
            ctx.say(&*help_text).await?;
        }
        None => {
            ctx.say(DEFAULT_HELP_TEXT).await?;
        }
    }

    Ok(())
}
