use crate::data::PoiseContext;
use color_eyre::eyre::Result;
use poise::builtins::register_application_commands_buttons;

/// Buttons to (un)register the slash commands, for when the automatic registration is not enough.
#[poise::command(prefix_command, owners_only, hide_in_help)]
pub async fn register(ctx: PoiseContext<'_>) -> Result<()> {
    register_application_commands_buttons(ctx).await?;
    Ok(())
}
