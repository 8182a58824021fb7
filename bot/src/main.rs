use bot_lib::{
    commands::all_commands,
    config,
    data::{RawAppState, State},
    event_handler::event_handler,
    starboard::SerenityGateway,
};
use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use dotenvy::dotenv;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing_subscriber::util::SubscriberInitExt;

/// The cli arguments for the bot
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Don't start the discord bot
    #[arg(short, long, default_value = "false")]
    pub dry_run: bool,

    /// Path to the config file
    #[arg(short, long, default_value_t = String::from("config.toml"))]
    pub config: String,
}

async fn on_error(error: poise::FrameworkError<'_, State, color_eyre::eyre::Error>) {
    match error {
        poise::FrameworkError::Command { ctx, error, .. } => {
            tracing::error!("Command `{}` failed: {:?}", ctx.command().name, error);
        }
        poise::FrameworkError::EventHandler { error, event, .. } => {
            tracing::error!("Event handler failed on {}: {:?}", event.snake_case_name(), error);
        }
        error => {
            tracing::warn!("{error}");

            if let Err(e) = poise::builtins::on_error(error).await {
                tracing::error!("Failed to report framework error: {:?}", e);
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenv() {
        eprintln!("No .env file loaded ({e}), reading DISCORD_TOKEN from the environment");
    }
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .compact()
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .finish()
        .init();

    let Args {
        dry_run,
        config: config_path,
    } = Args::parse();
    let token =
        std::env::var("DISCORD_TOKEN").wrap_err("Expected a discord token environment variable")?;
    let config =
        config::Config::create_from_file(&config_path).wrap_err("Failed to load config")?;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: all_commands(),
            event_handler: |ctx, event, _framework, data| {
                Box::pin(event_handler(ctx, event, Arc::clone(data)))
            },
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(|ctx, ready, framework| {
            Box::pin(async move {
                match config.guild_id {
                    Some(guild_id) => {
                        poise::builtins::register_in_guild(
                            ctx,
                            &framework.options().commands,
                            serenity::GuildId::new(guild_id),
                        )
                        .await?
                    }
                    None => {
                        poise::builtins::register_globally(ctx, &framework.options().commands)
                            .await?
                    }
                }

                tracing::info!("Logged in as {}", ready.user.name);

                let gateway = SerenityGateway::new(ctx, ready.user.id);

                Ok(Arc::new(RawAppState::new(config, &config_path, gateway)?))
            })
        });

    let client = serenity::ClientBuilder::new(
        token,
        serenity::GatewayIntents::non_privileged()
            | serenity::GatewayIntents::MESSAGE_CONTENT
            | serenity::GatewayIntents::GUILD_MESSAGE_REACTIONS
            | serenity::GatewayIntents::GUILD_MESSAGES,
    )
    .framework(framework.build())
    .await;

    if dry_run {
        println!("Bot setup worked, dry run enabled, exiting");
        return Ok(());
    }

    tracing::info!("Starting bot");

    client
        .wrap_err("Failed to start bot (serenity)")?
        .start()
        .await
        .wrap_err("Failed to start bot (startup)")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn framework_accepts_error_handler() {
        let options: poise::FrameworkOptions<State, color_eyre::eyre::Error> =
            poise::FrameworkOptions {
                commands: all_commands(),
                on_error: |error| Box::pin(on_error(error)),
                ..Default::default()
            };

        assert!(options.commands.iter().any(|command| command.name == "starboard"));
    }
}
