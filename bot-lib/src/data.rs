use crate::{
    config::Config,
    cooldown::Cooldowns,
    starboard::{SerenityGateway, StarboardEngine},
};
use bot_db::{BotDb, starboard::StarboardDb};
use color_eyre::eyre::{Error, Result, WrapErr};
use std::{path::Path, sync::Arc, time::Duration};
use tokio::sync::RwLock;

/// The global state of the bot
pub type State = Arc<RawAppState>;

pub struct RawAppState {
    pub config: Arc<RwLock<Config>>,
    /// Config file watcher that refreshes the config if it changes
    ///
    /// Attached to the AppState to keep the watcher alive
    _watcher: notify::RecommendedWatcher,
    pub starboard: StarboardEngine<SerenityGateway>,
    pub show_cooldowns: Cooldowns,
}

impl RawAppState {
    pub fn new(
        config: Config,
        config_path: impl AsRef<Path>,
        gateway: SerenityGateway,
    ) -> Result<RawAppState> {
        let db = BotDb::open(&config.db_path)?;
        let starboard = StarboardEngine::new(StarboardDb::new(&db)?, gateway);

        let config = Arc::new(RwLock::new(config));
        let watcher = watch_config(Arc::clone(&config), config_path.as_ref())?;

        Ok(RawAppState {
            config,
            _watcher: watcher,
            starboard,
            show_cooldowns: Cooldowns::default(),
        })
    }

    pub async fn star_emoji(&self) -> String {
        self.config.read().await.star_emoji.clone()
    }

    pub async fn show_cooldown(&self) -> Duration {
        self.config.read().await.show_cooldown
    }
}

fn watch_config(
    config: Arc<RwLock<Config>>,
    config_path: &Path,
) -> Result<notify::RecommendedWatcher> {
    use notify::{
        Event, EventKind, RecursiveMode, Watcher,
        event::{AccessKind, AccessMode},
    };

    let reload_config_path: Box<Path> = config_path.into();

    let mut watcher = notify::recommended_watcher(move |res| match res {
        Ok(Event {
            kind: EventKind::Access(AccessKind::Close(AccessMode::Write)),
            ..
        }) => {
            tracing::info!("config changed, reloading...");

            config.blocking_write().reload(&reload_config_path);
        }
        Err(e) => tracing::error!("watch error: {:?}", e),
        _ => {}
    })
    .wrap_err("Failed to create file watcher")?;

    watcher
        .watch(config_path, RecursiveMode::NonRecursive)
        .wrap_err("Failed to watch config file")?;

    Ok(watcher)
}

// User data, which is stored and accessible in all command invocations
pub type PoiseContext<'a> = poise::Context<'a, State, Error>;
