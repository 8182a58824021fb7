use color_eyre::eyre::Result;
use data::PoiseContext;
use poise::serenity_prelude::{Cache, CacheHttp, Http};
use std::sync::Arc;

pub mod commands;
pub mod config;
pub mod cooldown;
pub mod data;
pub mod event_handler;
mod handle_starboards;
pub mod starboard;
mod utils;

trait SayThenDelete {
    async fn say_then_delete(self, message: impl Into<String>) -> Result<()>;
}

impl<'a> SayThenDelete for PoiseContext<'a> {
    async fn say_then_delete(self, message: impl Into<String>) -> Result<()> {
        let message = self.say(message).await?;

        tokio::time::sleep(std::time::Duration::from_secs(15)).await;
        message.delete(self).await.ok();

        Ok(())
    }
}

/// An owned `CacheHttp`, so the starboard can outlive the event that created it.
pub struct CloneableCtx(Arc<Cache>, Arc<Http>);

impl From<&poise::serenity_prelude::Context> for CloneableCtx {
    fn from(ctx: &poise::serenity_prelude::Context) -> Self {
        Self(Arc::clone(&ctx.cache), Arc::clone(&ctx.http))
    }
}

impl CacheHttp for CloneableCtx {
    fn http(&self) -> &Http {
        &self.1
    }

    fn cache(&self) -> Option<&Arc<Cache>> {
        Some(&self.0)
    }
}

impl Clone for CloneableCtx {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0), Arc::clone(&self.1))
    }
}
