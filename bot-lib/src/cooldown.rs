use ahash::AHashMap;
use parking_lot::Mutex;
use poise::serenity_prelude::UserId;
use std::time::{Duration, Instant};

/// Per user cooldown, owned by whoever needs it rather than living in a static.
///
/// The period is passed on every call so it can follow a reloaded config.
#[derive(Debug, Default)]
pub struct Cooldowns {
    last_used: Mutex<AHashMap<UserId, Instant>>,
}

impl Cooldowns {
    /// Marks the user as having used the command, or returns how long they still have to wait.
    pub fn try_acquire(&self, user_id: UserId, period: Duration) -> Result<(), Duration> {
        self.try_acquire_at(user_id, period, Instant::now())
    }

    fn try_acquire_at(
        &self,
        user_id: UserId,
        period: Duration,
        now: Instant,
    ) -> Result<(), Duration> {
        let mut last_used = self.last_used.lock();

        if let Some(last) = last_used.get(&user_id) {
            let elapsed = now.saturating_duration_since(*last);

            if elapsed < period {
                return Err(period - elapsed);
            }
        }

        last_used.insert(user_id, now);

        // Keep the map from growing forever.
        last_used.retain(|_, last| now.saturating_duration_since(*last) < period);

        Ok(())
    }
}
