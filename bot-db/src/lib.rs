pub mod starboard;

use bot_traits::ForwardRefToTracing;
use color_eyre::eyre::{Context, Result};
use serde::{Serialize, de::DeserializeOwned};
use sled::{Db, Tree};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("channel {channel_id} is already the starboard of guild {guild_id}")]
    ChannelInUse { channel_id: u64, guild_id: u64 },
    #[error("database error: {0}")]
    Sled(#[from] sled::Error),
    #[error("could not encode or decode a record: {0}")]
    Encoding(#[from] bincode::Error),
}

pub trait ReadWriteTree {
    fn typed_insert<K: Serialize, V: Serialize>(&self, key: &K, value: &V)
    -> Result<(), StoreError>;

    fn typed_get<K: Serialize, V: DeserializeOwned>(&self, key: &K)
    -> Result<Option<V>, StoreError>;

    fn typed_remove<K: Serialize, V: DeserializeOwned>(
        &self,
        key: &K,
    ) -> Result<Option<V>, StoreError>;

    fn typed_values<V: DeserializeOwned>(&self) -> impl Iterator<Item = V>;
}

impl ReadWriteTree for Tree {
    fn typed_insert<K: Serialize, V: Serialize>(
        &self,
        key: &K,
        value: &V,
    ) -> Result<(), StoreError> {
        let key = bincode::serialize::<K>(key)?;
        let value = bincode::serialize::<V>(value)?;
        self.insert(key, value)?;
        Ok(())
    }

    fn typed_get<K: Serialize, V: DeserializeOwned>(
        &self,
        key: &K,
    ) -> Result<Option<V>, StoreError> {
        Ok(self
            .get(bincode::serialize::<K>(key)?)?
            .map(|value| bincode::deserialize::<V>(&value))
            .transpose()?)
    }

    fn typed_remove<K: Serialize, V: DeserializeOwned>(
        &self,
        key: &K,
    ) -> Result<Option<V>, StoreError> {
        Ok(self
            .remove(bincode::serialize::<K>(key)?)?
            .map(|value| bincode::deserialize::<V>(&value))
            .transpose()?)
    }

    /// Skips (and logs) anything that fails to read or decode.
    fn typed_values<V: DeserializeOwned>(&self) -> impl Iterator<Item = V> {
        self.iter()
            .values()
            .filter_map(|value| value.trace_err_ok())
            .filter_map(|value| {
                bincode::deserialize::<V>(&value)
                    .inspect_err(|e| tracing::error!("Failed to decode value: {:?}", e))
                    .ok()
            })
    }
}

/// Handle to the bot's database. Cheap to clone.
#[derive(Debug, Clone)]
pub struct BotDb(Db);

impl BotDb {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        sled::open(path)
            .map(Self)
            .wrap_err_with(|| format!("Failed to open database at {}", path.display()))
    }

    /// An in-memory database that is thrown away on drop.
    pub fn temporary() -> Result<Self> {
        sled::Config::new()
            .temporary(true)
            .open()
            .map(Self)
            .wrap_err("Failed to open temporary database")
    }

    fn open_tree(&self, name: impl AsRef<[u8]>) -> Result<Tree> {
        self.0.open_tree(name).wrap_err("Failed to open tree")
    }

    fn generate_id(&self) -> Result<u64, StoreError> {
        Ok(self.0.generate_id()?)
    }
}
