//! Typed client facade

use crate::codec::{Codec, JsonCodec};
use crate::config::BrineConfig;
use crate::engine::KvEngine;
use crate::error::KvResult;
use crate::manager::LifecycleState;
use std::collections::HashMap;
use std::marker::PhantomData;

/// A key-value store of `T` values over SQLite, PostgreSQL or MySQL.
///
/// Values pass through the codec `C` on the way in and out; the table only
/// ever sees strings. Every operation except [`init`](Self::init) and
/// [`close`](Self::close) fails with `NotInitialized` unless `init`
/// succeeded and `close` was not called yet.
pub struct Brine<T, C = JsonCodec> {
    engine: KvEngine,
    codec: C,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Brine<T, JsonCodec> {
    /// Store backed by `uri`, JSON-encoding values
    pub fn new(uri: impl Into<String>) -> Self {
        Self::with_config(uri, JsonCodec, &BrineConfig::default())
    }
}

impl<T, C> Brine<T, C> {
    pub fn with_codec(uri: impl Into<String>, codec: C) -> Self {
        Self::with_config(uri, codec, &BrineConfig::default())
    }

    pub fn with_config(uri: impl Into<String>, codec: C, config: &BrineConfig) -> Self {
        Self {
            engine: KvEngine::new(uri, config),
            codec,
            _marker: PhantomData,
        }
    }

    pub fn engine(&self) -> &KvEngine {
        &self.engine
    }

    pub fn state(&self) -> LifecycleState {
        self.engine.state()
    }

    /// Connect and create the table if needed
    pub async fn init(&self) -> KvResult<()> {
        self.engine.init().await
    }

    /// Release the connection; the store cannot be reopened
    pub async fn close(&self) -> KvResult<()> {
        self.engine.close().await
    }

    pub async fn delete(&self, key: &str) -> KvResult<()> {
        self.engine.delete(key).await
    }

    pub async fn delete_many(&self, keys: &[String]) -> KvResult<()> {
        self.engine.delete_many(keys).await
    }

    pub async fn count(&self) -> KvResult<u64> {
        self.engine.count().await
    }

    /// Existence check; the stored value is not decoded
    pub async fn has(&self, key: &str) -> KvResult<bool> {
        self.engine.has(key).await
    }

    /// All keys, in backend order
    pub async fn keys(&self) -> KvResult<Vec<String>> {
        self.engine.keys().await
    }

    pub async fn clear(&self) -> KvResult<()> {
        self.engine.clear().await
    }
}

impl<T, C> Brine<T, C>
where
    T: Send + Sync,
    C: Codec<T>,
{
    pub async fn get(&self, key: &str) -> KvResult<Option<T>> {
        match self.engine.get(key).await? {
            Some(raw) => Ok(Some(self.codec.deserialize(&raw).await?)),
            None => Ok(None),
        }
    }

    /// Insert or overwrite `key`; returns the value written
    pub async fn set(&self, key: &str, value: T) -> KvResult<T> {
        self.engine.ensure_ready()?;

        let raw = self.codec.serialize(&value).await?;
        self.engine.set(key, raw).await?;
        Ok(value)
    }

    /// Write every pair atomically. A later pair for the same key wins.
    pub async fn set_many(&self, pairs: Vec<(String, T)>) -> KvResult<()> {
        self.engine.ensure_ready()?;

        let mut encoded = Vec::with_capacity(pairs.len());
        for (key, value) in &pairs {
            encoded.push((key.clone(), self.codec.serialize(value).await?));
        }

        self.engine.set_many(encoded).await
    }

    pub async fn get_many(&self, keys: &[String]) -> KvResult<HashMap<String, Option<T>>> {
        let found = self.engine.get_many(keys).await?;

        let mut decoded = HashMap::with_capacity(found.len());
        for (key, raw) in found {
            let value = match raw {
                Some(raw) => Some(self.codec.deserialize(&raw).await?),
                None => None,
            };
            decoded.insert(key, value);
        }

        Ok(decoded)
    }

    /// All values, in backend order
    pub async fn values(&self) -> KvResult<Vec<T>> {
        let raw = self.engine.values().await?;

        let mut decoded = Vec::with_capacity(raw.len());
        for raw in raw {
            decoded.push(self.codec.deserialize(&raw).await?);
        }

        Ok(decoded)
    }

    /// Return the stored value for `key`, writing `value` first if there is none.
    ///
    /// Not atomic: the read and the write are separate operations, so a
    /// concurrent writer can set `key` in between and be overwritten.
    pub async fn ensure(&self, key: &str, value: T) -> KvResult<T> {
        if let Some(existing) = self.get(key).await? {
            return Ok(existing);
        }

        tracing::debug!(key, "ensure: key absent, writing");
        self.set(key, value).await
    }
}
