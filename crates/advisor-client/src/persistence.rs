//! Key-value persistence for UI preferences (the cookie/local-storage seam).

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{info, warn};

use advisor_common::redis::RedisCache;

/// String key-value store. Writes report success but callers may ignore it.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;

    async fn set(&self, key: &str, value: &str) -> bool;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: Mutex::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl PreferenceStore for MemoryStore {
    async fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    async fn set(&self, key: &str, value: &str) -> bool {
        match self.entries.lock() {
            Ok(mut entries) => {
                entries.insert(key.to_string(), value.to_string());
                true
            }
            Err(_) => false,
        }
    }
}

/// About one year, matching a long-lived preference cookie.
const PREFERENCE_TTL_SECS: u64 = 365 * 24 * 3600;

/// Redis-backed store, one key namespace per browser session.
///
/// Key schema: `advisor:ui:{session}:{key}`.
#[derive(Clone)]
pub struct RedisStore {
    redis: RedisCache,
    session: String,
    ttl_secs: u64,
}

impl RedisStore {
    pub fn new(redis: RedisCache, session: impl Into<String>) -> Self {
        Self {
            redis,
            session: session.into(),
            ttl_secs: PREFERENCE_TTL_SECS,
        }
    }

    /// Connect using `REDIS_URL`. Without it, or when the server does not answer
    /// PING, the store still works but persists nothing.
    pub async fn from_env(session: impl Into<String>) -> Self {
        let url = std::env::var("REDIS_URL").ok();
        Self::connect(url.as_deref(), session).await
    }

    pub async fn connect(url: Option<&str>, session: impl Into<String>) -> Self {
        let redis = RedisCache::new(url);
        if redis.is_available().await {
            info!("preference store connected to redis");
        } else if url.is_some() {
            warn!("redis unreachable, preferences will not persist");
        } else {
            info!("REDIS_URL not set, preferences will not persist");
        }
        Self::new(redis, session)
    }

    pub fn with_ttl_secs(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    fn key(&self, key: &str) -> String {
        format!("advisor:ui:{}:{key}", self.session)
    }
}

#[async_trait]
impl PreferenceStore for RedisStore {
    async fn get(&self, key: &str) -> Option<String> {
        self.redis.get(&self.key(key)).await
    }

    async fn set(&self, key: &str, value: &str) -> bool {
        self.redis
            .set_with_ttl(&self.key(key), value, self.ttl_secs)
            .await
    }
}
