//! Registry of in-flight job ids.
//!
//! A job id is registered for as long as its workspace may exist. The stale
//! workspace sweep removes every directory whose name is not registered, so
//! the registry has to be shared by every process that uses the same base
//! directory: the in-memory backend covers a single process, the Redis
//! backend covers several.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use thiserror::Error;
use tracing::{debug, info};

use muzhack_models::JobId;

use crate::config::{RegistryBackend, WorkerConfig};

/// Default TTL for registered job keys (24 hours).
/// A crashed worker's registrations expire after this long.
const DEFAULT_KEY_TTL_SECS: u64 = 24 * 60 * 60;

const KEY_PREFIX: &str = "muzhack:job:";

pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Set of job ids currently being processed.
#[async_trait]
pub trait JobRegistry: Send + Sync {
    /// Register `id`. Returns `false` if it was already registered.
    async fn try_register(&self, id: &JobId) -> RegistryResult<bool>;

    /// Remove `id`. Unknown ids are ignored.
    async fn unregister(&self, id: &JobId) -> RegistryResult<()>;

    /// Snapshot of the registered ids.
    async fn registered(&self) -> RegistryResult<HashSet<String>>;
}

/// Registry held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryJobRegistry {
    ids: Mutex<HashSet<String>>,
}

impl InMemoryJobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        // The set stays consistent even if a holder panicked.
        self.ids.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl JobRegistry for InMemoryJobRegistry {
    async fn try_register(&self, id: &JobId) -> RegistryResult<bool> {
        Ok(self.lock().insert(id.as_str().to_string()))
    }

    async fn unregister(&self, id: &JobId) -> RegistryResult<()> {
        self.lock().remove(id.as_str());
        Ok(())
    }

    async fn registered(&self) -> RegistryResult<HashSet<String>> {
        Ok(self.lock().clone())
    }
}

/// Registry shared through Redis, one expiring key per job.
pub struct RedisJobRegistry {
    client: redis::Client,
    key_ttl: Duration,
}

impl RedisJobRegistry {
    pub fn new(redis_url: &str) -> RegistryResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client,
            key_ttl: Duration::from_secs(DEFAULT_KEY_TTL_SECS),
        })
    }

    /// Create with custom TTL for testing.
    pub fn with_ttl(redis_url: &str, ttl: Duration) -> RegistryResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client, key_ttl: ttl })
    }

    fn job_key(id: &JobId) -> String {
        format!("{}{}", KEY_PREFIX, id)
    }
}

#[async_trait]
impl JobRegistry for RedisJobRegistry {
    async fn try_register(&self, id: &JobId) -> RegistryResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let key = Self::job_key(id);

        // SET NX returns nil when the key already exists
        let reply: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(1)
            .arg("NX")
            .arg("EX")
            .arg(self.key_ttl.as_secs())
            .query_async(&mut conn)
            .await?;

        debug!(job_id = %id, registered = reply.is_some(), "Registering job");
        Ok(reply.is_some())
    }

    async fn unregister(&self, id: &JobId) -> RegistryResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = conn.del(Self::job_key(id)).await?;
        debug!(job_id = %id, "Unregistered job");
        Ok(())
    }

    async fn registered(&self) -> RegistryResult<HashSet<String>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let pattern = format!("{}*", KEY_PREFIX);

        let mut ids = HashSet::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;

            ids.extend(
                keys.iter()
                    .filter_map(|key| key.strip_prefix(KEY_PREFIX))
                    .map(str::to_string),
            );

            if next == 0 {
                break;
            }
            cursor = next;
        }

        Ok(ids)
    }
}

/// Build the registry selected by the configuration.
pub fn build_registry(config: &WorkerConfig) -> RegistryResult<Arc<dyn JobRegistry>> {
    match &config.registry {
        RegistryBackend::Memory => {
            info!("Using in-memory job registry");
            Ok(Arc::new(InMemoryJobRegistry::new()))
        }
        RegistryBackend::Redis { url } => {
            info!("Using Redis job registry");
            Ok(Arc::new(RedisJobRegistry::new(url)?))
        }
    }
}
