//! Shared cache tier backed by Redis, for running several API replicas
//! against one result store.
//!
//! Results are stored as JSON under `resume-analysis:<fingerprint>` with `SET .. EX`,
//! so expiry is enforced server-side and eviction follows the server's
//! `maxmemory-policy` (configure `allkeys-lru`). Any Redis failure bubbles up as
//! a `CacheError`, which the orchestrator downgrades to a miss.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use tracing::info;

use crate::cache::{AnalysisCache, CacheError, CacheStats};
use crate::models::AnalysisResult;
use crate::pipeline::fingerprint::Fingerprint;

const KEY_PREFIX: &str = "resume-analysis:";

pub struct RedisCache {
    conn: MultiplexedConnection,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RedisCache {
    pub async fn connect(url: &str, ttl: Duration) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        info!("Redis cache connected");
        Ok(Self {
            conn,
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    fn key(fp: &Fingerprint) -> String {
        format!("{KEY_PREFIX}{fp}")
    }

    fn ttl_secs(&self) -> u64 {
        self.ttl.as_secs().max(1)
    }
}

fn encode(result: &AnalysisResult) -> Result<String, CacheError> {
    Ok(serde_json::to_string(result)?)
}

/// Inverse of `encode`; floats parse back bit-for-bit.
fn decode(json: &str) -> Result<AnalysisResult, CacheError> {
    Ok(serde_json::from_str(json)?)
}

#[async_trait]
impl AnalysisCache for RedisCache {
    async fn get(&self, fp: &Fingerprint) -> Result<Option<Arc<AnalysisResult>>, CacheError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = redis::cmd("GET")
            .arg(Self::key(fp))
            .query_async(&mut conn)
            .await?;

        match raw {
            Some(json) => {
                let result = decode(&json)?;
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(Arc::new(result)))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    async fn put(&self, fp: Fingerprint, result: Arc<AnalysisResult>) -> Result<(), CacheError> {
        let payload = encode(&result)?;
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("SET")
            .arg(Self::key(&fp))
            .arg(payload)
            .arg("EX")
            .arg(self.ttl_secs())
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn invalidate(&self, fp: &Fingerprint) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let removed: u64 = redis::cmd("DEL")
            .arg(Self::key(fp))
            .query_async(&mut conn)
            .await?;
        Ok(removed > 0)
    }

    async fn stats(&self) -> Result<CacheStats, CacheError> {
        Ok(CacheStats {
            backend: "redis",
            entries: None,
            capacity: None,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: 0,
        })
    }
}
