//! Result cache — the only place an `AnalysisResult` outlives a single request.
//!
//! The orchestrator holds an `Arc<dyn AnalysisCache>` so backends can be
//! swapped as a unit: the in-memory LRU by default, Redis when `REDIS_URL` is
//! configured, or a stub in tests. Every backend error is a `CacheError`; the
//! orchestrator treats it as a miss and keeps going.

pub mod memory;
pub mod redis_store;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::models::AnalysisResult;
use crate::pipeline::fingerprint::Fingerprint;

pub use memory::InMemoryCache;
pub use redis_store::RedisCache;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache lock poisoned")]
    Poisoned,

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CacheStats {
    pub backend: &'static str,
    /// `None` when the backend cannot report it cheaply.
    pub entries: Option<usize>,
    pub capacity: Option<usize>,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

#[async_trait]
pub trait AnalysisCache: Send + Sync {
    /// A live entry, or `Ok(None)` on a miss. Expired entries are misses.
    async fn get(&self, fp: &Fingerprint) -> Result<Option<Arc<AnalysisResult>>, CacheError>;

    /// Insert or overwrite.
    async fn put(&self, fp: Fingerprint, result: Arc<AnalysisResult>) -> Result<(), CacheError>;

    /// Returns whether an entry was removed.
    async fn invalidate(&self, fp: &Fingerprint) -> Result<bool, CacheError>;

    async fn stats(&self) -> Result<CacheStats, CacheError>;
}
