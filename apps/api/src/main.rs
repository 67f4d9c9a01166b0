mod analyzers;
mod cache;
mod config;
mod errors;
mod models;
mod pipeline;
mod routes;
mod state;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::analyzers::default_analyzers;
use crate::cache::{AnalysisCache, InMemoryCache, RedisCache};
use crate::config::Config;
use crate::pipeline::aggregator::ScoreAggregator;
use crate::pipeline::orchestrator::Orchestrator;
use crate::pipeline::ranker::SuggestionRanker;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on invalid values)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting resume analysis API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize result cache (Redis when configured, in-memory otherwise)
    let cache = build_cache(&config).await;

    // Initialize orchestrator with the built-in analyzers
    let orchestrator = Orchestrator::new(
        default_analyzers(),
        cache,
        ScoreAggregator::new(config.weights),
        SuggestionRanker::new(config.suggestion_bucket_limit),
        config.analyzer_deadline,
    );
    info!(
        "Orchestrator ready: weights {:?}, analyzer deadline {:?}",
        config.weights, config.analyzer_deadline
    );

    // Build app state
    let state = AppState {
        config: config.clone(),
        orchestrator: Arc::new(orchestrator),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Redis if `REDIS_URL` is set and reachable; otherwise the in-process LRU.
async fn build_cache(config: &Config) -> Arc<dyn AnalysisCache> {
    if let Some(url) = &config.redis_url {
        match RedisCache::connect(url, config.cache_ttl).await {
            Ok(redis) => return Arc::new(redis),
            Err(e) => warn!("Redis unavailable ({e}); falling back to in-memory cache"),
        }
    }

    info!(
        "In-memory cache: capacity {}, ttl {:?}",
        config.cache_capacity, config.cache_ttl
    );
    Arc::new(InMemoryCache::new(config.cache_capacity, config.cache_ttl))
}
