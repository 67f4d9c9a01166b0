use std::num::NonZeroUsize;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::pipeline::aggregator::AggregationWeights;
use crate::pipeline::ranker::DEFAULT_BUCKET_LIMIT;

/// Application configuration loaded from environment variables.
/// Every variable has a default; invalid values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// When set, results are cached in Redis instead of in process.
    pub redis_url: Option<String>,
    pub cache_capacity: NonZeroUsize,
    pub cache_ttl: Duration,
    /// Upper bound for any single analyzer.
    pub analyzer_deadline: Duration,
    /// Overall deadline when a request does not supply one.
    pub analysis_deadline: Duration,
    pub weights: AggregationWeights,
    pub suggestion_bucket_limit: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup, so parsing is testable without
    /// touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AggregationWeights::default();
        let weights = AggregationWeights::new(
            parse_or(&lookup, "WEIGHT_STRUCTURE", defaults.structure)?,
            parse_or(&lookup, "WEIGHT_ATS", defaults.ats)?,
            parse_or(&lookup, "WEIGHT_CONTENT", defaults.content)?,
        )
        .context("WEIGHT_STRUCTURE / WEIGHT_ATS / WEIGHT_CONTENT are invalid")?;

        let cache_capacity = NonZeroUsize::new(parse_or(&lookup, "CACHE_CAPACITY", 1024usize)?)
            .context("CACHE_CAPACITY must be at least 1")?;

        let analyzer_deadline_ms: u64 = parse_or(&lookup, "ANALYZER_DEADLINE_MS", 2000)?;
        let analysis_deadline_ms: u64 = parse_or(&lookup, "ANALYSIS_DEADLINE_MS", 5000)?;
        if analyzer_deadline_ms == 0 || analysis_deadline_ms == 0 {
            anyhow::bail!("ANALYZER_DEADLINE_MS and ANALYSIS_DEADLINE_MS must be positive");
        }

        Ok(Config {
            port: parse_or(&lookup, "PORT", 8080u16).context("PORT must be a valid port number")?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            redis_url: lookup("REDIS_URL").filter(|url| !url.trim().is_empty()),
            cache_capacity,
            cache_ttl: Duration::from_secs(parse_or(&lookup, "CACHE_TTL_SECS", 3600)?),
            analyzer_deadline: Duration::from_millis(analyzer_deadline_ms),
            analysis_deadline: Duration::from_millis(analysis_deadline_ms),
            weights,
            suggestion_bucket_limit: parse_or(&lookup, "SUGGESTION_BUCKET_LIMIT", DEFAULT_BUCKET_LIMIT)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.cache_capacity.get(), 1024);
        assert_eq!(cfg.cache_ttl, Duration::from_secs(3600));
        assert_eq!(cfg.analyzer_deadline, Duration::from_millis(2000));
        assert_eq!(cfg.analysis_deadline, Duration::from_millis(5000));
        assert_eq!(cfg.weights, AggregationWeights::default());
        assert_eq!(cfg.suggestion_bucket_limit, 5);
        assert!(cfg.redis_url.is_none());
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("PORT", "9000"),
            ("CACHE_CAPACITY", "8"),
            ("WEIGHT_STRUCTURE", "0.2"),
            ("WEIGHT_ATS", "0.5"),
            ("WEIGHT_CONTENT", "0.3"),
            ("REDIS_URL", "redis://localhost:6379"),
        ])
        .unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.cache_capacity.get(), 8);
        assert_eq!(cfg.weights.ats, 0.5);
        assert_eq!(cfg.redis_url.as_deref(), Some("redis://localhost:6379"));
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let err = config(&[("WEIGHT_ATS", "0.9")]).unwrap_err();
        assert!(format!("{err:#}").contains("sum to 1.0"));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(config(&[("CACHE_CAPACITY", "0")]).is_err());
    }

    #[test]
    fn test_garbage_value_names_the_variable() {
        let err = config(&[("CACHE_TTL_SECS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("CACHE_TTL_SECS"));
    }

    #[test]
    fn test_blank_redis_url_is_unset() {
        assert!(config(&[("REDIS_URL", "  ")]).unwrap().redis_url.is_none());
    }
}
