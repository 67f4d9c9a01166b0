//! Analyzers — independent scorers run concurrently over the same extracted content.
//!
//! Each implements the `Analyzer` trait; the orchestrator only ever sees the
//! `PartialResult` produced by `Dispatched::settle_by`, which enforces the
//! deadline and turns errors and panics into failure variants.
//!
//! Built-in analyzers are CPU-bound heuristics and run inside
//! `tokio::task::spawn_blocking` via `run_blocking`.

pub mod compatibility;
pub mod lexicon;
pub mod quality;
pub mod structure;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;

use crate::models::{AnalyzerKind, AnalyzerReport, ExtractedContent, FailureReason, PartialResult};

pub use compatibility::CompatibilityAnalyzer;
pub use quality::QualityAnalyzer;
pub use structure::StructureAnalyzer;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("analyzer panicked")]
    Panicked,

    #[error("internal error: {0}")]
    Internal(String),
}

impl AnalyzerError {
    pub fn reason(&self) -> FailureReason {
        match self {
            AnalyzerError::InvalidInput(_) => FailureReason::InvalidInput,
            AnalyzerError::Panicked => FailureReason::Panicked,
            AnalyzerError::Internal(_) => FailureReason::Internal,
        }
    }
}

/// The analyzer capability. Implementations must be stateless across calls:
/// any memoization belongs in the result cache, never inside an analyzer.
#[async_trait]
pub trait Analyzer: Send + Sync {
    fn kind(&self) -> AnalyzerKind;

    async fn analyze(&self, content: Arc<ExtractedContent>) -> Result<AnalyzerReport, AnalyzerError>;
}

/// The three built-in analyzers, one per kind.
pub fn default_analyzers() -> Vec<Arc<dyn Analyzer>> {
    vec![
        Arc::new(StructureAnalyzer),
        Arc::new(CompatibilityAnalyzer),
        Arc::new(QualityAnalyzer),
    ]
}

/// Runs a synchronous evaluation on the blocking pool, mapping a panic to
/// `AnalyzerError::Panicked`.
pub(crate) async fn run_blocking<F>(evaluate: F) -> Result<AnalyzerReport, AnalyzerError>
where
    F: FnOnce() -> Result<AnalyzerReport, AnalyzerError> + Send + 'static,
{
    match tokio::task::spawn_blocking(evaluate).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(AnalyzerError::Panicked),
        Err(e) => Err(AnalyzerError::Internal(e.to_string())),
    }
}

/// An analyzer invocation running as its own task.
pub struct Dispatched {
    kind: AnalyzerKind,
    handle: JoinHandle<Result<AnalyzerReport, AnalyzerError>>,
}

/// Starts `analyzer` on a new task. Returns immediately.
pub fn dispatch(analyzer: &Arc<dyn Analyzer>, content: &Arc<ExtractedContent>) -> Dispatched {
    let kind = analyzer.kind();
    let analyzer = Arc::clone(analyzer);
    let content = Arc::clone(content);
    let handle = tokio::spawn(async move { analyzer.analyze(content).await });
    Dispatched { kind, handle }
}

impl Dispatched {
    /// Waits until the task finishes or `cutoff` passes. A task still running at
    /// the cutoff is aborted (best effort: blocking work already on the pool runs
    /// to completion) and reported as a timeout.
    pub async fn settle_by(mut self, cutoff: Instant) -> PartialResult {
        match tokio::time::timeout_at(cutoff, &mut self.handle).await {
            Ok(joined) => settle(self.kind, joined),
            Err(_) => {
                self.handle.abort();
                PartialResult::failure(
                    self.kind,
                    FailureReason::Timeout,
                    format!("{} analyzer did not finish before the deadline", self.kind),
                )
            }
        }
    }
}

fn settle(
    kind: AnalyzerKind,
    joined: Result<Result<AnalyzerReport, AnalyzerError>, JoinError>,
) -> PartialResult {
    match joined {
        Ok(Ok(report)) => PartialResult::success(kind, report),
        Ok(Err(e)) => PartialResult::failure(kind, e.reason(), e.to_string()),
        Err(e) if e.is_panic() => {
            PartialResult::failure(kind, FailureReason::Panicked, format!("{kind} analyzer panicked"))
        }
        Err(e) => PartialResult::failure(kind, FailureReason::Cancelled, e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct Fixed(f64);

    #[async_trait]
    impl Analyzer for Fixed {
        fn kind(&self) -> AnalyzerKind {
            AnalyzerKind::Content
        }

        async fn analyze(&self, _content: Arc<ExtractedContent>) -> Result<AnalyzerReport, AnalyzerError> {
            Ok(AnalyzerReport::new(self.0, 1.0))
        }
    }

    struct Hangs;

    #[async_trait]
    impl Analyzer for Hangs {
        fn kind(&self) -> AnalyzerKind {
            AnalyzerKind::Ats
        }

        async fn analyze(&self, _content: Arc<ExtractedContent>) -> Result<AnalyzerReport, AnalyzerError> {
            std::future::pending().await
        }
    }

    struct Rejects;

    #[async_trait]
    impl Analyzer for Rejects {
        fn kind(&self) -> AnalyzerKind {
            AnalyzerKind::Structure
        }

        async fn analyze(&self, _content: Arc<ExtractedContent>) -> Result<AnalyzerReport, AnalyzerError> {
            Err(AnalyzerError::InvalidInput("no blocks".to_string()))
        }
    }

    struct BlockingPanic;

    #[async_trait]
    impl Analyzer for BlockingPanic {
        fn kind(&self) -> AnalyzerKind {
            AnalyzerKind::Structure
        }

        async fn analyze(&self, _content: Arc<ExtractedContent>) -> Result<AnalyzerReport, AnalyzerError> {
            run_blocking(|| panic!("heuristic blew up")).await
        }
    }

    fn content() -> Arc<ExtractedContent> {
        Arc::new(ExtractedContent::default())
    }

    async fn run_with_deadline(
        analyzer: &Arc<dyn Analyzer>,
        content: &Arc<ExtractedContent>,
        deadline: Duration,
    ) -> PartialResult {
        dispatch(analyzer, content).settle_by(Instant::now() + deadline).await
    }

    #[tokio::test]
    async fn test_success_is_wrapped() {
        let analyzer: Arc<dyn Analyzer> = Arc::new(Fixed(70.0));
        let partial = run_with_deadline(&analyzer, &content(), Duration::from_secs(1)).await;
        assert_eq!(partial.kind(), AnalyzerKind::Content);
        assert_eq!(partial.report().unwrap().score, 70.0);
    }

    #[tokio::test]
    async fn test_deadline_turns_into_timeout_failure() {
        let analyzer: Arc<dyn Analyzer> = Arc::new(Hangs);
        let started = std::time::Instant::now();
        let partial = run_with_deadline(&analyzer, &content(), Duration::from_millis(50)).await;

        assert!(started.elapsed() < Duration::from_secs(1));
        match partial {
            PartialResult::Failure { kind, reason, .. } => {
                assert_eq!(kind, AnalyzerKind::Ats);
                assert_eq!(reason, FailureReason::Timeout);
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_error_maps_to_reason_code() {
        let analyzer: Arc<dyn Analyzer> = Arc::new(Rejects);
        let partial = run_with_deadline(&analyzer, &content(), Duration::from_secs(1)).await;
        assert!(matches!(
            partial,
            PartialResult::Failure {
                reason: FailureReason::InvalidInput,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_blocking_panic_is_contained() {
        let analyzer: Arc<dyn Analyzer> = Arc::new(BlockingPanic);
        let partial = run_with_deadline(&analyzer, &content(), Duration::from_secs(1)).await;
        assert!(matches!(
            partial,
            PartialResult::Failure {
                reason: FailureReason::Panicked,
                ..
            }
        ));
    }

    #[test]
    fn test_default_analyzers_cover_every_kind_once() {
        let mut kinds: Vec<_> = default_analyzers().iter().map(|a| a.kind()).collect();
        kinds.sort();
        assert_eq!(kinds, AnalyzerKind::ALL.to_vec());
    }
}
