//! Orchestrator — drives one analysis run through the pipeline state machine.
//!
//!   Idle → CacheCheck → Dispatching → Collecting → Aggregating → Done
//!                         └──────────────┴──→ Errored   (zero successes)
//!   CacheCheck → Done on a hit
//!
//! Flow per run:
//! 1. fingerprint the content and query the cache (errors count as a miss)
//! 2. spawn every analyzer on the shared `Arc<ExtractedContent>`
//! 3. collect results until each analyzer's cutoff; late ones become timeouts
//! 4. aggregate + rank over whatever succeeded
//! 5. write through to the cache when at least one analyzer succeeded

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::analyzers::{self, Analyzer};
use crate::cache::{AnalysisCache, CacheError, CacheStats};
use crate::models::{
    AnalysisResult, AnalyzerKind, AnalyzerSummary, ExtractedContent, FailureReason, FinalScore,
    PartialResult,
};
use crate::pipeline::aggregator::ScoreAggregator;
use crate::pipeline::fingerprint::{fingerprint, Fingerprint};
use crate::pipeline::ranker::SuggestionRanker;

// ────────────────────────────────────────────────────────────────────────────
// State machine
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    CacheCheck,
    Dispatching,
    Collecting,
    Aggregating,
    Done,
    Errored,
}

impl PipelineState {
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;
        matches!(
            (self, next),
            (Idle, CacheCheck)
                | (CacheCheck, Done)
                | (CacheCheck, Dispatching)
                | (Dispatching, Collecting)
                | (Dispatching, Errored)
                | (Collecting, Aggregating)
                | (Collecting, Errored)
                | (Aggregating, Done)
        )
    }
}

/// Per-run bookkeeping: current state plus the ordered trail of states visited.
struct Run {
    id: Uuid,
    state: PipelineState,
    trail: Vec<PipelineState>,
}

impl Run {
    fn start() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: PipelineState::Idle,
            trail: vec![PipelineState::Idle],
        }
    }

    fn advance(&mut self, next: PipelineState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!("run {}: {:?} -> {:?}", self.id, self.state, next);
        self.state = next;
        self.trail.push(next);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Outcome
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub run_id: Uuid,
    pub result: Arc<AnalysisResult>,
    pub from_cache: bool,
    /// Terminal state: `Done` or `Errored`.
    pub state: PipelineState,
    pub trail: Vec<PipelineState>,
}

// ────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ────────────────────────────────────────────────────────────────────────────

pub struct Orchestrator {
    analyzers: Vec<Arc<dyn Analyzer>>,
    cache: Arc<dyn AnalysisCache>,
    aggregator: ScoreAggregator,
    ranker: SuggestionRanker,
    analyzer_deadline: Duration,
}

impl Orchestrator {
    pub fn new(
        analyzers: Vec<Arc<dyn Analyzer>>,
        cache: Arc<dyn AnalysisCache>,
        aggregator: ScoreAggregator,
        ranker: SuggestionRanker,
        analyzer_deadline: Duration,
    ) -> Self {
        Self {
            analyzers,
            cache,
            aggregator,
            ranker,
            analyzer_deadline,
        }
    }

    pub async fn cache_stats(&self) -> Result<CacheStats, CacheError> {
        self.cache.stats().await
    }

    pub async fn invalidate(&self, fp: &Fingerprint) -> Result<bool, CacheError> {
        self.cache.invalidate(fp).await
    }

    /// Runs the full pipeline. Never fails: analyzer and cache problems degrade
    /// the result instead. `deadline` bounds the whole run; each analyzer is
    /// additionally bounded by the configured per-analyzer deadline.
    pub async fn analyze(&self, content: ExtractedContent, deadline: Duration) -> AnalysisOutcome {
        let started = Instant::now();
        let mut run = Run::start();

        // Step 1: cache check
        run.advance(PipelineState::CacheCheck);
        let fp = fingerprint(&content);

        match self.cache.get(&fp).await {
            Ok(Some(cached)) => {
                info!("run {}: cache hit for {}", run.id, fp);
                run.advance(PipelineState::Done);
                return AnalysisOutcome {
                    run_id: run.id,
                    result: cached,
                    from_cache: true,
                    state: run.state,
                    trail: run.trail,
                };
            }
            Ok(None) => debug!("run {}: cache miss for {}", run.id, fp),
            Err(e) => warn!("run {}: cache unavailable, treating as miss: {}", run.id, e),
        }

        // Step 2: dispatch every analyzer on the same immutable content
        run.advance(PipelineState::Dispatching);
        let content = Arc::new(content);
        let handles: Vec<_> = self
            .analyzers
            .iter()
            .map(|analyzer| analyzers::dispatch(analyzer, &content))
            .collect();

        if handles.is_empty() {
            warn!("run {}: no analyzers registered", run.id);
            run.advance(PipelineState::Errored);
            return self.errored(run, fp, complete_partials(Vec::new()));
        }

        // Step 3: collect. Cutoffs are absolute, so awaiting sequentially still
        // bounds the whole collection by the earliest of the two deadlines.
        run.advance(PipelineState::Collecting);
        let cutoff = started + deadline.min(self.analyzer_deadline);
        let mut partials = Vec::with_capacity(handles.len());
        for dispatched in handles {
            let partial = dispatched.settle_by(cutoff).await;
            if let PartialResult::Failure { kind, reason, detail } = &partial {
                warn!("run {}: {} analyzer failed ({:?}): {}", run.id, kind, reason, detail);
            }
            partials.push(partial);
        }
        let partials = complete_partials(partials);

        if !partials.iter().any(PartialResult::is_success) {
            run.advance(PipelineState::Errored);
            return self.errored(run, fp, partials);
        }

        // Step 4: aggregate + rank
        run.advance(PipelineState::Aggregating);
        let score = self.aggregator.aggregate(&partials);
        let suggestions = self.ranker.rank(&partials);
        let complete = partials.iter().all(PartialResult::is_success);

        let result = Arc::new(AnalysisResult {
            fingerprint: fp,
            score,
            suggestions,
            analyzers: partials.iter().map(AnalyzerSummary::from).collect(),
            complete,
            analyzed_at: Utc::now(),
        });

        // Step 5: write-through
        if let Err(e) = self.cache.put(fp, Arc::clone(&result)).await {
            warn!("run {}: failed to cache result for {}: {}", run.id, fp, e);
        }

        info!(
            "run {}: score {:.2} (confidence {:.2}, complete={}), {} suggestions in {:?}",
            run.id,
            result.score.overall,
            result.score.confidence,
            complete,
            result.suggestions.len(),
            started.elapsed()
        );

        run.advance(PipelineState::Done);
        AnalysisOutcome {
            run_id: run.id,
            result,
            from_cache: false,
            state: run.state,
            trail: run.trail,
        }
    }

    /// Degraded result for a run where nothing succeeded. Never cached.
    fn errored(&self, run: Run, fp: Fingerprint, partials: Vec<PartialResult>) -> AnalysisOutcome {
        warn!("run {}: every analyzer failed for {}", run.id, fp);
        let result = Arc::new(AnalysisResult {
            fingerprint: fp,
            score: FinalScore::zero(),
            suggestions: SuggestionRanker::incomplete(),
            analyzers: partials.iter().map(AnalyzerSummary::from).collect(),
            complete: false,
            analyzed_at: Utc::now(),
        });

        AnalysisOutcome {
            run_id: run.id,
            result,
            from_cache: false,
            state: run.state,
            trail: run.trail,
        }
    }
}

/// Sorts partials into canonical kind order and records a failure for every
/// kind with no registered analyzer, so an incomplete analyzer set can never
/// report itself complete.
fn complete_partials(mut partials: Vec<PartialResult>) -> Vec<PartialResult> {
    for kind in AnalyzerKind::ALL {
        if !partials.iter().any(|p| p.kind() == kind) {
            partials.push(PartialResult::failure(
                kind,
                FailureReason::Internal,
                format!("no {kind} analyzer registered"),
            ));
        }
    }
    partials.sort_by_key(PartialResult::kind);
    partials
}
