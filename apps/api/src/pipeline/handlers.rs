//! Axum route handlers for the Analysis API.

use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cache::CacheStats;
use crate::errors::AppError;
use crate::models::{AnalysisResult, Completeness, ExtractedContent};
use crate::pipeline::fingerprint::Fingerprint;
use crate::pipeline::orchestrator::PipelineState;
use crate::state::AppState;

pub const MAX_DEADLINE_MS: u64 = 60_000;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub content: ExtractedContent,
    /// Overall deadline for this run. Falls back to `ANALYSIS_DEADLINE_MS`.
    pub deadline_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub run_id: Uuid,
    pub from_cache: bool,
    pub status: Completeness,
    /// Terminal pipeline state: `done` or `errored`.
    pub state: PipelineState,
    pub trail: Vec<PipelineState>,
    #[serde(flatten)]
    pub result: AnalysisResult,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/analysis
///
/// Runs the pipeline (or serves a cached result) for the extracted content.
/// Analyzer failures degrade the result; they never fail the request.
pub async fn handle_analyze(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let deadline = match request.deadline_ms {
        Some(ms) if ms == 0 || ms > MAX_DEADLINE_MS => {
            return Err(AppError::Validation(format!(
                "deadline_ms must be between 1 and {MAX_DEADLINE_MS}"
            )));
        }
        Some(ms) => Duration::from_millis(ms),
        None => state.config.analysis_deadline,
    };

    let outcome = state.orchestrator.analyze(request.content, deadline).await;

    Ok(Json(AnalyzeResponse {
        run_id: outcome.run_id,
        from_cache: outcome.from_cache,
        status: outcome.result.completeness(),
        state: outcome.state,
        trail: outcome.trail,
        result: outcome.result.as_ref().clone(),
    }))
}

/// GET /api/v1/analysis/cache
pub async fn handle_cache_stats(State(state): State<AppState>) -> Result<Json<CacheStats>, AppError> {
    let stats = state
        .orchestrator
        .cache_stats()
        .await
        .map_err(|e| AppError::CacheUnavailable(e.to_string()))?;
    Ok(Json(stats))
}

/// DELETE /api/v1/analysis/cache/:fingerprint
///
/// 204 when an entry was removed, 404 when none existed.
pub async fn handle_invalidate(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<StatusCode, AppError> {
    let fp: Fingerprint = raw
        .parse()
        .map_err(|e| AppError::Validation(format!("{e}")))?;

    let removed = state
        .orchestrator
        .invalidate(&fp)
        .await
        .map_err(|e| AppError::CacheUnavailable(e.to_string()))?;

    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("No cached analysis for {fp}")))
    }
}
