use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::pipeline::fingerprint::Fingerprint;

// ────────────────────────────────────────────────────────────────────────────
// Analyzer identity and issues
// ────────────────────────────────────────────────────────────────────────────

/// The three analyzer variants. Declaration order is the canonical order used
/// wherever partial results must be processed deterministically.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerKind {
    Structure,
    Ats,
    Content,
}

impl AnalyzerKind {
    pub const ALL: [AnalyzerKind; 3] = [AnalyzerKind::Structure, AnalyzerKind::Ats, AnalyzerKind::Content];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyzerKind::Structure => "structure",
            AnalyzerKind::Ats => "ats",
            AnalyzerKind::Content => "content",
        }
    }
}

impl std::fmt::Display for AnalyzerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered so that `High > Medium > Low`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Issue {
    pub severity: Severity,
    pub message: String,
    /// Actionable advice; the ranker falls back to `message` when absent.
    pub suggestion: Option<String>,
}

impl Issue {
    pub fn new(severity: Severity, message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            suggestion: Some(suggestion.into()),
        }
    }

    pub fn advice(&self) -> &str {
        self.suggestion.as_deref().unwrap_or(&self.message)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Partial results
// ────────────────────────────────────────────────────────────────────────────

/// What a successful analyzer produces. Score and confidence are clamped on
/// construction so downstream math never sees out-of-range values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyzerReport {
    pub score: f64,
    pub confidence: f64,
    pub metrics: BTreeMap<String, f64>,
    pub issues: Vec<Issue>,
}

impl AnalyzerReport {
    pub fn new(score: f64, confidence: f64) -> Self {
        Self {
            score: clamp_finite(score, 0.0, 100.0),
            confidence: clamp_finite(confidence, 0.0, 1.0),
            metrics: BTreeMap::new(),
            issues: Vec::new(),
        }
    }

    pub fn metric(mut self, name: &str, value: f64) -> Self {
        self.metrics.insert(name.to_string(), value);
        self
    }

    pub fn issue(mut self, issue: Issue) -> Self {
        self.issues.push(issue);
        self
    }
}

/// Scores and metrics are reported to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn clamp_finite(value: f64, min: f64, max: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        min
    }
}

/// Reason code attached to a failed partial result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Timeout,
    Panicked,
    Cancelled,
    InvalidInput,
    Internal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PartialResult {
    Success {
        kind: AnalyzerKind,
        report: AnalyzerReport,
    },
    Failure {
        kind: AnalyzerKind,
        reason: FailureReason,
        detail: String,
    },
}

impl PartialResult {
    pub fn success(kind: AnalyzerKind, report: AnalyzerReport) -> Self {
        PartialResult::Success { kind, report }
    }

    pub fn failure(kind: AnalyzerKind, reason: FailureReason, detail: impl Into<String>) -> Self {
        PartialResult::Failure {
            kind,
            reason,
            detail: detail.into(),
        }
    }

    pub fn kind(&self) -> AnalyzerKind {
        match self {
            PartialResult::Success { kind, .. } | PartialResult::Failure { kind, .. } => *kind,
        }
    }

    pub fn report(&self) -> Option<&AnalyzerReport> {
        match self {
            PartialResult::Success { report, .. } => Some(report),
            PartialResult::Failure { .. } => None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PartialResult::Success { .. })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Aggregated output
// ────────────────────────────────────────────────────────────────────────────

/// Per-component values keyed by analyzer kind. `None` means the analyzer did
/// not contribute.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ComponentScores {
    pub structure: Option<f64>,
    pub ats: Option<f64>,
    pub content: Option<f64>,
}

impl ComponentScores {
    pub fn set(&mut self, kind: AnalyzerKind, value: f64) {
        let slot = match kind {
            AnalyzerKind::Structure => &mut self.structure,
            AnalyzerKind::Ats => &mut self.ats,
            AnalyzerKind::Content => &mut self.content,
        };
        *slot = Some(value);
    }
}

#[cfg(test)]
impl ComponentScores {
    pub fn get(&self, kind: AnalyzerKind) -> Option<f64> {
        match kind {
            AnalyzerKind::Structure => self.structure,
            AnalyzerKind::Ats => self.ats,
            AnalyzerKind::Content => self.content,
        }
    }

    pub fn sum(&self) -> f64 {
        AnalyzerKind::ALL.iter().filter_map(|k| self.get(*k)).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinalScore {
    /// 0 – 100, two decimal places.
    pub overall: f64,
    pub breakdown: ComponentScores,
    /// Weights actually applied after redistribution; sums to 1.0 when any analyzer succeeded.
    pub effective_weights: ComponentScores,
    /// successful analyzers / analyzer kinds
    pub confidence: f64,
}

impl FinalScore {
    pub fn zero() -> Self {
        Self {
            overall: 0.0,
            breakdown: ComponentScores::default(),
            effective_weights: ComponentScores::default(),
            confidence: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Suggestion {
    pub text: String,
    pub severity: Severity,
    /// `None` for pipeline-level notices not raised by a single analyzer.
    pub source: Option<AnalyzerKind>,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Suggestions {
    pub critical: Vec<Suggestion>,
    pub recommended: Vec<Suggestion>,
    pub optional: Vec<Suggestion>,
}

impl Suggestions {
    pub fn len(&self) -> usize {
        self.critical.len() + self.recommended.len() + self.optional.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AnalyzerStatus {
    Ok,
    Failed { reason: FailureReason, detail: String },
}

/// Per-analyzer view exposed to the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalyzerSummary {
    pub kind: AnalyzerKind,
    pub status: AnalyzerStatus,
    pub score: Option<f64>,
    pub confidence: f64,
    pub metrics: BTreeMap<String, f64>,
}

impl From<&PartialResult> for AnalyzerSummary {
    fn from(partial: &PartialResult) -> Self {
        match partial {
            PartialResult::Success { kind, report } => AnalyzerSummary {
                kind: *kind,
                status: AnalyzerStatus::Ok,
                score: Some(report.score),
                confidence: report.confidence,
                metrics: report.metrics.clone(),
            },
            PartialResult::Failure { kind, reason, detail } => AnalyzerSummary {
                kind: *kind,
                status: AnalyzerStatus::Failed {
                    reason: *reason,
                    detail: detail.clone(),
                },
                score: None,
                confidence: 0.0,
                metrics: BTreeMap::new(),
            },
        }
    }
}

/// The combined output of one pipeline run. Immutable once built; cached
/// behind an `Arc` and handed out to every caller that hits the same fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub fingerprint: Fingerprint,
    pub score: FinalScore,
    pub suggestions: Suggestions,
    pub analyzers: Vec<AnalyzerSummary>,
    /// True only when every analyzer succeeded.
    pub complete: bool,
    pub analyzed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Completeness {
    Complete,
    Partial,
    Failed,
}

impl AnalysisResult {
    pub fn completeness(&self) -> Completeness {
        if self.complete {
            Completeness::Complete
        } else if self.score.confidence > 0.0 {
            Completeness::Partial
        } else {
            Completeness::Failed
        }
    }
}
