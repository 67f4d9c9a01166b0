//! Suggestion ranking — turns analyzer issues into a bounded, prioritized list.
//!
//! Buckets: high → critical, medium → recommended, low → optional.
//! Duplicates (same normalized text) collapse into the most severe, then most
//! confident, occurrence, which keeps the position of the first one seen.
//! Order within a bucket: severity desc, confidence desc, first seen.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::models::{PartialResult, Severity, Suggestion, Suggestions};

pub const DEFAULT_BUCKET_LIMIT: usize = 5;

pub const INCOMPLETE_ANALYSIS_NOTICE: &str =
    "Analysis could not complete. Please try again in a moment.";

#[derive(Debug, Clone)]
pub struct SuggestionRanker {
    bucket_limit: usize,
}

impl Default for SuggestionRanker {
    fn default() -> Self {
        Self::new(DEFAULT_BUCKET_LIMIT)
    }
}

struct Candidate {
    suggestion: Suggestion,
    first_seen: usize,
}

impl SuggestionRanker {
    pub fn new(bucket_limit: usize) -> Self {
        Self { bucket_limit }
    }

    pub fn rank(&self, partials: &[PartialResult]) -> Suggestions {
        // Canonical kind order makes "first seen" independent of completion order.
        let mut ordered: Vec<&PartialResult> = partials.iter().collect();
        ordered.sort_by_key(|p| p.kind());

        let mut candidates: Vec<Candidate> = Vec::new();
        let mut by_text: HashMap<String, usize> = HashMap::new();

        for partial in ordered {
            let PartialResult::Success { kind, report } = partial else {
                continue;
            };

            for issue in &report.issues {
                let key = normalize(issue.advice());
                if key.is_empty() {
                    continue;
                }

                let suggestion = Suggestion {
                    text: issue.advice().trim().to_string(),
                    severity: issue.severity,
                    source: Some(*kind),
                    confidence: report.confidence,
                };

                match by_text.get(&key).copied() {
                    Some(idx) => {
                        let existing = &mut candidates[idx].suggestion;
                        if outranks(&suggestion, existing) {
                            *existing = suggestion;
                        }
                    }
                    None => {
                        let first_seen = candidates.len();
                        by_text.insert(key, first_seen);
                        candidates.push(Candidate {
                            suggestion,
                            first_seen,
                        });
                    }
                }
            }
        }

        candidates.sort_by(|a, b| {
            b.suggestion
                .severity
                .cmp(&a.suggestion.severity)
                .then_with(|| b.suggestion.confidence.total_cmp(&a.suggestion.confidence))
                .then_with(|| a.first_seen.cmp(&b.first_seen))
        });

        let mut suggestions = Suggestions::default();
        for candidate in candidates {
            let bucket = match candidate.suggestion.severity {
                Severity::High => &mut suggestions.critical,
                Severity::Medium => &mut suggestions.recommended,
                Severity::Low => &mut suggestions.optional,
            };
            if bucket.len() < self.bucket_limit {
                bucket.push(candidate.suggestion);
            }
        }

        suggestions
    }

    /// The single notice returned when no analyzer succeeded.
    pub fn incomplete() -> Suggestions {
        Suggestions {
            critical: vec![Suggestion {
                text: INCOMPLETE_ANALYSIS_NOTICE.to_string(),
                severity: Severity::High,
                source: None,
                confidence: 0.0,
            }],
            ..Suggestions::default()
        }
    }
}

fn outranks(candidate: &Suggestion, existing: &Suggestion) -> bool {
    match candidate.severity.cmp(&existing.severity) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => candidate.confidence > existing.confidence,
    }
}

/// Lowercase, collapsed whitespace, trailing punctuation removed.
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .to_string()
}
