//! Score aggregation — weighted combination of successful partial results.
//!
//! A failed or missing analyzer's weight is redistributed proportionally over
//! the analyzers that succeeded:
//!
//!   effective(k) = weight(k) / Σ weight(successful)
//!   overall      = Σ effective(k) × score(k)
//!   confidence   = successful / analyzer kinds
//!
//! The combination is commutative: partial results may arrive in any order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{round2, AnalyzerKind, ComponentScores, FinalScore, PartialResult};

const WEIGHT_SUM_TOLERANCE: f64 = 1e-3;

#[derive(Debug, Error, PartialEq)]
pub enum WeightsError {
    #[error("weight for {0} must be a finite, non-negative number")]
    Invalid(AnalyzerKind),

    #[error("weights must sum to 1.0, got {0:.4}")]
    Sum(f64),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AggregationWeights {
    pub structure: f64,
    pub ats: f64,
    pub content: f64,
}

impl Default for AggregationWeights {
    fn default() -> Self {
        Self {
            structure: 0.3,
            ats: 0.4,
            content: 0.3,
        }
    }
}

impl AggregationWeights {
    pub fn new(structure: f64, ats: f64, content: f64) -> Result<Self, WeightsError> {
        let weights = Self {
            structure,
            ats,
            content,
        };

        for kind in AnalyzerKind::ALL {
            let w = weights.get(kind);
            if !w.is_finite() || w < 0.0 {
                return Err(WeightsError::Invalid(kind));
            }
        }

        let sum = structure + ats + content;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(WeightsError::Sum(sum));
        }

        Ok(weights)
    }

    pub fn get(&self, kind: AnalyzerKind) -> f64 {
        match kind {
            AnalyzerKind::Structure => self.structure,
            AnalyzerKind::Ats => self.ats,
            AnalyzerKind::Content => self.content,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScoreAggregator {
    weights: AggregationWeights,
}

impl ScoreAggregator {
    pub fn new(weights: AggregationWeights) -> Self {
        Self { weights }
    }

    /// Pure: the same set of successful scores always yields the same `FinalScore`.
    pub fn aggregate(&self, partials: &[PartialResult]) -> FinalScore {
        // Keyed by kind so arrival order cannot matter; duplicates keep the first success.
        let mut scores: BTreeMap<AnalyzerKind, f64> = BTreeMap::new();
        for partial in partials {
            if let Some(report) = partial.report() {
                scores.entry(partial.kind()).or_insert(report.score);
            }
        }

        if scores.is_empty() {
            return FinalScore::zero();
        }

        let success_weight: f64 = scores.keys().map(|k| self.weights.get(*k)).sum();

        let mut breakdown = ComponentScores::default();
        let mut effective_weights = ComponentScores::default();
        let mut overall = 0.0;

        for (kind, score) in &scores {
            let effective = if success_weight > f64::EPSILON {
                self.weights.get(*kind) / success_weight
            } else {
                // Every successful analyzer is weighted zero: share equally.
                1.0 / scores.len() as f64
            };
            overall += effective * score;
            breakdown.set(*kind, *score);
            effective_weights.set(*kind, effective);
        }

        FinalScore {
            overall: round2(overall.clamp(0.0, 100.0)),
            breakdown,
            effective_weights,
            confidence: scores.len() as f64 / AnalyzerKind::ALL.len() as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalyzerReport, FailureReason};

    fn ok(kind: AnalyzerKind, score: f64) -> PartialResult {
        PartialResult::success(kind, AnalyzerReport::new(score, 0.9))
    }

    fn failed(kind: AnalyzerKind) -> PartialResult {
        PartialResult::failure(kind, FailureReason::Timeout, "deadline")
    }

    fn aggregator() -> ScoreAggregator {
        ScoreAggregator::new(AggregationWeights::new(0.3, 0.4, 0.3).unwrap())
    }

    #[test]
    fn test_all_succeed_weighted_sum() {
        // 90*0.3 + 80*0.4 + 70*0.3 = 27 + 32 + 21 = 80
        let score = aggregator().aggregate(&[
            ok(AnalyzerKind::Structure, 90.0),
            ok(AnalyzerKind::Ats, 80.0),
            ok(AnalyzerKind::Content, 70.0),
        ]);
        assert!((score.overall - 80.0).abs() < 1e-9, "overall was {}", score.overall);
        assert_eq!(score.confidence, 1.0);
        assert_eq!(score.breakdown.ats, Some(80.0));
    }

    #[test]
    fn test_failed_weight_redistributed_proportionally() {
        // ATS fails: 0.3 and 0.3 rescale to 0.5 and 0.5 → 90*0.5 + 70*0.5 = 80
        let score = aggregator().aggregate(&[
            ok(AnalyzerKind::Structure, 90.0),
            failed(AnalyzerKind::Ats),
            ok(AnalyzerKind::Content, 70.0),
        ]);
        assert!((score.overall - 80.0).abs() < 1e-9);
        assert!((score.confidence - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(score.effective_weights.structure, Some(0.5));
        assert_eq!(score.effective_weights.content, Some(0.5));
        assert_eq!(score.effective_weights.ats, None);
        assert_eq!(score.breakdown.ats, None);
    }

    #[test]
    fn test_effective_weights_sum_to_one() {
        let sets = [
            vec![ok(AnalyzerKind::Structure, 50.0)],
            vec![ok(AnalyzerKind::Ats, 10.0), ok(AnalyzerKind::Content, 90.0)],
            vec![
                ok(AnalyzerKind::Structure, 1.0),
                ok(AnalyzerKind::Ats, 2.0),
                ok(AnalyzerKind::Content, 3.0),
            ],
        ];
        for partials in sets {
            let score = aggregator().aggregate(&partials);
            assert!((score.effective_weights.sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_removing_a_success_never_increases_confidence() {
        let all = vec![
            ok(AnalyzerKind::Structure, 90.0),
            ok(AnalyzerKind::Ats, 80.0),
            ok(AnalyzerKind::Content, 70.0),
        ];
        let full = aggregator().aggregate(&all);
        for i in 0..all.len() {
            let mut degraded = all.clone();
            let kind = degraded[i].kind();
            degraded[i] = failed(kind);
            let score = aggregator().aggregate(&degraded);
            assert!(score.confidence < full.confidence);
            assert!((score.effective_weights.sum() - 1.0).abs() < 1e-9);
            assert_eq!(score.effective_weights.get(kind), None);
        }
    }

    #[test]
    fn test_order_insensitive() {
        let a = aggregator().aggregate(&[
            ok(AnalyzerKind::Content, 61.0),
            ok(AnalyzerKind::Structure, 77.0),
            ok(AnalyzerKind::Ats, 43.0),
        ]);
        let b = aggregator().aggregate(&[
            ok(AnalyzerKind::Ats, 43.0),
            ok(AnalyzerKind::Content, 61.0),
            ok(AnalyzerKind::Structure, 77.0),
        ]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_all_failed_is_zero() {
        let score = aggregator().aggregate(&[failed(AnalyzerKind::Structure), failed(AnalyzerKind::Ats)]);
        assert_eq!(score, FinalScore::zero());
    }

    #[test]
    fn test_zero_weight_successes_share_equally() {
        let agg = ScoreAggregator::new(AggregationWeights::new(0.0, 1.0, 0.0).unwrap());
        let score = agg.aggregate(&[
            ok(AnalyzerKind::Structure, 40.0),
            failed(AnalyzerKind::Ats),
            ok(AnalyzerKind::Content, 60.0),
        ]);
        assert!((score.overall - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_weights_validation() {
        assert_eq!(AggregationWeights::new(0.5, 0.5, 0.5), Err(WeightsError::Sum(1.5)));
        assert_eq!(
            AggregationWeights::new(-0.1, 0.6, 0.5),
            Err(WeightsError::Invalid(AnalyzerKind::Structure))
        );
        assert!(AggregationWeights::new(f64::NAN, 0.5, 0.5).is_err());
        assert!(AggregationWeights::new(0.3333, 0.3333, 0.3334).is_ok());
    }
}
