//! Quality/Content analyzer — writing heuristics over bullet points.
//!
//! Units are list-block bullets; documents without lists fall back to
//! paragraph sentences.
//!
//! score = 40 × action_verb_ratio + 35 × quantified_ratio + 25 × (1 − passive_ratio)
//!         − 3 per weak phrase (max 15) − 5 when bullets are too long or too short

use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;

use crate::analyzers::lexicon::{is_quantified, starts_with_action_verb, weak_phrase};
use crate::analyzers::{run_blocking, Analyzer, AnalyzerError};
use crate::models::{round2, AnalyzerKind, AnalyzerReport, BlockKind, ExtractedContent, Issue, Severity};

const MIN_ACTION_VERB_RATIO: f64 = 0.6;
const MIN_QUANTIFIED_RATIO: f64 = 0.5;
const MAX_AVG_WORDS: f64 = 30.0;
const MIN_AVG_WORDS: f64 = 5.0;
const WEAK_PHRASE_PENALTY: f64 = 3.0;
const MAX_WEAK_PHRASE_PENALTY: f64 = 15.0;

fn passive_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(?:am|is|are|was|were|be|been|being)\s+(?:\w+ly\s+)?\w+(?:ed|en)\b")
            .expect("static pattern")
    })
}

pub fn passive_count(text: &str) -> usize {
    passive_pattern().find_iter(text).count()
}

pub struct QualityAnalyzer;

#[async_trait]
impl Analyzer for QualityAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Content
    }

    async fn analyze(&self, content: Arc<ExtractedContent>) -> Result<AnalyzerReport, AnalyzerError> {
        run_blocking(move || Ok(evaluate(&content))).await
    }
}

fn units(content: &ExtractedContent) -> (Vec<String>, bool) {
    let bullets = content.bullets();
    if !bullets.is_empty() {
        return (bullets, true);
    }

    let sentences = content
        .ordered_blocks()
        .into_iter()
        .filter(|b| b.kind == BlockKind::Paragraph)
        .flat_map(|b| b.text.split(['.', '\n']))
        .map(str::trim)
        .filter(|s| s.split_whitespace().count() >= 3)
        .map(String::from)
        .collect();
    (sentences, false)
}

fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

fn evaluate(content: &ExtractedContent) -> AnalyzerReport {
    let (units, from_lists) = units(content);

    if units.is_empty() {
        return AnalyzerReport::new(0.0, 0.2)
            .metric("bullet_count", 0.0)
            .issue(Issue::new(
                Severity::High,
                "No descriptive content found",
                "Describe your experience with bullet points that state what you achieved.",
            ));
    }

    let total = units.len();
    let action = units.iter().filter(|u| starts_with_action_verb(u)).count();
    let quantified = units.iter().filter(|u| is_quantified(u)).count();
    let passive: usize = units.iter().map(|u| passive_count(u)).sum();
    let weak: Vec<&'static str> = units.iter().filter_map(|u| weak_phrase(u)).collect();
    let words: usize = units.iter().map(|u| u.split_whitespace().count()).sum();

    let action_ratio = ratio(action, total);
    let quantified_ratio = ratio(quantified, total);
    let passive_ratio = ratio(passive, total).min(1.0);
    let avg_words = words as f64 / total as f64;
    let length_off = !(MIN_AVG_WORDS..=MAX_AVG_WORDS).contains(&avg_words);

    let score = 40.0 * action_ratio + 35.0 * quantified_ratio + 25.0 * (1.0 - passive_ratio)
        - (weak.len() as f64 * WEAK_PHRASE_PENALTY).min(MAX_WEAK_PHRASE_PENALTY)
        - if length_off { 5.0 } else { 0.0 };

    let confidence = (0.4 + 0.05 * total as f64).min(0.95);

    let mut report = AnalyzerReport::new(score, confidence)
        .metric("bullet_count", total as f64)
        .metric("action_verb_ratio", round2(action_ratio))
        .metric("quantified_ratio", round2(quantified_ratio))
        .metric("passive_voice_count", passive as f64)
        .metric("weak_phrase_count", weak.len() as f64)
        .metric("avg_words_per_bullet", round2(avg_words));

    if !from_lists {
        report = report.issue(Issue::new(
            Severity::Medium,
            "No bullet points found",
            "Present achievements as bullet points rather than paragraphs.",
        ));
    }

    if quantified_ratio < MIN_QUANTIFIED_RATIO {
        report = report.issue(Issue::new(
            Severity::High,
            format!(
                "Only {:.0}% of bullets include a measurable result",
                quantified_ratio * 100.0
            ),
            "Add a metric to each achievement: a number, percentage, amount, or time saved.",
        ));
    }

    if action_ratio < MIN_ACTION_VERB_RATIO {
        report = report.issue(Issue::new(
            Severity::Medium,
            format!(
                "Only {:.0}% of bullets start with an action verb",
                action_ratio * 100.0
            ),
            "Start each bullet with a strong verb such as 'Led' or 'Reduced'.",
        ));
    }

    if passive > 0 {
        let severity = if passive_ratio > 0.3 {
            Severity::Medium
        } else {
            Severity::Low
        };
        report = report.issue(Issue::new(
            severity,
            format!("{passive} passive-voice phrases"),
            "Rewrite passive phrases in active voice.",
        ));
    }

    let distinct: BTreeSet<&str> = weak.iter().copied().collect();
    for phrase in distinct {
        report = report.issue(Issue::new(
            Severity::Low,
            format!("Weak phrase '{phrase}'"),
            format!("Replace '{phrase}' with the outcome you delivered."),
        ));
    }

    if length_off {
        report = report.issue(Issue::new(
            Severity::Low,
            format!("Bullets average {avg_words:.0} words"),
            format!("Keep each bullet between {MIN_AVG_WORDS} and {MAX_AVG_WORDS} words."),
        ));
    }

    report
}
