//! Structure/Section analyzer — partitions blocks into labeled sections.
//!
//! Algorithm:
//! 1. Walk blocks in reading order; each heading opens a new section, body
//!    blocks before the first heading form an unheaded section.
//! 2. Label each section from its heading (exact name 0.95, keyword 0.75). Sections
//!    with no recognized heading are inferred from body hints (≤ 0.6) or fall to `Other`.
//! 3. score = Σ(core weight × best confidence for that label) × 100
//! 4. Sections under `LOW_CONFIDENCE_THRESHOLD` become issues, never failures.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::analyzers::lexicon::{classify_heading, SectionLabel, BODY_HINTS};
use crate::analyzers::{run_blocking, Analyzer, AnalyzerError};
use crate::models::{round2, AnalyzerKind, AnalyzerReport, BlockKind, ExtractedContent, Issue, Severity};

pub const LOW_CONFIDENCE_THRESHOLD: f64 = 0.5;

const CORE_WEIGHTS: &[(SectionLabel, f64)] = &[
    (SectionLabel::Experience, 0.4),
    (SectionLabel::Education, 0.3),
    (SectionLabel::Skills, 0.3),
];

const UNCLASSIFIED_CONFIDENCE: f64 = 0.3;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectedSection {
    pub label: SectionLabel,
    pub confidence: f64,
    pub heading: Option<String>,
    pub block_count: usize,
    pub start_position: u32,
}

pub struct StructureAnalyzer;

#[async_trait]
impl Analyzer for StructureAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Structure
    }

    async fn analyze(&self, content: Arc<ExtractedContent>) -> Result<AnalyzerReport, AnalyzerError> {
        check_blocks(&content)?;
        run_blocking(move || Ok(evaluate(&content))).await
    }
}

/// Sections are read from blocks. Text with no blocks at all means the
/// extractor dropped the layout, so there is nothing to partition.
fn check_blocks(content: &ExtractedContent) -> Result<(), AnalyzerError> {
    if content.blocks.is_empty() && !content.normalized_text().is_empty() {
        return Err(AnalyzerError::InvalidInput(
            "text was extracted without any content blocks".to_string(),
        ));
    }
    Ok(())
}

/// Builds raw sections. Body text is kept alongside for label inference.
fn partition(content: &ExtractedContent) -> Vec<(DetectedSection, Vec<String>)> {
    let mut sections: Vec<(DetectedSection, Vec<String>)> = Vec::new();

    for block in content.ordered_blocks() {
        if block.kind == BlockKind::Heading {
            let (label, confidence) = classify_heading(&block.text)
                .unwrap_or((SectionLabel::Other, 0.0));
            sections.push((
                DetectedSection {
                    label,
                    confidence,
                    heading: Some(block.text.trim().to_string()),
                    block_count: 0,
                    start_position: block.position,
                },
                Vec::new(),
            ));
            continue;
        }

        if sections.is_empty() {
            sections.push((
                DetectedSection {
                    label: SectionLabel::Other,
                    confidence: 0.0,
                    heading: None,
                    block_count: 0,
                    start_position: block.position,
                },
                Vec::new(),
            ));
        }

        if let Some((section, body)) = sections.last_mut() {
            section.block_count += 1;
            body.push(block.text.to_lowercase());
        }
    }

    sections
}

/// Best-guess label from body vocabulary for sections without a recognized heading.
fn infer_from_body(body: &[String]) -> (SectionLabel, f64) {
    let words: Vec<&str> = body
        .iter()
        .flat_map(|t| t.split(|c: char| !c.is_alphanumeric() && c != '.'))
        .filter(|w| !w.is_empty())
        .collect();

    let best = BODY_HINTS
        .iter()
        .map(|(label, hints)| {
            let hits = words.iter().filter(|w| hints.contains(w)).count();
            (*label, hits)
        })
        .filter(|(_, hits)| *hits > 0)
        .max_by_key(|(_, hits)| *hits);

    match best {
        Some((label, hits)) => (label, (0.25 + 0.1 * hits as f64).min(0.6)),
        None => (SectionLabel::Other, UNCLASSIFIED_CONFIDENCE),
    }
}

pub fn detect_sections(content: &ExtractedContent) -> Vec<DetectedSection> {
    partition(content)
        .into_iter()
        .map(|(mut section, body)| {
            if section.label == SectionLabel::Other {
                let (label, confidence) = infer_from_body(&body);
                section.label = label;
                section.confidence = confidence;
            }
            section
        })
        .collect()
}

fn evaluate(content: &ExtractedContent) -> AnalyzerReport {
    let sections = detect_sections(content);

    let mut best: BTreeMap<SectionLabel, f64> = BTreeMap::new();
    for section in &sections {
        let slot = best.entry(section.label).or_insert(0.0);
        *slot = slot.max(section.confidence);
    }

    let score = CORE_WEIGHTS
        .iter()
        .map(|(label, weight)| weight * best.get(label).copied().unwrap_or(0.0))
        .sum::<f64>()
        * 100.0;

    let mean_confidence = if sections.is_empty() {
        0.0
    } else {
        sections.iter().map(|s| s.confidence).sum::<f64>() / sections.len() as f64
    };

    let headings = sections.iter().filter(|s| s.heading.is_some()).count();

    let mut report = AnalyzerReport::new(score, mean_confidence.max(0.1))
        .metric("sections_detected", sections.len() as f64)
        .metric("headings", headings as f64)
        .metric("mean_section_confidence", round2(mean_confidence));

    for label in SectionLabel::CORE {
        let confidence = best.get(&label).copied().unwrap_or(0.0);
        report = report.metric(&format!("section.{}", label.as_str()), round2(confidence));

        if confidence == 0.0 {
            let severity = if label == SectionLabel::Experience {
                Severity::High
            } else {
                Severity::Medium
            };
            report = report.issue(Issue::new(
                severity,
                format!("No {} section detected", label.as_str()),
                format!("Add a section titled '{}'.", label.title()),
            ));
        }
    }

    if headings == 0 && !sections.is_empty() {
        report = report.issue(Issue::new(
            Severity::Medium,
            "No section headings found",
            "Break the document into sections with clear headings.",
        ));
    }

    for section in sections.iter().filter(|s| s.confidence < LOW_CONFIDENCE_THRESHOLD) {
        let name = section
            .heading
            .clone()
            .unwrap_or_else(|| format!("content at position {}", section.start_position));
        report = report.issue(Issue::new(
            Severity::Low,
            format!(
                "Section '{name}' could not be classified confidently ({:.2})",
                section.confidence
            ),
            "Use a standard section heading so the section is recognized.",
        ));
    }

    report
}
