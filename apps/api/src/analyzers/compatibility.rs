//! Compatibility (ATS) analyzer — layout and keyword signals that decide whether
//! an applicant tracking system can parse the document.
//!
//! Starts from 100 and deducts per finding: high −20, medium −10, low −5.
//! Unparseable text (empty extraction) is a single high finding worth −40.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;

use crate::analyzers::lexicon::{classify_heading, SectionLabel};
use crate::analyzers::{run_blocking, Analyzer, AnalyzerError};
use crate::models::{round2, AnalyzerKind, AnalyzerReport, BlockKind, ExtractedContent, Issue, Severity};

const SPARSE_WORD_COUNT: usize = 100;
const EMPTY_TEXT_PENALTY: f64 = 40.0;

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[\w.+-]+@[\w-]+\.[\w.-]+").expect("static pattern"))
}

fn phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\+?\(?\d[\d\s().-]{8,}\d").expect("static pattern"))
}

fn penalty(severity: Severity) -> f64 {
    match severity {
        Severity::High => 20.0,
        Severity::Medium => 10.0,
        Severity::Low => 5.0,
    }
}

/// Glyphs ATS parsers commonly drop or mangle: dingbats, arrows, private-use
/// icon fonts, and emoji. Plain bullets (•, -, *) are fine.
fn is_decorative(c: char) -> bool {
    matches!(c as u32,
        0x2190..=0x21FF   // arrows
        | 0x2700..=0x27BF // dingbats
        | 0x2600..=0x26FF // misc symbols
        | 0x25A0..=0x25FF // geometric shapes
        | 0xE000..=0xF8FF // private use (icon fonts)
        | 0x1F300..=0x1FAFF)
}

fn looks_like_table(text: &str) -> bool {
    text.lines()
        .any(|line| line.matches('|').count() >= 2 || line.contains('\t'))
}

pub struct CompatibilityAnalyzer;

#[async_trait]
impl Analyzer for CompatibilityAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Ats
    }

    async fn analyze(&self, content: Arc<ExtractedContent>) -> Result<AnalyzerReport, AnalyzerError> {
        run_blocking(move || Ok(evaluate(&content))).await
    }
}

fn evaluate(content: &ExtractedContent) -> AnalyzerReport {
    let text = content.normalized_text();
    let word_count = text.split_whitespace().count();
    let layout = &content.layout;
    let columns = layout.canonical_columns();

    let mut issues = Vec::new();

    if text.is_empty() {
        issues.push(Issue::new(
            Severity::High,
            "No extractable text",
            "Export the document as a text-based PDF; scanned images cannot be read by ATS software.",
        ));
    } else if word_count < SPARSE_WORD_COUNT {
        issues.push(Issue::new(
            Severity::Medium,
            format!("Only {word_count} words of parseable text"),
            "Check that text is not embedded in images or text boxes.",
        ));
    }

    if columns > 1 {
        issues.push(Issue::new(
            Severity::High,
            format!("Multi-column layout ({columns} columns)"),
            "Switch to a single-column layout; many ATS parsers read columns out of order.",
        ));
    }

    if layout.has_header {
        issues.push(Issue::new(
            Severity::Medium,
            "Content placed in the page header",
            "Move contact details out of the page header into the document body.",
        ));
    }

    if layout.has_footer {
        issues.push(Issue::new(
            Severity::Low,
            "Content placed in the page footer",
            "Keep important details out of the page footer.",
        ));
    }

    if content.blocks.iter().any(|b| looks_like_table(&b.text)) {
        issues.push(Issue::new(
            Severity::Medium,
            "Table-like structure detected",
            "Replace tables with plain lists; ATS parsers often scramble table cells.",
        ));
    }

    let decorative = content.text.chars().filter(|c| is_decorative(*c)).count()
        + content
            .blocks
            .iter()
            .flat_map(|b| b.text.chars())
            .filter(|c| is_decorative(*c))
            .count();
    if decorative > 0 {
        issues.push(Issue::new(
            Severity::Low,
            format!("{decorative} decorative symbols or icons"),
            "Replace icons and symbols with plain text labels.",
        ));
    }

    let has_email = email_pattern().is_match(&text);
    if !text.is_empty() && !has_email {
        issues.push(Issue::new(
            Severity::High,
            "No email address found",
            "Add an email address in the body of the document.",
        ));
    }

    let has_phone = phone_pattern().is_match(&text);
    if !text.is_empty() && !has_phone {
        issues.push(Issue::new(
            Severity::Low,
            "No phone number found",
            "Add a phone number so recruiters can reach you.",
        ));
    }

    let present: Vec<SectionLabel> = content
        .blocks
        .iter()
        .filter(|b| b.kind == BlockKind::Heading)
        .filter_map(|b| classify_heading(&b.text).map(|(label, _)| label))
        .collect();
    let mut found = 0usize;
    for label in SectionLabel::CORE {
        if present.contains(&label) {
            found += 1;
        } else {
            issues.push(Issue::new(
                Severity::Medium,
                format!("No standard '{}' heading", label.title()),
                format!(
                    "Label the section '{}' so keyword-based ATS filters find it.",
                    label.title()
                ),
            ));
        }
    }
    let keyword_coverage = found as f64 / SectionLabel::CORE.len() as f64;

    let mut deductions: f64 = issues.iter().map(|i| penalty(i.severity)).sum();
    if text.is_empty() {
        deductions += EMPTY_TEXT_PENALTY - penalty(Severity::High);
    }

    let confidence = if text.is_empty() {
        0.3
    } else if word_count < SPARSE_WORD_COUNT {
        0.6
    } else {
        0.9
    };

    let mut report = AnalyzerReport::new(100.0 - deductions, confidence)
        .metric("columns", columns as f64)
        .metric("word_count", word_count as f64)
        .metric("keyword_coverage", round2(keyword_coverage))
        .metric("has_email", if has_email { 1.0 } else { 0.0 })
        .metric("has_phone", if has_phone { 1.0 } else { 0.0 })
        .metric("decorative_symbols", decorative as f64);
    report.issues = issues;
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::content::{ContentBlock, LayoutSummary};

    fn heading(text: &str, position: u32) -> ContentBlock {
        ContentBlock {
            kind: BlockKind::Heading,
            text: text.to_string(),
            position,
        }
    }

    fn clean_resume() -> ExtractedContent {
        let filler = "delivered reliable systems for customers ".repeat(30);
        ExtractedContent {
            text: format!(
                "Jane Doe jane@example.com +1 (555) 010-2030 Experience {filler} Education Skills"
            ),
            blocks: vec![
                heading("Experience", 0),
                heading("Education", 1),
                heading("Skills", 2),
            ],
            layout: LayoutSummary::default(),
        }
    }

    fn has_issue(report: &AnalyzerReport, needle: &str, severity: Severity) -> bool {
        report
            .issues
            .iter()
            .any(|i| i.message.contains(needle) && i.severity == severity)
    }

    #[test]
    fn test_clean_resume_scores_full() {
        let report = evaluate(&clean_resume());
        assert!(report.issues.is_empty(), "unexpected issues: {:?}", report.issues);
        assert_eq!(report.score, 100.0);
        assert_eq!(report.metrics["keyword_coverage"], 1.0);
        assert_eq!(report.confidence, 0.9);
    }

    #[test]
    fn test_multi_column_is_high() {
        let mut c = clean_resume();
        c.layout.columns = 2;
        let report = evaluate(&c);
        assert!(has_issue(&report, "Multi-column", Severity::High));
        assert_eq!(report.score, 80.0);
    }

    #[test]
    fn test_header_and_footer() {
        let mut c = clean_resume();
        c.layout.has_header = true;
        c.layout.has_footer = true;
        let report = evaluate(&c);
        assert!(has_issue(&report, "header", Severity::Medium));
        assert!(has_issue(&report, "footer", Severity::Low));
        assert_eq!(report.score, 85.0);
    }

    #[test]
    fn test_table_and_icons_flagged() {
        let mut c = clean_resume();
        c.blocks.push(ContentBlock {
            kind: BlockKind::Paragraph,
            text: "Skill | Level | Years\n★ Rust".to_string(),
            position: 3,
        });
        let report = evaluate(&c);
        assert!(has_issue(&report, "Table-like", Severity::Medium));
        assert!(has_issue(&report, "decorative", Severity::Low));
    }

    #[test]
    fn test_missing_email_is_high() {
        let mut c = clean_resume();
        c.text = c.text.replace("jane@example.com", "");
        let report = evaluate(&c);
        assert!(has_issue(&report, "email", Severity::High));
        assert_eq!(report.metrics["has_email"], 0.0);
    }

    #[test]
    fn test_missing_standard_heading() {
        let mut c = clean_resume();
        c.blocks.retain(|b| b.text != "Skills");
        let report = evaluate(&c);
        assert!(has_issue(&report, "'Skills'", Severity::Medium));
        assert!((report.metrics["keyword_coverage"] - 0.67).abs() < 1e-9);
    }

    #[test]
    fn test_empty_text_is_single_heavy_finding() {
        let report = evaluate(&ExtractedContent::default());
        assert!(has_issue(&report, "No extractable text", Severity::High));
        // 40 for empty text + 3 missing headings at 10 each
        assert_eq!(report.score, 30.0);
        assert_eq!(report.confidence, 0.3);
    }
}
