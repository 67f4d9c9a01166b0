//! Shared vocabulary for the built-in analyzers: section headings, action
//! verbs, weak phrasing, and the quantified-impact check.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SectionLabel {
    Education,
    Experience,
    Skills,
    Other,
}

impl SectionLabel {
    /// Labels every resume is expected to carry.
    pub const CORE: [SectionLabel; 3] = [SectionLabel::Experience, SectionLabel::Education, SectionLabel::Skills];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionLabel::Education => "education",
            SectionLabel::Experience => "experience",
            SectionLabel::Skills => "skills",
            SectionLabel::Other => "other",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            SectionLabel::Education => "Education",
            SectionLabel::Experience => "Experience",
            SectionLabel::Skills => "Skills",
            SectionLabel::Other => "Other",
        }
    }
}

const EXACT_HEADINGS: &[(SectionLabel, &[&str])] = &[
    (
        SectionLabel::Experience,
        &[
            "experience",
            "work experience",
            "professional experience",
            "employment",
            "employment history",
            "work history",
        ],
    ),
    (
        SectionLabel::Education,
        &["education", "academic background", "education and training"],
    ),
    (
        SectionLabel::Skills,
        &["skills", "technical skills", "core competencies", "competencies"],
    ),
];

const HEADING_KEYWORDS: &[(SectionLabel, &[&str])] = &[
    (
        SectionLabel::Experience,
        &["experience", "employment", "career", "work"],
    ),
    (
        SectionLabel::Education,
        &["education", "academic", "degree", "qualification"],
    ),
    (
        SectionLabel::Skills,
        &["skill", "technolog", "tools", "competenc", "expertise"],
    ),
];

/// Words that hint at a section's label when its heading is missing or unrecognized.
pub const BODY_HINTS: &[(SectionLabel, &[&str])] = &[
    (
        SectionLabel::Experience,
        &["engineer", "manager", "developer", "intern", "present", "led", "company", "inc"],
    ),
    (
        SectionLabel::Education,
        &["university", "college", "bachelor", "master", "phd", "gpa", "b.s", "m.s", "diploma"],
    ),
    (
        SectionLabel::Skills,
        &["python", "rust", "java", "sql", "docker", "kubernetes", "aws", "excel", "typescript"],
    ),
];

pub const EXACT_HEADING_CONFIDENCE: f64 = 0.95;
pub const KEYWORD_HEADING_CONFIDENCE: f64 = 0.75;

/// Classifies a heading's text. `None` means the heading is not a recognized section name.
pub fn classify_heading(text: &str) -> Option<(SectionLabel, f64)> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    for (label, headings) in EXACT_HEADINGS {
        if headings.contains(&cleaned.as_str()) {
            return Some((*label, EXACT_HEADING_CONFIDENCE));
        }
    }

    for (label, keywords) in HEADING_KEYWORDS {
        let hit = cleaned
            .split(' ')
            .any(|word| keywords.iter().any(|k| word.starts_with(k)));
        if hit {
            return Some((*label, KEYWORD_HEADING_CONFIDENCE));
        }
    }

    None
}

/// Strong opening verbs for resume bullets.
pub const ACTION_VERBS: &[&str] = &[
    "achieved", "architected", "automated", "built", "coordinated", "created", "cut",
    "delivered", "designed", "developed", "drove", "established", "executed", "expanded",
    "founded", "generated", "grew", "implemented", "increased", "initiated", "launched",
    "led", "managed", "mentored", "migrated", "negotiated", "optimized", "orchestrated",
    "owned", "partnered", "pioneered", "produced", "reduced", "redesigned", "refactored",
    "resolved", "scaled", "shipped", "simplified", "spearheaded", "streamlined", "trained",
    "transformed", "won", "wrote",
];

/// Phrases that describe duties rather than outcomes.
pub const WEAK_PHRASES: &[&str] = &[
    "responsible for",
    "duties included",
    "tasked with",
    "worked on",
    "helped",
    "assisted",
    "participated in",
    "involved in",
];

/// Whether the bullet opens with a strong action verb.
pub fn starts_with_action_verb(bullet: &str) -> bool {
    bullet
        .split_whitespace()
        .next()
        .map(|w| {
            let word = w
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            ACTION_VERBS.contains(&word.as_str())
        })
        .unwrap_or(false)
}

pub fn weak_phrase(bullet: &str) -> Option<&'static str> {
    let lower = bullet.to_lowercase();
    WEAK_PHRASES.iter().copied().find(|p| lower.contains(p))
}

/// A bullet is quantified when it carries a number, percentage, or currency amount.
pub fn is_quantified(bullet: &str) -> bool {
    bullet.chars().any(|c| c.is_ascii_digit())
        || bullet.contains('%')
        || bullet.contains('$')
        || bullet.contains('€')
        || bullet.contains('£')
}
