pub mod analysis;
pub mod content;

pub use analysis::{
    round2, AnalysisResult, AnalyzerKind, AnalyzerReport, AnalyzerSummary, ComponentScores,
    Completeness, FailureReason, FinalScore, Issue, PartialResult, Severity, Suggestion,
    Suggestions,
};
pub use content::{BlockKind, ExtractedContent};
