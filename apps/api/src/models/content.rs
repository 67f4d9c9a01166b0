use serde::{Deserialize, Serialize};

/// Highest column count treated as meaningful. Anything above is clamped.
pub const MAX_COLUMNS: u8 = 8;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Paragraph,
    List,
    Heading,
}

/// A single block of text as laid out in the source document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentBlock {
    pub kind: BlockKind,
    pub text: String,
    /// Reading-order index assigned by the extractor.
    pub position: u32,
}

/// Page layout signals reported by the extractor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutSummary {
    #[serde(default = "default_columns")]
    pub columns: u8,
    #[serde(default)]
    pub has_header: bool,
    #[serde(default)]
    pub has_footer: bool,
}

fn default_columns() -> u8 {
    1
}

impl Default for LayoutSummary {
    fn default() -> Self {
        Self {
            columns: 1,
            has_header: false,
            has_footer: false,
        }
    }
}

impl LayoutSummary {
    /// Column count in canonical form: 0 becomes 1, large values clamp to `MAX_COLUMNS`.
    pub fn canonical_columns(&self) -> u8 {
        self.columns.clamp(1, MAX_COLUMNS)
    }
}

/// Immutable output of the extraction collaborator. The core never mutates it;
/// a pipeline run shares it across analyzer tasks behind an `Arc`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ExtractedContent {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub blocks: Vec<ContentBlock>,
    #[serde(default)]
    pub layout: LayoutSummary,
}

impl ExtractedContent {
    /// Whitespace-collapsed, control-character-free view of `text`.
    /// Blank or malformed text normalizes to the empty string.
    pub fn normalized_text(&self) -> String {
        normalize_text(&self.text)
    }

    /// Blocks in reading order. Extractors are not required to emit them sorted.
    pub fn ordered_blocks(&self) -> Vec<&ContentBlock> {
        let mut blocks: Vec<&ContentBlock> = self.blocks.iter().collect();
        blocks.sort_by_key(|b| b.position);
        blocks
    }

    /// Individual bullet lines from list blocks, trimmed of bullet glyphs.
    pub fn bullets(&self) -> Vec<String> {
        self.ordered_blocks()
            .into_iter()
            .filter(|b| b.kind == BlockKind::List)
            .flat_map(|b| b.text.lines())
            .map(strip_bullet_marker)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect()
    }
}

pub fn normalize_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;

    for c in raw.chars() {
        if c.is_whitespace() {
            pending_space = !out.is_empty();
        } else if c.is_control() {
            continue;
        } else {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(c);
        }
    }

    out
}

fn strip_bullet_marker(line: &str) -> &str {
    line.trim()
        .trim_start_matches(['-', '*', '•', '·', '◦', '▪', '‣'])
        .trim_start()
}
