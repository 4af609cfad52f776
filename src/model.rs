//! Value types flowing through the conversion pipeline.
//!
//! ```text
//! Page { RawFragment*, RawImage* }
//!   └─ segment ──▶ QuestionBlock
//!                    └─ classify + normalise + exhibit ──▶ Question
//!                                                            └─ Document ──▶ markup
//! ```
//!
//! Everything downstream of [`QuestionBlock`] is constructed once and never
//! mutated; stages hand owned vectors to the next stage.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ── Extractor output ─────────────────────────────────────────────────────

/// One positioned run of text as produced by the page extractor.
///
/// `y` grows downward from the top edge of the page so that sorting by `y`
/// yields reading order. `page` is 0-based.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFragment {
    pub text: String,
    pub page: usize,
    pub y: f32,
    pub x: f32,
}

impl RawFragment {
    pub fn new(text: impl Into<String>, page: usize, y: f32, x: f32) -> Self {
        Self {
            text: text.into(),
            page,
            y,
            x,
        }
    }
}

/// Axis-aligned box in top-down page coordinates (points).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

/// An embedded raster image. `bytes` holds an encoded image (PNG, JPEG, GIF).
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct RawImage {
    pub bytes: Vec<u8>,
    pub page: usize,
    pub bbox: BoundingBox,
}

impl fmt::Debug for RawImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawImage")
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .field("page", &self.page)
            .field("bbox", &self.bbox)
            .finish()
    }
}

/// Everything the extractor yields for a single page, in reading order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub index: usize,
    pub fragments: Vec<RawFragment>,
    pub images: Vec<RawImage>,
}

// ── Segmenter output ─────────────────────────────────────────────────────

/// Where a block sits in the document: its header position, and the header
/// position of the block that follows it (if any).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlockSpan {
    pub page: usize,
    pub y: f32,
    pub end: Option<(usize, f32)>,
}

impl BlockSpan {
    /// Whether a point lies after this block's header and before the next one.
    pub fn contains(&self, page: usize, y: f32) -> bool {
        let after_start = page > self.page || (page == self.page && y >= self.y);
        let before_end = match self.end {
            Some((end_page, end_y)) => page < end_page || (page == end_page && y < end_y),
            None => true,
        };
        after_start && before_end
    }
}

/// A contiguous run of lines belonging to one question.
///
/// `body_lines` is never empty: the header's own text (minus the marker and
/// ordinal) is its first element when present.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionBlock {
    pub ordinal: u32,
    pub header_line: String,
    pub marker: Option<QuestionType>,
    pub body_lines: Vec<String>,
    pub span: BlockSpan,
}

// ── Final question model ─────────────────────────────────────────────────

/// Answer format of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    /// Exactly one correct option.
    Mc,
    /// Select all that apply: one or more correct options.
    Sata,
    /// True/false statement with no options.
    Tf,
}

impl QuestionType {
    /// The leading marker token, e.g. `@sata`.
    pub fn marker(&self) -> &'static str {
        match self {
            QuestionType::Mc => "@mc",
            QuestionType::Sata => "@sata",
            QuestionType::Tf => "@tf",
        }
    }

    /// Parse a marker token with or without its `@`.
    pub fn from_marker(token: &str) -> Option<Self> {
        match token.trim_start_matches('@').to_ascii_lowercase().as_str() {
            "mc" => Some(QuestionType::Mc),
            "sata" => Some(QuestionType::Sata),
            "tf" => Some(QuestionType::Tf),
            _ => None,
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

/// One lettered option of a choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub letter: char,
    pub text: String,
}

/// A fully parsed question ready for emission.
///
/// Invariants upheld by the parser:
/// * `Mc` has exactly one answer, `Sata` at least one.
/// * `Tf` has no options and a single answer, `"true"` or `"false"`.
/// * Every answer of a choice question names one of its option letters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub ordinal: u32,
    pub kind: QuestionType,
    pub text: String,
    pub options: Vec<AnswerOption>,
    pub correct_answers: BTreeSet<String>,
    /// `data:image/...;base64,...` URI of the resolved exhibit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exhibit_image: Option<String>,
}

impl Question {
    pub fn option_letters(&self) -> Vec<char> {
        self.options.iter().map(|o| o.letter).collect()
    }
}

/// Quiz-wide settings rendered as YAML frontmatter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Frontmatter {
    pub quiz_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u32>,
    pub pass_score: u8,
    pub shuffle: bool,
    pub show_answer: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam_range: Option<String>,
}

/// Title used when neither the caller nor the document supplies one.
pub const DEFAULT_QUIZ_TITLE: &str = "VCE Quiz";

impl Default for Frontmatter {
    fn default() -> Self {
        Self {
            quiz_title: DEFAULT_QUIZ_TITLE.to_string(),
            time_limit: None,
            pass_score: 70,
            shuffle: true,
            show_answer: false,
            exam_range: None,
        }
    }
}

/// The assembled artifact handed to the emitter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub frontmatter: Frontmatter,
    pub questions: Vec<Question>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_round_trip() {
        for kind in [QuestionType::Mc, QuestionType::Sata, QuestionType::Tf] {
            assert_eq!(QuestionType::from_marker(kind.marker()), Some(kind));
        }
        assert_eq!(QuestionType::from_marker("SATA"), Some(QuestionType::Sata));
        assert_eq!(QuestionType::from_marker("@essay"), None);
    }

    #[test]
    fn span_contains_same_page() {
        let span = BlockSpan {
            page: 1,
            y: 100.0,
            end: Some((1, 400.0)),
        };
        assert!(span.contains(1, 100.0));
        assert!(span.contains(1, 250.0));
        assert!(!span.contains(1, 400.0));
        assert!(!span.contains(1, 50.0));
        assert!(!span.contains(2, 10.0));
    }

    #[test]
    fn span_contains_across_pages() {
        let span = BlockSpan {
            page: 0,
            y: 600.0,
            end: Some((1, 200.0)),
        };
        assert!(span.contains(0, 700.0));
        assert!(span.contains(1, 150.0));
        assert!(!span.contains(1, 250.0));

        let open = BlockSpan {
            page: 3,
            y: 10.0,
            end: None,
        };
        assert!(open.contains(9, 0.0));
    }

    #[test]
    fn frontmatter_defaults() {
        let fm = Frontmatter::default();
        assert_eq!(fm.pass_score, 70);
        assert!(fm.shuffle);
        assert!(!fm.show_answer);
        assert!(fm.time_limit.is_none());
    }

    #[test]
    fn raw_image_debug_hides_payload() {
        let img = RawImage {
            bytes: vec![0u8; 2048],
            page: 0,
            bbox: BoundingBox::default(),
        };
        let dbg = format!("{img:?}");
        assert!(dbg.contains("<2048 bytes>"));
    }
}
