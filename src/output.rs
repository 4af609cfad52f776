//! Result types returned by the conversion entry points.

use crate::error::ParseWarning;
use crate::model::Document;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Everything produced for one converted document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// The FlashQuiz markup, frontmatter included.
    pub markup: String,
    /// The parsed quiz the markup was rendered from.
    pub document: Document,
    /// Recoverable problems, in document order.
    pub warnings: Vec<ParseWarning>,
    /// PDF metadata read alongside the pages.
    pub metadata: DocumentMetadata,
    pub stats: ConversionStats,
}

/// Counters for a single conversion.
///
/// `questions == blocks - dropped_blocks` always holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Pages in the PDF.
    pub total_pages: usize,
    /// Pages actually read (after page selection).
    pub processed_pages: usize,
    /// Question blocks found by the segmenter.
    pub blocks: usize,
    /// Questions emitted.
    pub questions: usize,
    /// Blocks dropped by classification.
    pub dropped_blocks: usize,
    /// Questions carrying an inline exhibit image.
    pub exhibits: usize,
    /// Total recoverable warnings.
    pub warnings: usize,
    pub extract_duration_ms: u64,
    pub total_duration_ms: u64,
}

impl ConversionStats {
    /// Warning counts grouped by [`ParseWarning::kind`].
    pub fn warning_summary(warnings: &[ParseWarning]) -> BTreeMap<&'static str, usize> {
        let mut summary = BTreeMap::new();
        for w in warnings {
            *summary.entry(w.kind()).or_insert(0) += 1;
        }
        summary
    }
}

/// Metadata read from the PDF's info dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

/// Outcome of one file in a directory run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FileOutcome {
    /// Markup written to `output`.
    Converted {
        input: PathBuf,
        output: PathBuf,
        stats: ConversionStats,
        warnings: Vec<ParseWarning>,
    },
    /// Fatal error; no file written.
    Failed { input: PathBuf, error: String },
}

impl FileOutcome {
    pub fn input(&self) -> &PathBuf {
        match self {
            FileOutcome::Converted { input, .. } | FileOutcome::Failed { input, .. } => input,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FileOutcome::Converted { .. })
    }
}

/// Result of [`crate::convert::convert_dir`], one entry per PDF in path order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub files: Vec<FileOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.files.iter().filter(|f| f.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.files.len() - self.succeeded()
    }

    /// True when every file converted.
    pub fn all_succeeded(&self) -> bool {
        self.failed() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_counts() {
        let report = BatchReport {
            files: vec![
                FileOutcome::Converted {
                    input: "a.pdf".into(),
                    output: "a.md".into(),
                    stats: ConversionStats::default(),
                    warnings: vec![],
                },
                FileOutcome::Failed {
                    input: "b.pdf".into(),
                    error: "corrupt".into(),
                },
            ],
        };
        assert_eq!(report.succeeded(), 1);
        assert_eq!(report.failed(), 1);
        assert!(!report.all_succeeded());
        assert_eq!(report.files[1].input(), &PathBuf::from("b.pdf"));
    }

    #[test]
    fn warning_summary_groups_by_kind() {
        let warnings = vec![
            ParseWarning::MissingExhibit { ordinal: 1, page: 1 },
            ParseWarning::AnswerMismatch {
                ordinal: 2,
                letter: "f".into(),
            },
            ParseWarning::MissingExhibit { ordinal: 5, page: 3 },
        ];
        let summary = ConversionStats::warning_summary(&warnings);
        assert_eq!(summary.get("missing-exhibit"), Some(&2));
        assert_eq!(summary.get("answer-mismatch"), Some(&1));
    }
}
