//! Configuration types for VCE-to-FlashQuiz conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Frontmatter values, layout tolerances
//! and batch settings live in the same struct so one config can be shared by
//! every file of a directory run.

use crate::error::QuizError;
use crate::model::{Frontmatter, DEFAULT_QUIZ_TITLE};
use crate::pipeline::extract::PageExtractor;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Configuration for a VCE-to-FlashQuiz conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use vce2flashquiz::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .quiz_title("AZ-104 practice")
///     .time_limit(90)
///     .pass_score(80)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Quiz title override. Default: None.
    ///
    /// When unset the first line of text before the first question is used,
    /// then the PDF's metadata title, then `"VCE Quiz"`.
    pub quiz_title: Option<String>,

    /// Time limit in minutes. Omitted from the frontmatter when None.
    pub time_limit: Option<u32>,

    /// Pass score in percent, 0–100. Default: 70.
    pub pass_score: u8,

    /// Shuffle question order in the quiz plugin. Default: true.
    pub shuffle: bool,

    /// Reveal the answer after each question. Default: false.
    pub show_answer: bool,

    /// Optional `exam-range` frontmatter value (e.g. `"1-50"`).
    pub exam_range: Option<String>,

    /// Emit ordinals 1..n instead of the numbers printed in the PDF. Default: false.
    pub renumber: bool,

    /// Vertical distance in points under which fragments share a line. Default: 2.0.
    ///
    /// Exam exports set text at 9–12 pt with ~3 pt leading, so baselines of
    /// adjacent lines are never closer than ~10 pt while runs of the same line
    /// jitter by a fraction of a point.
    pub line_tolerance: f32,

    /// Case-insensitive substrings marking a question that references an image.
    /// Default: `["exhibit"]`.
    pub exhibit_keywords: Vec<String>,

    /// Resolve and inline exhibit images. Default: true.
    pub embed_exhibits: bool,

    /// Page selection. Default: All pages.
    pub pages: PageSelection,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Number of documents converted at once in directory mode. Default: 4.
    pub concurrency: usize,

    /// Pre-constructed page extractor. Takes precedence over pdfium.
    pub extractor: Option<Arc<dyn PageExtractor>>,

    /// Optional progress callback for directory runs.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        let fm = Frontmatter::default();
        Self {
            quiz_title: None,
            time_limit: fm.time_limit,
            pass_score: fm.pass_score,
            shuffle: fm.shuffle,
            show_answer: fm.show_answer,
            exam_range: fm.exam_range,
            renumber: false,
            line_tolerance: 2.0,
            exhibit_keywords: vec!["exhibit".to_string()],
            embed_exhibits: true,
            pages: PageSelection::default(),
            password: None,
            concurrency: 4,
            extractor: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("quiz_title", &self.quiz_title)
            .field("time_limit", &self.time_limit)
            .field("pass_score", &self.pass_score)
            .field("shuffle", &self.shuffle)
            .field("show_answer", &self.show_answer)
            .field("exam_range", &self.exam_range)
            .field("renumber", &self.renumber)
            .field("line_tolerance", &self.line_tolerance)
            .field("exhibit_keywords", &self.exhibit_keywords)
            .field("embed_exhibits", &self.embed_exhibits)
            .field("pages", &self.pages)
            .field("concurrency", &self.concurrency)
            .field("extractor", &self.extractor.as_ref().map(|_| "<dyn PageExtractor>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// Build the frontmatter for a document, picking the first available title.
    pub fn frontmatter(&self, document_title: Option<&str>) -> Frontmatter {
        let quiz_title = [self.quiz_title.as_deref(), document_title]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|t| !t.is_empty())
            .unwrap_or(DEFAULT_QUIZ_TITLE)
            .to_string();

        Frontmatter {
            quiz_title,
            time_limit: self.time_limit,
            pass_score: self.pass_score,
            shuffle: self.shuffle,
            show_answer: self.show_answer,
            exam_range: self.exam_range.clone(),
        }
    }
}

/// Builder for [`ConversionConfig`].
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl fmt::Debug for ConversionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ConversionConfigBuilder {
    pub fn quiz_title(mut self, title: impl Into<String>) -> Self {
        self.config.quiz_title = Some(title.into());
        self
    }

    pub fn time_limit(mut self, minutes: u32) -> Self {
        self.config.time_limit = Some(minutes);
        self
    }

    pub fn pass_score(mut self, percent: u8) -> Self {
        self.config.pass_score = percent;
        self
    }

    pub fn shuffle(mut self, v: bool) -> Self {
        self.config.shuffle = v;
        self
    }

    pub fn show_answer(mut self, v: bool) -> Self {
        self.config.show_answer = v;
        self
    }

    pub fn exam_range(mut self, range: impl Into<String>) -> Self {
        self.config.exam_range = Some(range.into());
        self
    }

    pub fn renumber(mut self, v: bool) -> Self {
        self.config.renumber = v;
        self
    }

    pub fn line_tolerance(mut self, points: f32) -> Self {
        self.config.line_tolerance = points;
        self
    }

    pub fn exhibit_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.exhibit_keywords = keywords.into_iter().map(Into::into).collect();
        self
    }

    pub fn embed_exhibits(mut self, v: bool) -> Self {
        self.config.embed_exhibits = v;
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn PageExtractor>) -> Self {
        self.config.extractor = Some(extractor);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, QuizError> {
        let c = &self.config;
        if c.pass_score > 100 {
            return Err(QuizError::InvalidConfig(format!(
                "pass score must be 0–100, got {}",
                c.pass_score
            )));
        }
        if !(c.line_tolerance.is_finite() && c.line_tolerance > 0.0) {
            return Err(QuizError::InvalidConfig(format!(
                "line tolerance must be a positive number of points, got {}",
                c.line_tolerance
            )));
        }
        if c.embed_exhibits && c.exhibit_keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(QuizError::InvalidConfig(
                "at least one non-empty exhibit keyword is required".into(),
            ));
        }
        if c.concurrency == 0 {
            return Err(QuizError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Specifies which pages of the PDF to read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Read all pages (default).
    #[default]
    All,
    /// Read a single page (1-indexed).
    Single(usize),
    /// Read a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Read specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_flashquiz_defaults() {
        let c = ConversionConfig::default();
        assert_eq!(c.pass_score, 70);
        assert!(c.shuffle);
        assert!(!c.show_answer);
        assert!(c.time_limit.is_none());
        assert!(!c.renumber);
        assert_eq!(c.exhibit_keywords, vec!["exhibit".to_string()]);
    }

    #[test]
    fn builder_rejects_bad_pass_score() {
        let err = ConversionConfig::builder().pass_score(120).build().unwrap_err();
        assert!(err.to_string().contains("0–100"));
    }

    #[test]
    fn builder_rejects_non_positive_tolerance() {
        assert!(ConversionConfig::builder().line_tolerance(0.0).build().is_err());
        assert!(ConversionConfig::builder()
            .line_tolerance(f32::NAN)
            .build()
            .is_err());
    }

    #[test]
    fn builder_rejects_blank_keywords() {
        let res = ConversionConfig::builder()
            .exhibit_keywords(["  "])
            .build();
        assert!(res.is_err());

        // Blank keywords are fine when exhibits are disabled altogether.
        let res = ConversionConfig::builder()
            .exhibit_keywords(Vec::<String>::new())
            .embed_exhibits(false)
            .build();
        assert!(res.is_ok());
    }

    #[test]
    fn concurrency_is_clamped() {
        let c = ConversionConfig::builder().concurrency(0).build().unwrap();
        assert_eq!(c.concurrency, 1);
    }

    #[test]
    fn frontmatter_title_precedence() {
        let c = ConversionConfig::default();
        assert_eq!(c.frontmatter(None).quiz_title, "VCE Quiz");
        assert_eq!(c.frontmatter(Some("  ")).quiz_title, "VCE Quiz");
        assert_eq!(c.frontmatter(Some("From PDF")).quiz_title, "From PDF");

        let c = ConversionConfig::builder()
            .quiz_title("Override")
            .time_limit(45)
            .build()
            .unwrap();
        let fm = c.frontmatter(Some("From PDF"));
        assert_eq!(fm.quiz_title, "Override");
        assert_eq!(fm.time_limit, Some(45));
    }

    #[test]
    fn page_selection_to_indices() {
        assert_eq!(PageSelection::All.to_indices(3), vec![0, 1, 2]);
        assert_eq!(PageSelection::Single(3).to_indices(5), vec![2]);
        assert_eq!(PageSelection::Single(6).to_indices(5), Vec::<usize>::new());
        assert_eq!(PageSelection::Range(2, 4).to_indices(5), vec![1, 2, 3]);
        assert_eq!(
            PageSelection::Set(vec![3, 1, 3]).to_indices(5),
            vec![0, 2]
        );
    }
}
