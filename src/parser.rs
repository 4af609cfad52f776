//! The synchronous parsing core: extracted pages → [`Document`].
//!
//! ```text
//! pages ──▶ cluster_lines ──▶ segment ──▶ classify ──▶ normalize ──▶ exhibit
//! ```
//!
//! Nothing here performs I/O. Recoverable problems become [`ParseWarning`]s;
//! the only way a block disappears is a [`crate::error::ClassificationError`],
//! so `questions == blocks - dropped` holds for every input.

use crate::config::ConversionConfig;
use crate::error::ParseWarning;
use crate::model::{Document, Page, QuestionBlock};
use crate::pipeline::answer;
use crate::pipeline::classify;
use crate::pipeline::exhibit::{references_exhibit, ExhibitResolver};
use crate::pipeline::segment::{cluster_lines, segment};
use tracing::{debug, info, warn};

/// Result of [`parse_pages`].
#[derive(Debug, Clone, Default)]
pub struct ParsedDocument {
    pub document: Document,
    pub warnings: Vec<ParseWarning>,
    /// Question blocks found by the segmenter.
    pub blocks: usize,
    /// Blocks dropped by classification.
    pub dropped: usize,
    /// Questions that received an exhibit image.
    pub exhibits: usize,
    /// First non-empty line before the first question.
    pub preamble_title: Option<String>,
}

/// Parse extracted pages into a quiz document.
pub fn parse_pages(pages: &[Page], config: &ConversionConfig) -> ParsedDocument {
    parse_pages_with_title(pages, config, None)
}

/// Like [`parse_pages`], with a title to use when the configuration sets
/// none and the document has no preamble (typically the PDF metadata title).
pub fn parse_pages_with_title(
    pages: &[Page],
    config: &ConversionConfig,
    fallback_title: Option<&str>,
) -> ParsedDocument {
    let lines = cluster_lines(pages, config.line_tolerance);
    let segmentation = segment(&lines);
    let preamble_title = segmentation.title().map(str::to_string);

    let mut warnings = Vec::new();
    for &(ordinal, page) in &segmentation.empty_headers {
        record(
            &mut warnings,
            ParseWarning::EmptyBlock {
                ordinal,
                page: page + 1,
            },
        );
    }

    let mut resolver = ExhibitResolver::new(pages);
    let mut questions = Vec::with_capacity(segmentation.blocks.len());
    let mut dropped = 0;
    let mut exhibits = 0;

    for block in &segmentation.blocks {
        let ordinal = if config.renumber {
            questions.len() as u32 + 1
        } else {
            block.ordinal
        };

        let mut question = match build_question(block, ordinal, &mut warnings) {
            Ok(q) => q,
            Err(warning) => {
                dropped += 1;
                record(&mut warnings, warning);
                continue;
            }
        };

        if config.embed_exhibits && references_exhibit(&question.text, &config.exhibit_keywords) {
            match resolver.resolve(&block.span) {
                Some(uri) => {
                    exhibits += 1;
                    question.exhibit_image = Some(uri);
                }
                None => record(
                    &mut warnings,
                    ParseWarning::MissingExhibit {
                        ordinal: block.ordinal,
                        page: block.span.page + 1,
                    },
                ),
            }
        }

        questions.push(question);
    }

    let title = preamble_title.as_deref().or(fallback_title);
    let document = Document {
        frontmatter: config.frontmatter(title),
        questions,
    };

    info!(
        "Parsed {} questions from {} blocks ({} dropped, {} exhibits, {} warnings)",
        document.questions.len(),
        segmentation.blocks.len(),
        dropped,
        exhibits,
        warnings.len()
    );

    ParsedDocument {
        document,
        warnings,
        blocks: segmentation.blocks.len(),
        dropped,
        exhibits,
        preamble_title,
    }
}

/// Classify, normalise and validate one block. Answer-level warnings are
/// pushed to `warnings`; a dropped block comes back as its warning.
fn build_question(
    block: &QuestionBlock,
    ordinal: u32,
    warnings: &mut Vec<ParseWarning>,
) -> Result<crate::model::Question, ParseWarning> {
    let dropped = |error| ParseWarning::Classification {
        ordinal: block.ordinal,
        page: block.span.page + 1,
        error,
    };

    let classified = classify::classify(block).map_err(dropped)?;
    let normalized =
        answer::normalize(&classified.answer, &classified.option_letters()).map_err(dropped)?;

    if normalized.ambiguous {
        record(
            warnings,
            ParseWarning::AmbiguousAnswer {
                ordinal: block.ordinal,
                raw: classified.answer.clone(),
            },
        );
    }
    for letter in &normalized.dropped {
        record(
            warnings,
            ParseWarning::AnswerMismatch {
                ordinal: block.ordinal,
                letter: letter.clone(),
            },
        );
    }

    let question = classified
        .into_question(ordinal, normalized.answers)
        .map_err(dropped)?;
    debug!(
        "Question {} → {} with {} options",
        block.ordinal,
        question.kind,
        question.options.len()
    );
    Ok(question)
}

fn record(warnings: &mut Vec<ParseWarning>, warning: ParseWarning) {
    warn!("{}", warning);
    warnings.push(warning);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClassificationError;
    use crate::model::{BoundingBox, QuestionType, RawFragment, RawImage};

    /// One fragment per line, 14 pt apart.
    fn page(index: usize, lines: &[&str]) -> Page {
        Page {
            index,
            fragments: lines
                .iter()
                .enumerate()
                .map(|(i, text)| RawFragment::new(*text, index, 50.0 + 14.0 * i as f32, 40.0))
                .collect(),
            images: vec![],
        }
    }

    #[test]
    fn mixed_document() {
        let pages = vec![page(
            0,
            &[
                "Networking Basics",
                "@tf 3) The Earth is flat.",
                "= false",
                "4) Which ports are encrypted?",
                "a) 22",
                "b) 80",
                "c) 443",
                "= AC",
                "5) Which is a colour?",
                "a) Red",
                "b) Seven",
                "= a",
            ],
        )];
        let parsed = parse_pages(&pages, &ConversionConfig::default());
        let qs = &parsed.document.questions;
        assert_eq!(qs.len(), 3);
        assert_eq!(qs[0].kind, QuestionType::Tf);
        assert_eq!(qs[0].ordinal, 3);
        assert_eq!(qs[1].kind, QuestionType::Sata);
        assert_eq!(qs[2].kind, QuestionType::Mc);
        assert_eq!(parsed.document.frontmatter.quiz_title, "Networking Basics");
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn dropped_blocks_are_counted() {
        let pages = vec![page(
            0,
            &["1) No answer here", "a) x", "2) Fine", "a) x", "b) y", "= b"],
        )];
        let parsed = parse_pages(&pages, &ConversionConfig::default());
        assert_eq!(parsed.blocks, 2);
        assert_eq!(parsed.dropped, 1);
        assert_eq!(
            parsed.document.questions.len(),
            parsed.blocks - parsed.dropped
        );
        assert!(matches!(
            parsed.warnings[0],
            ParseWarning::Classification {
                ordinal: 1,
                page: 1,
                error: ClassificationError::NoAnswerLine
            }
        ));
    }

    #[test]
    fn mismatched_letter_is_dropped_with_warning() {
        let pages = vec![page(0, &["1) Pick", "a) x", "b) y", "= A, E"])];
        let parsed = parse_pages(&pages, &ConversionConfig::default());
        let q = &parsed.document.questions[0];
        assert_eq!(q.kind, QuestionType::Sata);
        assert_eq!(q.correct_answers.len(), 1);
        assert_eq!(
            parsed.warnings,
            vec![ParseWarning::AnswerMismatch {
                ordinal: 1,
                letter: "e".into()
            }]
        );
    }

    #[test]
    fn missing_exhibit_keeps_question() {
        let pages = vec![page(0, &["1) See Exhibit A. Which VM?", "a) vm1", "b) vm2", "= a"])];
        let parsed = parse_pages(&pages, &ConversionConfig::default());
        assert_eq!(parsed.document.questions.len(), 1);
        assert!(parsed.document.questions[0].exhibit_image.is_none());
        assert_eq!(
            parsed.warnings,
            vec![ParseWarning::MissingExhibit { ordinal: 1, page: 1 }]
        );
    }

    #[test]
    fn exhibit_is_bound_from_block_span() {
        let mut p = page(0, &["1) Refer to the exhibit.", "a) x", "b) y", "= b"]);
        p.images.push(RawImage {
            bytes: b"\x89PNGdiagram".to_vec(),
            page: 0,
            bbox: BoundingBox {
                left: 40.0,
                top: 60.0,
                right: 300.0,
                bottom: 200.0,
            },
        });
        let parsed = parse_pages(&[p], &ConversionConfig::default());
        assert_eq!(parsed.exhibits, 1);
        let uri = parsed.document.questions[0].exhibit_image.as_deref().unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn renumbering_and_title_fallback() {
        let pages = vec![page(0, &["7) Q", "a) x", "= a", "9) R", "a) x", "= a"])];
        let config = ConversionConfig::builder().renumber(true).build().unwrap();
        let parsed = parse_pages_with_title(&pages, &config, Some("Meta title"));
        let ordinals: Vec<u32> = parsed.document.questions.iter().map(|q| q.ordinal).collect();
        assert_eq!(ordinals, vec![1, 2]);
        assert_eq!(parsed.document.frontmatter.quiz_title, "Meta title");
    }

    #[test]
    fn empty_header_is_warned() {
        let pages = vec![page(0, &["QUESTION 1", "QUESTION 2", "Q", "A. x", "Correct Answer: A"])];
        let parsed = parse_pages(&pages, &ConversionConfig::default());
        assert_eq!(parsed.document.questions.len(), 1);
        assert_eq!(
            parsed.warnings,
            vec![ParseWarning::EmptyBlock { ordinal: 1, page: 1 }]
        );
    }

    #[test]
    fn blank_option_survives_markup_round_trip() {
        let pages = [page(
            0,
            &["QUESTION 1", "Pick one.", "A. first", "B.", "Correct Answer: A"],
        )];
        let parsed = parse_pages(&pages, &ConversionConfig::default());
        assert_eq!(parsed.document.questions[0].options[1].text, "");

        let markup = crate::pipeline::emit::emit(&parsed.document).unwrap();
        assert!(markup.contains("\na) first\nb)\n= a\n"));
        let back = crate::markup::parse_markup(&markup).unwrap();
        assert_eq!(back, parsed.document);
    }
}
