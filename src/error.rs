//! Error types for the vce2flashquiz library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`QuizError`] — **Fatal**: the current file cannot be converted at all
//!   (unreadable path, corrupt PDF, pdfium missing, output not writable).
//!   Returned as `Err(QuizError)` from the top-level `convert*` functions.
//!   In directory mode it fails only the file it belongs to.
//!
//! * [`ParseWarning`] — **Non-fatal**: one question block was dropped, one
//!   answer letter was discarded, or an exhibit image could not be located.
//!   Collected into [`crate::output::ConversionOutput::warnings`] so callers
//!   can print a post-run summary without losing the rest of the quiz.

use crate::model::QuestionType;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the vce2flashquiz library.
#[derive(Debug, Error)]
pub enum QuizError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input path does not exist.
    #[error("Input not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// A directory was expected.
    #[error("'{path}' is not a directory")]
    NotADirectory { path: PathBuf },

    /// Directory mode found nothing to convert.
    #[error("No PDF files found in '{path}'")]
    NoPdfFiles { path: PathBuf },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be decoded.
    #[error("PDF '{path}' could not be decoded: {detail}\nTry repairing with: qpdf input.pdf output.pdf")]
    Decode { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The page selection matched no page of the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium failed while reading the objects of one page.
    #[error("Text/image extraction failed for page {page}: {detail}")]
    ExtractionFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Place libpdfium next to the binary, install it system-wide,\n\
or set PDFIUM_LIB_PATH=/path/to/libpdfium.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Markup errors ─────────────────────────────────────────────────────
    /// The markup emitter could not render the document.
    #[error("Failed to emit FlashQuiz markup: {0}")]
    EmissionFailed(String),

    /// FlashQuiz text could not be read back.
    #[error("Invalid FlashQuiz markup at line {line}: {detail}")]
    InvalidMarkup { line: usize, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output markup file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why a question block could not be turned into a question.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ClassificationError {
    /// No `=` / `Correct Answer:` line in the block.
    #[error("no answer line")]
    NoAnswerLine,

    /// The answer line matches no known answer shape.
    #[error("unrecognised answer '{raw}'")]
    UnrecognizedAnswer { raw: String },

    /// A choice question has no option lines.
    #[error("no option lines")]
    NoOptions,

    /// Every answer letter was dropped during validation.
    #[error("no answer letter matches an option")]
    NoValidAnswers,

    /// The answer count contradicts the question type.
    #[error("{kind} question has {count} correct answers")]
    AnswerCount { kind: QuestionType, count: usize },
}

/// A recoverable problem found while parsing one document.
///
/// Ordinals are the question numbers printed in the document; pages are
/// 1-indexed.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum ParseWarning {
    /// The block matched no question shape and was dropped.
    #[error("Question {ordinal} (page {page}): dropped, {error}")]
    Classification {
        ordinal: u32,
        page: usize,
        error: ClassificationError,
    },

    /// An answer letter has no corresponding option and was dropped.
    #[error("Question {ordinal}: answer '{letter}' has no matching option")]
    AnswerMismatch { ordinal: u32, letter: String },

    /// A long upper-case answer run may be a word rather than letters.
    #[error("Question {ordinal}: answer '{raw}' is ambiguous, review manually")]
    AmbiguousAnswer { ordinal: u32, raw: String },

    /// The text mentions an exhibit but no image was found.
    #[error("Question {ordinal} (page {page}): exhibit referenced but no image found")]
    MissingExhibit { ordinal: u32, page: usize },

    /// A header line was followed by no text at all.
    #[error("Question {ordinal} (page {page}): header without any content")]
    EmptyBlock { ordinal: u32, page: usize },
}

impl ParseWarning {
    /// Short machine-friendly label used in summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            ParseWarning::Classification { .. } => "classification",
            ParseWarning::AnswerMismatch { .. } => "answer-mismatch",
            ParseWarning::AmbiguousAnswer { .. } => "ambiguous-answer",
            ParseWarning::MissingExhibit { .. } => "missing-exhibit",
            ParseWarning::EmptyBlock { .. } => "empty-block",
        }
    }
}
