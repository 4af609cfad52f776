//! # vce2flashquiz
//!
//! Convert VCE (Visual CertExam) exam-export PDFs into FlashQuiz markup.
//!
//! ## Why this crate?
//!
//! Exam exports are PDFs with a text layer but no structure: a stream of
//! positioned text runs and embedded images. Questions, options, answer
//! lines and exhibit diagrams have to be recovered from layout cues
//! (numbering, option-letter prefixes, marker tokens) before they can be
//! written out as a quiz file.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     validate the file or list a directory (magic bytes)
//!  ├─ 2. Extract   positioned text runs + images via pdfium (spawn_blocking)
//!  ├─ 3. Segment   runs → lines → question blocks
//!  ├─ 4. Classify  ordered rules decide @mc / @sata / @tf
//!  ├─ 5. Answers   `ABCD` / `a, c` / `true` → validated answer set
//!  ├─ 6. Exhibits  bind referenced images, inline as data URIs
//!  └─ 7. Emit      YAML frontmatter + one block per question
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vce2flashquiz::{convert, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder().time_limit(90).build()?;
//!     let output = convert("exam.pdf", &config).await?;
//!     println!("{}", output.markup);
//!     for warning in &output.warnings {
//!         eprintln!("warning: {warning}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Pages extracted by other means can be parsed directly with
//! [`parse_pages`], which performs no I/O.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `vce2flashquiz` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! vce2flashquiz = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod markup;
pub mod model;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, PageSelection};
pub use convert::{
    convert, convert_dir, convert_from_bytes, convert_sync, convert_to_file, inspect, inspect_with,
    write_markup,
};
pub use error::{ClassificationError, ParseWarning, QuizError};
pub use markup::parse_markup;
pub use model::{
    AnswerOption, Document, Frontmatter, Page, Question, QuestionType, RawFragment, RawImage,
};
pub use output::{BatchReport, ConversionOutput, ConversionStats, DocumentMetadata, FileOutcome};
pub use parser::{parse_pages, parse_pages_with_title, ParsedDocument};
pub use pipeline::emit::emit;
pub use pipeline::extract::{ExtractedDocument, PageExtractor, PdfSource, PdfiumExtractor};
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
