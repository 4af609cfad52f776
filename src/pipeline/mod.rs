//! Pipeline stages for VCE-to-FlashQuiz conversion.
//!
//! Each submodule implements exactly one transformation step and is pure
//! except for [`input`] and [`extract`], which touch the filesystem and
//! pdfium.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ clean ──▶ segment ──▶ classify ──▶ answer ──▶ exhibit ──▶ emit
//! (path)    (pdfium)    (text)    (blocks)    (type)       (letters)  (images)    (markup)
//! ```
//!
//! 1. [`input`]    — validate a file path or list the PDFs of a directory
//! 2. [`extract`]  — positioned text runs and images per page; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`clean`]    — deterministic cleanup of extraction noise in each run
//! 4. [`segment`]  — cluster runs into lines and lines into question blocks
//! 5. [`classify`] — ordered rule table deciding `@mc` / `@sata` / `@tf`
//! 6. [`answer`]   — answer-line shapes and letter validation
//! 7. [`exhibit`]  — bind referenced images and encode them inline
//! 8. [`emit`]     — render frontmatter and questions as FlashQuiz markup

pub mod answer;
pub mod classify;
pub mod clean;
pub mod emit;
pub mod exhibit;
pub mod extract;
pub mod input;
pub mod segment;
