//! Conversion entry points.
//!
//! Every entry point funnels into the same sequence: validate the input,
//! extract pages on a blocking thread, run the synchronous parser, emit the
//! markup. Directory runs repeat that per file with bounded concurrency and
//! record each file's outcome instead of stopping at the first failure.

use crate::config::ConversionConfig;
use crate::error::QuizError;
use crate::output::{BatchReport, ConversionOutput, ConversionStats, DocumentMetadata, FileOutcome};
use crate::parser::parse_pages_with_title;
use crate::pipeline::emit::emit;
use crate::pipeline::extract::{ExtractedDocument, PageExtractor, PdfSource, PdfiumExtractor};
use crate::pipeline::input;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert one exam PDF to FlashQuiz markup.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(ConversionOutput)` on success, even if some blocks were dropped
/// (check `output.warnings`).
///
/// # Errors
/// Returns `Err(QuizError)` only for fatal errors:
/// - File not found / permission denied / not a PDF
/// - PDF cannot be decoded or needs a password
/// - pdfium could not be loaded
/// - Markup emission failed
pub async fn convert(
    path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, QuizError> {
    let pdf_path = input::resolve_pdf(path)?;
    convert_source(PdfSource::File(pdf_path), config).await
}

/// Convert PDF bytes held in memory.
///
/// # Example
/// ```rust,no_run
/// use vce2flashquiz::{convert_from_bytes, ConversionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("exam.pdf")?;
/// let output = convert_from_bytes(&bytes, &ConversionConfig::default()).await?;
/// println!("{}", output.markup);
/// # Ok(())
/// # }
/// ```
pub async fn convert_from_bytes(
    bytes: &[u8],
    config: &ConversionConfig,
) -> Result<ConversionOutput, QuizError> {
    let label = PathBuf::from("<memory>");
    input::check_pdf_bytes(bytes, &label)?;
    convert_source(
        PdfSource::Bytes {
            label,
            data: bytes.to_vec(),
        },
        config,
    )
    .await
}

/// Convert a PDF and write the markup to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn convert_to_file(
    path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionStats, QuizError> {
    let output = convert(path, config).await?;
    write_markup(output_path.as_ref(), &output.markup).await?;
    Ok(output.stats)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, QuizError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| QuizError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(path, config))
}

/// Convert every PDF directly inside `dir`, writing `<stem>.md` next to each.
///
/// A file that fails is recorded in the report and the run moves on.
///
/// # Errors
/// Only when `dir` is not a readable directory or holds no PDFs.
pub async fn convert_dir(
    dir: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<BatchReport, QuizError> {
    let pdfs = input::list_pdfs(dir)?;
    let total = pdfs.len();
    info!("Converting {} PDFs (concurrency {})", total, config.concurrency);

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let mut outcomes: Vec<(usize, FileOutcome)> =
        stream::iter(pdfs.into_iter().enumerate().map(|(i, pdf)| async move {
            if let Some(ref cb) = config.progress_callback {
                cb.on_file_start(&pdf);
            }
            let outcome = convert_one(&pdf, config).await;
            if let Some(ref cb) = config.progress_callback {
                match &outcome {
                    FileOutcome::Converted { stats, .. } => {
                        cb.on_file_complete(&pdf, stats.questions, stats.warnings)
                    }
                    FileOutcome::Failed { error, .. } => cb.on_file_error(&pdf, error),
                }
            }
            (i, outcome)
        }))
        .buffer_unordered(config.concurrency)
        .collect()
        .await;

    outcomes.sort_by_key(|(i, _)| *i);
    let report = BatchReport {
        files: outcomes.into_iter().map(|(_, o)| o).collect(),
    };

    info!(
        "Batch complete: {}/{} files converted",
        report.succeeded(),
        total
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total, report.succeeded());
    }

    Ok(report)
}

/// Read PDF metadata without parsing any question.
pub async fn inspect(path: impl AsRef<Path>) -> Result<DocumentMetadata, QuizError> {
    inspect_with(path, &ConversionConfig::default()).await
}

/// [`inspect`] using the extractor and password from `config`.
pub async fn inspect_with(
    path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<DocumentMetadata, QuizError> {
    let source = PdfSource::File(input::resolve_pdf(path)?);
    let extractor = resolve_extractor(config);
    let password = config.password.clone();
    tokio::task::spawn_blocking(move || extractor.metadata(&source, password.as_deref()))
        .await
        .map_err(|e| QuizError::Internal(format!("Task join error: {}", e)))?
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Pick the page extractor: the one injected through the config, else pdfium.
fn resolve_extractor(config: &ConversionConfig) -> Arc<dyn PageExtractor> {
    match config.extractor {
        Some(ref extractor) => Arc::clone(extractor),
        None => Arc::new(PdfiumExtractor) as Arc<dyn PageExtractor>,
    }
}

async fn extract(
    source: PdfSource,
    config: &ConversionConfig,
) -> Result<ExtractedDocument, QuizError> {
    let extractor = resolve_extractor(config);
    let password = config.password.clone();
    let pages = config.pages.clone();
    tokio::task::spawn_blocking(move || extractor.extract(&source, password.as_deref(), &pages))
        .await
        .map_err(|e| QuizError::Internal(format!("Task join error: {}", e)))?
}

async fn convert_source(
    source: PdfSource,
    config: &ConversionConfig,
) -> Result<ConversionOutput, QuizError> {
    let total_start = Instant::now();
    info!("Starting conversion: {}", source.label().display());

    // ── Step 1: Extract pages ────────────────────────────────────────────
    let extract_start = Instant::now();
    let extracted = extract(source, config).await?;
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;
    debug!(
        "Extracted {} pages in {}ms",
        extracted.pages.len(),
        extract_duration_ms
    );

    // ── Step 2: Parse questions ──────────────────────────────────────────
    let parsed = parse_pages_with_title(
        &extracted.pages,
        config,
        extracted.metadata.title.as_deref(),
    );

    // ── Step 3: Emit markup ──────────────────────────────────────────────
    let markup = emit(&parsed.document)?;

    let stats = ConversionStats {
        total_pages: extracted.metadata.page_count,
        processed_pages: extracted.pages.len(),
        blocks: parsed.blocks,
        questions: parsed.document.questions.len(),
        dropped_blocks: parsed.dropped,
        exhibits: parsed.exhibits,
        warnings: parsed.warnings.len(),
        extract_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Conversion complete: {} questions, {} warnings, {}ms total",
        stats.questions, stats.warnings, stats.total_duration_ms
    );

    Ok(ConversionOutput {
        markup,
        document: parsed.document,
        warnings: parsed.warnings,
        metadata: extracted.metadata,
        stats,
    })
}

async fn convert_one(pdf: &Path, config: &ConversionConfig) -> FileOutcome {
    let output_path = input::markup_path_for(pdf);
    let result = match convert(pdf, config).await {
        Ok(output) => write_markup(&output_path, &output.markup)
            .await
            .map(|()| output),
        Err(e) => Err(e),
    };

    match result {
        Ok(output) => FileOutcome::Converted {
            input: pdf.to_path_buf(),
            output: output_path,
            stats: output.stats,
            warnings: output.warnings,
        },
        Err(e) => {
            warn!("Skipping {}: {}", pdf.display(), e);
            FileOutcome::Failed {
                input: pdf.to_path_buf(),
                error: e.to_string(),
            }
        }
    }
}

/// Write markup atomically: a sibling `.md.tmp` file renamed into place.
///
/// The temporary file is removed again when the write or the rename fails.
pub async fn write_markup(path: impl AsRef<Path>, contents: &str) -> Result<(), QuizError> {
    let path = path.as_ref();
    let write_err = |e| QuizError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("md.tmp");
    let written = match tokio::fs::write(&tmp_path, contents).await {
        Ok(()) => tokio::fs::rename(&tmp_path, path).await,
        Err(e) => Err(e),
    };
    if let Err(e) = written {
        if let Err(cleanup) = tokio::fs::remove_file(&tmp_path).await {
            debug!("Could not remove {}: {}", tmp_path.display(), cleanup);
        }
        return Err(write_err(e));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoPages;

    impl PageExtractor for NoPages {
        fn extract(
            &self,
            _source: &PdfSource,
            _password: Option<&str>,
            _selection: &crate::config::PageSelection,
        ) -> Result<ExtractedDocument, QuizError> {
            Ok(ExtractedDocument::default())
        }

        fn metadata(
            &self,
            _source: &PdfSource,
            _password: Option<&str>,
        ) -> Result<DocumentMetadata, QuizError> {
            Ok(DocumentMetadata {
                title: Some("injected".into()),
                ..DocumentMetadata::default()
            })
        }
    }

    #[test]
    fn injected_extractor_is_preferred() {
        let injected: Arc<dyn PageExtractor> = Arc::new(NoPages);
        let config = ConversionConfig::builder()
            .extractor(Arc::clone(&injected))
            .build()
            .unwrap();
        assert!(Arc::ptr_eq(&resolve_extractor(&config), &injected));

        let source = PdfSource::File(PathBuf::from("unused.pdf"));
        let meta = resolve_extractor(&config).metadata(&source, None).unwrap();
        assert_eq!(meta.title.as_deref(), Some("injected"));
    }

    #[tokio::test]
    async fn write_markup_leaves_no_tmp_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("quiz.md");
        write_markup(&out, "---\n---\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "---\n---\n");
        assert!(!out.with_extension("md.tmp").exists());
    }

    #[tokio::test]
    async fn failed_rename_removes_tmp_file() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory cannot be replaced by a file.
        let out = dir.path().join("quiz.md");
        std::fs::create_dir(&out).unwrap();
        std::fs::write(out.join("keep"), "x").unwrap();

        let err = write_markup(&out, "---\n---\n").await.unwrap_err();
        assert!(matches!(err, QuizError::OutputWriteFailed { .. }));
        assert!(!out.with_extension("md.tmp").exists());
        assert!(out.join("keep").exists());
    }

    #[tokio::test]
    async fn missing_file_is_fatal() {
        let err = convert("/definitely/not/here.pdf", &ConversionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, QuizError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn bytes_must_look_like_pdf() {
        let err = convert_from_bytes(b"hello", &ConversionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, QuizError::NotAPdf { .. }));
    }
}
