//! Page extraction: pull positioned text runs and embedded images out of a PDF.
//!
//! [`PageExtractor`] is the seam between the parsing core and the PDF
//! library. The default [`PdfiumExtractor`] drives `pdfium-render`; tests and
//! embedders can supply any other implementation through
//! [`crate::config::ConversionConfigBuilder::extractor`].
//!
//! ## Coordinates
//!
//! PDF user space has its origin at the bottom-left corner with `y` growing
//! upward. Everything leaving this module is flipped to top-down coordinates
//! (`y = page_height - y_pdf`) so that ascending `y` means reading order.
//!
//! ## Threading
//!
//! pdfium keeps thread-local state and is not async-safe. Callers run
//! [`PageExtractor::extract`] inside `tokio::task::spawn_blocking`.

use crate::config::PageSelection;
use crate::error::QuizError;
use crate::model::{BoundingBox, Page, RawFragment, RawImage};
use crate::output::DocumentMetadata;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Where the PDF bytes come from.
#[derive(Debug, Clone)]
pub enum PdfSource {
    /// A file on disk.
    File(PathBuf),
    /// An in-memory document; `label` names it in errors and logs.
    Bytes { label: PathBuf, data: Vec<u8> },
}

impl PdfSource {
    /// Path used in error messages.
    pub fn label(&self) -> &Path {
        match self {
            PdfSource::File(p) => p,
            PdfSource::Bytes { label, .. } => label,
        }
    }
}

/// Everything read from a document before parsing starts.
#[derive(Debug, Clone, Default)]
pub struct ExtractedDocument {
    pub metadata: DocumentMetadata,
    pub pages: Vec<Page>,
}

/// Turns a PDF into pages of positioned fragments and images.
///
/// Implementations must preserve reading order and page numbering, and fail
/// with [`QuizError::Decode`] (or a more specific fatal variant) when the
/// document cannot be read.
pub trait PageExtractor: Send + Sync {
    fn extract(
        &self,
        source: &PdfSource,
        password: Option<&str>,
        selection: &PageSelection,
    ) -> Result<ExtractedDocument, QuizError>;

    /// Read document metadata without touching page content.
    fn metadata(
        &self,
        source: &PdfSource,
        password: Option<&str>,
    ) -> Result<DocumentMetadata, QuizError>;
}

/// [`PageExtractor`] backed by the pdfium C++ library.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfiumExtractor;

impl PageExtractor for PdfiumExtractor {
    fn extract(
        &self,
        source: &PdfSource,
        password: Option<&str>,
        selection: &PageSelection,
    ) -> Result<ExtractedDocument, QuizError> {
        let pdfium = bind_pdfium()?;
        let document = load_document(&pdfium, source, password)?;
        let metadata = read_metadata(&document);

        let total_pages = metadata.page_count;
        let indices = selection.to_indices(total_pages);
        if indices.is_empty() {
            return Err(QuizError::PageOutOfRange {
                page: 0,
                total: total_pages,
            });
        }
        info!(
            "PDF loaded: {} pages, reading {}",
            total_pages,
            indices.len()
        );

        let pages = document.pages();
        let mut extracted = Vec::with_capacity(indices.len());
        for idx in indices {
            let page = pages
                .get(idx as u16)
                .map_err(|e| QuizError::ExtractionFailed {
                    page: idx + 1,
                    detail: format!("{:?}", e),
                })?;
            extracted.push(extract_page(&page, idx)?);
        }

        Ok(ExtractedDocument {
            metadata,
            pages: extracted,
        })
    }

    fn metadata(
        &self,
        source: &PdfSource,
        password: Option<&str>,
    ) -> Result<DocumentMetadata, QuizError> {
        let pdfium = bind_pdfium()?;
        let document = load_document(&pdfium, source, password)?;
        Ok(read_metadata(&document))
    }
}

/// Bind to pdfium: `PDFIUM_LIB_PATH` first, then the working directory, then
/// the system library path.
fn bind_pdfium() -> Result<Pdfium, QuizError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(path) if !path.is_empty() => Pdfium::bind_to_library(&path),
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| QuizError::PdfiumBindingFailed(format!("{:?}", e)))?;

    Ok(Pdfium::new(bindings))
}

fn load_document<'a>(
    pdfium: &'a Pdfium,
    source: &'a PdfSource,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, QuizError> {
    let loaded = match source {
        PdfSource::File(path) => pdfium.load_pdf_from_file(path, password),
        PdfSource::Bytes { data, .. } => pdfium.load_pdf_from_byte_slice(data, password),
    };

    loaded.map_err(|e| {
        let path = source.label().to_path_buf();
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                QuizError::WrongPassword { path }
            } else {
                QuizError::PasswordRequired { path }
            }
        } else {
            QuizError::Decode {
                path,
                detail: err_str,
            }
        }
    })
}

fn extract_page(page: &PdfPage<'_>, idx: usize) -> Result<Page, QuizError> {
    let height = page.height().value;

    let text = page.text().map_err(|e| QuizError::ExtractionFailed {
        page: idx + 1,
        detail: format!("{:?}", e),
    })?;

    let fragments: Vec<RawFragment> = text
        .segments()
        .iter()
        .map(|segment| {
            let bounds = segment.bounds();
            RawFragment::new(
                segment.text(),
                idx,
                height - bounds.top().value,
                bounds.left().value,
            )
        })
        .collect();

    let mut images = Vec::new();
    for object in page.objects().iter() {
        let Some(image_object) = object.as_image_object() else {
            continue;
        };

        let bounds = match object.bounds() {
            Ok(b) => b,
            Err(e) => {
                warn!("Page {}: image without bounds skipped: {:?}", idx + 1, e);
                continue;
            }
        };

        let bytes = match image_object.get_raw_image() {
            Ok(img) => match encode_png(&img) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("Page {}: image could not be re-encoded: {}", idx + 1, e);
                    continue;
                }
            },
            Err(e) => {
                warn!("Page {}: image data unreadable: {:?}", idx + 1, e);
                continue;
            }
        };

        images.push(RawImage {
            bytes,
            page: idx,
            bbox: BoundingBox {
                left: bounds.left().value,
                top: height - bounds.top().value,
                right: bounds.right().value,
                bottom: height - bounds.bottom().value,
            },
        });
    }

    debug!(
        "Extracted page {}: {} text runs, {} images",
        idx + 1,
        fragments.len(),
        images.len()
    );

    Ok(Page {
        index: idx,
        fragments,
        images,
    })
}

fn read_metadata(document: &PdfDocument<'_>) -> DocumentMetadata {
    let metadata = document.metadata();

    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        page_count: document.pages().len() as usize,
        pdf_version: format!("{:?}", document.version()),
    }
}

/// Re-encode a decoded image as PNG.
///
/// pdfium hands back decoded pixels regardless of the stream filter, so every
/// exhibit is normalised to lossless PNG.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!(
        "Encoded {}x{} image → {} bytes PNG",
        img.width(),
        img.height(),
        buf.len()
    );
    Ok(buf)
}
