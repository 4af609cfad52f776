//! Input resolution: validate a single PDF path or list a directory of them.
//!
//! We check the PDF magic bytes (`%PDF`) before handing a file to pdfium so
//! callers get a meaningful error rather than an opaque decode failure.

use crate::error::QuizError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// What the user pointed the converter at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    /// A single PDF file.
    File(PathBuf),
    /// A directory whose top-level PDFs are converted.
    Directory(PathBuf),
}

/// Classify a user-supplied path as file or directory.
pub fn classify_input(path: impl AsRef<Path>) -> Result<InputKind, QuizError> {
    let path = path.as_ref().to_path_buf();
    if path.is_dir() {
        Ok(InputKind::Directory(path))
    } else if path.exists() {
        Ok(InputKind::File(path))
    } else {
        Err(QuizError::FileNotFound { path })
    }
}

/// Resolve a local file path, validating existence and PDF magic bytes.
pub fn resolve_pdf(path: impl AsRef<Path>) -> Result<PathBuf, QuizError> {
    let path = path.as_ref().to_path_buf();

    if !path.exists() {
        return Err(QuizError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != b"%PDF" {
                return Err(QuizError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(QuizError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(QuizError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(path)
}

/// Check that bytes held in memory look like a PDF.
pub fn check_pdf_bytes(bytes: &[u8], label: &Path) -> Result<(), QuizError> {
    if bytes.len() >= 4 && &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(QuizError::NotAPdf {
            path: label.to_path_buf(),
            magic,
        });
    }
    Ok(())
}

/// List the PDFs directly inside `dir` (non-recursive), sorted by path.
///
/// Both `.pdf` and `.PDF` extensions are accepted.
pub fn list_pdfs(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, QuizError> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(QuizError::NotADirectory {
            path: dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => QuizError::PermissionDenied {
            path: dir.to_path_buf(),
        },
        _ => QuizError::Internal(format!("reading {}: {e}", dir.display())),
    })?;

    let mut pdfs: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|p| p.is_file() && has_pdf_extension(p))
        .collect();
    pdfs.sort();

    if pdfs.is_empty() {
        return Err(QuizError::NoPdfFiles {
            path: dir.to_path_buf(),
        });
    }
    debug!("Found {} PDF(s) in {}", pdfs.len(), dir.display());
    Ok(pdfs)
}

/// The `.md` file written next to a PDF in directory mode.
pub fn markup_path_for(pdf: &Path) -> PathBuf {
    pdf.with_extension("md")
}

fn has_pdf_extension(path: &Path) -> bool {
    matches!(path.extension().and_then(|e| e.to_str()), Some("pdf" | "PDF"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdf_extension_matching() {
        assert!(has_pdf_extension(Path::new("exam.pdf")));
        assert!(has_pdf_extension(Path::new("EXAM.PDF")));
        assert!(!has_pdf_extension(Path::new("exam.Pdf")));
        assert!(!has_pdf_extension(Path::new("exam.md")));
        assert!(!has_pdf_extension(Path::new("pdf")));
    }

    #[test]
    fn markup_path_swaps_extension() {
        assert_eq!(
            markup_path_for(Path::new("/tmp/AZ-900.pdf")),
            PathBuf::from("/tmp/AZ-900.md")
        );
    }

    #[test]
    fn magic_check_on_bytes() {
        assert!(check_pdf_bytes(b"%PDF-1.7\n", Path::new("mem")).is_ok());
        let err = check_pdf_bytes(b"PK\x03\x04zip", Path::new("mem")).unwrap_err();
        assert!(matches!(err, QuizError::NotAPdf { .. }));
    }

    #[test]
    fn missing_path_is_not_found() {
        let err = classify_input("/definitely/not/here.pdf").unwrap_err();
        assert!(matches!(err, QuizError::FileNotFound { .. }));
    }

    #[test]
    fn list_pdfs_is_sorted_and_flat() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("b.pdf"), b"%PDF").unwrap();
        std::fs::write(dir.path().join("a.PDF"), b"%PDF").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"hi").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested/c.pdf"), b"%PDF").unwrap();

        let found = list_pdfs(dir.path()).expect("list");
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.PDF", "b.pdf"]);
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = list_pdfs(dir.path()).unwrap_err();
        assert!(matches!(err, QuizError::NoPdfFiles { .. }));
    }

    #[test]
    fn resolve_rejects_non_pdf() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("fake.pdf");
        std::fs::write(&path, b"<html></html>").unwrap();
        let err = resolve_pdf(&path).unwrap_err();
        assert!(matches!(err, QuizError::NotAPdf { .. }));
    }
}
