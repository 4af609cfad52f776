//! Progress-callback trait for directory conversion events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as [`crate::convert::convert_dir`] works through a folder of exam
//! exports. The trait is `Send + Sync` because documents are converted
//! concurrently.
//!
//! # Example
//!
//! ```rust
//! use vce2flashquiz::{ConversionProgressCallback, ConversionConfig};
//! use std::path::Path;
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     questions: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_file_complete(&self, path: &Path, questions: usize, warnings: usize) {
//!         self.questions.fetch_add(questions, Ordering::SeqCst);
//!         eprintln!("{}: {questions} questions, {warnings} warnings", path.display());
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { questions: AtomicUsize::new(0) });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by the batch runner as it processes each document.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. `on_file_*` may be called concurrently from
/// different tasks; protect shared state accordingly.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before any file is opened.
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called just before a file is extracted.
    fn on_file_start(&self, path: &Path) {
        let _ = path;
    }

    /// Called when a file converted and its markup was written.
    ///
    /// # Arguments
    /// * `questions` — questions emitted
    /// * `warnings`  — recoverable problems recorded for the file
    fn on_file_complete(&self, path: &Path, questions: usize, warnings: usize) {
        let _ = (path, questions, warnings);
    }

    /// Called when a file failed fatally and was skipped.
    fn on_file_error(&self, path: &Path, error: &str) {
        let _ = (path, error);
    }

    /// Called once after every file has been attempted.
    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        let _ = (total_files, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        questions: AtomicUsize,
        succeeded: AtomicUsize,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_file_start(&self, _path: &Path) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_file_complete(&self, _path: &Path, questions: usize, _warnings: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
            self.questions.fetch_add(questions, Ordering::SeqCst);
        }

        fn on_file_error(&self, _path: &Path, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_batch_complete(&self, _total_files: usize, success_count: usize) {
            self.succeeded.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(2);
        cb.on_file_start(Path::new("a.pdf"));
        cb.on_file_complete(Path::new("a.pdf"), 10, 1);
        cb.on_file_error(Path::new("b.pdf"), "corrupt");
        cb.on_batch_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_file_start(Path::new("a.pdf"));
        tracker.on_file_complete(Path::new("a.pdf"), 40, 0);
        tracker.on_file_start(Path::new("b.pdf"));
        tracker.on_file_complete(Path::new("b.pdf"), 25, 3);
        tracker.on_file_start(Path::new("c.pdf"));
        tracker.on_file_error(Path::new("c.pdf"), "not a PDF");
        tracker.on_batch_complete(3, 2);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.questions.load(Ordering::SeqCst), 65);
        assert_eq!(tracker.succeeded.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_batch_start(1);
        cb.on_file_complete(Path::new("x.pdf"), 1, 0);
    }
}
