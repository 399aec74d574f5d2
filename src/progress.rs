//! Progress reporting and cooperative cancellation for document conversion.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the converter finishes each page. Pages are processed strictly
//! one at a time, so events for a single conversion never overlap.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2bw::{ConversionConfig, ConversionProgress, ConversionProgressCallback};
//! use std::sync::Arc;
//!
//! struct PrintingCallback;
//!
//! impl ConversionProgressCallback for PrintingCallback {
//!     fn on_page_complete(&self, progress: ConversionProgress) {
//!         eprintln!(
//!             "{}/{} ({:.0}%)",
//!             progress.pages_completed,
//!             progress.pages_total,
//!             progress.fraction() * 100.0
//!         );
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(PrintingCallback))
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Snapshot emitted once per completed page.
///
/// `pages_completed` only ever increases within one conversion, and
/// `0 <= pages_completed <= pages_total` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionProgress {
    pub pages_completed: usize,
    pub pages_total: usize,
}

impl ConversionProgress {
    /// Completed share in `[0.0, 1.0]`. An empty document counts as done.
    pub fn fraction(&self) -> f64 {
        if self.pages_total == 0 {
            1.0
        } else {
            self.pages_completed as f64 / self.pages_total as f64
        }
    }

    pub fn is_finished(&self) -> bool {
        self.pages_completed >= self.pages_total
    }
}

/// Called by the document converter as it processes each page.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before the first page is rasterised.
    fn on_conversion_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before a page is rasterised.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — total pages in the document
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called after a page has been processed and handed to the assembler.
    fn on_page_complete(&self, progress: ConversionProgress) {
        let _ = progress;
    }

    /// Called when a page fails. The conversion aborts right after.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after every page was assembled and the document finalised.
    fn on_conversion_complete(&self, total_pages: usize) {
        let _ = total_pages;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

/// Shared flag checked by the converter between pages.
///
/// Clones share the same underlying flag, so a clone handed to a signal
/// handler or UI thread can stop a conversion running elsewhere. There is
/// no mid-page interruption: the page in flight always finishes first.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    struct TrackingCallback {
        starts: AtomicUsize,
        errors: AtomicUsize,
        started_total: AtomicUsize,
        seen: Mutex<Vec<ConversionProgress>>,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_conversion_start(&self, total_pages: usize) {
            self.started_total.store(total_pages, Ordering::SeqCst);
        }

        fn on_page_start(&self, _page_num: usize, _total_pages: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_complete(&self, progress: ConversionProgress) {
            self.seen.lock().unwrap().push(progress);
        }

        fn on_page_error(&self, _page_num: usize, _total_pages: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_conversion_start(5);
        cb.on_page_start(1, 5);
        cb.on_page_complete(ConversionProgress {
            pages_completed: 1,
            pages_total: 5,
        });
        cb.on_page_error(2, 5, "some error");
        cb.on_conversion_complete(5);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback {
            starts: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
            started_total: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        };

        tracker.on_conversion_start(2);
        tracker.on_page_start(1, 2);
        tracker.on_page_complete(ConversionProgress {
            pages_completed: 1,
            pages_total: 2,
        });
        tracker.on_page_start(2, 2);
        tracker.on_page_error(2, 2, "render failed");

        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn progress_fraction() {
        let p = ConversionProgress {
            pages_completed: 3,
            pages_total: 4,
        };
        assert!((p.fraction() - 0.75).abs() < f64::EPSILON);
        assert!(!p.is_finished());

        let empty = ConversionProgress {
            pages_completed: 0,
            pages_total: 0,
        };
        assert_eq!(empty.fraction(), 1.0);
        assert!(empty.is_finished());
    }

    #[test]
    fn cancel_flag_is_shared_between_clones() {
        let flag = CancelFlag::new();
        let handle = flag.clone();
        assert!(!flag.is_cancelled());
        handle.cancel();
        assert!(flag.is_cancelled());
    }
}
