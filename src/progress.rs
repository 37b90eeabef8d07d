//! Progress-callback trait for per-report batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the batch works through the report list.
//!
//! # Example
//!
//! ```rust
//! use report2json::{BatchProgressCallback, ExtractionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     done: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_report_complete(&self, report_number: usize, url: &str, succeeded: bool) {
//!         self.done.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("#{report_number} {url}: {}", if succeeded { "ok" } else { "failed" });
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { done: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the batch runner as it processes each report.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Reports are processed one at a time, so events for
/// different reports never interleave.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once, after the input list is loaded.
    ///
    /// # Arguments
    /// * `total` — number of entries with a usable URL
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called just before a report is downloaded.
    fn on_report_start(&self, report_number: usize, url: &str) {
        let _ = (report_number, url);
    }

    /// Called once a report has a result, successful or not.
    ///
    /// # Arguments
    /// * `report_number` — 1-based report number
    /// * `url`           — the URL as given
    /// * `succeeded`     — `true` if the model produced a usable JSON object
    fn on_report_complete(&self, report_number: usize, url: &str, succeeded: bool) {
        let _ = (report_number, url, succeeded);
    }

    /// Called once after every report has been attempted.
    fn on_batch_complete(&self, succeeded: usize, failed: usize) {
        let _ = (succeeded, failed);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
