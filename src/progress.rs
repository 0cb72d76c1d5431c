//! Progress-callback trait for per-submission batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::AssemblyConfigBuilder::progress_callback`] to receive
//! events as the assembler works through the directory.
//!
//! # Example
//!
//! ```rust
//! use abstract2tex::{BatchProgressCallback, AssemblyConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     rendered: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_submission_complete(&self, index: usize, total: usize, file: &str) {
//!         self.rendered.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}/{} {}", index, total, file);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { rendered: AtomicUsize::new(0) });
//!
//! let config = AssemblyConfig::builder()
//!     .progress_callback(counter as Arc<dyn BatchProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the assembler as it processes each submission.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Indices are 1-based.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once after discovery, before any submission is converted.
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called before a submission is handed to the converter.
    fn on_submission_start(&self, index: usize, total: usize, file: &str) {
        let _ = (index, total, file);
    }

    /// Called when a figure file was paired with the submission.
    fn on_figure_matched(&self, index: usize, file: &str, figure: &str) {
        let _ = (index, file, figure);
    }

    /// Called when the submission's block was appended to the output file.
    fn on_submission_complete(&self, index: usize, total: usize, file: &str) {
        let _ = (index, total, file);
    }

    /// Called when the submission was skipped or failed.
    ///
    /// # Arguments
    /// * `reason`: human-readable description naming what to fix
    fn on_submission_skipped(&self, index: usize, total: usize, file: &str, reason: &str) {
        let _ = (index, total, file, reason);
    }

    /// Called once after every submission has been attempted.
    fn on_batch_complete(&self, total: usize, rendered: usize) {
        let _ = (total, rendered);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AssemblyConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
