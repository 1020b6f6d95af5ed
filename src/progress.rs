//! Progress-callback trait for job stage and per-line synthesis events.
//!
//! Inject an [`Arc<dyn JobProgressCallback>`] via
//! [`crate::config::PodcastConfigBuilder::progress_callback`] to follow a job
//! as it moves through its stages and voices each line.
//!
//! # Example
//!
//! ```rust
//! use pdf2podcast::{JobProgressCallback, JobStage, PodcastConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct LineCounter {
//!     voiced: AtomicUsize,
//! }
//!
//! impl JobProgressCallback for LineCounter {
//!     fn on_line_complete(&self, line_index: usize, total_lines: usize, audio_len: usize) {
//!         let done = self.voiced.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("line {} voiced ({done}/{total_lines}, {audio_len} bytes)", line_index + 1);
//!     }
//! }
//!
//! let config = PodcastConfig::builder()
//!     .openai_api_key("sk-test")
//!     .progress_callback(Arc::new(LineCounter { voiced: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::job::JobStage;
use std::sync::Arc;

/// Called by the job runner as it progresses.
///
/// Line events fire from concurrent synthesis tasks, so implementations must
/// be `Send + Sync` and protect shared mutable state. Every method has a
/// no-op default.
pub trait JobProgressCallback: Send + Sync {
    /// The job entered `stage`. [`JobStage::Failed`] and [`JobStage::Done`]
    /// are each reported at most once, last.
    fn on_stage(&self, stage: JobStage) {
        let _ = stage;
    }

    /// The LLM answer failed validation; `attempt` (1-based) will be retried.
    fn on_generation_retry(&self, attempt: u32, max_attempts: u32, error: &str) {
        let _ = (attempt, max_attempts, error);
    }

    /// The dialogue script is ready and synthesis is about to start.
    fn on_script_ready(&self, total_lines: usize, total_chars: usize) {
        let _ = (total_lines, total_chars);
    }

    /// A TTS request for `line_index` (0-based) was dispatched.
    fn on_line_start(&self, line_index: usize, total_lines: usize) {
        let _ = (line_index, total_lines);
    }

    /// Audio for `line_index` arrived.
    fn on_line_complete(&self, line_index: usize, total_lines: usize, audio_len: usize) {
        let _ = (line_index, total_lines, audio_len);
    }

    /// The TTS request for `line_index` failed; the job will abort.
    fn on_line_error(&self, line_index: usize, total_lines: usize, error: &str) {
        let _ = (line_index, total_lines, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl JobProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PodcastConfig`].
pub type ProgressCallback = Arc<dyn JobProgressCallback>;
