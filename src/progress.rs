//! Progress-callback trait for per-stage review events.
//!
//! Inject an [`Arc<dyn ReviewProgressCallback>`] via
//! [`crate::config::AnalysisConfigBuilder::progress_callback`] to be told when
//! each pipeline stage starts and how long it took. The CLI uses it to drive
//! a spinner and print "extraction took 1.2s" lines; a web front-end could
//! forward the same events to its own widgets.
//!
//! # Example
//!
//! ```rust
//! use deck_coach::{AnalysisConfig, ReviewProgressCallback, Stage};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! struct Timings;
//!
//! impl ReviewProgressCallback for Timings {
//!     fn on_stage_complete(&self, stage: Stage, elapsed: Duration) {
//!         eprintln!("{} took {:.1}s", stage, elapsed.as_secs_f64());
//!     }
//! }
//!
//! let config = AnalysisConfig::builder()
//!     .progress_callback(Arc::new(Timings) as Arc<dyn ReviewProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// The three timed stages of a review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    /// Reading text and images out of the uploaded file.
    Extraction,
    /// Captioning embedded images.
    Captioning,
    /// The analysis chat call.
    Analysis,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Extraction => "extraction",
            Stage::Captioning => "captioning",
            Stage::Analysis => "analysis",
        })
    }
}

/// Called by the review pipeline as it moves through its stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
///
/// # Thread safety
///
/// `on_caption_complete` may be called from whichever task finishes a
/// caption; implementations must be `Send + Sync`.
pub trait ReviewProgressCallback: Send + Sync {
    /// Called right before a stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage has finished, successfully or not.
    fn on_stage_complete(&self, stage: Stage, elapsed: Duration) {
        let _ = (stage, elapsed);
    }

    /// Called once per image as its caption request settles.
    ///
    /// # Arguments
    /// * `index` — 1-indexed image number
    /// * `total` — number of images being captioned
    /// * `ok`    — `false` when the placeholder caption was used
    fn on_caption_complete(&self, index: usize, total: usize, ok: bool) {
        let _ = (index, total, ok);
    }

    /// Called for every non-fatal problem (unreadable file, skipped image).
    fn on_warning(&self, message: &str) {
        let _ = message;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ReviewProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AnalysisConfig`].
pub type ProgressCallback = Arc<dyn ReviewProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        started: Mutex<Vec<Stage>>,
        completed: Mutex<Vec<Stage>>,
        captions_failed: AtomicUsize,
        warnings: AtomicUsize,
    }

    impl ReviewProgressCallback for TrackingCallback {
        fn on_stage_start(&self, stage: Stage) {
            self.started.lock().unwrap().push(stage);
        }

        fn on_stage_complete(&self, stage: Stage, _elapsed: Duration) {
            self.completed.lock().unwrap().push(stage);
        }

        fn on_caption_complete(&self, _index: usize, _total: usize, ok: bool) {
            if !ok {
                self.captions_failed.fetch_add(1, Ordering::SeqCst);
            }
        }

        fn on_warning(&self, _message: &str) {
            self.warnings.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_stage_start(Stage::Extraction);
        cb.on_stage_complete(Stage::Extraction, Duration::from_millis(5));
        cb.on_caption_complete(1, 3, false);
        cb.on_warning("corrupt file");
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_stage_start(Stage::Captioning);
        tracker.on_caption_complete(1, 2, true);
        tracker.on_caption_complete(2, 2, false);
        tracker.on_stage_complete(Stage::Captioning, Duration::from_secs(1));
        tracker.on_warning("image too large");

        assert_eq!(*tracker.started.lock().unwrap(), vec![Stage::Captioning]);
        assert_eq!(*tracker.completed.lock().unwrap(), vec![Stage::Captioning]);
        assert_eq!(tracker.captions_failed.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.warnings.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stage_display() {
        assert_eq!(Stage::Extraction.to_string(), "extraction");
        assert_eq!(Stage::Analysis.to_string(), "analysis");
    }
}
