//! Progress tracking and callback system for export jobs

use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::domain::errors::DomainError;
use crate::domain::model::ExportState;
use crate::domain::rules::{EtaEstimate, ProgressRules};

/// Progress callback trait for UI integration
pub trait ProgressCallback: Send + Sync {
    /// Called on every progress change
    fn on_progress(&self, progress: &ExportProgress);

    /// Called once when the artifact is ready
    fn on_complete(&self, _filename: &str) {}

    /// Called when the job fails or is cancelled
    fn on_error(&self, _error: &DomainError) {}
}

/// Snapshot delivered to callbacks
#[derive(Debug, Clone, PartialEq)]
pub struct ExportProgress {
    pub clip_number: u32,
    pub state: ExportState,
    /// 0.0 - 100.0, non-decreasing while capturing
    pub percent: f64,
    pub elapsed: Duration,
    pub eta: EtaEstimate,
}

/// Monotonic progress tracker with thread-safe updates
#[derive(Clone)]
pub struct ProgressTracker {
    inner: Arc<Mutex<TrackerInner>>,
    callbacks: Arc<Mutex<Vec<Arc<dyn ProgressCallback>>>>,
}

struct TrackerInner {
    clip_number: u32,
    state: ExportState,
    percent: f64,
    started: Option<Instant>,
    completed: bool,
}

impl TrackerInner {
    fn snapshot(&self) -> ExportProgress {
        let elapsed = self.started.map(|s| s.elapsed()).unwrap_or_default();
        let eta = if self.completed {
            EtaEstimate::Finishing
        } else {
            ProgressRules::estimate_remaining(self.percent, elapsed)
        };
        ExportProgress {
            clip_number: self.clip_number,
            state: self.state,
            percent: self.percent,
            elapsed,
            eta,
        }
    }
}

impl ProgressTracker {
    pub fn new(clip_number: u32) -> Self {
        let inner = TrackerInner {
            clip_number,
            state: ExportState::Idle,
            percent: 0.0,
            started: None,
            completed: false,
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
            callbacks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn add_callback(&self, callback: Arc<dyn ProgressCallback>) {
        self.callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(callback);
    }

    /// Record a state change without emitting
    pub fn set_state(&self, state: ExportState) {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).state = state;
    }

    /// Start the capture clock and emit 0%
    pub fn start(&self) {
        let snapshot = {
            let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            inner.state = ExportState::Capturing;
            inner.percent = 0.0;
            inner.started = Some(Instant::now());
            inner.snapshot()
        };
        self.notify(|cb| cb.on_progress(&snapshot));
    }

    /// Capture progress; lower values than already reported are ignored
    pub fn update(&self, percent: f64) {
        let snapshot = {
            let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            if inner.completed {
                return;
            }
            let clamped = percent.clamp(0.0, ProgressRules::CAPTURE_CEILING);
            if clamped > inner.percent {
                inner.percent = clamped;
            }
            inner.snapshot()
        };
        self.notify(|cb| cb.on_progress(&snapshot));
    }

    /// Emit 100% exactly once
    pub fn complete(&self) {
        let snapshot = {
            let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            if inner.completed {
                return;
            }
            inner.completed = true;
            inner.percent = 100.0;
            inner.state = ExportState::Finalizing;
            inner.snapshot()
        };
        self.notify(|cb| cb.on_progress(&snapshot));
    }

    pub fn finish(&self, filename: &str) {
        self.set_state(ExportState::Done);
        self.notify(|cb| cb.on_complete(filename));
    }

    pub fn fail(&self, error: &DomainError) {
        self.set_state(ExportState::Failed);
        self.notify(|cb| cb.on_error(error));
    }

    pub fn percent(&self) -> f64 {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).percent
    }

    pub fn snapshot(&self) -> ExportProgress {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot()
    }

    fn notify<F>(&self, f: F)
    where
        F: Fn(&dyn ProgressCallback),
    {
        let callbacks = self
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for callback in callbacks.iter() {
            f(callback.as_ref());
        }
    }
}

/// Single-line console progress on stderr
pub struct ConsoleProgressCallback {
    last_whole_percent: Mutex<Option<u32>>,
}

impl ConsoleProgressCallback {
    pub fn new() -> Self {
        Self {
            last_whole_percent: Mutex::new(None),
        }
    }
}

impl Default for ConsoleProgressCallback {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressCallback for ConsoleProgressCallback {
    fn on_progress(&self, progress: &ExportProgress) {
        let whole = progress.percent.floor() as u32;
        {
            let mut last = self
                .last_whole_percent
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if *last == Some(whole) {
                return;
            }
            *last = Some(whole);
        }

        let bar_length = 20;
        let filled = (progress.percent / 100.0 * bar_length as f64) as usize;
        let bar = "#".repeat(filled.min(bar_length)) + &"-".repeat(bar_length - filled.min(bar_length));
        let mut stderr = std::io::stderr().lock();
        let _ = write!(
            stderr,
            "\rclip {} [{}] {:>3}% {}   ",
            progress.clip_number, bar, whole, progress.eta
        );
        let _ = stderr.flush();
    }

    fn on_complete(&self, filename: &str) {
        eprintln!("\nExported {}", filename);
    }

    fn on_error(&self, error: &DomainError) {
        eprintln!("\nExport stopped: {}", error);
    }
}

/// JSON progress events on stdout, one per line
pub struct JsonProgressCallback;

impl ProgressCallback for JsonProgressCallback {
    fn on_progress(&self, progress: &ExportProgress) {
        let event = serde_json::json!({
            "event": "progress",
            "clip_number": progress.clip_number,
            "state": progress.state.to_string(),
            "percent": progress.percent,
            "elapsed_secs": progress.elapsed.as_secs_f64(),
            "eta": progress.eta.to_string(),
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        println!("{}", event);
    }

    fn on_complete(&self, filename: &str) {
        let event = serde_json::json!({
            "event": "complete",
            "filename": filename,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        println!("{}", event);
    }

    fn on_error(&self, error: &DomainError) {
        let event = serde_json::json!({
            "event": "error",
            "error": error.to_string(),
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        println!("{}", event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<f64>>,
        completed: Mutex<Option<String>>,
    }

    impl ProgressCallback for Recorder {
        fn on_progress(&self, progress: &ExportProgress) {
            self.seen.lock().unwrap().push(progress.percent);
        }

        fn on_complete(&self, filename: &str) {
            *self.completed.lock().unwrap() = Some(filename.to_string());
        }
    }

    #[test]
    fn test_tracker_is_monotonic_and_capped() {
        let tracker = ProgressTracker::new(1);
        let recorder = Arc::new(Recorder::default());
        tracker.add_callback(recorder.clone());

        tracker.start();
        tracker.update(40.0);
        tracker.update(20.0);
        tracker.update(150.0);

        let seen = recorder.seen.lock().unwrap().clone();
        assert_eq!(seen, vec![0.0, 40.0, 40.0, 99.0]);
    }

    #[test]
    fn test_tracker_completes_once() {
        let tracker = ProgressTracker::new(2);
        let recorder = Arc::new(Recorder::default());
        tracker.add_callback(recorder.clone());

        tracker.start();
        tracker.complete();
        tracker.complete();
        tracker.update(50.0);
        tracker.finish("clip_2_x.mp4");

        let seen = recorder.seen.lock().unwrap().clone();
        assert_eq!(seen.iter().filter(|p| **p == 100.0).count(), 1);
        assert_eq!(seen.last(), Some(&100.0));
        assert_eq!(recorder.completed.lock().unwrap().as_deref(), Some("clip_2_x.mp4"));
        assert_eq!(tracker.snapshot().state, ExportState::Done);
    }

    #[test]
    fn test_snapshot_before_start_is_calculating() {
        let tracker = ProgressTracker::new(3);
        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.percent, 0.0);
        assert_eq!(snapshot.eta, EtaEstimate::Calculating);
    }
}
