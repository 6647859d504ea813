//! Clip export engine module

pub mod compositor;
pub mod exporter;
pub mod job;
pub mod progress;

pub use compositor::FrameCompositor;
pub use exporter::{CancelSignal, ClipExporter, DEFAULT_SEEK_TIMEOUT};
pub use job::{ExportSlot, JobLease, JobStatus};
pub use progress::{
    ConsoleProgressCallback, ExportProgress, JsonProgressCallback, ProgressCallback,
    ProgressTracker,
};
