//! Batch progress notifications.

use crate::domain::QualityReport;

/// Events emitted while grading a batch.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Grading started for a photo.
    Started {
        /// Path to the photo.
        path: String,
        /// Index in the batch (0-based).
        index: usize,
        /// Batch size, if known.
        total: Option<usize>,
    },
    /// A photo was graded.
    Completed {
        /// The report.
        report: Box<QualityReport>,
    },
    /// A photo could not be graded.
    Skipped {
        /// Path to the photo.
        path: String,
        /// Why it was skipped.
        reason: String,
    },
    /// The batch is done.
    Finished {
        /// Photos graded.
        processed: usize,
        /// Photos skipped.
        skipped: usize,
    },
}

/// Port for receiving progress events.
pub trait ProgressSink: Send + Sync {
    /// Called for every event, in order.
    fn on_event(&self, event: ProgressEvent);
}
