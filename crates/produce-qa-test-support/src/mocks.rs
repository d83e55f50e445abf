//! Mock implementations of core port traits.

use std::sync::{Arc, Mutex, PoisonError};

use produce_qa_core::domain::{Detection, Detector, ImageInfo, QualityReport};
use produce_qa_core::ports::{ImageSource, ProgressEvent, ProgressSink, ReportOutput};

/// Mock implementation of `ImageSource` for testing.
///
/// Yields pre-built images and tracks iteration for assertions.
pub struct MockImageSource {
    images: Vec<ImageInfo>,
    iteration_count: Arc<Mutex<usize>>,
}

impl MockImageSource {
    /// Creates a new mock source with the given images.
    #[must_use]
    pub fn new(images: Vec<ImageInfo>) -> Self {
        Self {
            images,
            iteration_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Creates an empty mock source.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(vec![])
    }

    /// Returns the number of times the source has been iterated.
    #[must_use]
    pub fn iteration_count(&self) -> usize {
        *self
            .iteration_count
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl ImageSource for MockImageSource {
    fn images(&self) -> Box<dyn Iterator<Item = anyhow::Result<ImageInfo>> + Send + '_> {
        let count = Arc::clone(&self.iteration_count);
        if let Ok(mut c) = count.lock() {
            *c += 1;
        }
        Box::new(self.images.iter().cloned().map(Ok))
    }

    fn count_hint(&self) -> Option<usize> {
        Some(self.images.len())
    }
}

/// Mock implementation of `ReportOutput` for testing.
///
/// Captures reports for later assertions.
pub struct MockReportOutput {
    reports: Arc<Mutex<Vec<QualityReport>>>,
    flush_count: Arc<Mutex<usize>>,
}

impl MockReportOutput {
    /// Creates a new mock output.
    #[must_use]
    pub fn new() -> Self {
        Self {
            reports: Arc::new(Mutex::new(Vec::new())),
            flush_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Returns all captured reports.
    #[must_use]
    pub fn reports(&self) -> Vec<QualityReport> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of times `flush()` was called.
    #[must_use]
    pub fn flush_count(&self) -> usize {
        *self
            .flush_count
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockReportOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportOutput for MockReportOutput {
    fn write(&self, report: &QualityReport) -> anyhow::Result<()> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(report.clone());
        Ok(())
    }

    fn flush(&self) -> anyhow::Result<()> {
        if let Ok(mut c) = self.flush_count.lock() {
            *c += 1;
        }
        Ok(())
    }
}

/// Mock implementation of `ProgressSink` for testing.
///
/// Captures events for later assertions.
pub struct MockProgressSink {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl MockProgressSink {
    /// Creates a new mock progress sink.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns all captured events.
    #[must_use]
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of `Started` events.
    #[must_use]
    pub fn started_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ProgressEvent::Started { .. }))
            .count()
    }

    /// Returns the number of `Completed` events.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ProgressEvent::Completed { .. }))
            .count()
    }

    /// Returns the number of `Skipped` events.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ProgressEvent::Skipped { .. }))
            .count()
    }

    /// Returns whether a `Finished` event was received.
    #[must_use]
    pub fn has_finished(&self) -> bool {
        self.events()
            .iter()
            .any(|e| matches!(e, ProgressEvent::Finished { .. }))
    }

    /// Returns the final counts from the `Finished` event, if any.
    #[must_use]
    pub fn finished_counts(&self) -> Option<(usize, usize)> {
        self.events().iter().find_map(|e| match e {
            ProgressEvent::Finished { processed, skipped } => Some((*processed, *skipped)),
            _ => None,
        })
    }
}

impl Default for MockProgressSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for MockProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

/// Scripted `Detector` returning fixed detections or a fixed failure.
pub struct MockDetector {
    detections: Vec<Detection>,
    failure: Option<String>,
    calls: Arc<Mutex<usize>>,
}

impl MockDetector {
    /// A detector that always returns `detections`.
    #[must_use]
    pub fn returning(detections: Vec<Detection>) -> Self {
        Self {
            detections,
            failure: None,
            calls: Arc::new(Mutex::new(0)),
        }
    }

    /// A detector that always fails with `message`.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            detections: Vec::new(),
            failure: Some(message.into()),
            calls: Arc::new(Mutex::new(0)),
        }
    }

    /// Returns how many images were passed to `detect`.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Detector for MockDetector {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn detect(&self, _image: &image::DynamicImage) -> anyhow::Result<Vec<Detection>> {
        *self.calls.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        match &self.failure {
            Some(message) => Err(anyhow::anyhow!("{message}")),
            None => Ok(self.detections.clone()),
        }
    }
}
