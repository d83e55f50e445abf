//! Boundaries between the grading core and its collaborators.
//!
//! Callers supply images through [`ImageSource`], receive reports through
//! [`ReportOutput`] and follow batch progress through [`ProgressSink`].

mod image_source;
mod progress;
mod report_output;

pub use image_source::ImageSource;
pub use progress::{ProgressEvent, ProgressSink};
pub use report_output::ReportOutput;
