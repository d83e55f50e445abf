//! Test support utilities for produce-qa.
//!
//! Provides port mocks, a scripted detector, and synthetic produce photos
//! for testing the grading pipeline.
//!
//! # Example
//!
//! ```
//! use produce_qa_test_support::{MockImageSource, ProduceImageBuilder};
//!
//! let clean = ProduceImageBuilder::red_apple(200);
//! let bruised = ProduceImageBuilder::bruised_apple(200, 3);
//!
//! let source = MockImageSource::new(vec![clean, bruised]);
//! ```

mod builders;
mod mocks;

pub use builders::{ProduceImageBuilder, APPLE_RED, BACKDROP, BANANA_YELLOW, BRUISE};
pub use mocks::{MockDetector, MockImageSource, MockProgressSink, MockReportOutput};
