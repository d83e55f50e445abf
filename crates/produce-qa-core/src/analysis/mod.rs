//! Preprocessing and whole-image measurements that feed the factors.

pub mod capture;
pub mod preprocess;
pub mod sample;

pub use capture::{capture_metrics, composition, estimated_weight, ripeness, Composition};
pub use preprocess::{crop, preprocess, PreprocessConfig, Preprocessed};
pub use sample::{ObjectGeometry, Sample};
