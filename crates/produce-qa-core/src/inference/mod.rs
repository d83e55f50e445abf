//! Detection inference.
//!
//! [`SsdDetector`] runs a trained produce/defect model with Candle;
//! [`HeuristicDetector`] is the model-free fallback.

mod device;
mod heuristic;
mod loader;
mod ssd;
mod utils;

pub use device::get_device;
pub use heuristic::HeuristicDetector;
pub use loader::{load_safetensors, LazyModel, ModelBuilder};
pub use ssd::{DetectorConfig, ProduceNet, SsdDetector, INPUT_SIZE, NUM_ANCHORS};
pub use utils::{iou, nms, sigmoid};
