//! Compute device selection.

use candle_core::Device;
use tracing::{debug, info};

/// Picks the device for detector inference.
///
/// With `force_cpu` unset, tries Metal then CUDA when the matching cargo
/// feature is enabled, and falls back to the CPU.
#[must_use]
pub fn get_device(force_cpu: bool) -> Device {
    if force_cpu {
        debug!("CPU inference requested");
        return Device::Cpu;
    }

    #[cfg(feature = "metal")]
    match Device::new_metal(0) {
        Ok(device) => {
            info!("Detector running on Metal");
            return device;
        }
        Err(e) => debug!("Metal unavailable: {e}"),
    }

    #[cfg(feature = "cuda")]
    match Device::new_cuda(0) {
        Ok(device) => {
            info!("Detector running on CUDA");
            return device;
        }
        Err(e) => debug!("CUDA unavailable: {e}"),
    }

    info!("Detector running on CPU");
    Device::Cpu
}
