//! Pixel-level building blocks shared by the factor extractors.
//!
//! Everything here works on `image` buffers and plain `f32` planes; no
//! external image-processing crate is involved.

pub mod color;
pub mod filters;
pub mod histogram;
pub mod segment;

pub use color::{circular_hue_std, rgb_to_hsv, rgb_to_lab, Hsv};
pub use filters::Plane;
pub use histogram::Histogram;
pub use segment::{
    background_color, circularity, contour_perimeter, foreground_mask, ComponentStats, Components,
    Mask,
};
