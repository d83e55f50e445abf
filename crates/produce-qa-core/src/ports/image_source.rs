//! Where product photos come from.

use crate::domain::ImageInfo;

/// Port for loading product photos.
pub trait ImageSource: Send + Sync {
    /// Iterates over the photos, decoding lazily.
    ///
    /// # Errors
    ///
    /// Individual items are errors when a photo cannot be read or decoded.
    fn images(&self) -> Box<dyn Iterator<Item = anyhow::Result<ImageInfo>> + Send + '_>;

    /// Number of photos, if known up front.
    fn count_hint(&self) -> Option<usize>;
}
