//! Filesystem adapter for loading product photos.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::DynamicImage;
use produce_qa_core::{ImageInfo, ImageSource};
use tracing::{debug, warn};

/// Supported image extensions.
const RASTER_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tiff", "tif", "webp", "bmp", "gif"];

/// Filesystem image source adapter.
pub struct FsImageSource {
    paths: Vec<PathBuf>,
    recursive: bool,
}

impl FsImageSource {
    /// Creates a new filesystem image source.
    ///
    /// # Arguments
    ///
    /// * `paths` - Files or directories to scan
    /// * `recursive` - Whether to recurse into subdirectories
    #[must_use]
    pub const fn new(paths: Vec<PathBuf>, recursive: bool) -> Self {
        Self { paths, recursive }
    }

    /// Collects all image files from the configured paths.
    ///
    /// Directory contents are sorted so batches run in a stable order.
    fn collect_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();

        for path in &self.paths {
            if path.is_file() {
                if is_supported_image(path) {
                    files.push(path.clone());
                } else {
                    warn!("Unsupported file type: {}", path.display());
                }
            } else if path.is_dir() {
                let mut found = Vec::new();
                self.collect_from_dir(path, &mut found);
                found.sort();
                files.extend(found);
            } else {
                warn!("Path does not exist: {}", path.display());
            }
        }

        files
    }

    fn collect_from_dir(&self, dir: &Path, files: &mut Vec<PathBuf>) {
        let entries = match std::fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) => {
                warn!("Failed to read directory {}: {e}", dir.display());
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() && is_supported_image(&path) {
                files.push(path);
            } else if path.is_dir() && self.recursive {
                self.collect_from_dir(&path, files);
            }
        }
    }
}

impl ImageSource for FsImageSource {
    fn images(&self) -> Box<dyn Iterator<Item = Result<ImageInfo>> + Send + '_> {
        let files = self.collect_files();
        debug!("Found {} image files", files.len());

        Box::new(files.into_iter().map(|path| load_image(&path)))
    }

    fn count_hint(&self) -> Option<usize> {
        Some(self.collect_files().len())
    }
}

/// Checks if a path has a supported image extension.
fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .is_some_and(|e| RASTER_EXTENSIONS.contains(&e.as_str()))
}

/// Loads an image from the filesystem, turned upright per its EXIF
/// orientation.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or decoded.
pub fn load_image(path: &Path) -> Result<ImageInfo> {
    let image =
        image::open(path).with_context(|| format!("Failed to open image: {}", path.display()))?;

    let image = match read_orientation(path) {
        Some(orientation) if orientation != 1 => {
            debug!(orientation, "Applying EXIF orientation to {}", path.display());
            apply_orientation(image, orientation)
        }
        _ => image,
    };

    Ok(ImageInfo::new(path.to_string_lossy(), image))
}

fn read_exif(path: &Path) -> Option<exif::Exif> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    exif::Reader::new().read_from_container(&mut reader).ok()
}

/// EXIF orientation tag (0x0112) of the primary image, if present.
fn read_orientation(path: &Path) -> Option<u32> {
    let exif = read_exif(path)?;
    exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?
        .value
        .get_uint(0)
}

/// Rotates/flips `image` so an EXIF-oriented photo displays upright.
///
/// Values outside 1-8 leave the image unchanged.
#[must_use]
pub fn apply_orientation(image: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => image.fliph(),
        3 => image.rotate180(),
        4 => image.flipv(),
        5 => image.rotate90().fliph(),
        6 => image.rotate90(),
        7 => image.rotate270().fliph(),
        8 => image.rotate270(),
        _ => image,
    }
}

/// Reads all EXIF fields of the primary image as display strings.
///
/// Returns `None` when the file has no readable EXIF block.
#[must_use]
pub fn exif_metadata(path: &Path) -> Option<HashMap<String, String>> {
    let exif = read_exif(path)?;
    let mut data = HashMap::new();
    for field in exif.fields() {
        if field.ifd_num != exif::In::PRIMARY {
            continue;
        }
        let key = field.tag.to_string();
        let value = field.display_value().with_unit(&exif).to_string();
        data.insert(key, value);
    }

    if data.is_empty() {
        None
    } else {
        Some(data)
    }
}
