//! Integration tests for raster image loading.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::cast_possible_truncation)]

use std::path::{Path, PathBuf};

use image::{DynamicImage, Rgb, RgbImage};
use produce_qa_adapters::{exif_metadata, load_image, FsImageSource};
use produce_qa_core::{ImageInfo, ImageSource};

const FORMATS: &[&str] = &["jpg", "png", "tiff", "webp", "bmp", "gif"];

fn sample_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 20) as u8, (y * 20) as u8, 128])
    }))
}

/// Writes one 8x8 image per supported format into a fresh temp dir.
fn fixtures() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for ext in FORMATS {
        sample_image(8, 8)
            .save(dir.path().join(format!("test.{ext}")))
            .unwrap();
    }
    dir
}

fn load_single(path: PathBuf) -> ImageInfo {
    let source = FsImageSource::new(vec![path], false);
    let images: Vec<_> = source.images().collect();
    assert_eq!(images.len(), 1);
    images.into_iter().next().unwrap().expect("should load")
}

#[test]
fn test_load_each_format() {
    let dir = fixtures();
    for ext in FORMATS {
        let info = load_single(dir.path().join(format!("test.{ext}")));
        assert_eq!((info.width, info.height), (8, 8), "format {ext}");
        assert!(info.path.ends_with(&format!("test.{ext}")));
    }
}

#[test]
fn test_load_directory() {
    let dir = fixtures();
    std::fs::write(dir.path().join("notes.txt"), "not an image").unwrap();
    let source = FsImageSource::new(vec![dir.path().to_path_buf()], false);

    let images: Vec<_> = source.images().collect();
    assert_eq!(images.len(), FORMATS.len());
    for result in images {
        let info: ImageInfo = result.expect("all fixtures should load");
        assert_eq!(info.width, 8);
    }
}

#[test]
fn test_directory_order_is_sorted() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["c.png", "a.png", "b.png"] {
        sample_image(4, 4).save(dir.path().join(name)).unwrap();
    }
    let source = FsImageSource::new(vec![dir.path().to_path_buf()], false);
    let names: Vec<String> = source
        .images()
        .map(|r| r.unwrap().stem().unwrap_or_default())
        .collect();
    assert_eq!(names, ["a", "b", "c"]);
}

#[test]
fn test_recursive_scan() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("crate-7");
    std::fs::create_dir(&nested).unwrap();
    sample_image(4, 4).save(dir.path().join("top.png")).unwrap();
    sample_image(4, 4).save(nested.join("inner.png")).unwrap();

    let flat = FsImageSource::new(vec![dir.path().to_path_buf()], false);
    assert_eq!(flat.count_hint(), Some(1));
    let deep = FsImageSource::new(vec![dir.path().to_path_buf()], true);
    assert_eq!(deep.count_hint(), Some(2));
}

#[test]
fn test_missing_and_unsupported_paths_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let text = dir.path().join("readme.md");
    std::fs::write(&text, "# hi").unwrap();
    let source = FsImageSource::new(vec![dir.path().join("missing.jpg"), text], false);
    assert_eq!(source.count_hint(), Some(0));
    assert_eq!(source.images().count(), 0);
}

#[test]
fn test_corrupt_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.jpg");
    std::fs::write(&path, b"\xFF\xD8 truncated").unwrap();
    let source = FsImageSource::new(vec![path], false);
    let results: Vec<_> = source.images().collect();
    assert_eq!(results.len(), 1);
    let err = results.into_iter().next().unwrap().unwrap_err();
    assert!(format!("{err:#}").contains("broken.jpg"));
}

/// Minimal big-endian EXIF APP1 segment holding only an orientation tag.
fn exif_app1(orientation: u8) -> Vec<u8> {
    let mut tiff = vec![b'M', b'M', 0x00, 0x2A, 0x00, 0x00, 0x00, 0x08];
    tiff.extend_from_slice(&[0x00, 0x01]);
    tiff.extend_from_slice(&[0x01, 0x12, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01]);
    tiff.extend_from_slice(&[0x00, orientation, 0x00, 0x00]);
    tiff.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);

    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(&tiff);
    let len = u16::try_from(payload.len() + 2).unwrap();

    let mut segment = vec![0xFF, 0xE1];
    segment.extend_from_slice(&len.to_be_bytes());
    segment.extend_from_slice(&payload);
    segment
}

fn write_oriented_jpeg(dir: &Path, orientation: u8) -> PathBuf {
    let path = dir.join("phone.jpg");
    sample_image(40, 20).save(&path).unwrap();
    let jpeg = std::fs::read(&path).unwrap();
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
    let mut patched = jpeg[..2].to_vec();
    patched.extend_from_slice(&exif_app1(orientation));
    patched.extend_from_slice(&jpeg[2..]);
    std::fs::write(&path, patched).unwrap();
    path
}

#[test]
fn test_exif_orientation_is_applied() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_oriented_jpeg(dir.path(), 6);

    let info = load_image(&path).unwrap();
    assert_eq!((info.width, info.height), (20, 40));

    let exif = exif_metadata(&path).expect("EXIF block present");
    assert!(exif.contains_key("Orientation"));
}

#[test]
fn test_upright_orientation_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_oriented_jpeg(dir.path(), 1);
    let info = load_image(&path).unwrap();
    assert_eq!((info.width, info.height), (40, 20));
}
