//! Image I/O: decoding blobs into RGBA rasters and encoding rasters as PNG.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::png::PngEncoder;
use image::{ImageEncoder, RgbaImage};

use crate::error::{Error, Result};

/// Decode an encoded image blob into an 8-bit RGBA raster.
///
/// The format is guessed from the content; anything the `image` crate can
/// read is accepted and converted to RGBA.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the blob is not a valid image.
pub fn decode(bytes: &[u8]) -> Result<RgbaImage> {
    let img = image::load_from_memory(bytes).map_err(Error::Decode)?;
    Ok(img.to_rgba8())
}

/// Encode an RGBA raster as a PNG blob.
///
/// # Errors
///
/// Returns [`Error::Encode`] if the PNG encoder rejects the raster.
pub fn encode_png(raster: &RgbaImage) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    PngEncoder::new(&mut out)
        .write_image(
            raster.as_raw(),
            raster.width(),
            raster.height(),
            image::ExtendedColorType::Rgba8,
        )
        .map_err(Error::Encode)?;
    Ok(out.into_inner())
}

/// Read and decode an image file.
///
/// # Errors
///
/// Returns [`Error::UnsupportedFormat`] for unknown extensions, [`Error::Io`]
/// if the file cannot be read, or [`Error::Decode`] for invalid content.
pub fn read_image(path: &Path) -> Result<RgbaImage> {
    if !is_supported_image(path) {
        return Err(Error::UnsupportedFormat(path.display().to_string()));
    }
    let bytes = std::fs::read(path)?;
    decode(&bytes)
}

/// Encode a raster as PNG and write it to `path`, creating parent directories.
///
/// # Errors
///
/// Returns an error if encoding or writing fails.
pub fn write_png(raster: &RgbaImage, path: &Path) -> Result<()> {
    let png = encode_png(raster)?;
    write_bytes(&png, path)
}

/// Write an already-encoded blob to `path`, creating parent directories.
///
/// # Errors
///
/// Returns [`Error::Io`] if the directory or file cannot be written.
pub fn write_bytes(bytes: &[u8], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Check if a file has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => matches!(
            ext.to_lowercase().as_str(),
            "jpg" | "jpeg" | "png" | "webp" | "bmp"
        ),
        None => false,
    }
}

/// Generate a default output path from an input path.
///
/// Example: `"art.jpg"` becomes `"art_print.png"`.
#[must_use]
pub fn default_output_path(input: &Path) -> PathBuf {
    suffixed_output_path(input, "print")
}

/// Build `{stem}_{suffix}.png` next to `input`.
#[must_use]
pub fn suffixed_output_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    let parent = input.parent().unwrap_or(Path::new("."));
    parent.join(format!("{stem}_{suffix}.png"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn encode_then_decode_preserves_pixels_and_alpha() {
        let mut img = RgbaImage::new(7, 5);
        img.put_pixel(3, 2, Rgba([10, 20, 30, 40]));
        img.put_pixel(6, 4, Rgba([255, 0, 128, 255]));

        let png = encode_png(&img).unwrap();
        assert_eq!(&png[1..4], b"PNG");

        let back = decode(&png).unwrap();
        assert_eq!(back.dimensions(), (7, 5));
        assert_eq!(back.as_raw(), img.as_raw());
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn default_output_path_appends_print_suffix() {
        let p = default_output_path(Path::new("/tmp/art.jpg"));
        assert_eq!(p, PathBuf::from("/tmp/art_print.png"));

        let p = suffixed_output_path(Path::new("design.png"), "esrgan-8x");
        assert_eq!(
            p.file_name().unwrap().to_str().unwrap(),
            "design_esrgan-8x.png"
        );
    }

    #[test]
    fn is_supported_image_accepts_common_formats() {
        assert!(is_supported_image(Path::new("art.jpg")));
        assert!(is_supported_image(Path::new("art.JPEG")));
        assert!(is_supported_image(Path::new("art.png")));
        assert!(is_supported_image(Path::new("art.webp")));
        assert!(is_supported_image(Path::new("art.bmp")));
        assert!(!is_supported_image(Path::new("art.gif")));
        assert!(!is_supported_image(Path::new("art")));
    }

    #[test]
    fn write_png_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.png");
        write_png(&RgbaImage::new(2, 2), &path).unwrap();
        let back = read_image(&path).unwrap();
        assert_eq!(back.dimensions(), (2, 2));
    }
}
