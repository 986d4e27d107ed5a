//! FPGA payload preparation
//!
//! The accelerator takes the source image as raw RGB triplets, row-major,
//! resized to the agreed frame geometry. The same bytes can be dumped as a
//! `.mem` text file for loading into simulation or block RAM.

use image::imageops::FilterType;
use image::DynamicImage;
use penplot_core::artifact;
use penplot_core::ArtifactError;
use std::path::Path;

/// Pixels per line in `.mem` dumps
const MEM_PIXELS_PER_LINE: usize = 8;

/// Load an image from disk, reporting missing and undecodable files as
/// precondition failures
pub fn load_image(path: &Path) -> penplot_core::Result<DynamicImage> {
    if !path.exists() {
        return Err(ArtifactError::Missing {
            path: path.to_path_buf(),
        }
        .into());
    }
    image::open(path).map_err(|e| {
        ArtifactError::Unreadable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }
        .into()
    })
}

/// Resize to `width`x`height` (Lanczos3, aspect ratio ignored) and emit
/// `width * height * 3` RGB bytes row-major
pub fn rgb_payload(image: &DynamicImage, width: u32, height: u32) -> Vec<u8> {
    let resized = if image.width() == width && image.height() == height {
        image.to_rgb8()
    } else {
        image.resize_exact(width, height, FilterType::Lanczos3).to_rgb8()
    };
    resized.into_raw()
}

/// Write an RGB payload as `.mem` text: six hex digits per pixel, eight
/// pixels per line. A trailing partial pixel is dropped.
pub fn write_mem(path: &Path, payload: &[u8]) -> penplot_core::Result<()> {
    let pixels: Vec<&[u8]> = payload.chunks_exact(3).collect();
    let lines: Vec<String> = pixels
        .chunks(MEM_PIXELS_PER_LINE)
        .map(|row| {
            let words: Vec<String> = row
                .iter()
                .map(|px| format!("{:02X}{:02X}{:02X}", px[0], px[1], px[2]))
                .collect();
            format!("{}\n", words.join(" "))
        })
        .collect();

    artifact::write_lines(path, &lines)?;
    tracing::debug!("Wrote {} pixels to {}", pixels.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_payload_length_and_order() {
        let img = RgbImage::from_fn(2, 1, |x, _| if x == 0 { Rgb([1, 2, 3]) } else { Rgb([4, 5, 6]) });
        let payload = rgb_payload(&DynamicImage::ImageRgb8(img), 2, 1);
        assert_eq!(payload, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_payload_resizes() {
        let img = RgbImage::from_pixel(40, 30, Rgb([200, 100, 50]));
        let payload = rgb_payload(&DynamicImage::ImageRgb8(img), 17, 24);
        assert_eq!(payload.len(), 17 * 24 * 3);
    }

    #[test]
    fn test_mem_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.mem");
        let payload: Vec<u8> = (0..9u8 * 3).collect();
        write_mem(&path, &payload).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("000102 030405"));
        assert_eq!(lines[0].split(' ').count(), 8);
        assert_eq!(lines[1], "18191A");
    }

    #[test]
    fn test_load_missing_image() {
        let err = load_image(Path::new("/nonexistent/penplot/source.png")).unwrap_err();
        assert!(err.is_precondition_failed());
    }
}
