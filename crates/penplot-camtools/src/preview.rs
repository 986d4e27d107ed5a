//! Plot preview rendering
//!
//! Draws an ordered path into an RGB image: strokes in the pen color and
//! pen-up transitions as thin red links, so ordering quality can be judged
//! without running the plotter.

use crate::optimizer::OrderedPath;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use penplot_core::{ArtifactError, PixelPoint};
use std::path::Path;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const STROKE: Rgb<u8> = Rgb([20, 40, 160]);
const TRAVEL: Rgb<u8> = Rgb([220, 30, 30]);

fn as_f32(p: PixelPoint) -> (f32, f32) {
    (p.x as f32, p.y as f32)
}

/// Render `path` on a `width`x`height` canvas in pixel coordinates.
///
/// With `start` set, the first pen-up link is drawn from it.
pub fn render(width: u32, height: u32, path: &OrderedPath, start: Option<PixelPoint>) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(width, height, BACKGROUND);
    let mut cursor = start;

    for polyline in path.polylines() {
        let (Some(first), Some(last)) = (polyline.start(), polyline.end()) else {
            continue;
        };
        if let Some(from) = cursor {
            draw_line_segment_mut(&mut canvas, as_f32(from), as_f32(first), TRAVEL);
        }
        for pair in polyline.points().windows(2) {
            draw_line_segment_mut(&mut canvas, as_f32(pair[0]), as_f32(pair[1]), STROKE);
        }
        if polyline.len() == 1 && first.x >= 0 && first.y >= 0 {
            let (x, y) = (first.x as u32, first.y as u32);
            if x < width && y < height {
                canvas.put_pixel(x, y, STROKE);
            }
        }
        cursor = Some(last);
    }

    canvas
}

/// Save a rendered preview; the format follows the file extension
pub fn save(path: &Path, image: &RgbImage) -> penplot_core::Result<()> {
    image.save(path).map_err(|e| ArtifactError::WriteFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    tracing::info!("Saved preview to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::PathOrderer;
    use penplot_core::PixelPolyline;

    #[test]
    fn test_render_strokes_and_travel() {
        let path = PathOrderer::new(Some(PixelPoint::new(0, 0))).order(vec![
            PixelPolyline::from_coords(&[(2, 2), (8, 2)]),
            PixelPolyline::from_coords(&[(8, 8), (2, 8)]),
        ]);
        let img = render(10, 10, &path, Some(PixelPoint::new(0, 0)));

        assert_eq!(img.dimensions(), (10, 10));
        assert_eq!(*img.get_pixel(5, 2), STROKE);
        assert_eq!(*img.get_pixel(5, 8), STROKE);
        // Link from (8,2) down to (8,8)
        assert_eq!(*img.get_pixel(8, 5), TRAVEL);
        assert_eq!(*img.get_pixel(5, 5), BACKGROUND);
    }

    #[test]
    fn test_empty_path_is_blank() {
        let img = render(4, 4, &OrderedPath::default(), None);
        assert!(img.pixels().all(|p| *p == BACKGROUND));
    }
}
