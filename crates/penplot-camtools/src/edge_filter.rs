//! Edge filtering capability
//!
//! In the deployed system blurring and edge detection run on the FPGA and
//! only the binary edge raster comes back. [`EdgeFilter`] is the seam for
//! doing the same work on the host, which lets a full plan run without the
//! accelerator attached.

use crate::raster::from_luma;
use image::DynamicImage;
use penplot_core::RasterFrame;
use serde::{Deserialize, Serialize};

/// Turns a source image into a binary edge frame
pub trait EdgeFilter: Send + Sync {
    /// Filter `image` into a frame where ON marks an edge pixel
    fn filter(&self, image: &DynamicImage) -> RasterFrame;
}

impl<F> EdgeFilter for F
where
    F: Fn(&DynamicImage) -> RasterFrame + Send + Sync,
{
    fn filter(&self, image: &DynamicImage) -> RasterFrame {
        self(image)
    }
}

/// Grayscale, Gaussian blur, then Canny hysteresis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CannyEdgeFilter {
    /// Gaussian blur standard deviation; values <= 0 skip blurring
    pub blur_sigma: f32,
    /// Lower hysteresis threshold
    pub low_threshold: f32,
    /// Upper hysteresis threshold
    pub high_threshold: f32,
}

impl Default for CannyEdgeFilter {
    fn default() -> Self {
        Self {
            blur_sigma: 1.0,
            low_threshold: 50.0,
            high_threshold: 150.0,
        }
    }
}

impl EdgeFilter for CannyEdgeFilter {
    fn filter(&self, image: &DynamicImage) -> RasterFrame {
        let gray = image.to_luma8();
        let blurred = if self.blur_sigma > 0.0 {
            imageproc::filter::gaussian_blur_f32(&gray, self.blur_sigma)
        } else {
            gray
        };
        let edges = imageproc::edges::canny(&blurred, self.low_threshold, self.high_threshold);
        from_luma(&edges)
    }
}
