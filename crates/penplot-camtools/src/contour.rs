//! Contour extraction
//!
//! [`ContourTracer`] is the narrow seam to whatever tracing library turns a
//! binary raster into pixel polylines. [`ContourAdapter`] validates the
//! frame, runs the tracer and drops contours that are too short to draw.
//!
//! The order of the returned polylines is whatever the tracer produced and
//! carries no meaning; the path orderer decides the plot order.

use crate::raster::to_luma;
use penplot_core::{PixelPoint, PixelPolyline, RasterError, RasterFrame};
use serde::{Deserialize, Serialize};

/// Default minimum number of points for a contour to be kept
pub const DEFAULT_MIN_LENGTH: usize = 2;

/// Trait for contour tracing strategies.
///
/// Input: a binary frame (ON pixels are edges).
/// Output: every boundary polyline found, holes included, not only the
/// outermost borders.
pub trait ContourTracer: Send + Sync {
    /// Trace contours in the given frame
    fn trace(&self, frame: &RasterFrame) -> Vec<PixelPolyline>;
}

impl<F> ContourTracer for F
where
    F: Fn(&RasterFrame) -> Vec<PixelPolyline> + Send + Sync,
{
    fn trace(&self, frame: &RasterFrame) -> Vec<PixelPolyline> {
        self(frame)
    }
}

/// Selects which contour tracing algorithm to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContourTracerKind {
    /// Suzuki-Abe border following via `imageproc::contours::find_contours`.
    ///
    /// Returns outer borders and hole borders alike.
    #[default]
    BorderFollowing,
}

impl ContourTracer for ContourTracerKind {
    fn trace(&self, frame: &RasterFrame) -> Vec<PixelPolyline> {
        match *self {
            Self::BorderFollowing => trace_border_following(frame),
        }
    }
}

fn trace_border_following(frame: &RasterFrame) -> Vec<PixelPolyline> {
    let luma = to_luma(frame);
    let contours: Vec<imageproc::contours::Contour<i32>> =
        imageproc::contours::find_contours(&luma);

    contours
        .into_iter()
        .map(|c| {
            PixelPolyline::new(
                c.points
                    .into_iter()
                    .map(|p| PixelPoint::new(p.x, p.y))
                    .collect(),
            )
        })
        .collect()
}

/// Frame-to-polyline stage with short contour filtering
pub struct ContourAdapter {
    tracer: Box<dyn ContourTracer>,
    min_length: usize,
}

impl std::fmt::Debug for ContourAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContourAdapter")
            .field("min_length", &self.min_length)
            .finish_non_exhaustive()
    }
}

impl Default for ContourAdapter {
    fn default() -> Self {
        Self::new(Box::new(ContourTracerKind::default()), DEFAULT_MIN_LENGTH)
    }
}

impl ContourAdapter {
    /// Create an adapter around a tracer
    pub fn new(tracer: Box<dyn ContourTracer>, min_length: usize) -> Self {
        Self { tracer, min_length }
    }

    /// Minimum points a contour needs to survive
    pub fn min_length(&self) -> usize {
        self.min_length
    }

    /// Trace `frame` and keep contours with at least `min_length` points.
    pub fn extract(&self, frame: &RasterFrame) -> Result<Vec<PixelPolyline>, RasterError> {
        frame.validate()?;

        let traced = self.tracer.trace(frame);
        let total = traced.len();
        let kept: Vec<PixelPolyline> = traced
            .into_iter()
            .filter(|c| c.len() >= self.min_length)
            .collect();

        tracing::debug!(
            "Traced {} contours, kept {} with >= {} points",
            total,
            kept.len(),
            self.min_length
        );
        Ok(kept)
    }
}
