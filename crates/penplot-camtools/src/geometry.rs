//! Geometry Transformer
//!
//! Pixel to millimeter conversion, Ramer-Douglas-Peucker simplification
//! and fixed-step densification. Applied in that order; densification is
//! optional because some controllers interpolate on their own.

use penplot_core::{MmPoint, MmPolyline, ParameterError, PixelPoint, PixelPolyline};
use serde::{Deserialize, Serialize};

/// Transformation parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeometryParams {
    /// Millimeters per pixel, applied to both axes
    pub pixel_to_mm: f64,
    /// Pixel that maps to (0, 0) mm
    #[serde(default)]
    pub origin: PixelPoint,
    /// RDP tolerance in mm; 0 keeps every non-colinear point
    pub rdp_epsilon: f64,
    /// Maximum gap between consecutive points in mm, `None` disables
    /// densification
    pub densify_step: Option<f64>,
}

impl Default for GeometryParams {
    fn default() -> Self {
        Self {
            pixel_to_mm: 0.5,
            origin: PixelPoint::new(0, 0),
            rdp_epsilon: 0.1,
            densify_step: Some(0.2),
        }
    }
}

impl GeometryParams {
    /// Check every parameter is usable
    pub fn validate(&self) -> Result<(), ParameterError> {
        check_ratio(self.pixel_to_mm)?;
        check_epsilon(self.rdp_epsilon)?;
        if let Some(step) = self.densify_step {
            check_step(step)?;
        }
        Ok(())
    }
}

fn check_ratio(ratio: f64) -> Result<(), ParameterError> {
    if ratio.is_finite() && ratio > 0.0 {
        Ok(())
    } else {
        Err(ParameterError::out_of_range("pixel_to_mm", ratio, "> 0"))
    }
}

fn check_epsilon(epsilon: f64) -> Result<(), ParameterError> {
    if epsilon.is_finite() && epsilon >= 0.0 {
        Ok(())
    } else {
        Err(ParameterError::out_of_range("rdp_epsilon", epsilon, ">= 0"))
    }
}

fn check_step(step: f64) -> Result<(), ParameterError> {
    if step.is_finite() && step > 0.0 {
        Ok(())
    } else {
        Err(ParameterError::out_of_range("densify_step", step, "> 0"))
    }
}

/// Convert a pixel polyline to millimeters: `mm = (pixel - origin) * ratio`
pub fn pixels_to_mm(polyline: &PixelPolyline, origin: PixelPoint, ratio: f64) -> MmPolyline {
    let ox = f64::from(origin.x);
    let oy = f64::from(origin.y);
    MmPolyline::new(
        polyline
            .points()
            .iter()
            .map(|p| MmPoint::new((f64::from(p.x) - ox) * ratio, (f64::from(p.y) - oy) * ratio))
            .collect(),
    )
}

/// Distance from `p` to the chord `a`-`b`.
///
/// Perpendicular distance while the projection lands on the chord,
/// distance to the nearer endpoint otherwise. A zero-length chord falls
/// back to plain point distance.
fn chord_distance(p: &MmPoint, a: &MmPoint, b: &MmPoint) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return p.distance(a);
    }

    let t = ((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq;
    if t <= 0.0 {
        p.distance(a)
    } else if t >= 1.0 {
        p.distance(b)
    } else {
        ((p.y - a.y) * dx - (p.x - a.x) * dy).abs() / len_sq.sqrt()
    }
}

/// Ramer-Douglas-Peucker simplification.
///
/// Keeps both endpoints and every interior point farther than `epsilon`
/// from the chord of its enclosing kept pair. Works off an explicit stack
/// of index ranges, so long contours cannot exhaust the call stack.
pub fn rdp_simplify(polyline: &MmPolyline, epsilon: f64) -> Result<MmPolyline, ParameterError> {
    check_epsilon(epsilon)?;

    let points = polyline.points();
    let n = points.len();
    if n <= 2 {
        return Ok(polyline.clone());
    }

    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;

    let mut stack = vec![(0usize, n - 1)];
    while let Some((start, end)) = stack.pop() {
        if end <= start + 1 {
            continue;
        }

        let mut max_dist = 0.0;
        let mut max_index = start;
        for i in start + 1..end {
            let d = chord_distance(&points[i], &points[start], &points[end]);
            if d > max_dist {
                max_dist = d;
                max_index = i;
            }
        }

        if max_dist > epsilon {
            keep[max_index] = true;
            stack.push((start, max_index));
            stack.push((max_index, end));
        }
    }

    Ok(MmPolyline::new(
        points
            .iter()
            .zip(keep)
            .filter_map(|(p, k)| k.then_some(*p))
            .collect(),
    ))
}

/// Insert evenly spaced points so no gap exceeds `step_mm`.
///
/// Each edge is split into `ceil(length / step_mm)` pieces; zero-length
/// edges are collapsed.
pub fn densify(polyline: &MmPolyline, step_mm: f64) -> Result<MmPolyline, ParameterError> {
    check_step(step_mm)?;

    let points = polyline.points();
    let Some(&first) = points.first() else {
        return Ok(MmPolyline::default());
    };

    let mut out = Vec::with_capacity(points.len());
    out.push(first);
    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let length = a.distance(&b);
        if length == 0.0 {
            continue;
        }

        let segments = ((length / step_mm).ceil() as usize).max(1);
        for k in 1..segments {
            out.push(a.lerp(&b, k as f64 / segments as f64));
        }
        out.push(b);
    }

    Ok(MmPolyline::new(out))
}

/// Pixel polylines in, plot-ready millimeter polylines out
#[derive(Debug, Clone, Copy)]
pub struct GeometryTransformer {
    params: GeometryParams,
}

impl GeometryTransformer {
    /// Create a transformer after validating `params`
    pub fn new(params: GeometryParams) -> Result<Self, ParameterError> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Active parameters
    pub fn params(&self) -> &GeometryParams {
        &self.params
    }

    /// Convert, simplify and optionally densify one polyline
    pub fn transform(&self, polyline: &PixelPolyline) -> Result<MmPolyline, ParameterError> {
        let p = &self.params;
        let mm = pixels_to_mm(polyline, p.origin, p.pixel_to_mm);
        let simplified = rdp_simplify(&mm, p.rdp_epsilon)?;
        match p.densify_step {
            Some(step) => densify(&simplified, step),
            None => Ok(simplified),
        }
    }

    /// Transform every polyline, keeping order
    pub fn transform_all(
        &self,
        polylines: &[PixelPolyline],
    ) -> Result<Vec<MmPolyline>, ParameterError> {
        let out = polylines
            .iter()
            .map(|p| self.transform(p))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            "Transformed {} polylines: {} -> {} points",
            out.len(),
            polylines.iter().map(PixelPolyline::len).sum::<usize>(),
            out.iter().map(MmPolyline::len).sum::<usize>()
        );
        Ok(out)
    }
}
