//! Points and polylines in pixel and millimeter space.

use serde::{Deserialize, Serialize};

/// Integer pixel coordinate, `x` to the right and `y` down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PixelPoint {
    /// Column
    pub x: i32,
    /// Row
    pub y: i32,
}

impl PixelPoint {
    /// Create a new pixel point
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in pixels
    pub fn distance(&self, other: &PixelPoint) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        dx.hypot(dy)
    }
}

impl From<(i32, i32)> for PixelPoint {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

/// Ordered pixel coordinates traced along one contour
///
/// Immutable once created; reversing yields a new polyline.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PixelPolyline {
    points: Vec<PixelPoint>,
}

impl PixelPolyline {
    /// Create a polyline from points
    pub fn new(points: Vec<PixelPoint>) -> Self {
        Self { points }
    }

    /// Build from `(x, y)` tuples
    pub fn from_coords(coords: &[(i32, i32)]) -> Self {
        Self::new(coords.iter().copied().map(PixelPoint::from).collect())
    }

    /// All points in drawing order
    pub fn points(&self) -> &[PixelPoint] {
        &self.points
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when the polyline has no points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// First point
    pub fn start(&self) -> Option<PixelPoint> {
        self.points.first().copied()
    }

    /// Last point
    pub fn end(&self) -> Option<PixelPoint> {
        self.points.last().copied()
    }

    /// Same points in the opposite direction
    pub fn reversed(&self) -> Self {
        let mut points = self.points.clone();
        points.reverse();
        Self { points }
    }

    /// Consume into the point vector
    pub fn into_points(self) -> Vec<PixelPoint> {
        self.points
    }
}

/// Physical coordinate in millimeters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MmPoint {
    /// X position in mm
    pub x: f64,
    /// Y position in mm
    pub y: f64,
}

impl MmPoint {
    /// Create a new millimeter point
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in millimeters
    pub fn distance(&self, other: &MmPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Linear interpolation towards `other` at parameter `t`
    pub fn lerp(&self, other: &MmPoint, t: f64) -> MmPoint {
        MmPoint::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }
}

/// Ordered millimeter coordinates; start-to-end order is preserved by
/// every transformation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MmPolyline {
    points: Vec<MmPoint>,
}

impl MmPolyline {
    /// Create a polyline from points
    pub fn new(points: Vec<MmPoint>) -> Self {
        Self { points }
    }

    /// Build from `(x, y)` tuples
    pub fn from_coords(coords: &[(f64, f64)]) -> Self {
        Self::new(coords.iter().map(|&(x, y)| MmPoint::new(x, y)).collect())
    }

    /// All points in drawing order
    pub fn points(&self) -> &[MmPoint] {
        &self.points
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when the polyline has no points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// First point
    pub fn start(&self) -> Option<MmPoint> {
        self.points.first().copied()
    }

    /// Last point
    pub fn end(&self) -> Option<MmPoint> {
        self.points.last().copied()
    }

    /// Drawn length along the polyline
    pub fn length(&self) -> f64 {
        self.points.windows(2).map(|w| w[0].distance(&w[1])).sum()
    }

    /// Largest gap between consecutive points
    pub fn max_step(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| w[0].distance(&w[1]))
            .fold(0.0, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_distance() {
        let a = PixelPoint::new(1, 1);
        let b = PixelPoint::new(5, 5);
        assert!((a.distance(&b) - 32f64.sqrt()).abs() < 1e-12);
        assert_eq!(a.distance(&a), 0.0);
    }

    #[test]
    fn test_reversed_keeps_original() {
        let line = PixelPolyline::from_coords(&[(0, 0), (1, 0), (2, 1)]);
        let rev = line.reversed();
        assert_eq!(rev.start(), Some(PixelPoint::new(2, 1)));
        assert_eq!(rev.end(), Some(PixelPoint::new(0, 0)));
        assert_eq!(line.start(), Some(PixelPoint::new(0, 0)));
    }

    #[test]
    fn test_mm_length_and_step() {
        let line = MmPolyline::from_coords(&[(0.0, 0.0), (3.0, 4.0), (3.0, 5.0)]);
        assert!((line.length() - 6.0).abs() < 1e-12);
        assert!((line.max_step() - 5.0).abs() < 1e-12);
        assert_eq!(MmPolyline::default().max_step(), 0.0);
    }
}
