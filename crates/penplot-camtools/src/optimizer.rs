//! Path Optimizer
//!
//! Orders contours to cut pen-up travel with a greedy nearest-neighbor
//! walk. At each step every remaining polyline is considered in both
//! directions and the globally closest start point wins; a polyline chosen
//! by its end point is reversed before it is appended.
//!
//! Greedy, deterministic for a given input order, O(n²) in the number of
//! polylines. Not globally optimal.

use penplot_core::{PixelPoint, PixelPolyline};

/// Polylines in plot order plus the pen-up travel between them
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OrderedPath {
    polylines: Vec<PixelPolyline>,
    total_travel: f64,
}

impl OrderedPath {
    /// Polylines in plot order, each possibly reversed
    pub fn polylines(&self) -> &[PixelPolyline] {
        &self.polylines
    }

    /// Sum of transition distances in pixels, excluding drawn length
    pub fn total_travel(&self) -> f64 {
        self.total_travel
    }

    /// Number of polylines
    pub fn len(&self) -> usize {
        self.polylines.len()
    }

    /// True when nothing is left to plot
    pub fn is_empty(&self) -> bool {
        self.polylines.is_empty()
    }

    /// Total point count across all polylines
    pub fn point_count(&self) -> usize {
        self.polylines.iter().map(PixelPolyline::len).sum()
    }

    /// Split into polylines and travel
    pub fn into_parts(self) -> (Vec<PixelPolyline>, f64) {
        (self.polylines, self.total_travel)
    }
}

/// Best next candidate found by [`nearest`]
#[derive(Debug, Clone, Copy)]
struct Candidate {
    index: usize,
    reversed: bool,
    distance: f64,
}

/// First candidate with the strictly smallest distance; start is tested
/// before end for each polyline.
fn nearest(remaining: &[PixelPolyline], from: PixelPoint) -> Option<Candidate> {
    let mut best: Option<Candidate> = None;
    for (index, polyline) in remaining.iter().enumerate() {
        let (Some(start), Some(end)) = (polyline.start(), polyline.end()) else {
            continue;
        };
        for (reversed, point) in [(false, start), (true, end)] {
            let distance = from.distance(&point);
            if best.map_or(true, |b| distance < b.distance) {
                best = Some(Candidate {
                    index,
                    reversed,
                    distance,
                });
            }
        }
    }
    best
}

/// Greedy travel-minimizing orderer
#[derive(Debug, Clone, Copy, Default)]
pub struct PathOrderer {
    start: Option<PixelPoint>,
}

impl PathOrderer {
    /// Create an orderer; `start` is the pen position before the first contour
    pub fn new(start: Option<PixelPoint>) -> Self {
        Self { start }
    }

    /// Order `polylines` for plotting.
    ///
    /// Without a start point the longest polyline (first one on ties) goes
    /// first in its original direction and contributes no travel. Empty
    /// polylines cannot be placed and are dropped. Single-point polylines
    /// are placed like any other and cost no drawing move.
    pub fn order(&self, polylines: Vec<PixelPolyline>) -> OrderedPath {
        let before = polylines.len();
        let mut remaining: Vec<PixelPolyline> =
            polylines.into_iter().filter(|p| !p.is_empty()).collect();
        if remaining.len() < before {
            tracing::warn!(
                "Dropped {} empty polylines before ordering",
                before - remaining.len()
            );
        }

        let mut ordered = Vec::with_capacity(remaining.len());
        let mut total_travel = 0.0;

        let mut cursor = match self.start {
            Some(start) => start,
            None => {
                let Some(seed) = longest_index(&remaining) else {
                    return OrderedPath::default();
                };
                let first = remaining.remove(seed);
                let cursor = first.end();
                ordered.push(first);
                match cursor {
                    Some(point) => point,
                    None => return OrderedPath::default(),
                }
            }
        };

        while let Some(pick) = nearest(&remaining, cursor) {
            let polyline = remaining.remove(pick.index);
            let polyline = if pick.reversed {
                polyline.reversed()
            } else {
                polyline
            };
            if let Some(end) = polyline.end() {
                cursor = end;
            }
            total_travel += pick.distance;
            ordered.push(polyline);
        }

        tracing::debug!(
            "Ordered {} polylines, pen-up travel {:.2}px",
            ordered.len(),
            total_travel
        );

        OrderedPath {
            polylines: ordered,
            total_travel,
        }
    }
}

fn longest_index(polylines: &[PixelPolyline]) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (i, p) in polylines.iter().enumerate() {
        if best.map_or(true, |(_, len)| p.len() > len) {
            best = Some((i, p.len()));
        }
    }
    best.map(|(i, _)| i)
}

/// Pen-up travel for polylines plotted in the given order and directions.
///
/// With a start point the move to the first polyline counts; without one
/// the pen is assumed to begin at the first polyline's end.
pub fn penup_distance(polylines: &[PixelPolyline], start: Option<PixelPoint>) -> f64 {
    let mut iter = polylines.iter().filter(|p| !p.is_empty());
    let mut cursor = match start {
        Some(point) => point,
        None => match iter.next().and_then(PixelPolyline::end) {
            Some(point) => point,
            None => return 0.0,
        },
    };

    let mut total = 0.0;
    for polyline in iter {
        if let (Some(s), Some(e)) = (polyline.start(), polyline.end()) {
            total += cursor.distance(&s);
            cursor = e;
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(coords: &[(i32, i32)]) -> PixelPolyline {
        PixelPolyline::from_coords(coords)
    }

    #[test]
    fn test_empty_input() {
        let path = PathOrderer::new(None).order(Vec::new());
        assert!(path.is_empty());
        assert_eq!(path.total_travel(), 0.0);

        let path = PathOrderer::new(Some(PixelPoint::new(3, 3))).order(Vec::new());
        assert!(path.is_empty());
        assert_eq!(path.total_travel(), 0.0);
    }

    #[test]
    fn test_three_segments_from_origin() {
        let a = line(&[(0, 0), (1, 1)]);
        let b = line(&[(5, 5), (6, 6)]);
        let c = line(&[(1, 1), (2, 2)]);

        let path = PathOrderer::new(Some(PixelPoint::new(0, 0)))
            .order(vec![a.clone(), b.clone(), c.clone()]);

        assert_eq!(path.polylines(), &[a, c, b]);
        // (2,2) -> (5,5)
        assert!((path.total_travel() - 18f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_reverses_when_end_is_closer() {
        let a = line(&[(0, 0), (10, 0)]);
        let b = line(&[(30, 0), (11, 0)]);

        let path = PathOrderer::new(Some(PixelPoint::new(0, 0))).order(vec![a, b]);
        assert_eq!(path.polylines()[1], line(&[(11, 0), (30, 0)]));
        assert!((path.total_travel() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_start_point_can_pick_reversed_first() {
        let a = line(&[(10, 10), (0, 1)]);
        let path = PathOrderer::new(Some(PixelPoint::new(0, 0))).order(vec![a]);
        assert_eq!(path.polylines()[0], line(&[(0, 1), (10, 10)]));
        assert!((path.total_travel() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_seeds_with_longest_without_start() {
        let short = line(&[(0, 0), (1, 0)]);
        let long = line(&[(10, 0), (11, 0), (12, 0)]);
        let path = PathOrderer::new(None).order(vec![short.clone(), long.clone()]);

        assert_eq!(path.polylines()[0], long);
        // From (12,0): short start (0,0) is 12 away, short end (1,0) is 11
        assert_eq!(path.polylines()[1], short.reversed());
        assert!((path.total_travel() - 11.0).abs() < 1e-12);
    }

    #[test]
    fn test_ties_keep_first_candidate() {
        let a = line(&[(1, 0), (2, 0)]);
        let b = line(&[(-1, 0), (-2, 0)]);
        let path = PathOrderer::new(Some(PixelPoint::new(0, 0))).order(vec![a.clone(), b]);
        assert_eq!(path.polylines()[0], a);

        // Longest-seed tie also keeps the first
        let c = line(&[(5, 5), (6, 6)]);
        let d = line(&[(7, 7), (8, 8)]);
        let path = PathOrderer::new(None).order(vec![c.clone(), d]);
        assert_eq!(path.polylines()[0], c);
    }

    #[test]
    fn test_single_point_polyline_is_zero_length() {
        let dot = line(&[(3, 4)]);
        let a = line(&[(0, 0), (1, 0)]);
        let path = PathOrderer::new(Some(PixelPoint::new(0, 0))).order(vec![dot.clone(), a]);

        assert_eq!(path.len(), 2);
        assert!(path.polylines().contains(&dot));
        assert!(path.total_travel().is_finite());
    }

    #[test]
    fn test_empty_polylines_are_dropped() {
        let path = PathOrderer::new(None).order(vec![
            PixelPolyline::default(),
            line(&[(0, 0), (1, 0)]),
        ]);
        assert_eq!(path.len(), 1);
    }

    #[test]
    fn test_penup_distance_matches_ordered_travel() {
        let polylines = vec![
            line(&[(0, 0), (4, 0)]),
            line(&[(9, 9), (4, 3)]),
            line(&[(20, 0), (25, 0)]),
        ];
        let start = Some(PixelPoint::new(2, 2));
        let path = PathOrderer::new(start).order(polylines.clone());

        let recomputed = penup_distance(path.polylines(), start);
        assert!((recomputed - path.total_travel()).abs() < 1e-9);
        assert!(path.total_travel() <= penup_distance(&polylines, start) + 1e-9);
    }
}
