use penplot_camtools::optimizer::{penup_distance, PathOrderer};
use penplot_camtools::raster::{encode_packed, BitOrder, PixelMode, RasterCodec, RasterSpec};
use penplot_camtools::{densify, rdp_simplify};
use penplot_core::{MmPoint, MmPolyline, PixelPoint, PixelPolyline, RasterFrame};
use proptest::prelude::*;

fn polyline_strategy() -> impl Strategy<Value = PixelPolyline> {
    prop::collection::vec((-50i32..50, -50i32..50), 1..6)
        .prop_map(|coords| PixelPolyline::from_coords(&coords))
}

fn mm_polyline_strategy() -> impl Strategy<Value = MmPolyline> {
    prop::collection::vec((-100.0f64..100.0, -100.0f64..100.0), 0..20)
        .prop_map(|coords| MmPolyline::from_coords(&coords))
}

fn sorted_keys(polylines: &[PixelPolyline]) -> Vec<Vec<PixelPoint>> {
    let mut keys: Vec<Vec<PixelPoint>> = polylines.iter().map(|p| p.points().to_vec()).collect();
    keys.sort_by_key(|k| k.iter().map(|p| (p.x, p.y)).collect::<Vec<_>>());
    keys
}

/// Orientation-free identity: the lexicographically smaller direction
fn canonical(polyline: &PixelPolyline) -> PixelPolyline {
    let rev = polyline.reversed();
    let key = |p: &PixelPolyline| p.points().iter().map(|q| (q.x, q.y)).collect::<Vec<_>>();
    if key(&rev) < key(polyline) {
        rev
    } else {
        polyline.clone()
    }
}

proptest! {
    #[test]
    fn prop_packed_round_trip(
        width in 1usize..24,
        height in 1usize..12,
        seed in any::<u64>(),
        little in any::<bool>(),
    ) {
        let order = if little { BitOrder::Little } else { BitOrder::Big };
        let pixels = width * height;
        let mut payload: Vec<u8> = (0..pixels.div_ceil(8))
            .map(|i| (seed.rotate_left((i % 64) as u32) as u8) ^ (i as u8))
            .collect();
        // Padding bits past the last pixel carry no information
        let spare = payload.len() * 8 - pixels;
        if spare > 0 {
            let last = payload.len() - 1;
            payload[last] &= match order {
                BitOrder::Big => 0xFFu8 << spare,
                BitOrder::Little => 0xFFu8 >> spare,
            };
        }

        let spec = RasterSpec {
            width,
            height,
            header_marker: 0xAA,
            mode: PixelMode::Packed1bpp,
            bit_order: order,
        };
        let mut wire = vec![0xAA];
        wire.extend_from_slice(&payload);

        let frame = RasterCodec::new(spec).decode(&wire).unwrap();
        prop_assert_eq!(encode_packed(&frame, order), payload);
    }

    #[test]
    fn prop_order_is_permutation(
        polylines in prop::collection::vec(polyline_strategy(), 0..12),
        start in prop::option::of((-50i32..50, -50i32..50)),
    ) {
        let start = start.map(PixelPoint::from);
        let path = PathOrderer::new(start).order(polylines.clone());

        prop_assert_eq!(path.len(), polylines.len());
        let input: Vec<PixelPolyline> = polylines.iter().map(canonical).collect();
        let output: Vec<PixelPolyline> = path.polylines().iter().map(canonical).collect();
        prop_assert_eq!(sorted_keys(&input), sorted_keys(&output));
    }

    #[test]
    fn prop_travel_is_sum_of_transitions(
        polylines in prop::collection::vec(polyline_strategy(), 0..12),
        start in prop::option::of((-50i32..50, -50i32..50)),
    ) {
        let start = start.map(PixelPoint::from);
        let path = PathOrderer::new(start).order(polylines);

        prop_assert!(path.total_travel() >= 0.0);
        let recomputed = penup_distance(path.polylines(), start);
        prop_assert!((recomputed - path.total_travel()).abs() < 1e-6);
    }

    #[test]
    fn prop_rdp_keeps_endpoints(
        line in mm_polyline_strategy(),
        epsilon in 0.0f64..5.0,
    ) {
        let out = rdp_simplify(&line, epsilon).unwrap();
        prop_assert_eq!(out.start(), line.start());
        prop_assert_eq!(out.end(), line.end());
        prop_assert!(out.len() <= line.len());
    }

    #[test]
    fn prop_rdp_straight_line_is_two_points(
        n in 3usize..40,
        dx in -4i32..5,
        dy in -4i32..5,
    ) {
        prop_assume!(dx != 0 || dy != 0);
        let line = MmPolyline::new(
            (0..n)
                .map(|i| MmPoint::new(f64::from(dx) * 0.5 * i as f64, f64::from(dy) * 0.5 * i as f64))
                .collect(),
        );
        prop_assert_eq!(rdp_simplify(&line, 0.0).unwrap().len(), 2);
    }

    #[test]
    fn prop_densify_bounds_step(
        line in mm_polyline_strategy(),
        step in 0.05f64..10.0,
    ) {
        let out = densify(&line, step).unwrap();
        prop_assert!(out.max_step() <= step + 1e-9);
        prop_assert_eq!(out.start(), line.start());
        if line.len() > 1 {
            prop_assert_eq!(out.end(), line.end());
        }
    }

    #[test]
    fn prop_densify_is_idempotent(
        line in mm_polyline_strategy(),
        step in 0.5f64..10.0,
    ) {
        let once = densify(&line, step).unwrap();
        let twice = densify(&once, step).unwrap();
        prop_assert!(twice.len() <= once.len() + once.len() / 10 + 1);
        prop_assert!(twice.max_step() <= step + 1e-9);
    }
}
