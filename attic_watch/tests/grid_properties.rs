use attic_watch::core_modules::scorer::score;
use attic_watch::{build_zones, AnchorRule, Detection};
use proptest::prelude::*;

proptest! {
    #[test]
    fn grid_is_deterministic(w in 1u32..2000, h in 1u32..2000, stride in 2u32..300, size in 1u32..400) {
        prop_assert_eq!(build_zones(w, h, stride, size), build_zones(w, h, stride, size));
    }

    #[test]
    fn grid_count_matches_formula(w in 1u32..2000, h in 1u32..2000, stride in 2u32..300, size in 1u32..400) {
        let zones = build_zones(w, h, stride, size);
        let expected = if size >= w || size >= h {
            0
        } else {
            ((w - size) / stride) * ((h - size) / stride)
        };
        prop_assert_eq!(zones.len() as u32, expected);
        for zone in &zones {
            prop_assert!(zone.x2 <= w && zone.y2 <= h);
        }
    }

    #[test]
    fn ranking_is_sorted_and_nonzero(points in prop::collection::vec((0f32..1280.0, 0f32..720.0), 0..40)) {
        let zones = build_zones(1280, 720, 100, 200);
        let batch: Vec<Detection> = points
            .iter()
            .map(|(x, y)| Detection::centered_at(*x, *y, 10.0, 10.0))
            .collect();
        let ranked = score(&batch, &zones, AnchorRule::Centroid);
        prop_assert!(ranked.iter().all(|r| r.trigger_count > 0));
        for pair in ranked.windows(2) {
            prop_assert!(pair[0].trigger_count >= pair[1].trigger_count);
            if pair[0].trigger_count == pair[1].trigger_count {
                prop_assert!(pair[0].zone.id < pair[1].zone.id);
            }
        }
    }
}
