//! Property tests for intersection computation and root margins.
//!
//! ## Invariants
//!
//! 1. `intersection_ratio` stays in `[0, 1]` for finite input
//! 2. `is_intersecting` implies a positive ratio at or above the threshold
//! 3. A span fully inside the root band is fully visible
//! 4. A span entirely outside the root band never intersects
//! 5. `RootMargin::to_css` parses back to the same margin

use proptest::prelude::*;
use scrollcanvas_core::observer::{IntersectionEntry, MarginValue, ObserverOptions, RootMargin};
use scrollcanvas_core::{Duration, VerticalSpan};

fn arb_margin_value() -> impl Strategy<Value = MarginValue> {
    prop_oneof![
        (-400i32..400).prop_map(|px| MarginValue::Px(f64::from(px))),
        (-45i32..45).prop_map(|pct| MarginValue::Percent(f64::from(pct))),
    ]
}

fn arb_options() -> impl Strategy<Value = ObserverOptions> {
    (arb_margin_value(), arb_margin_value(), 0.0..=1.0f64).prop_map(|(top, bottom, threshold)| {
        ObserverOptions {
            root_margin: RootMargin { top, bottom },
            threshold,
        }
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn ratio_is_bounded(
        top in -3000.0..3000.0f64,
        height in 0.0..2000.0f64,
        viewport in 1.0..2000.0f64,
        options in arb_options(),
    ) {
        let entry = IntersectionEntry::compute(
            VerticalSpan::new(top, top + height),
            viewport,
            &options,
            Duration::ZERO,
        );
        prop_assert!((0.0..=1.0).contains(&entry.intersection_ratio));
        if entry.is_intersecting {
            prop_assert!(entry.intersection_ratio > 0.0);
            prop_assert!(entry.intersection_ratio >= options.threshold);
        }
    }

    #[test]
    fn spans_inside_the_root_are_fully_visible(
        start in 0.0..1.0f64,
        len in 0.0..1.0f64,
        viewport in 100.0..2000.0f64,
    ) {
        let options = ObserverOptions { root_margin: RootMargin::ZERO, threshold: 0.0 };
        let top = start * viewport;
        let bottom = top + len * (viewport - top);
        let entry = IntersectionEntry::compute(
            VerticalSpan::new(top, bottom),
            viewport,
            &options,
            Duration::ZERO,
        );
        prop_assert!(entry.is_intersecting);
        prop_assert!((entry.intersection_ratio - 1.0).abs() < 1e-9);
    }

    #[test]
    fn spans_outside_the_root_never_intersect(
        gap in 1.0..5000.0f64,
        height in 1.0..1000.0f64,
        viewport in 100.0..2000.0f64,
        below in any::<bool>(),
        options in arb_options(),
    ) {
        let root = options.root_margin.root_span(viewport);
        let span = if below {
            VerticalSpan::new(root.bottom + gap, root.bottom + gap + height)
        } else {
            VerticalSpan::new(root.top - gap - height, root.top - gap)
        };
        let entry = IntersectionEntry::compute(span, viewport, &options, Duration::ZERO);
        prop_assert!(!entry.is_intersecting);
        prop_assert_eq!(entry.intersection_ratio, 0.0);
    }

    #[test]
    fn root_margin_css_round_trips(top in arb_margin_value(), bottom in arb_margin_value()) {
        let margin = RootMargin { top, bottom };
        prop_assert_eq!(RootMargin::parse(&margin.to_css()), Ok(margin));
    }
}
