#![no_main]

use libfuzzer_sys::fuzz_target;
use scrollcanvas_core::observer::{MarginValue, RootMargin};

fn finite(value: MarginValue) -> bool {
    match value {
        MarginValue::Px(v) | MarginValue::Percent(v) => v.is_finite(),
    }
}

fuzz_target!(|data: &[u8]| {
    let Ok(css) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(margin) = RootMargin::parse(css) else {
        return;
    };

    // Serialized shorthand must parse back to the same margin.
    let css = margin.to_css();
    let reparsed = RootMargin::parse(&css).expect("to_css output must parse");
    if finite(margin.top) && finite(margin.bottom) {
        assert_eq!(reparsed, margin, "round trip through {css:?}");
        let root = margin.root_span(800.0);
        assert!(root.top.is_finite() && root.bottom.is_finite());
    }
});
