#![no_main]

use arbitrary::{Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;
use scrollcanvas_core::observer::{IntersectionEntry, ObserverOptions};
use scrollcanvas_core::{Duration, GapId, SentinelId, VerticalSpan, ZoneId};
use scrollcanvas_layout::Viewport;
use scrollcanvas_runtime::{CanvasConfig, CanvasContext, ZoneMode};

const ZONES: [&str; 3] = ["a", "b", "c"];

#[derive(Debug, Arbitrary)]
enum Op {
    RegisterZone { zone: u8, steps: u8 },
    RegisterStep { zone: u8, index: u8 },
    RegisterGap,
    UnregisterZone { zone: u8 },
    UnregisterStep { zone: u8, index: u8 },
    Scroll { sentinel: u8, index: u8, top: i16, height: u16 },
    Frame { dt_ms: u16 },
    Resize { width: u16 },
}

fn zone(raw: u8) -> ZoneId {
    ZoneId::from(ZONES[raw as usize % ZONES.len()])
}

fuzz_target!(|data: &[u8]| {
    let mut u = Unstructured::new(data);
    let ctx: CanvasContext<u8> =
        CanvasContext::new(CanvasConfig::default(), Viewport::new(1280.0, 800.0));
    let options = ObserverOptions::default();
    let mut now = Duration::ZERO;

    while let Ok(op) = Op::arbitrary(&mut u) {
        match op {
            Op::RegisterZone { zone: z, steps } => {
                let mode = match steps % 5 {
                    0 => ZoneMode::Single,
                    n => ZoneMode::Stepped { total_steps: n as usize },
                };
                let _ = ctx.register_zone(zone(z), mode, Some(z));
            }
            Op::RegisterStep { zone: z, index } => {
                // Unknown zones and out-of-range steps are rejected, not panics.
                let _ = ctx.register_step(&zone(z), index as usize % 6, Some(index));
            }
            Op::RegisterGap => {
                let _ = ctx.register_gap(GapId::from("gap"));
            }
            Op::UnregisterZone { zone: z } => {
                ctx.unregister_zone(&zone(z));
            }
            Op::UnregisterStep { zone: z, index } => {
                ctx.unregister_step(&zone(z), index as usize % 6);
            }
            Op::Scroll { sentinel, index, top, height } => {
                let target = match sentinel % 3 {
                    0 => SentinelId::Zone(zone(sentinel / 3)),
                    1 => SentinelId::Step(zone(sentinel / 3), index as usize % 6),
                    _ => SentinelId::Gap(GapId::from("gap")),
                };
                let top = f64::from(top);
                let bounds = VerticalSpan::new(top, top + f64::from(height));
                let height = ctx.viewport().height;
                let entry = IntersectionEntry::compute(bounds, height, &options, now);
                ctx.update_geometry(&target, entry);
            }
            Op::Frame { dt_ms } => {
                now += Duration::from_millis(u64::from(dt_ms));
                ctx.on_animation_frame(now);

                let snapshot = ctx.snapshot();
                assert!(!snapshot.pending_close || snapshot.is_open);
                assert!(snapshot.is_open || snapshot.active_zone_id.is_none());
                assert!(snapshot.active_step_index.is_none() || snapshot.active_zone_id.is_some());
                if let Some(zone) = &snapshot.active_zone_id {
                    let step = snapshot.active_step_index;
                    let mounted = ctx.with_registry(|r| {
                        r.zone(zone)
                            .is_some_and(|z| step.is_none_or(|index| z.has_step(index)))
                    });
                    assert!(mounted, "snapshot names an unmounted zone or step");
                }
                if snapshot.is_open && !snapshot.pending_close {
                    let zone = snapshot.active_zone_id.clone().expect("open has a zone");
                    let intersecting =
                        ctx.with_registry(|r| r.zone(&zone).is_some_and(|z| z.is_intersecting()));
                    assert!(intersecting);
                }
                let layout = ctx.layout();
                if ctx.viewport_class().is_mobile() {
                    assert!(!layout.open);
                    assert!(!layout.full_bleed);
                    assert!(layout.horizontal_shift.is_none());
                } else {
                    assert_eq!(layout.open, snapshot.is_open);
                }
            }
            Op::Resize { width } => {
                ctx.set_viewport(Viewport::new(f64::from(width), 800.0));
            }
        }
    }

    ctx.teardown();
    assert!(!ctx.snapshot().is_open);
    assert!(ctx.with_registry(|r| r.is_empty()));
});
