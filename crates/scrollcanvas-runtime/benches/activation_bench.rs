//! Benchmarks for activation evaluation and frame coalescing.
//!
//! Run with: cargo bench -p scrollcanvas-runtime --bench activation_bench
//!
//! - `evaluate/N`: one engine evaluation over N zones, a third of them
//!   intersecting, one stepped zone with 8 steps.
//! - `frame_burst/N`: N geometry updates followed by one animation frame,
//!   the per-frame cost of fast scrolling.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use scrollcanvas_core::observer::IntersectionEntry;
use scrollcanvas_core::{Duration, SentinelId, VerticalSpan, ZoneId};
use scrollcanvas_layout::Viewport;
use scrollcanvas_runtime::{ActivationEngine, CanvasConfig, CanvasContext, ZoneMode, ZoneRegistry};

const VIEWPORT: f64 = 800.0;
const STEPS: usize = 8;

fn zone_name(i: usize) -> String {
    format!("zone-{i}")
}

fn entry_for(i: usize, at: Duration) -> IntersectionEntry {
    let top = (i as f64) * 150.0 - 600.0;
    let bounds = VerticalSpan::new(top, top + 400.0);
    if i % 3 == 0 {
        IntersectionEntry::visible(bounds, 0.5, at)
    } else {
        IntersectionEntry::hidden(bounds, at)
    }
}

fn populated_registry(zones: usize) -> ZoneRegistry {
    let mut registry = ZoneRegistry::new();
    for i in 0..zones {
        let id = ZoneId::new(zone_name(i));
        let mode = if i == 0 {
            ZoneMode::Stepped { total_steps: STEPS }
        } else {
            ZoneMode::Single
        };
        let _ = registry.register_zone(id.clone(), mode);
        registry.update_geometry(&SentinelId::Zone(id), entry_for(i, Duration::ZERO));
    }
    let stepped = ZoneId::new(zone_name(0));
    for step in 0..STEPS {
        let _ = registry.register_step(&stepped, step);
        let top = step as f64 * 120.0;
        registry.update_geometry(
            &SentinelId::Step(stepped.clone(), step),
            IntersectionEntry::visible(VerticalSpan::new(top, top + 100.0), 1.0, Duration::ZERO),
        );
    }
    registry
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");
    for zones in [4usize, 32, 256] {
        let registry = populated_registry(zones);
        group.bench_with_input(BenchmarkId::from_parameter(zones), &registry, |b, registry| {
            let mut engine = ActivationEngine::default();
            let mut now = Duration::ZERO;
            b.iter(|| {
                now += Duration::from_millis(16);
                black_box(engine.evaluate(black_box(registry), VIEWPORT, now))
            });
        });
    }
    group.finish();
}

fn bench_frame_burst(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_burst");
    let zones = 32;
    for updates in [1usize, 16, 128] {
        let ctx: CanvasContext<u32> =
            CanvasContext::new(CanvasConfig::default(), Viewport::new(1280.0, VIEWPORT));
        for i in 0..zones {
            let _ = ctx.register_zone(ZoneId::new(zone_name(i)), ZoneMode::Single, Some(i as u32));
        }
        let sentinels: Vec<SentinelId> =
            (0..zones).map(|i| SentinelId::zone(zone_name(i))).collect();
        group.bench_function(BenchmarkId::from_parameter(updates), |b| {
            let mut now = Duration::ZERO;
            b.iter(|| {
                now += Duration::from_millis(16);
                for u in 0..updates {
                    let i = u % zones;
                    let shift = (now.as_millis() as usize / 16) % 3;
                    ctx.update_geometry(&sentinels[i], entry_for(i + shift, now));
                }
                black_box(ctx.on_animation_frame(now))
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_evaluate, bench_frame_burst);
criterion_main!(benches);
