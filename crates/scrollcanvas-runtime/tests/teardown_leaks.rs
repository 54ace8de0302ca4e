#![forbid(unsafe_code)]

//! Teardown and leak checks.
//!
//! After teardown (or after the last strong handle drops) late observer
//! callbacks must do nothing, observers must be released, and subscribers
//! must stop hearing about the context.

use std::cell::Cell;
use std::rc::Rc;

use scrollcanvas_core::observer::{HostObserver, IntersectionEntry, ObserverOptions};
use scrollcanvas_core::{Duration, SentinelId, VerticalSpan, ZoneId};
use scrollcanvas_layout::Viewport;
use scrollcanvas_runtime::{
    CanvasConfig, CanvasContext, CanvasError, GeometryUpdate, SentinelBridge, ZoneMode,
};

fn context() -> CanvasContext<u32> {
    CanvasContext::new(CanvasConfig::default(), Viewport::new(1280.0, 800.0))
}

fn inside(at_ms: u64) -> IntersectionEntry {
    IntersectionEntry::visible(
        VerticalSpan::new(300.0, 500.0),
        1.0,
        Duration::from_millis(at_ms),
    )
}

#[test]
fn pending_close_timer_is_cancelled_by_teardown() {
    let ctx = context();
    ctx.register_zone(ZoneId::from("a"), ZoneMode::Single, None)
        .unwrap();
    ctx.update_geometry(&SentinelId::zone("a"), inside(0));
    ctx.on_animation_frame(Duration::ZERO);
    ctx.update_geometry(
        &SentinelId::zone("a"),
        IntersectionEntry::hidden(VerticalSpan::new(-600.0, -400.0), Duration::from_millis(5)),
    );
    ctx.on_animation_frame(Duration::from_millis(5));
    assert!(ctx.pending_deadline().is_some());

    ctx.teardown();
    assert_eq!(ctx.pending_deadline(), None);
    assert!(!ctx.snapshot().is_open);
    assert!(!ctx.layout().open);
}

#[test]
fn callbacks_after_teardown_are_noops() {
    let ctx = context();
    let observer = HostObserver::new(ObserverOptions::default());
    let mut bridge = SentinelBridge::new(observer.clone(), ctx.clone());
    let zone = SentinelId::zone("a");
    bridge
        .mount_zone(&zone, ZoneId::from("a"), ZoneMode::Single, Some(7))
        .unwrap();

    assert_eq!(observer.observed_count(), 1);

    ctx.teardown();
    assert_eq!(observer.observed_count(), 0);
    assert_eq!(bridge.mounted_count(), 0);
    assert_eq!(
        observer.emit_bounds(&zone, VerticalSpan::new(300.0, 500.0), 800.0, Duration::ZERO),
        0
    );
    ctx.on_animation_frame(Duration::ZERO);
    assert!(!ctx.snapshot().is_open);
    assert!(matches!(
        bridge.mount_gap(&SentinelId::gap("g"), "g".into()),
        Err(CanvasError::TornDown)
    ));
    assert_eq!(observer.observed_count(), 0);
}

#[test]
fn hooks_registered_after_teardown_run_immediately() {
    let ctx = context();
    ctx.teardown();
    let ran = Rc::new(Cell::new(false));
    let flag = Rc::clone(&ran);
    ctx.on_teardown(move || flag.set(true));
    assert!(ran.get());
}

#[test]
fn dropped_context_detaches_weak_handles() {
    let weak = {
        let ctx = context();
        ctx.register_zone(ZoneId::from("a"), ZoneMode::Single, None)
            .unwrap();
        ctx.downgrade()
    };
    assert!(weak.upgrade().is_none());
    assert_eq!(
        weak.update_geometry(&SentinelId::zone("a"), inside(0)),
        GeometryUpdate::Detached
    );
}

#[test]
fn subscribers_are_detached_on_teardown() {
    let ctx = context();
    let calls = Rc::new(Cell::new(0));
    let sink = Rc::clone(&calls);
    let _sub = ctx.subscribe(move |_| sink.set(sink.get() + 1));

    ctx.register_zone(ZoneId::from("a"), ZoneMode::Single, None)
        .unwrap();
    ctx.update_geometry(&SentinelId::zone("a"), inside(0));
    ctx.on_animation_frame(Duration::ZERO);
    assert_eq!(calls.get(), 1);

    // Teardown publishes the closed layout once, then detaches.
    ctx.teardown();
    assert_eq!(calls.get(), 2);
    ctx.set_viewport(Viewport::new(390.0, 800.0));
    ctx.teardown();
    assert_eq!(calls.get(), 2);
}

#[test]
fn repeated_mount_cycles_do_not_accumulate() {
    let ctx = context();
    let observer = HostObserver::new(ObserverOptions::default());
    let mut bridge = SentinelBridge::new(observer.clone(), ctx.clone());
    let zone_id = ZoneId::from("s");
    for _ in 0..50 {
        bridge
            .mount_zone(
                &SentinelId::zone("s"),
                zone_id.clone(),
                ZoneMode::Stepped { total_steps: 2 },
                Some(1),
            )
            .unwrap();
        bridge
            .mount_step(&SentinelId::step("s", 0), &zone_id, 0, Some(2))
            .unwrap();
        bridge
            .mount_step(&SentinelId::step("s", 1), &zone_id, 1, Some(3))
            .unwrap();
        bridge.unmount(&SentinelId::zone("s"));
    }
    assert_eq!(observer.observed_count(), 0);
    assert_eq!(bridge.mounted_count(), 0);
    assert!(ctx.with_registry(|r| r.is_empty()));
}
