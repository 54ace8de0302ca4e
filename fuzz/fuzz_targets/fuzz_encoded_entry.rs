#![no_main]

use libfuzzer_sys::fuzz_target;
use scrollcanvas_web::HostCore;
use scrollcanvas_runtime::CanvasConfig;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let mut host = HostCore::new(CanvasConfig::default(), 1280.0, 800.0);
    host.mount_zone("a", 2, Some("zone".into())).expect("fresh zone");
    host.mount_step("a", 0, None).expect("fresh step");
    host.mount_step("a", 1, None).expect("fresh step");
    host.mount_gap("g").expect("fresh gap");

    // Arbitrary JSON lines: each one is either rejected or applied, never a panic.
    for line in text.lines() {
        let _ = host.push_encoded_entry_lossy(line);
        host.advance_time_ms(16.0);
        let report = host.frame();
        assert!(!report.closing || report.open, "closing implies open");
        assert!(report.active_step.is_none() || report.active_zone.is_some());
    }
    host.teardown();
    assert!(!host.layout().open);
});
