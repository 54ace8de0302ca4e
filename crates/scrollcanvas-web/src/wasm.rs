#![forbid(unsafe_code)]

//! `wasm-bindgen` exports and the DOM observer adapter.
//!
//! Only compiled on `wasm32` targets.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Array, Object, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Element, IntersectionObserver, IntersectionObserverEntry, IntersectionObserverInit};

use scrollcanvas_core::observer::{
    EntryCallback, IntersectionEntry, ObserverHandle, ObserverOptions, ViewportObserver,
};
use scrollcanvas_core::{Duration, VerticalSpan};
use scrollcanvas_runtime::CanvasConfig;

use super::host_core::{FrameReport, HostCore, WebHostError};

fn console_error(msg: &str) {
    let global = js_sys::global();
    let Ok(console) = Reflect::get(&global, &"console".into()) else {
        return;
    };
    let Ok(error) = Reflect::get(&console, &"error".into()) else {
        return;
    };
    let Ok(error_fn) = error.dyn_into::<js_sys::Function>() else {
        return;
    };
    let _ = error_fn.call1(&console, &JsValue::from_str(msg));
}

fn install_panic_hook() {
    use std::sync::Once;

    static ONCE: Once = Once::new();
    ONCE.call_once(|| {
        std::panic::set_hook(Box::new(|info| {
            console_error(&format!("panic: {info}"));
        }));
    });
}

fn set_js(obj: &Object, key: &str, value: JsValue) {
    let _ = Reflect::set(obj, &JsValue::from_str(key), &value);
}

fn opt_str(value: Option<String>) -> JsValue {
    value.map_or(JsValue::NULL, |s| JsValue::from_str(&s))
}

fn opt_index(value: Option<usize>) -> JsValue {
    value.map_or(JsValue::NULL, |i| JsValue::from_f64(i as f64))
}

fn frame_report_to_js(report: FrameReport) -> JsValue {
    let obj = Object::new();
    set_js(&obj, "frameIdx", JsValue::from_f64(report.frame_idx as f64));
    set_js(&obj, "evaluated", JsValue::from_bool(report.evaluated));
    set_js(&obj, "transition", JsValue::from_str(&report.transition));
    set_js(&obj, "layoutChanged", JsValue::from_bool(report.layout_changed));
    set_js(&obj, "open", JsValue::from_bool(report.open));
    set_js(&obj, "closing", JsValue::from_bool(report.closing));
    set_js(&obj, "activeZone", opt_str(report.active_zone));
    set_js(&obj, "activeStep", opt_index(report.active_step));
    obj.into()
}

fn to_js_error(err: WebHostError) -> JsValue {
    js_sys::Error::new(&err.to_string()).into()
}

fn payload(value: JsValue) -> Option<String> {
    value.as_string()
}

// ---------------------------------------------------------------------------
// Host-driven runner
// ---------------------------------------------------------------------------

/// Host-driven canvas runner.
///
/// JavaScript owns the event loop: it forwards intersection entries, advances
/// time, and calls `frame()` from `requestAnimationFrame`.
#[wasm_bindgen]
pub struct CanvasRunner {
    inner: HostCore,
}

#[wasm_bindgen(start)]
pub fn wasm_start() {
    install_panic_hook();
}

#[wasm_bindgen]
impl CanvasRunner {
    /// Create a runner with default configuration.
    #[wasm_bindgen(constructor)]
    pub fn new(width: f64, height: f64) -> Self {
        install_panic_hook();
        Self {
            inner: HostCore::new(CanvasConfig::default(), width, height),
        }
    }

    /// Create a runner from a JSON configuration.
    #[wasm_bindgen(js_name = withConfig)]
    pub fn with_config(json: &str, width: f64, height: f64) -> Result<CanvasRunner, JsValue> {
        install_panic_hook();
        HostCore::from_config_json(json, width, height)
            .map(|inner| Self { inner })
            .map_err(to_js_error)
    }

    /// Mount a zone; `totalSteps == 0` mounts a single zone.
    #[wasm_bindgen(js_name = mountZone)]
    pub fn mount_zone(
        &mut self,
        id: &str,
        total_steps: u32,
        payload_value: JsValue,
    ) -> Result<f64, JsValue> {
        self.inner
            .mount_zone(id, total_steps as usize, payload(payload_value))
            .map(|generation| generation as f64)
            .map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = mountStep)]
    pub fn mount_step(
        &mut self,
        zone: &str,
        index: u32,
        payload_value: JsValue,
    ) -> Result<f64, JsValue> {
        self.inner
            .mount_step(zone, index as usize, payload(payload_value))
            .map(|generation| generation as f64)
            .map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = mountGap)]
    pub fn mount_gap(&mut self, id: &str) -> Result<f64, JsValue> {
        self.inner
            .mount_gap(id)
            .map(|generation| generation as f64)
            .map_err(to_js_error)
    }

    #[wasm_bindgen(js_name = unmountZone)]
    pub fn unmount_zone(&mut self, id: &str) -> bool {
        self.inner.unmount_zone(id)
    }

    #[wasm_bindgen(js_name = unmountStep)]
    pub fn unmount_step(&mut self, zone: &str, index: u32) -> bool {
        self.inner.unmount_step(zone, index as usize)
    }

    #[wasm_bindgen(js_name = unmountGap)]
    pub fn unmount_gap(&mut self, id: &str) -> bool {
        self.inner.unmount_gap(id)
    }

    /// Forward one JSON-encoded entry. Returns `true` if a mounted sentinel
    /// received it.
    #[wasm_bindgen(js_name = pushEncodedEntry)]
    pub fn push_encoded_entry(&mut self, json: &str) -> bool {
        self.inner.push_encoded_entry_lossy(json)
    }

    /// Advance the host clock by `dt_ms` milliseconds.
    #[wasm_bindgen(js_name = advanceTime)]
    pub fn advance_time(&mut self, dt_ms: f64) {
        self.inner.advance_time_ms(dt_ms);
    }

    /// Set the clock to an absolute `performance.now()` value.
    #[wasm_bindgen(js_name = setTime)]
    pub fn set_time(&mut self, ts_ms: f64) {
        self.inner.set_time_ms(ts_ms);
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.inner.resize(width, height);
    }

    #[wasm_bindgen(js_name = needsFrame)]
    pub fn needs_frame(&self) -> bool {
        self.inner.needs_frame()
    }

    /// Milliseconds until the pending close fires, or `undefined`.
    #[wasm_bindgen(js_name = msUntilDeadline)]
    pub fn ms_until_deadline(&self) -> Option<f64> {
        self.inner.ms_until_deadline()
    }

    /// Run one frame and return its report.
    pub fn frame(&mut self) -> JsValue {
        frame_report_to_js(self.inner.frame())
    }

    /// Current layout contract as JSON.
    #[wasm_bindgen(js_name = layoutJson)]
    pub fn layout_json(&self) -> String {
        self.inner.layout_json()
    }

    /// Drain log lines.
    #[wasm_bindgen(js_name = takeLogs)]
    pub fn take_logs(&mut self) -> Array {
        self.inner
            .take_logs()
            .into_iter()
            .map(|line| JsValue::from_str(&line))
            .collect()
    }

    /// Unmount everything. The runner is inert afterwards.
    pub fn destroy(&mut self) {
        self.inner.teardown();
    }
}

// ---------------------------------------------------------------------------
// DOM adapter
// ---------------------------------------------------------------------------

/// Whether the global scope has an `IntersectionObserver` constructor.
#[must_use]
pub fn intersection_observer_supported() -> bool {
    Reflect::has(&js_sys::global(), &JsValue::from_str("IntersectionObserver")).unwrap_or(false)
}

type DomCallback = Closure<dyn FnMut(Array, JsValue)>;

/// [`ViewportObserver`] over the browser's `IntersectionObserver`.
///
/// Each observation gets its own observer so that dropping the handle
/// disconnects exactly one target. Without `IntersectionObserver` every
/// registration is inert.
#[derive(Debug, Clone)]
pub struct DomIntersectionObserver {
    options: ObserverOptions,
    supported: bool,
}

impl DomIntersectionObserver {
    #[must_use]
    pub fn new(options: ObserverOptions) -> Self {
        Self {
            options,
            supported: intersection_observer_supported(),
        }
    }

    fn init(&self) -> IntersectionObserverInit {
        let init = IntersectionObserverInit::new();
        init.set_root_margin(&self.options.root_margin.to_css());
        init.set_threshold(&JsValue::from_f64(self.options.threshold));
        init
    }
}

fn entry_from_dom(entry: &IntersectionObserverEntry) -> IntersectionEntry {
    let rect = entry.bounding_client_rect();
    let time_ms = entry.time();
    let observed_at = if time_ms.is_finite() && time_ms > 0.0 {
        Duration::from_micros((time_ms * 1000.0).round() as u64)
    } else {
        Duration::ZERO
    };
    IntersectionEntry {
        is_intersecting: entry.is_intersecting(),
        intersection_ratio: entry.intersection_ratio(),
        bounds: VerticalSpan::new(rect.top(), rect.bottom()),
        observed_at,
    }
}

impl ViewportObserver for DomIntersectionObserver {
    type Target = Element;

    fn observe(&self, target: &Element, callback: EntryCallback) -> ObserverHandle {
        if !self.supported {
            return ObserverHandle::inert();
        }
        let closure: DomCallback = Closure::new(move |entries: Array, _observer: JsValue| {
            for value in entries.iter() {
                if let Ok(entry) = value.dyn_into::<IntersectionObserverEntry>() {
                    callback(entry_from_dom(&entry));
                }
            }
        });
        let handler: &js_sys::Function = closure.as_ref().unchecked_ref();
        let observer = match IntersectionObserver::new_with_options(handler, &self.init()) {
            Ok(observer) => observer,
            Err(err) => {
                tracing::warn!(error = ?err, "IntersectionObserver construction failed");
                return ObserverHandle::inert();
            }
        };
        observer.observe(target);
        let closure = Rc::new(RefCell::new(Some(closure)));
        ObserverHandle::new(move || {
            observer.disconnect();
            closure.borrow_mut().take();
        })
    }

    fn is_supported(&self) -> bool {
        self.supported
    }

    fn options(&self) -> ObserverOptions {
        self.options
    }
}
