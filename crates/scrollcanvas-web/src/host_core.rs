#![forbid(unsafe_code)]

//! Platform-independent host core.
//!
//! [`HostCore`] owns a canvas context, a sentinel bridge over a
//! [`HostObserver`], and a deterministic clock. The page (JavaScript, a
//! test, or a replay file) pushes JSON-encoded intersection entries and
//! drives frames explicitly; nothing here touches JS types.
//!
//! # Entry encoding
//!
//! ```json
//! {"sentinel":{"kind":"step","zone":"intro","index":1},
//!  "top":120.0,"bottom":340.0,
//!  "is_intersecting":true,"intersection_ratio":0.8}
//! ```
//!
//! `is_intersecting` and `intersection_ratio` are optional: when
//! `is_intersecting` is absent the entry is computed from the bounds, the
//! current viewport height, and the observer options. Entries are stamped
//! with the deterministic clock.

use serde::{Deserialize, Serialize};

use scrollcanvas_core::clock::{Clock, ManualClock};
use scrollcanvas_core::observer::{HostObserver, IntersectionEntry};
use scrollcanvas_core::{Duration, GapId, SentinelId, VerticalSpan, ZoneId};
use scrollcanvas_layout::{LayoutContract, Viewport};
use scrollcanvas_runtime::{
    CanvasConfig, CanvasContext, CanvasError, ConfigError, Generation, SentinelBridge, ZoneMode,
};

/// Errors surfaced to the host.
#[derive(Debug)]
pub enum WebHostError {
    /// Entry JSON did not parse.
    Json(serde_json::Error),
    /// Configuration JSON did not load.
    Config(ConfigError),
    Canvas(CanvasError),
}

impl std::fmt::Display for WebHostError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(e) => write!(f, "malformed entry: {e}"),
            Self::Config(e) => write!(f, "{e}"),
            Self::Canvas(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for WebHostError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Canvas(e) => Some(e),
        }
    }
}

impl From<CanvasError> for WebHostError {
    fn from(e: CanvasError) -> Self {
        Self::Canvas(e)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum EncodedSentinel {
    Zone { zone: String },
    Step { zone: String, index: usize },
    Gap { gap: String },
}

impl From<EncodedSentinel> for SentinelId {
    fn from(encoded: EncodedSentinel) -> Self {
        match encoded {
            EncodedSentinel::Zone { zone } => SentinelId::zone(zone),
            EncodedSentinel::Step { zone, index } => SentinelId::step(zone, index),
            EncodedSentinel::Gap { gap } => SentinelId::gap(gap),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct EncodedEntry {
    sentinel: EncodedSentinel,
    top: f64,
    bottom: f64,
    #[serde(default)]
    is_intersecting: Option<bool>,
    #[serde(default)]
    intersection_ratio: Option<f64>,
}

/// Result of one host frame, serialized for the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrameReport {
    pub frame_idx: u64,
    pub evaluated: bool,
    pub transition: String,
    pub layout_changed: bool,
    pub open: bool,
    pub closing: bool,
    pub active_zone: Option<String>,
    pub active_step: Option<usize>,
}

/// Serializable view of the layout contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayoutView {
    pub open: bool,
    pub closing: bool,
    pub full_bleed: bool,
    pub horizontal_shift: Option<String>,
    pub zone_id: Option<String>,
    pub step_index: Option<usize>,
    pub zone_payload: Option<String>,
    pub step_payload: Option<String>,
}

impl From<&LayoutContract<String>> for LayoutView {
    fn from(contract: &LayoutContract<String>) -> Self {
        let content = contract.content.as_ref();
        Self {
            open: contract.open,
            closing: contract.closing,
            full_bleed: contract.full_bleed,
            horizontal_shift: contract.horizontal_shift.clone(),
            zone_id: content.map(|c| c.zone_id.to_string()),
            step_index: content.and_then(|c| c.step_index),
            zone_payload: content.and_then(|c| c.zone.clone()),
            step_payload: content.and_then(|c| c.step.clone()),
        }
    }
}

fn duration_to_ms(duration: Duration) -> f64 {
    duration.as_micros() as f64 / 1000.0
}

/// Host-driven canvas with string payloads.
pub struct HostCore {
    clock: ManualClock,
    observer: HostObserver,
    bridge: SentinelBridge<HostObserver, String>,
    frame_idx: u64,
    logs: Vec<String>,
}

impl HostCore {
    /// Create a core for a `width` x `height` viewport.
    #[must_use]
    pub fn new(config: CanvasConfig, width: f64, height: f64) -> Self {
        let observer = HostObserver::new(config.observer);
        let context = CanvasContext::new(config, Viewport::new(width, height));
        Self {
            clock: ManualClock::new(),
            bridge: SentinelBridge::new(observer.clone(), context),
            observer,
            frame_idx: 0,
            logs: Vec::new(),
        }
    }

    /// Create a core from a JSON configuration.
    pub fn from_config_json(json: &str, width: f64, height: f64) -> Result<Self, WebHostError> {
        let config = CanvasConfig::from_json_str(json).map_err(WebHostError::Config)?;
        Ok(Self::new(config, width, height))
    }

    #[must_use]
    pub fn context(&self) -> &CanvasContext<String> {
        self.bridge.context()
    }

    /// Mount a zone. `total_steps == 0` mounts a single zone.
    pub fn mount_zone(
        &mut self,
        id: &str,
        total_steps: usize,
        payload: Option<String>,
    ) -> Result<Generation, WebHostError> {
        let mode = if total_steps == 0 {
            ZoneMode::Single
        } else {
            ZoneMode::Stepped { total_steps }
        };
        let sentinel = SentinelId::zone(id);
        Ok(self
            .bridge
            .mount_zone(&sentinel, ZoneId::from(id), mode, payload)?)
    }

    pub fn mount_step(
        &mut self,
        zone: &str,
        index: usize,
        payload: Option<String>,
    ) -> Result<Generation, WebHostError> {
        let sentinel = SentinelId::step(zone, index);
        Ok(self
            .bridge
            .mount_step(&sentinel, &ZoneId::from(zone), index, payload)?)
    }

    pub fn mount_gap(&mut self, id: &str) -> Result<Generation, WebHostError> {
        let sentinel = SentinelId::gap(id);
        Ok(self.bridge.mount_gap(&sentinel, GapId::from(id))?)
    }

    pub fn unmount_zone(&mut self, id: &str) -> bool {
        self.bridge.unmount(&SentinelId::zone(id))
    }

    pub fn unmount_step(&mut self, zone: &str, index: usize) -> bool {
        self.bridge.unmount(&SentinelId::step(zone, index))
    }

    pub fn unmount_gap(&mut self, id: &str) -> bool {
        self.bridge.unmount(&SentinelId::gap(id))
    }

    /// Parse one encoded entry and deliver it to the mounted sentinel.
    ///
    /// Returns the number of observations that received it (0 when the
    /// sentinel is not mounted).
    pub fn push_encoded_entry(&mut self, json: &str) -> Result<usize, WebHostError> {
        let encoded: EncodedEntry = serde_json::from_str(json).map_err(WebHostError::Json)?;
        let sentinel = SentinelId::from(encoded.sentinel);
        let bounds = VerticalSpan::new(encoded.top, encoded.bottom);
        let now = self.clock.now_mono();
        let delivered = match encoded.is_intersecting {
            None => self
                .observer
                .emit_bounds(&sentinel, bounds, self.context().viewport().height, now),
            Some(is_intersecting) => {
                let ratio = encoded
                    .intersection_ratio
                    .unwrap_or(if is_intersecting { 1.0 } else { 0.0 });
                let entry = IntersectionEntry {
                    is_intersecting,
                    intersection_ratio: ratio,
                    bounds,
                    observed_at: now,
                };
                self.observer.emit(&sentinel, entry)
            }
        };
        if delivered == 0 {
            tracing::trace!(sentinel = %sentinel, "entry for unmounted sentinel dropped");
        }
        Ok(delivered)
    }

    /// Like [`push_encoded_entry`](Self::push_encoded_entry), reporting
    /// failure as `false`.
    pub fn push_encoded_entry_lossy(&mut self, json: &str) -> bool {
        match self.push_encoded_entry(json) {
            Ok(delivered) => delivered > 0,
            Err(e) => {
                self.logs.push(format!("scrollcanvas entry_rejected error={e}"));
                false
            }
        }
    }

    /// Advance the clock by `dt_ms`. Non-finite or non-positive values are
    /// ignored.
    pub fn advance_time_ms(&mut self, dt_ms: f64) {
        if !self.clock.advance_ms(dt_ms) {
            tracing::trace!(dt_ms, "clock step ignored");
        }
    }

    /// Set the clock to absolute milliseconds. Never moves backwards.
    pub fn set_time_ms(&mut self, ts_ms: f64) {
        if !self.clock.set_ms(ts_ms) {
            tracing::trace!(ts_ms, "clock stamp ignored");
        }
    }

    #[must_use]
    pub fn now_ms(&self) -> f64 {
        self.clock.now_ms()
    }

    /// Resize the viewport.
    pub fn resize(&mut self, width: f64, height: f64) {
        if width.is_finite() && height.is_finite() && width >= 0.0 && height >= 0.0 {
            self.context().set_viewport(Viewport::new(width, height));
        }
    }

    /// Whether a frame should be scheduled.
    #[must_use]
    pub fn needs_frame(&self) -> bool {
        self.context().needs_frame()
    }

    /// Milliseconds until the pending close timer fires, if any.
    #[must_use]
    pub fn ms_until_deadline(&self) -> Option<f64> {
        let deadline = self.context().pending_deadline()?;
        let now = self.clock.now_mono();
        Some(duration_to_ms(deadline.saturating_sub(now)))
    }

    /// Run one animation frame at the current clock time.
    pub fn frame(&mut self) -> FrameReport {
        self.frame_idx += 1;
        let outcome = self.context().on_animation_frame(self.clock.now_mono());
        let snapshot = self.context().snapshot();
        let layout = self.context().layout();
        if outcome.transition.is_change() {
            self.logs.push(format!(
                "scrollcanvas frame={} transition={} open={}",
                self.frame_idx, outcome.transition, layout.open
            ));
        }
        FrameReport {
            frame_idx: self.frame_idx,
            evaluated: outcome.evaluated,
            transition: outcome.transition.to_string(),
            layout_changed: outcome.layout_changed,
            open: layout.open,
            closing: layout.closing,
            active_zone: snapshot.active_zone_id.map(|z| z.to_string()),
            active_step: snapshot.active_step_index,
        }
    }

    /// Frame report as JSON.
    pub fn frame_json(&mut self) -> String {
        let report = self.frame();
        serde_json::to_string(&report).unwrap_or_default()
    }

    #[must_use]
    pub fn layout(&self) -> LayoutView {
        LayoutView::from(&self.context().layout())
    }

    /// Current layout as JSON.
    #[must_use]
    pub fn layout_json(&self) -> String {
        serde_json::to_string(&self.layout()).unwrap_or_default()
    }

    /// Drain accumulated log lines.
    pub fn take_logs(&mut self) -> Vec<String> {
        std::mem::take(&mut self.logs)
    }

    /// Unmount everything and tear the context down.
    pub fn teardown(&mut self) {
        self.bridge.unmount_all();
        self.context().teardown();
    }
}
