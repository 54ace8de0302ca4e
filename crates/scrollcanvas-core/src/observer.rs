#![forbid(unsafe_code)]

//! Viewport observation: the adapter contract around the host's
//! intersection-detection primitive.
//!
//! # Design
//!
//! [`ViewportObserver::observe`] registers a target and returns an
//! [`ObserverHandle`]. The handle is an RAII guard: dropping it (or calling
//! [`ObserverHandle::unobserve`]) runs the registration's cleanup exactly
//! once. The adapter applies no policy; it only reports
//! [`IntersectionEntry`] values.
//!
//! [`HostObserver`] is the host-driven implementation: the embedder pushes
//! entries via [`HostObserver::emit`] (or synthesises them from raw geometry
//! with [`HostObserver::emit_bounds`]). Browsers use the `IntersectionObserver`
//! wrapper in `scrollcanvas-web`.
//!
//! # Failure Modes
//!
//! - **Primitive unavailable**: an unsupported adapter accepts every
//!   registration and returns an inert handle. No callback ever fires, so
//!   the canvas never opens. Nothing panics.
//! - **Re-entrant callbacks**: callbacks are collected before they run, so a
//!   callback may observe or unobserve targets on the same adapter.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use web_time::Duration;

use crate::geometry::VerticalSpan;
use crate::sentinel::SentinelId;

/// Default root margin percentage: shrink the viewport to its middle third.
pub const DEFAULT_ROOT_MARGIN_PERCENT: f64 = -33.0;

/// Default minimum intersection ratio (any visibility counts).
pub const DEFAULT_THRESHOLD: f64 = 0.0;

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// One visibility report for an observed target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectionEntry {
    /// Whether the target overlaps the (margin-adjusted) root.
    pub is_intersecting: bool,
    /// Visible fraction of the target, `0.0..=1.0`.
    pub intersection_ratio: f64,
    /// Bounding geometry of the target in viewport coordinates.
    pub bounds: VerticalSpan,
    /// Monotonic time the host computed this entry.
    pub observed_at: Duration,
}

impl IntersectionEntry {
    /// An entry reporting the target as not intersecting.
    #[must_use]
    pub fn hidden(bounds: VerticalSpan, observed_at: Duration) -> Self {
        Self {
            is_intersecting: false,
            intersection_ratio: 0.0,
            bounds,
            observed_at,
        }
    }

    /// An entry reporting the target as intersecting with `ratio`.
    #[must_use]
    pub fn visible(bounds: VerticalSpan, ratio: f64, observed_at: Duration) -> Self {
        Self {
            is_intersecting: true,
            intersection_ratio: ratio.clamp(0.0, 1.0),
            bounds,
            observed_at,
        }
    }

    /// Derive an entry from raw geometry the way the browser would.
    ///
    /// The root is `[0, viewport_height]` grown (or shrunk, for negative
    /// values) by `options.root_margin`. The target intersects when it
    /// overlaps the root and its visible ratio reaches `options.threshold`.
    /// Zero-height targets count as fully visible when they sit inside the
    /// root.
    #[must_use]
    pub fn compute(
        bounds: VerticalSpan,
        viewport_height: f64,
        options: &ObserverOptions,
        observed_at: Duration,
    ) -> Self {
        if !bounds.is_finite() || !viewport_height.is_finite() || viewport_height <= 0.0 {
            return Self::hidden(bounds, observed_at);
        }
        let root = options.root_margin.root_span(viewport_height);
        let ratio = if bounds.height() == 0.0 {
            if bounds.top >= root.top && bounds.top <= root.bottom {
                1.0
            } else {
                0.0
            }
        } else {
            bounds
                .intersection(&root)
                .map_or(0.0, |overlap| overlap.height() / bounds.height())
        };
        if ratio > 0.0 && ratio >= options.threshold {
            Self::visible(bounds, ratio, observed_at)
        } else {
            Self {
                intersection_ratio: ratio,
                ..Self::hidden(bounds, observed_at)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// One side of a CSS-style root margin.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum MarginValue {
    /// Absolute pixels.
    Px(f64),
    /// Percentage of the viewport height.
    Percent(f64),
}

impl MarginValue {
    /// Resolve to pixels for a viewport of `viewport_height`.
    #[must_use]
    pub fn resolve(self, viewport_height: f64) -> f64 {
        match self {
            Self::Px(px) => px,
            Self::Percent(pct) => viewport_height * pct / 100.0,
        }
    }

    fn parse(token: &str) -> Result<Self, RootMarginError> {
        let invalid = || RootMarginError::InvalidToken(token.to_owned());
        if let Some(num) = token.strip_suffix('%') {
            num.parse().map(Self::Percent).map_err(|_| invalid())
        } else if let Some(num) = token.strip_suffix("px") {
            num.parse().map(Self::Px).map_err(|_| invalid())
        } else if token == "0" {
            Ok(Self::Px(0.0))
        } else {
            Err(invalid())
        }
    }
}

impl fmt::Display for MarginValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Px(px) => write!(f, "{px}px"),
            Self::Percent(pct) => write!(f, "{pct}%"),
        }
    }
}

/// Vertical root margin applied around the viewport.
///
/// Horizontal margins are irrelevant for vertical scrolling and always
/// render as `0px`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RootMargin {
    pub top: MarginValue,
    pub bottom: MarginValue,
}

/// Error parsing a CSS root margin string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootMarginError {
    /// Zero or more than four tokens.
    TokenCount(usize),
    /// A token that is neither `N%`, `Npx`, nor `0`.
    InvalidToken(String),
}

impl fmt::Display for RootMarginError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TokenCount(n) => write!(f, "root margin needs 1 to 4 values, got {n}"),
            Self::InvalidToken(token) => write!(f, "invalid root margin value: {token:?}"),
        }
    }
}

impl std::error::Error for RootMarginError {}

impl RootMargin {
    /// No margin: the root is exactly the viewport.
    pub const ZERO: Self = Self {
        top: MarginValue::Px(0.0),
        bottom: MarginValue::Px(0.0),
    };

    /// Symmetric percentage margin on top and bottom.
    #[must_use]
    pub const fn percent(pct: f64) -> Self {
        Self {
            top: MarginValue::Percent(pct),
            bottom: MarginValue::Percent(pct),
        }
    }

    /// Parse CSS shorthand (`"-33% 0px -33% 0px"`, `"10px"`, ...).
    pub fn parse(css: &str) -> Result<Self, RootMarginError> {
        let tokens: Vec<&str> = css.split_whitespace().collect();
        let (top, bottom) = match tokens.as_slice() {
            [all] => (*all, *all),
            [vertical, _] => (*vertical, *vertical),
            [top, _, bottom] | [top, _, bottom, _] => (*top, *bottom),
            other => return Err(RootMarginError::TokenCount(other.len())),
        };
        Ok(Self {
            top: MarginValue::parse(top)?,
            bottom: MarginValue::parse(bottom)?,
        })
    }

    /// CSS shorthand suitable for `IntersectionObserverInit.rootMargin`.
    #[must_use]
    pub fn to_css(&self) -> String {
        format!("{} 0px {} 0px", self.top, self.bottom)
    }

    /// The root band for a viewport of `viewport_height`.
    #[must_use]
    pub fn root_span(&self, viewport_height: f64) -> VerticalSpan {
        VerticalSpan {
            top: -self.top.resolve(viewport_height),
            bottom: viewport_height + self.bottom.resolve(viewport_height),
        }
    }
}

impl Default for RootMargin {
    fn default() -> Self {
        Self::percent(DEFAULT_ROOT_MARGIN_PERCENT)
    }
}

/// Options shared by every registration on one adapter.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ObserverOptions {
    pub root_margin: RootMargin,
    /// Minimum visible ratio for a target to count as intersecting.
    pub threshold: f64,
}

impl Default for ObserverOptions {
    fn default() -> Self {
        Self {
            root_margin: RootMargin::default(),
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

// ---------------------------------------------------------------------------
// Handles and the adapter trait
// ---------------------------------------------------------------------------

/// Callback invoked with each new entry for a target.
pub type EntryCallback = Box<dyn Fn(IntersectionEntry)>;

/// RAII guard for one observation.
///
/// The cleanup runs exactly once: on [`unobserve`](Self::unobserve) or on
/// drop, whichever comes first.
pub struct ObserverHandle {
    cleanup: Option<Box<dyn FnOnce()>>,
}

impl ObserverHandle {
    /// Wrap a cleanup closure.
    #[must_use]
    pub fn new(cleanup: impl FnOnce() + 'static) -> Self {
        Self {
            cleanup: Some(Box::new(cleanup)),
        }
    }

    /// A handle with nothing to clean up.
    #[must_use]
    pub fn inert() -> Self {
        Self { cleanup: None }
    }

    /// Whether the cleanup has not run yet.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.cleanup.is_some()
    }

    /// Stop observing now.
    pub fn unobserve(mut self) {
        self.run_cleanup();
    }

    fn run_cleanup(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }
}

impl Drop for ObserverHandle {
    fn drop(&mut self) {
        self.run_cleanup();
    }
}

impl fmt::Debug for ObserverHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverHandle")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Adapter around a host visibility primitive.
pub trait ViewportObserver {
    /// What the host observes (a DOM element, a sentinel id, ...).
    type Target;

    /// Register `target`; `callback` fires on every visibility change until
    /// the returned handle is dropped.
    fn observe(&self, target: &Self::Target, callback: EntryCallback) -> ObserverHandle;

    /// Whether the underlying primitive exists. Unsupported adapters never
    /// fire callbacks.
    fn is_supported(&self) -> bool {
        true
    }

    /// Options applied to every registration.
    fn options(&self) -> ObserverOptions;
}

// ---------------------------------------------------------------------------
// Host-driven adapter
// ---------------------------------------------------------------------------

struct Watcher {
    target: SentinelId,
    callback: Rc<dyn Fn(IntersectionEntry)>,
}

struct HostObserverInner {
    supported: bool,
    options: ObserverOptions,
    next_key: u64,
    watchers: BTreeMap<u64, Watcher>,
}

/// Host-driven [`ViewportObserver`] keyed by [`SentinelId`].
///
/// Cloning shares the same registrations.
#[derive(Clone)]
pub struct HostObserver {
    inner: Rc<RefCell<HostObserverInner>>,
}

impl HostObserver {
    /// A supported adapter with `options`.
    #[must_use]
    pub fn new(options: ObserverOptions) -> Self {
        Self::build(true, options)
    }

    /// An adapter standing in for a missing primitive: registrations are
    /// accepted but nothing is ever reported.
    #[must_use]
    pub fn unsupported() -> Self {
        Self::build(false, ObserverOptions::default())
    }

    fn build(supported: bool, options: ObserverOptions) -> Self {
        Self {
            inner: Rc::new(RefCell::new(HostObserverInner {
                supported,
                options,
                next_key: 0,
                watchers: BTreeMap::new(),
            })),
        }
    }

    /// Deliver `entry` to every registration on `target`.
    ///
    /// Returns the number of callbacks invoked.
    pub fn emit(&self, target: &SentinelId, entry: IntersectionEntry) -> usize {
        let callbacks: Vec<Rc<dyn Fn(IntersectionEntry)>> = {
            let inner = self.inner.borrow();
            if !inner.supported {
                return 0;
            }
            inner
                .watchers
                .values()
                .filter(|w| &w.target == target)
                .map(|w| Rc::clone(&w.callback))
                .collect()
        };
        for cb in &callbacks {
            cb(entry);
        }
        callbacks.len()
    }

    /// Compute an entry from raw geometry with this adapter's options and
    /// deliver it.
    pub fn emit_bounds(
        &self,
        target: &SentinelId,
        bounds: VerticalSpan,
        viewport_height: f64,
        observed_at: Duration,
    ) -> usize {
        let options = self.inner.borrow().options;
        let entry = IntersectionEntry::compute(bounds, viewport_height, &options, observed_at);
        self.emit(target, entry)
    }

    /// Number of live registrations.
    #[must_use]
    pub fn observed_count(&self) -> usize {
        self.inner.borrow().watchers.len()
    }

    /// Whether `target` has at least one live registration.
    #[must_use]
    pub fn is_observing(&self, target: &SentinelId) -> bool {
        self.inner
            .borrow()
            .watchers
            .values()
            .any(|w| &w.target == target)
    }
}

impl Default for HostObserver {
    fn default() -> Self {
        Self::new(ObserverOptions::default())
    }
}

impl fmt::Debug for HostObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("HostObserver")
            .field("supported", &inner.supported)
            .field("options", &inner.options)
            .field("observed", &inner.watchers.len())
            .finish()
    }
}

impl ViewportObserver for HostObserver {
    type Target = SentinelId;

    fn observe(&self, target: &SentinelId, callback: EntryCallback) -> ObserverHandle {
        let mut inner = self.inner.borrow_mut();
        if !inner.supported {
            tracing::debug!(target = %target, "viewport observer unsupported; registration inert");
            return ObserverHandle::inert();
        }
        let key = inner.next_key;
        inner.next_key += 1;
        inner.watchers.insert(
            key,
            Watcher {
                target: target.clone(),
                callback: Rc::from(callback),
            },
        );
        let weak: Weak<RefCell<HostObserverInner>> = Rc::downgrade(&self.inner);
        ObserverHandle::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().watchers.remove(&key);
            }
        })
    }

    fn is_supported(&self) -> bool {
        self.inner.borrow().supported
    }

    fn options(&self) -> ObserverOptions {
        self.inner.borrow().options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn default_root_margin_is_middle_third() {
        let margin = RootMargin::default();
        assert_eq!(margin.to_css(), "-33% 0px -33% 0px");
        let band = margin.root_span(900.0);
        assert!((band.top - 297.0).abs() < 1e-9);
        assert!((band.bottom - 603.0).abs() < 1e-9);
    }

    #[test]
    fn parse_root_margin_forms() {
        assert_eq!(
            RootMargin::parse("-33% 0px -33% 0px").unwrap(),
            RootMargin::default()
        );
        assert_eq!(
            RootMargin::parse("10px").unwrap(),
            RootMargin {
                top: MarginValue::Px(10.0),
                bottom: MarginValue::Px(10.0)
            }
        );
        assert_eq!(
            RootMargin::parse("0 5px -20%").unwrap(),
            RootMargin {
                top: MarginValue::Px(0.0),
                bottom: MarginValue::Percent(-20.0)
            }
        );
    }

    #[test]
    fn parse_root_margin_rejects_garbage() {
        assert_eq!(RootMargin::parse(""), Err(RootMarginError::TokenCount(0)));
        assert!(matches!(
            RootMargin::parse("10em"),
            Err(RootMarginError::InvalidToken(_))
        ));
    }

    #[test]
    fn compute_inside_band_intersects() {
        let opts = ObserverOptions::default();
        let bounds = VerticalSpan::new(350.0, 450.0);
        let entry = IntersectionEntry::compute(bounds, 900.0, &opts, ms(1));
        assert!(entry.is_intersecting);
        assert_eq!(entry.intersection_ratio, 1.0);
    }

    #[test]
    fn compute_outside_band_is_hidden() {
        let opts = ObserverOptions::default();
        // Visible in the viewport, but above the middle third.
        let entry = IntersectionEntry::compute(VerticalSpan::new(10.0, 200.0), 900.0, &opts, ms(1));
        assert!(!entry.is_intersecting);
        assert_eq!(entry.intersection_ratio, 0.0);
    }

    #[test]
    fn compute_respects_threshold() {
        let opts = ObserverOptions {
            root_margin: RootMargin::ZERO,
            threshold: 0.5,
        };
        // 25% of the target is on screen.
        let bounds = VerticalSpan::new(-300.0, 100.0);
        let entry = IntersectionEntry::compute(bounds, 800.0, &opts, ms(0));
        assert!(!entry.is_intersecting);
        assert!((entry.intersection_ratio - 0.25).abs() < 1e-9);
    }

    #[test]
    fn compute_degenerate_viewport_is_hidden() {
        let opts = ObserverOptions::default();
        let entry = IntersectionEntry::compute(VerticalSpan::new(0.0, 10.0), 0.0, &opts, ms(0));
        assert!(!entry.is_intersecting);
    }

    #[test]
    fn handle_cleanup_runs_exactly_once() {
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let handle = ObserverHandle::new(move || c.set(c.get() + 1));
        assert!(handle.is_active());
        handle.unobserve();
        assert_eq!(count.get(), 1);

        let c = Rc::clone(&count);
        drop(ObserverHandle::new(move || c.set(c.get() + 1)));
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn host_observer_delivers_until_dropped() {
        let observer = HostObserver::default();
        let seen = Rc::new(Cell::new(0));
        let s = Rc::clone(&seen);
        let target = SentinelId::zone("a");
        let handle = observer.observe(&target, Box::new(move |_| s.set(s.get() + 1)));

        let entry = IntersectionEntry::visible(VerticalSpan::new(0.0, 1.0), 1.0, ms(0));
        assert_eq!(observer.emit(&target, entry), 1);
        assert_eq!(observer.emit(&SentinelId::zone("b"), entry), 0);
        assert_eq!(seen.get(), 1);

        drop(handle);
        assert_eq!(observer.observed_count(), 0);
        assert_eq!(observer.emit(&target, entry), 0);
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn unsupported_observer_never_fires() {
        let observer = HostObserver::unsupported();
        assert!(!observer.is_supported());
        let fired = Rc::new(Cell::new(false));
        let f = Rc::clone(&fired);
        let target = SentinelId::zone("a");
        let handle = observer.observe(&target, Box::new(move |_| f.set(true)));
        assert!(!handle.is_active());
        let entry = IntersectionEntry::visible(VerticalSpan::new(0.0, 1.0), 1.0, ms(0));
        assert_eq!(observer.emit(&target, entry), 0);
        assert!(!fired.get());
    }

    #[test]
    fn callback_may_unobserve_reentrantly() {
        let observer = HostObserver::default();
        let target = SentinelId::gap("g");
        let slot: Rc<RefCell<Option<ObserverHandle>>> = Rc::new(RefCell::new(None));
        let s = Rc::clone(&slot);
        let handle = observer.observe(
            &target,
            Box::new(move |_| {
                s.borrow_mut().take();
            }),
        );
        *slot.borrow_mut() = Some(handle);
        let entry = IntersectionEntry::hidden(VerticalSpan::default(), ms(0));
        assert_eq!(observer.emit(&target, entry), 1);
        assert_eq!(observer.observed_count(), 0);
    }
}
