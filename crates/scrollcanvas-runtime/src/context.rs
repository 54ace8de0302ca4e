#![forbid(unsafe_code)]

//! Shared canvas context.
//!
//! A [`CanvasContext`] is a cheap, cloneable handle to the state one page
//! region shares: the zone registry, the activation engine, the frame
//! coalescer, the content catalog, and the published layout contract.
//! There is no global instance; hosts pass the handle (or a
//! [`WeakCanvasContext`]) to whatever needs it.
//!
//! # Frame flow
//!
//! ```text
//!  observer callback ─▶ update_geometry ─▶ registry ─▶ frames.request()
//!                                                            │
//!  host animation frame ─▶ on_animation_frame(now) ──────────┘
//!                              │ evaluate (at most once)
//!                              ▼
//!                         engine ─▶ coordinator.project ─▶ layout.set ─▶ subscribers
//! ```
//!
//! # Invariants
//!
//! 1. Activation is evaluated at most once per `on_animation_frame`, no
//!    matter how many geometry updates arrived since the previous frame.
//! 2. Subscribers run after every interior borrow is released.
//! 3. After [`teardown`](CanvasContext::teardown) every operation is a
//!    no-op: registrations fail with [`CanvasError::TornDown`], geometry
//!    reports [`GeometryUpdate::Detached`], and frames do nothing.
//! 4. Teardown hooks run exactly once, before teardown returns. Bridges
//!    use them to release their observers.
//! 5. The snapshot never names a zone or step that is no longer
//!    registered.
//!
//! # Failure Modes
//!
//! - **Re-entrant registration from a layout subscriber**: allowed, since
//!   the state borrow is released before subscribers run.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use scrollcanvas_core::frame::FrameCoalescer;
use scrollcanvas_core::observer::IntersectionEntry;
use scrollcanvas_core::{ActivationSnapshot, Duration, GapId, SentinelId, ZoneId};
use scrollcanvas_layout::{
    ContentCatalog, LayoutConfig, LayoutContract, LayoutCoordinator, Viewport, ViewportClass,
};
use tracing::field::Empty;

use crate::activation::{ActivationEngine, ActivationTransition};
use crate::config::CanvasConfig;
use crate::publish::{Published, Subscription};
use crate::registry::{Generation, GeometryUpdate, RegistryError, ZoneMode, ZoneRegistry};

/// Errors from context operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanvasError {
    Registry(RegistryError),
    /// The context was torn down.
    TornDown,
}

impl fmt::Display for CanvasError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registry(e) => write!(f, "registry error: {e}"),
            Self::TornDown => f.write_str("canvas context has been torn down"),
        }
    }
}

impl std::error::Error for CanvasError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Registry(e) => Some(e),
            Self::TornDown => None,
        }
    }
}

impl From<RegistryError> for CanvasError {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

/// What one animation frame did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameOutcome {
    /// Whether pending geometry was evaluated.
    pub evaluated: bool,
    pub transition: ActivationTransition,
    /// Whether the published layout contract changed.
    pub layout_changed: bool,
}

impl FrameOutcome {
    fn idle() -> Self {
        Self {
            evaluated: false,
            transition: ActivationTransition::Unchanged,
            layout_changed: false,
        }
    }
}

struct CanvasState<P> {
    config: CanvasConfig,
    registry: ZoneRegistry,
    engine: ActivationEngine,
    frames: FrameCoalescer,
    catalog: ContentCatalog<P>,
    coordinator: LayoutCoordinator,
    viewport: Viewport,
    class_override: Option<ViewportClass>,
    torn_down: bool,
}

impl<P: Clone> CanvasState<P> {
    fn viewport_class(&self) -> ViewportClass {
        self.class_override
            .unwrap_or_else(|| self.viewport.class(self.config.desktop_min_width))
    }

    fn project(&self) -> LayoutContract<P> {
        self.coordinator
            .project(&self.engine.snapshot(), self.viewport_class(), &self.catalog)
    }

    fn request_frame(&mut self) {
        if self.frames.request() {
            tracing::trace!("frame requested");
        }
    }

    fn forget(&mut self, sentinel: &SentinelId) {
        match sentinel {
            SentinelId::Zone(zone) => {
                self.catalog.remove_zone(zone);
                self.engine.forget_zone(zone);
            }
            SentinelId::Step(zone, index) => {
                self.catalog.remove_step(zone, *index);
                let fallback = self.registry.zone(zone).and_then(|r| r.lowest_step());
                self.engine.forget_step(zone, *index, fallback);
            }
            SentinelId::Gap(_) => {}
        }
    }
}

type TeardownHook = Box<dyn FnOnce()>;

struct CanvasShared<P> {
    state: RefCell<CanvasState<P>>,
    layout: Published<LayoutContract<P>>,
    teardown_hooks: RefCell<Vec<TeardownHook>>,
}

/// Handle to shared canvas state. Clones share the same state.
pub struct CanvasContext<P> {
    shared: Rc<CanvasShared<P>>,
}

impl<P> Clone for CanvasContext<P> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<P> fmt::Debug for CanvasContext<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.borrow();
        f.debug_struct("CanvasContext")
            .field("zones", &state.registry.zone_count())
            .field("state", &state.engine.state().label())
            .field("torn_down", &state.torn_down)
            .finish()
    }
}

impl<P: Clone + PartialEq + 'static> CanvasContext<P> {
    /// Create a context for `viewport`.
    #[must_use]
    pub fn new(config: CanvasConfig, viewport: Viewport) -> Self {
        let state = CanvasState {
            engine: ActivationEngine::new(config.activation),
            coordinator: LayoutCoordinator::new(config.layout.clone()),
            config,
            registry: ZoneRegistry::new(),
            frames: FrameCoalescer::new(),
            catalog: ContentCatalog::new(),
            viewport,
            class_override: None,
            torn_down: false,
        };
        let initial = state.project();
        Self {
            shared: Rc::new(CanvasShared {
                state: RefCell::new(state),
                layout: Published::new(initial),
                teardown_hooks: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Weak handle for observer callbacks.
    #[must_use]
    pub fn downgrade(&self) -> WeakCanvasContext<P> {
        WeakCanvasContext {
            shared: Rc::downgrade(&self.shared),
        }
    }

    fn live_state(&self) -> Result<std::cell::RefMut<'_, CanvasState<P>>, CanvasError> {
        let state = self.shared.state.borrow_mut();
        if state.torn_down {
            Err(CanvasError::TornDown)
        } else {
            Ok(state)
        }
    }

    // ---- registration -------------------------------------------------

    /// Register a zone with its render payload.
    pub fn register_zone(
        &self,
        id: ZoneId,
        mode: ZoneMode,
        payload: Option<P>,
    ) -> Result<Generation, CanvasError> {
        let mut state = self.live_state()?;
        let generation = state.registry.register_zone(id.clone(), mode)?;
        // A replaced record loses its steps and geometry.
        state.forget(&SentinelId::Zone(id.clone()));
        state.catalog.set_zone(id, payload);
        state.request_frame();
        Ok(generation)
    }

    /// Register step `index` of `zone`. The zone must be registered first.
    pub fn register_step(
        &self,
        zone: &ZoneId,
        index: usize,
        payload: Option<P>,
    ) -> Result<Generation, CanvasError> {
        let mut state = self.live_state()?;
        let generation = state.registry.register_step(zone, index)?;
        match payload {
            Some(payload) => state.catalog.set_step(zone.clone(), index, payload),
            None => state.catalog.remove_step(zone, index),
        }
        state.request_frame();
        Ok(generation)
    }

    /// Register a gap.
    pub fn register_gap(&self, id: GapId) -> Result<Generation, CanvasError> {
        let mut state = self.live_state()?;
        let generation = state.registry.register_gap(id);
        state.request_frame();
        Ok(generation)
    }

    /// Remove a zone, its steps, and their payloads.
    pub fn unregister_zone(&self, id: &ZoneId) -> bool {
        self.unregister(&SentinelId::Zone(id.clone()))
    }

    /// Remove one step and its payload.
    pub fn unregister_step(&self, zone: &ZoneId, index: usize) -> bool {
        self.unregister(&SentinelId::Step(zone.clone(), index))
    }

    /// Remove a gap.
    pub fn unregister_gap(&self, id: &GapId) -> bool {
        self.unregister(&SentinelId::Gap(id.clone()))
    }

    fn unregister(&self, sentinel: &SentinelId) -> bool {
        let Ok(mut state) = self.live_state() else {
            return false;
        };
        let removed = match sentinel {
            SentinelId::Zone(zone) => state.registry.unregister_zone(zone).is_some(),
            SentinelId::Step(zone, index) => state.registry.unregister_step(zone, *index),
            SentinelId::Gap(gap) => state.registry.unregister_gap(gap),
        };
        if removed {
            state.forget(sentinel);
            state.request_frame();
        }
        removed
    }

    /// Remove `sentinel` only if `generation` still owns it.
    pub fn release(&self, sentinel: &SentinelId, generation: Generation) -> bool {
        let Ok(mut state) = self.live_state() else {
            return false;
        };
        let removed = state.registry.release(sentinel, generation);
        if removed {
            state.forget(sentinel);
            state.request_frame();
        }
        removed
    }

    /// Generation of the live registration for `sentinel`.
    #[must_use]
    pub fn generation_of(&self, sentinel: &SentinelId) -> Option<Generation> {
        self.shared.state.borrow().registry.generation_of(sentinel)
    }

    // ---- geometry and frames ------------------------------------------

    /// Store a new entry and schedule a frame if it was applied.
    pub fn update_geometry(
        &self,
        sentinel: &SentinelId,
        entry: IntersectionEntry,
    ) -> GeometryUpdate {
        let Ok(mut state) = self.live_state() else {
            tracing::trace!(sentinel = %sentinel, "geometry after teardown ignored");
            return GeometryUpdate::Detached;
        };
        let result = state.registry.update_geometry(sentinel, entry);
        if result.is_applied() {
            state.request_frame();
        }
        result
    }

    /// Whether an evaluation is pending for the next frame.
    #[must_use]
    pub fn needs_frame(&self) -> bool {
        self.shared.state.borrow().frames.is_pending()
    }

    /// Run one animation frame at `now`.
    ///
    /// Evaluates activation if geometry changed since the last frame, fires
    /// a due close timer, and publishes the layout.
    pub fn on_animation_frame(&self, now: Duration) -> FrameOutcome {
        let Ok(mut guard) = self.live_state() else {
            return FrameOutcome::idle();
        };
        let state = &mut *guard;
        let span = tracing::debug_span!(
            "scrollcanvas.frame",
            zones = state.registry.zone_count(),
            coalesced = state.frames.coalesced_requests(),
            transition = Empty,
        );
        let _enter = span.enter();

        let evaluated = state.frames.take();
        let mut transition = if evaluated {
            state
                .engine
                .evaluate(&state.registry, state.viewport.height, now)
        } else {
            ActivationTransition::Unchanged
        };
        if !transition.is_change() {
            transition = state.engine.advance(now);
        }
        span.record("transition", tracing::field::display(&transition));
        let contract = state.project();
        drop(guard);

        let layout_changed = self.shared.layout.publish(contract);
        FrameOutcome {
            evaluated,
            transition,
            layout_changed,
        }
    }

    /// Fire the close timer if due at `now`, without evaluating geometry.
    pub fn advance(&self, now: Duration) -> ActivationTransition {
        let Ok(mut state) = self.live_state() else {
            return ActivationTransition::Unchanged;
        };
        let transition = state.engine.advance(now);
        if !transition.is_change() {
            return transition;
        }
        let contract = state.project();
        drop(state);
        self.shared.layout.publish(contract);
        transition
    }

    /// Deadline of the pending close timer, for hosts that schedule it.
    #[must_use]
    pub fn pending_deadline(&self) -> Option<Duration> {
        self.shared.state.borrow().engine.pending_deadline()
    }

    // ---- viewport and layout ------------------------------------------

    /// Update viewport dimensions. The activation line moves with the
    /// height, so a frame is scheduled; the class may change immediately.
    pub fn set_viewport(&self, viewport: Viewport) {
        let Ok(mut state) = self.live_state() else {
            return;
        };
        if state.viewport == viewport {
            return;
        }
        let before = state.viewport_class();
        state.viewport = viewport;
        state.request_frame();
        let after = state.viewport_class();
        if before != after {
            tracing::debug!(from = %before, to = %after, "viewport class changed");
        }
        let contract = state.project();
        drop(state);
        self.shared.layout.publish(contract);
    }

    /// Force a viewport class (for hosts with their own media query), or
    /// `None` to classify by width.
    pub fn set_viewport_class(&self, class: Option<ViewportClass>) {
        let Ok(mut state) = self.live_state() else {
            return;
        };
        state.class_override = class;
        let contract = state.project();
        drop(state);
        self.shared.layout.publish(contract);
    }

    /// Replace the presentation knobs.
    pub fn set_layout_config(&self, config: LayoutConfig) {
        let Ok(mut state) = self.live_state() else {
            return;
        };
        state.config.layout = config.clone();
        state.coordinator.set_config(config);
        let contract = state.project();
        drop(state);
        self.shared.layout.publish(contract);
    }

    #[must_use]
    pub fn viewport(&self) -> Viewport {
        self.shared.state.borrow().viewport
    }

    #[must_use]
    pub fn viewport_class(&self) -> ViewportClass {
        self.shared.state.borrow().viewport_class()
    }

    #[must_use]
    pub fn config(&self) -> CanvasConfig {
        self.shared.state.borrow().config.clone()
    }

    /// Current activation snapshot.
    #[must_use]
    pub fn snapshot(&self) -> ActivationSnapshot {
        self.shared.state.borrow().engine.snapshot()
    }

    /// Last published layout contract.
    #[must_use]
    pub fn layout(&self) -> LayoutContract<P> {
        self.shared.layout.current()
    }

    /// Bumps each time the published layout changes.
    #[must_use]
    pub fn layout_version(&self) -> u64 {
        self.shared.layout.version()
    }

    /// Observe layout changes. Dropping the guard unsubscribes.
    pub fn subscribe(&self, callback: impl Fn(&LayoutContract<P>) + 'static) -> Subscription {
        self.shared.layout.subscribe(callback)
    }

    /// Read-only access to the registry.
    pub fn with_registry<R>(&self, f: impl FnOnce(&ZoneRegistry) -> R) -> R {
        f(&self.shared.state.borrow().registry)
    }

    // ---- teardown -----------------------------------------------------

    /// Run `hook` once at teardown, or right away if the context is
    /// already torn down.
    pub fn on_teardown(&self, hook: impl FnOnce() + 'static) {
        if self.is_torn_down() {
            hook();
            return;
        }
        self.shared.teardown_hooks.borrow_mut().push(Box::new(hook));
    }

    /// Cancel timers, drop every registration, run teardown hooks, publish
    /// the closed layout, and detach subscribers. Idempotent.
    pub fn teardown(&self) {
        let Ok(mut state) = self.live_state() else {
            return;
        };
        state.torn_down = true;
        state.engine.cancel();
        state.registry.clear();
        state.catalog.clear();
        state.frames.clear();
        drop(state);
        let hooks = std::mem::take(&mut *self.shared.teardown_hooks.borrow_mut());
        tracing::debug!(hooks = hooks.len(), "canvas context torn down");
        for hook in hooks {
            hook();
        }
        self.shared.layout.publish(LayoutContract::closed());
        self.shared.layout.detach_all();
    }

    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.shared.state.borrow().torn_down
    }
}

/// Non-owning handle held by observer callbacks.
pub struct WeakCanvasContext<P> {
    shared: Weak<CanvasShared<P>>,
}

impl<P> Clone for WeakCanvasContext<P> {
    fn clone(&self) -> Self {
        Self {
            shared: Weak::clone(&self.shared),
        }
    }
}

impl<P> fmt::Debug for WeakCanvasContext<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakCanvasContext")
            .field("alive", &(self.shared.strong_count() > 0))
            .finish()
    }
}

impl<P: Clone + PartialEq + 'static> WeakCanvasContext<P> {
    /// The live context, or `None` once dropped or torn down.
    #[must_use]
    pub fn upgrade(&self) -> Option<CanvasContext<P>> {
        let shared = self.shared.upgrade()?;
        let context = CanvasContext { shared };
        (!context.is_torn_down()).then_some(context)
    }

    /// Forward an entry, or report [`GeometryUpdate::Detached`].
    pub fn update_geometry(
        &self,
        sentinel: &SentinelId,
        entry: IntersectionEntry,
    ) -> GeometryUpdate {
        match self.upgrade() {
            Some(context) => context.update_geometry(sentinel, entry),
            None => GeometryUpdate::Detached,
        }
    }
}
