#![forbid(unsafe_code)]

//! Activation decision engine: the canvas open/close state machine.
//!
//! # States
//!
//! ```text
//!            zone intersects                    no zone intersects
//!   Closed ──────────────────▶ Open(z, s) ─────────────────────────▶ ClosingPending(z, s, timer)
//!     ▲                         │   ▲                                    │        │
//!     │                         └───┘ zone/step switch                   │        │
//!     │                                          zone intersects again   │        │
//!     │                        Open(z', s') ◀────────────────────────────┘        │
//!     └───────────────────────────────────────────────────────────────────────────┘
//!                                 timer deadline reached, nothing intersecting
//! ```
//!
//! # Selection
//!
//! - **Zone**: among intersecting zones, the one whose bounds midpoint is
//!   closest to the activation line. Ties (within `tie_epsilon`) keep the
//!   currently active zone, then prefer the lower top offset, then the
//!   earlier registration.
//! - **Step**: among intersecting steps of the active zone, the closest
//!   midpoint; ties prefer the lower index. With no intersecting step the
//!   zone's previous step is kept, falling back to its lowest mounted step.
//!
//! # Invariants
//!
//! 1. The canvas never opens unless a zone is intersecting.
//! 2. `Open → Closed` always passes through `ClosingPending` and lasts at
//!    least `close_delay`.
//! 3. Any activation during `ClosingPending` cancels the timer.
//! 4. A stepped active zone with mounted steps always has an active step.

use std::fmt;

use rustc_hash::FxHashMap;
use scrollcanvas_core::{ActivationSnapshot, ZoneId};
use web_time::Duration;

use crate::registry::{ZoneRecord, ZoneRegistry};

/// Default close debounce.
pub const DEFAULT_CLOSE_DELAY_MS: u64 = 600;

/// Default activation line as a fraction of the viewport height.
pub const DEFAULT_ACTIVATION_LINE: f64 = 0.5;

/// Default distance (px) under which two candidates count as tied.
pub const DEFAULT_TIE_EPSILON: f64 = 0.5;

/// Tunables for the decision engine.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "policy-config",
    derive(serde::Serialize, serde::Deserialize)
)]
#[cfg_attr(feature = "policy-config", serde(default))]
pub struct ActivationConfig {
    /// Delay between "nothing intersecting" and closing, in milliseconds.
    pub close_delay_ms: u64,
    /// Activation line position, as a fraction of viewport height.
    pub activation_line: f64,
    /// Distances within this many pixels are ties.
    pub tie_epsilon: f64,
}

impl ActivationConfig {
    /// Close debounce as a duration.
    #[must_use]
    pub fn close_delay(&self) -> Duration {
        Duration::from_millis(self.close_delay_ms)
    }
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            close_delay_ms: DEFAULT_CLOSE_DELAY_MS,
            activation_line: DEFAULT_ACTIVATION_LINE,
            tie_epsilon: DEFAULT_TIE_EPSILON,
        }
    }
}

/// Cancellable close timer stored alongside the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseTimer {
    id: u64,
    deadline: Duration,
}

impl CloseTimer {
    /// Timer id (unique per engine).
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// When the timer fires.
    #[must_use]
    pub const fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Whether the deadline has been reached at `now`.
    #[must_use]
    pub fn is_due(&self, now: Duration) -> bool {
        now >= self.deadline
    }
}

/// Engine state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ActivationState {
    #[default]
    Closed,
    Open {
        zone: ZoneId,
        step: Option<usize>,
    },
    ClosingPending {
        zone: ZoneId,
        step: Option<usize>,
        timer: CloseTimer,
    },
}

impl ActivationState {
    /// Active zone (also while closing is pending).
    #[must_use]
    pub fn zone(&self) -> Option<&ZoneId> {
        match self {
            Self::Closed => None,
            Self::Open { zone, .. } | Self::ClosingPending { zone, .. } => Some(zone),
        }
    }

    /// Active step (also while closing is pending).
    #[must_use]
    pub fn step(&self) -> Option<usize> {
        match self {
            Self::Closed => None,
            Self::Open { step, .. } | Self::ClosingPending { step, .. } => *step,
        }
    }

    /// Pending close timer, if any.
    #[must_use]
    pub fn timer(&self) -> Option<CloseTimer> {
        match self {
            Self::ClosingPending { timer, .. } => Some(*timer),
            _ => None,
        }
    }

    /// Stable label used in logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open { .. } => "open",
            Self::ClosingPending { .. } => "closing_pending",
        }
    }
}

/// What one evaluation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationTransition {
    Unchanged,
    /// `Closed → Open`.
    Opened { zone: ZoneId, step: Option<usize> },
    /// `Open → Open` with a different zone or step.
    Switched {
        from: ZoneId,
        zone: ZoneId,
        step: Option<usize>,
    },
    /// `Open → ClosingPending`.
    ClosePending { deadline: Duration },
    /// `ClosingPending → Open`; the timer was cancelled.
    CloseCancelled { zone: ZoneId, step: Option<usize> },
    /// `ClosingPending → Closed`.
    Closed,
}

impl ActivationTransition {
    /// Whether the snapshot changed.
    #[must_use]
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

impl fmt::Display for ActivationTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unchanged => f.write_str("unchanged"),
            Self::Opened { zone, step } => write!(f, "opened zone={zone} step={step:?}"),
            Self::Switched { from, zone, step } => {
                write!(f, "switched from={from} zone={zone} step={step:?}")
            }
            Self::ClosePending { deadline } => {
                write!(f, "close_pending deadline_ms={}", deadline.as_millis())
            }
            Self::CloseCancelled { zone, step } => {
                write!(f, "close_cancelled zone={zone} step={step:?}")
            }
            Self::Closed => f.write_str("closed"),
        }
    }
}

/// The activation state machine.
#[derive(Debug, Clone, Default)]
pub struct ActivationEngine {
    config: ActivationConfig,
    state: ActivationState,
    /// Last active step per stepped zone.
    remembered_steps: FxHashMap<ZoneId, usize>,
    next_timer_id: u64,
    evaluations: u64,
}

impl ActivationEngine {
    /// Engine starting `Closed`.
    #[must_use]
    pub fn new(config: ActivationConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn config(&self) -> &ActivationConfig {
        &self.config
    }

    /// Replace the configuration. A pending timer keeps its deadline.
    pub fn set_config(&mut self, config: ActivationConfig) {
        self.config = config;
    }

    #[must_use]
    pub fn state(&self) -> &ActivationState {
        &self.state
    }

    /// Number of evaluations run.
    #[must_use]
    pub fn evaluations(&self) -> u64 {
        self.evaluations
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> ActivationSnapshot {
        match &self.state {
            ActivationState::Closed => ActivationSnapshot::closed(),
            ActivationState::Open { zone, step } => ActivationSnapshot {
                is_open: true,
                active_zone_id: Some(zone.clone()),
                active_step_index: *step,
                pending_close: false,
            },
            ActivationState::ClosingPending { zone, step, .. } => ActivationSnapshot {
                is_open: true,
                active_zone_id: Some(zone.clone()),
                active_step_index: *step,
                pending_close: true,
            },
        }
    }

    /// Recompute the state from `registry` for a viewport of
    /// `viewport_height` at time `now`.
    pub fn evaluate(
        &mut self,
        registry: &ZoneRegistry,
        viewport_height: f64,
        now: Duration,
    ) -> ActivationTransition {
        self.evaluations += 1;
        let line = viewport_height * self.config.activation_line;
        let Some(record) = self.select_zone(registry, line) else {
            return self.on_nothing_intersecting(now);
        };
        let zone = record.id().clone();
        let step = self.select_step(record, line);
        let next = ActivationState::Open {
            zone: zone.clone(),
            step,
        };
        let previous = std::mem::replace(&mut self.state, next);
        let transition = match previous {
            ActivationState::Closed => ActivationTransition::Opened { zone, step },
            ActivationState::ClosingPending { timer, .. } => {
                tracing::debug!(timer = timer.id(), "close timer cancelled");
                ActivationTransition::CloseCancelled { zone, step }
            }
            ActivationState::Open {
                zone: from,
                step: from_step,
            } => {
                if from == zone && from_step == step {
                    ActivationTransition::Unchanged
                } else {
                    ActivationTransition::Switched { from, zone, step }
                }
            }
        };
        self.log(&transition);
        transition
    }

    /// Fire the close timer if it is due at `now`.
    pub fn advance(&mut self, now: Duration) -> ActivationTransition {
        let due = self.state.timer().is_some_and(|timer| timer.is_due(now));
        if !due {
            return ActivationTransition::Unchanged;
        }
        self.state = ActivationState::Closed;
        let transition = ActivationTransition::Closed;
        self.log(&transition);
        transition
    }

    /// Deadline of the pending close timer.
    #[must_use]
    pub fn pending_deadline(&self) -> Option<Duration> {
        self.state.timer().map(|t| t.deadline())
    }

    /// Drop a removed zone's remembered step. Removing the active zone
    /// closes at once and drops any pending timer.
    pub fn forget_zone(&mut self, zone: &ZoneId) -> ActivationTransition {
        self.remembered_steps.remove(zone);
        if self.state.zone() != Some(zone) {
            return ActivationTransition::Unchanged;
        }
        self.state = ActivationState::Closed;
        let transition = ActivationTransition::Closed;
        self.log(&transition);
        transition
    }

    /// A step of `zone` was removed. If it was the active step, move to
    /// `fallback` (the zone's lowest remaining step, if any).
    pub fn forget_step(&mut self, zone: &ZoneId, index: usize, fallback: Option<usize>) {
        if self.remembered_steps.get(zone) == Some(&index) {
            self.remembered_steps.remove(zone);
        }
        if self.state.zone() != Some(zone) || self.state.step() != Some(index) {
            return;
        }
        match &mut self.state {
            ActivationState::Open { step, .. } | ActivationState::ClosingPending { step, .. } => {
                *step = fallback;
            }
            ActivationState::Closed => {}
        }
        tracing::debug!(zone = %zone, removed = index, step = ?fallback, "active step removed");
    }

    /// Return to `Closed` immediately, dropping any timer (teardown).
    pub fn cancel(&mut self) {
        if let Some(timer) = self.state.timer() {
            tracing::debug!(timer = timer.id(), "close timer cleared on teardown");
        }
        self.state = ActivationState::Closed;
        self.remembered_steps.clear();
    }

    fn on_nothing_intersecting(&mut self, now: Duration) -> ActivationTransition {
        match &self.state {
            ActivationState::Closed => ActivationTransition::Unchanged,
            ActivationState::ClosingPending { .. } => self.advance(now),
            ActivationState::Open { zone, step } => {
                let timer = CloseTimer {
                    id: self.next_timer_id,
                    deadline: now.saturating_add(self.config.close_delay()),
                };
                self.next_timer_id += 1;
                self.state = ActivationState::ClosingPending {
                    zone: zone.clone(),
                    step: *step,
                    timer,
                };
                let transition = ActivationTransition::ClosePending {
                    deadline: timer.deadline,
                };
                self.log(&transition);
                match self.advance(now) {
                    ActivationTransition::Unchanged => transition,
                    closed => closed,
                }
            }
        }
    }

    fn select_zone<'r>(&self, registry: &'r ZoneRegistry, line: f64) -> Option<&'r ZoneRecord> {
        let candidates: Vec<(&ZoneRecord, f64)> = registry
            .intersecting_zones()
            .into_iter()
            .filter_map(|record| record.bounds().map(|b| (record, b.distance_to(line))))
            .collect();
        let band = tie_band(candidates.iter().map(|&(_, d)| d), self.config.tie_epsilon)?;
        let mut tied = candidates
            .into_iter()
            .filter(|&(_, d)| d <= band)
            .map(|(record, _)| record);
        let current = self.state.zone();
        let mut best = tied.next()?;
        for record in tied {
            if current == Some(best.id()) {
                break;
            }
            // Registration order breaks equal tops.
            if current == Some(record.id()) || top(record) < top(best) {
                best = record;
            }
        }
        Some(best)
    }

    fn select_step(&mut self, record: &ZoneRecord, line: f64) -> Option<usize> {
        if !record.mode().is_stepped() {
            return None;
        }
        let candidates: Vec<(usize, f64)> = record
            .intersecting_steps()
            .filter_map(|step| step.bounds().map(|b| (step.index(), b.distance_to(line))))
            .collect();
        // Steps come in index order, so the first one in the band is the
        // lowest tied index.
        let chosen = tie_band(candidates.iter().map(|&(_, d)| d), self.config.tie_epsilon)
            .and_then(|band| candidates.iter().find(|&&(_, d)| d <= band))
            .map(|&(index, _)| index);
        match chosen {
            Some(index) => {
                self.remembered_steps.insert(record.id().clone(), index);
                Some(index)
            }
            None => {
                let retained = self
                    .remembered_steps
                    .get(record.id())
                    .copied()
                    .filter(|&index| record.has_step(index));
                retained.or_else(|| record.lowest_step())
            }
        }
    }

    fn log(&self, transition: &ActivationTransition) {
        if transition.is_change() {
            tracing::debug!(
                state = self.state.label(),
                evaluations = self.evaluations,
                %transition,
                "activation transition"
            );
        }
    }
}

/// Upper distance bound of the tie group around the smallest distance.
fn tie_band(distances: impl Iterator<Item = f64>, eps: f64) -> Option<f64> {
    distances.reduce(f64::min).map(|min| min + eps)
}

fn top(record: &ZoneRecord) -> f64 {
    record.bounds().map_or(f64::INFINITY, |b| b.top)
}
