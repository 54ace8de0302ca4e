#![forbid(unsafe_code)]

//! Zone registry: the single source of truth for which regions exist.
//!
//! The registry stores zones, their steps, and gaps together with the
//! latest [`IntersectionEntry`] reported for each. It never decides
//! activation; the [`ActivationEngine`](crate::activation::ActivationEngine)
//! reads it.
//!
//! # Invariants
//!
//! 1. A step exists only under a registered stepped zone, with an index in
//!    `[0, total_steps)`, unique within the zone.
//! 2. Every registration gets a fresh [`Generation`]; re-registering an id
//!    replaces the record and bumps the generation.
//! 3. [`release`](ZoneRegistry::release) removes a record only when the
//!    generation matches, so a late cleanup of an old mount cannot remove a
//!    newer mount of the same id.
//! 4. An entry older than the stored one (by `observed_at`) is never
//!    applied.
//!
//! # Failure Modes
//!
//! - Ordering violations (step before zone, out-of-range index) return a
//!   [`RegistryError`] and log at `error` level.
//! - Geometry for unknown sentinels, stale entries, and non-finite geometry
//!   are reported through [`GeometryUpdate`] and otherwise ignored.

use std::collections::BTreeMap;
use std::fmt;

use rustc_hash::FxHashMap;
use scrollcanvas_core::observer::IntersectionEntry;
use scrollcanvas_core::{GapId, SentinelId, VerticalSpan, ZoneId};

/// Registration stamp.
pub type Generation = u64;

/// How a zone maps onto canvas visuals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneMode {
    /// One visual for the whole zone.
    Single,
    /// One visual per step.
    Stepped { total_steps: usize },
}

impl ZoneMode {
    /// Whether the zone is stepped.
    #[must_use]
    pub const fn is_stepped(self) -> bool {
        matches!(self, Self::Stepped { .. })
    }
}

/// Registration-ordering defect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Step registered for a zone that does not exist (yet).
    UnknownZone { zone: ZoneId },
    /// Step registered for a single-mode zone.
    NotStepped { zone: ZoneId },
    /// Step index outside `[0, total_steps)`.
    StepOutOfRange {
        zone: ZoneId,
        index: usize,
        total_steps: usize,
    },
    /// Stepped zone declared with zero steps.
    EmptySteppedZone { zone: ZoneId },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownZone { zone } => {
                write!(f, "step registered before its zone {zone:?} was mounted")
            }
            Self::NotStepped { zone } => write!(f, "zone {zone:?} is not a stepped zone"),
            Self::StepOutOfRange {
                zone,
                index,
                total_steps,
            } => write!(
                f,
                "step {index} out of range for zone {zone:?} with {total_steps} steps"
            ),
            Self::EmptySteppedZone { zone } => {
                write!(f, "stepped zone {zone:?} declared with zero steps")
            }
        }
    }
}

impl std::error::Error for RegistryError {}

/// Result of feeding one entry into the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryUpdate {
    /// Stored.
    Applied,
    /// No such sentinel is registered.
    UnknownSentinel,
    /// Older than the stored entry.
    Stale,
    /// Non-finite geometry or ratio.
    Malformed,
    /// The owning context has been torn down.
    Detached,
}

impl GeometryUpdate {
    /// Whether the registry changed.
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Registry record for one step.
#[derive(Debug, Clone)]
pub struct StepRecord {
    index: usize,
    generation: Generation,
    entry: Option<IntersectionEntry>,
}

impl StepRecord {
    /// Step index within its zone.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Latest entry, if any was reported.
    #[must_use]
    pub fn entry(&self) -> Option<&IntersectionEntry> {
        self.entry.as_ref()
    }

    /// Whether the latest entry reports intersection.
    #[must_use]
    pub fn is_intersecting(&self) -> bool {
        self.entry.is_some_and(|e| e.is_intersecting)
    }

    /// Latest bounds, if any.
    #[must_use]
    pub fn bounds(&self) -> Option<VerticalSpan> {
        self.entry.map(|e| e.bounds)
    }
}

/// Registry record for one zone.
#[derive(Debug, Clone)]
pub struct ZoneRecord {
    id: ZoneId,
    mode: ZoneMode,
    generation: Generation,
    /// Registration sequence, used as a last-resort document order.
    order: u64,
    entry: Option<IntersectionEntry>,
    steps: BTreeMap<usize, StepRecord>,
}

impl ZoneRecord {
    #[must_use]
    pub fn id(&self) -> &ZoneId {
        &self.id
    }

    #[must_use]
    pub fn mode(&self) -> ZoneMode {
        self.mode
    }

    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Registration sequence number.
    #[must_use]
    pub fn order(&self) -> u64 {
        self.order
    }

    /// Latest entry, if any was reported.
    #[must_use]
    pub fn entry(&self) -> Option<&IntersectionEntry> {
        self.entry.as_ref()
    }

    /// Whether the latest entry reports intersection.
    #[must_use]
    pub fn is_intersecting(&self) -> bool {
        self.entry.is_some_and(|e| e.is_intersecting)
    }

    /// Latest bounds, if any.
    #[must_use]
    pub fn bounds(&self) -> Option<VerticalSpan> {
        self.entry.map(|e| e.bounds)
    }

    /// Whether step `index` is mounted.
    #[must_use]
    pub fn has_step(&self, index: usize) -> bool {
        self.steps.contains_key(&index)
    }

    /// Lowest mounted step index.
    #[must_use]
    pub fn lowest_step(&self) -> Option<usize> {
        self.steps.keys().next().copied()
    }

    /// Mounted steps in index order.
    pub fn steps(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps.values()
    }

    /// Intersecting steps in index order.
    pub fn intersecting_steps(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps.values().filter(|s| s.is_intersecting())
    }

    /// Number of mounted steps.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }
}

/// Registry record for one gap.
#[derive(Debug, Clone)]
pub struct GapRecord {
    id: GapId,
    generation: Generation,
    entry: Option<IntersectionEntry>,
}

impl GapRecord {
    #[must_use]
    pub fn id(&self) -> &GapId {
        &self.id
    }

    /// Whether the latest entry reports intersection.
    #[must_use]
    pub fn is_intersecting(&self) -> bool {
        self.entry.is_some_and(|e| e.is_intersecting)
    }
}

/// Store of mounted zones, steps, and gaps.
#[derive(Debug, Clone, Default)]
pub struct ZoneRegistry {
    zones: FxHashMap<ZoneId, ZoneRecord>,
    gaps: FxHashMap<GapId, GapRecord>,
    next_generation: Generation,
    next_order: u64,
}

/// Apply `entry` over `slot` unless it is older than what is stored.
pub(crate) fn apply_entry(
    slot: &mut Option<IntersectionEntry>,
    entry: IntersectionEntry,
) -> GeometryUpdate {
    if slot.is_some_and(|current| entry.observed_at < current.observed_at) {
        return GeometryUpdate::Stale;
    }
    *slot = Some(entry);
    GeometryUpdate::Applied
}

impl ZoneRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn bump_generation(&mut self) -> Generation {
        self.next_generation += 1;
        self.next_generation
    }

    /// Register (or replace) a zone.
    pub fn register_zone(
        &mut self,
        id: ZoneId,
        mode: ZoneMode,
    ) -> Result<Generation, RegistryError> {
        if mode == (ZoneMode::Stepped { total_steps: 0 }) {
            tracing::error!(zone = %id, "stepped zone declared with zero steps");
            return Err(RegistryError::EmptySteppedZone { zone: id });
        }
        let generation = self.bump_generation();
        let order = self.next_order;
        self.next_order += 1;
        if self.zones.contains_key(&id) {
            tracing::warn!(zone = %id, generation, "zone re-registered; replacing previous mount");
        }
        self.zones.insert(
            id.clone(),
            ZoneRecord {
                id,
                mode,
                generation,
                order,
                entry: None,
                steps: BTreeMap::new(),
            },
        );
        Ok(generation)
    }

    /// Remove a zone and its steps.
    pub fn unregister_zone(&mut self, id: &ZoneId) -> Option<ZoneRecord> {
        self.zones.remove(id)
    }

    /// Register (or replace) step `index` of `zone`.
    pub fn register_step(
        &mut self,
        zone: &ZoneId,
        index: usize,
    ) -> Result<Generation, RegistryError> {
        let Some(record) = self.zones.get(zone) else {
            tracing::error!(zone = %zone, index, "step registered before its zone");
            return Err(RegistryError::UnknownZone { zone: zone.clone() });
        };
        let total_steps = match record.mode {
            ZoneMode::Single => {
                tracing::error!(zone = %zone, index, "step registered on a single-mode zone");
                return Err(RegistryError::NotStepped { zone: zone.clone() });
            }
            ZoneMode::Stepped { total_steps } => total_steps,
        };
        if index >= total_steps {
            tracing::error!(zone = %zone, index, total_steps, "step index out of range");
            return Err(RegistryError::StepOutOfRange {
                zone: zone.clone(),
                index,
                total_steps,
            });
        }
        let generation = self.bump_generation();
        let replaced = self.zones.get_mut(zone).and_then(|record| {
            record.steps.insert(
                index,
                StepRecord {
                    index,
                    generation,
                    entry: None,
                },
            )
        });
        if replaced.is_some() {
            tracing::warn!(
                zone = %zone,
                index,
                generation,
                "step re-registered; replacing previous mount"
            );
        }
        Ok(generation)
    }

    /// Remove one step. Returns whether it existed.
    pub fn unregister_step(&mut self, zone: &ZoneId, index: usize) -> bool {
        self.zones
            .get_mut(zone)
            .is_some_and(|record| record.steps.remove(&index).is_some())
    }

    /// Register (or replace) a gap.
    pub fn register_gap(&mut self, id: GapId) -> Generation {
        let generation = self.bump_generation();
        self.gaps.insert(
            id.clone(),
            GapRecord {
                id,
                generation,
                entry: None,
            },
        );
        generation
    }

    /// Remove a gap. Returns whether it existed.
    pub fn unregister_gap(&mut self, id: &GapId) -> bool {
        self.gaps.remove(id).is_some()
    }

    /// Generation of the current registration for `sentinel`.
    #[must_use]
    pub fn generation_of(&self, sentinel: &SentinelId) -> Option<Generation> {
        match sentinel {
            SentinelId::Zone(zone) => self.zones.get(zone).map(|z| z.generation),
            SentinelId::Step(zone, index) => self
                .zones
                .get(zone)
                .and_then(|z| z.steps.get(index))
                .map(|s| s.generation),
            SentinelId::Gap(gap) => self.gaps.get(gap).map(|g| g.generation),
        }
    }

    /// Remove `sentinel` if it is still the registration stamped with
    /// `generation`. Returns whether anything was removed.
    pub fn release(&mut self, sentinel: &SentinelId, generation: Generation) -> bool {
        if self.generation_of(sentinel) != Some(generation) {
            tracing::trace!(
                sentinel = %sentinel,
                generation,
                "release skipped; newer mount owns id"
            );
            return false;
        }
        match sentinel {
            SentinelId::Zone(zone) => self.unregister_zone(zone).is_some(),
            SentinelId::Step(zone, index) => self.unregister_step(zone, *index),
            SentinelId::Gap(gap) => self.unregister_gap(gap),
        }
    }

    /// Store the latest entry for `sentinel`.
    pub fn update_geometry(
        &mut self,
        sentinel: &SentinelId,
        entry: IntersectionEntry,
    ) -> GeometryUpdate {
        if !entry.bounds.is_finite() || !entry.intersection_ratio.is_finite() {
            return GeometryUpdate::Malformed;
        }
        let slot = match sentinel {
            SentinelId::Zone(zone) => self.zones.get_mut(zone).map(|z| &mut z.entry),
            SentinelId::Step(zone, index) => self
                .zones
                .get_mut(zone)
                .and_then(|z| z.steps.get_mut(index))
                .map(|s| &mut s.entry),
            SentinelId::Gap(gap) => self.gaps.get_mut(gap).map(|g| &mut g.entry),
        };
        let result = match slot {
            Some(slot) => apply_entry(slot, entry),
            None => GeometryUpdate::UnknownSentinel,
        };
        if !result.is_applied() {
            tracing::trace!(sentinel = %sentinel, ?result, "geometry update ignored");
        }
        result
    }

    /// Look up a zone.
    #[must_use]
    pub fn zone(&self, id: &ZoneId) -> Option<&ZoneRecord> {
        self.zones.get(id)
    }

    /// Look up a gap.
    #[must_use]
    pub fn gap(&self, id: &GapId) -> Option<&GapRecord> {
        self.gaps.get(id)
    }

    /// All zones in registration order.
    #[must_use]
    pub fn zones(&self) -> Vec<&ZoneRecord> {
        let mut zones: Vec<&ZoneRecord> = self.zones.values().collect();
        zones.sort_by_key(|z| z.order);
        zones
    }

    /// Intersecting zones in registration order.
    #[must_use]
    pub fn intersecting_zones(&self) -> Vec<&ZoneRecord> {
        let mut zones: Vec<&ZoneRecord> =
            self.zones.values().filter(|z| z.is_intersecting()).collect();
        zones.sort_by_key(|z| z.order);
        zones
    }

    /// Whether any zone currently intersects.
    #[must_use]
    pub fn any_zone_intersecting(&self) -> bool {
        self.zones.values().any(ZoneRecord::is_intersecting)
    }

    /// Whether any gap currently intersects.
    #[must_use]
    pub fn any_gap_intersecting(&self) -> bool {
        self.gaps.values().any(GapRecord::is_intersecting)
    }

    #[must_use]
    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    #[must_use]
    pub fn gap_count(&self) -> usize {
        self.gaps.len()
    }

    /// Mounted steps across all zones.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.zones.values().map(ZoneRecord::step_count).sum()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty() && self.gaps.is_empty()
    }

    /// Remove every registration. Generations keep increasing.
    pub fn clear(&mut self) {
        self.zones.clear();
        self.gaps.clear();
    }
}
