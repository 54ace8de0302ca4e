#![forbid(unsafe_code)]

//! Render payloads registered per zone and step.
//!
//! Payloads are opaque to the system: whatever the content renderer supplies
//! for a zone (and for each step of a stepped zone) is stored here and handed
//! back unchanged when that zone/step becomes active.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use scrollcanvas_core::{ActivationSnapshot, ZoneId};

#[derive(Debug, Clone)]
struct ZoneContent<P> {
    payload: Option<P>,
    steps: BTreeMap<usize, P>,
}

impl<P> Default for ZoneContent<P> {
    fn default() -> Self {
        Self {
            payload: None,
            steps: BTreeMap::new(),
        }
    }
}

/// Content resolved for the active zone/step.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasContent<P> {
    pub zone_id: ZoneId,
    pub step_index: Option<usize>,
    /// Zone-level payload, if the zone registered one.
    pub zone: Option<P>,
    /// Payload of the active step, if any.
    pub step: Option<P>,
}

/// Payload store keyed by zone id and step index.
#[derive(Debug, Clone)]
pub struct ContentCatalog<P> {
    zones: FxHashMap<ZoneId, ZoneContent<P>>,
}

impl<P> Default for ContentCatalog<P> {
    fn default() -> Self {
        Self {
            zones: FxHashMap::default(),
        }
    }
}

impl<P: Clone> ContentCatalog<P> {
    /// Empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or clear) the zone-level payload. Creates the zone entry.
    pub fn set_zone(&mut self, zone: ZoneId, payload: Option<P>) {
        self.zones.entry(zone).or_default().payload = payload;
    }

    /// Set the payload of one step. Creates the zone entry.
    pub fn set_step(&mut self, zone: ZoneId, index: usize, payload: P) {
        self.zones.entry(zone).or_default().steps.insert(index, payload);
    }

    /// Drop a zone and all of its step payloads.
    pub fn remove_zone(&mut self, zone: &ZoneId) {
        self.zones.remove(zone);
    }

    /// Drop one step payload.
    pub fn remove_step(&mut self, zone: &ZoneId, index: usize) {
        if let Some(content) = self.zones.get_mut(zone) {
            content.steps.remove(&index);
        }
    }

    /// Whether the zone has an entry.
    #[must_use]
    pub fn contains_zone(&self, zone: &ZoneId) -> bool {
        self.zones.contains_key(zone)
    }

    /// Number of zones with entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.zones.clear();
    }

    /// Look up content for the snapshot's active zone and step.
    ///
    /// Returns `None` when there is no active zone or the zone has no entry.
    #[must_use]
    pub fn resolve(&self, snapshot: &ActivationSnapshot) -> Option<CanvasContent<P>> {
        let zone_id = snapshot.active_zone_id.as_ref()?;
        let content = self.zones.get(zone_id)?;
        let step = snapshot
            .active_step_index
            .and_then(|index| content.steps.get(&index).cloned());
        Some(CanvasContent {
            zone_id: zone_id.clone(),
            step_index: snapshot.active_step_index,
            zone: content.payload.clone(),
            step,
        })
    }
}
