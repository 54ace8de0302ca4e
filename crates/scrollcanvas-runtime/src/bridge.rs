#![forbid(unsafe_code)]

//! Sentinel bridge: mount lifecycle between page markers and the context.
//!
//! Each mounted sentinel pairs a registry record (stamped with its
//! [`Generation`]) with the [`ObserverHandle`] that feeds it. The bridge
//! keeps both together so that unmounting tears down exactly what mounting
//! created.
//!
//! # Invariants
//!
//! 1. A sentinel is observed only while it is registered.
//! 2. Unmount drops the observer handle before releasing the registry
//!    record, so no entry can arrive for a released record.
//! 3. Release is by generation: a late unmount of an old mount never
//!    removes a newer mount of the same id.
//! 4. Unmounting a zone unmounts its steps first.
//! 5. Tearing down the context releases every observer the bridge holds,
//!    even while the bridge itself stays alive.
//!
//! # Failure Modes
//!
//! - **Step before zone**: `mount_step` returns the registry error and
//!   installs no observer.
//! - **Unsupported observer**: mounts still register (so payloads and
//!   ordering are validated) but no entry ever arrives; the canvas stays
//!   closed.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use scrollcanvas_core::observer::{ObserverHandle, ViewportObserver};
use scrollcanvas_core::{GapId, SentinelId, ZoneId};

use crate::context::{CanvasContext, CanvasError};
use crate::registry::{Generation, ZoneMode};

struct Mounted {
    generation: Generation,
    handle: ObserverHandle,
}

type MountTable = Rc<RefCell<FxHashMap<SentinelId, Mounted>>>;

/// Mounts sentinels into a [`CanvasContext`] through a [`ViewportObserver`].
pub struct SentinelBridge<O: ViewportObserver, P: Clone + PartialEq + 'static> {
    observer: O,
    context: CanvasContext<P>,
    mounted: MountTable,
}

impl<O: ViewportObserver, P: Clone + PartialEq + 'static> fmt::Debug for SentinelBridge<O, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SentinelBridge")
            .field("mounted", &self.mounted.borrow().len())
            .field("supported", &self.observer.is_supported())
            .finish()
    }
}

impl<O: ViewportObserver, P: Clone + PartialEq + 'static> SentinelBridge<O, P> {
    #[must_use]
    pub fn new(observer: O, context: CanvasContext<P>) -> Self {
        if !observer.is_supported() {
            tracing::warn!("viewport observer unsupported; canvas will stay closed");
        }
        let mounted = MountTable::default();
        let table = Rc::downgrade(&mounted);
        context.on_teardown(move || {
            let Some(table) = table.upgrade() else {
                return;
            };
            let released: Vec<Mounted> = table.borrow_mut().drain().map(|(_, m)| m).collect();
            tracing::debug!(observers = released.len(), "observers released on teardown");
            for mounted in released {
                mounted.handle.unobserve();
            }
        });
        Self {
            observer,
            context,
            mounted,
        }
    }

    #[must_use]
    pub fn context(&self) -> &CanvasContext<P> {
        &self.context
    }

    #[must_use]
    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Mount a zone sentinel observed through `target`.
    pub fn mount_zone(
        &mut self,
        target: &O::Target,
        id: ZoneId,
        mode: ZoneMode,
        payload: Option<P>,
    ) -> Result<Generation, CanvasError> {
        let sentinel = SentinelId::Zone(id.clone());
        self.unmount(&sentinel);
        let generation = self.context.register_zone(id, mode, payload)?;
        self.attach(target, sentinel, generation);
        Ok(generation)
    }

    /// Mount step `index` of a mounted zone.
    pub fn mount_step(
        &mut self,
        target: &O::Target,
        zone: &ZoneId,
        index: usize,
        payload: Option<P>,
    ) -> Result<Generation, CanvasError> {
        let sentinel = SentinelId::Step(zone.clone(), index);
        self.unmount(&sentinel);
        let generation = self.context.register_step(zone, index, payload)?;
        self.attach(target, sentinel, generation);
        Ok(generation)
    }

    /// Mount a gap sentinel.
    pub fn mount_gap(&mut self, target: &O::Target, id: GapId) -> Result<Generation, CanvasError> {
        let sentinel = SentinelId::Gap(id.clone());
        self.unmount(&sentinel);
        let generation = self.context.register_gap(id)?;
        self.attach(target, sentinel, generation);
        Ok(generation)
    }

    fn attach(&mut self, target: &O::Target, sentinel: SentinelId, generation: Generation) {
        let weak = self.context.downgrade();
        let key = sentinel.clone();
        let handle = self.observer.observe(
            target,
            Box::new(move |entry| {
                weak.update_geometry(&key, entry);
            }),
        );
        tracing::trace!(
            kind = sentinel.kind(),
            sentinel = %sentinel,
            generation,
            "sentinel mounted"
        );
        self.mounted
            .borrow_mut()
            .insert(sentinel, Mounted { generation, handle });
    }

    /// Unmount `sentinel` (and, for a zone, its steps). Returns whether it
    /// was mounted.
    pub fn unmount(&mut self, sentinel: &SentinelId) -> bool {
        if let SentinelId::Zone(zone) = sentinel {
            let steps: Vec<SentinelId> = self
                .mounted
                .borrow()
                .keys()
                .filter(|key| matches!(key, SentinelId::Step(..)) && key.zone_id() == Some(zone))
                .cloned()
                .collect();
            for step in &steps {
                self.detach(step);
            }
        }
        self.detach(sentinel)
    }

    fn detach(&mut self, sentinel: &SentinelId) -> bool {
        let removed = self.mounted.borrow_mut().remove(sentinel);
        let Some(Mounted { generation, handle }) = removed else {
            return false;
        };
        handle.unobserve();
        self.context.release(sentinel, generation);
        tracing::trace!(
            kind = sentinel.kind(),
            sentinel = %sentinel,
            generation,
            "sentinel unmounted"
        );
        true
    }

    /// Unmount everything, steps before zones.
    pub fn unmount_all(&mut self) {
        let mut sentinels: Vec<SentinelId> = self.mounted.borrow().keys().cloned().collect();
        sentinels.sort_by_key(|s| !matches!(s, SentinelId::Step(..)));
        for sentinel in &sentinels {
            self.detach(sentinel);
        }
    }

    #[must_use]
    pub fn is_mounted(&self, sentinel: &SentinelId) -> bool {
        self.mounted.borrow().contains_key(sentinel)
    }

    #[must_use]
    pub fn mounted_count(&self) -> usize {
        self.mounted.borrow().len()
    }
}

impl<O: ViewportObserver, P: Clone + PartialEq + 'static> Drop for SentinelBridge<O, P> {
    fn drop(&mut self) {
        self.unmount_all();
    }
}
