#![forbid(unsafe_code)]

//! The activation snapshot shared between the decision engine and the
//! layout coordinator.

use crate::sentinel::ZoneId;

/// Open/active state of the canvas at one point in time.
///
/// # Invariants
///
/// 1. `active_step_index` is `Some` only if `active_zone_id` is `Some` and
///    refers to a stepped zone with at least one mounted step.
/// 2. `pending_close` implies `is_open`.
/// 3. `!is_open` implies no active zone.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActivationSnapshot {
    pub is_open: bool,
    pub active_zone_id: Option<ZoneId>,
    pub active_step_index: Option<usize>,
    pub pending_close: bool,
}

impl ActivationSnapshot {
    /// The closed snapshot.
    #[must_use]
    pub fn closed() -> Self {
        Self::default()
    }

    /// Whether `zone` is the active zone.
    #[must_use]
    pub fn is_active(&self, zone: &ZoneId) -> bool {
        self.active_zone_id.as_ref() == Some(zone)
    }
}
