#![forbid(unsafe_code)]

//! Projection of activation state into the render-facing layout contract.
//!
//! # Invariants
//!
//! 1. On [`ViewportClass::Mobile`] the contract is always closed, carries no
//!    content, no horizontal shift, and `full_bleed == false`.
//! 2. On desktop, `open` mirrors `snapshot.is_open`.
//! 3. On desktop, `full_bleed` and `horizontal_shift` are the configured
//!    values, forwarded unchanged.
//! 4. `content` is `Some` only when `open` is true and the active zone has
//!    a catalog entry.
//!
//! # Failure Modes
//!
//! None: projection is a pure function of its inputs.

use scrollcanvas_core::ActivationSnapshot;

use crate::content::{CanvasContent, ContentCatalog};
use crate::viewport::ViewportClass;

/// Presentation knobs forwarded to the render layer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LayoutConfig {
    /// Let the canvas break out of the content column.
    pub full_bleed: bool,
    /// CSS-like offset applied to the content column while the canvas is
    /// shown (for example `"calc(-25vw + 2rem)"`).
    pub horizontal_shift: Option<String>,
}

/// What the presentation layer renders.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutContract<P> {
    pub open: bool,
    pub content: Option<CanvasContent<P>>,
    pub horizontal_shift: Option<String>,
    pub full_bleed: bool,
    /// Whether the engine is inside the close debounce window.
    pub closing: bool,
}

impl<P> LayoutContract<P> {
    /// The closed contract (also the mobile contract).
    #[must_use]
    pub fn closed() -> Self {
        Self {
            open: false,
            content: None,
            horizontal_shift: None,
            full_bleed: false,
            closing: false,
        }
    }
}

impl<P> Default for LayoutContract<P> {
    fn default() -> Self {
        Self::closed()
    }
}

/// Reconciles activation snapshots with viewport class and configuration.
#[derive(Debug, Clone, Default)]
pub struct LayoutCoordinator {
    config: LayoutConfig,
}

impl LayoutCoordinator {
    /// Create a coordinator with `config`.
    #[must_use]
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Replace the configuration.
    pub fn set_config(&mut self, config: LayoutConfig) {
        self.config = config;
    }

    /// Project a snapshot for `class`, resolving content from `catalog`.
    #[must_use]
    pub fn project<P: Clone>(
        &self,
        snapshot: &ActivationSnapshot,
        class: ViewportClass,
        catalog: &ContentCatalog<P>,
    ) -> LayoutContract<P> {
        if class.is_mobile() {
            return LayoutContract::closed();
        }
        let content = if snapshot.is_open {
            catalog.resolve(snapshot)
        } else {
            None
        };
        LayoutContract {
            open: snapshot.is_open,
            content,
            horizontal_shift: self.config.horizontal_shift.clone(),
            full_bleed: self.config.full_bleed,
            closing: snapshot.pending_close,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrollcanvas_core::ZoneId;

    fn open_snapshot() -> ActivationSnapshot {
        ActivationSnapshot {
            is_open: true,
            active_zone_id: Some(ZoneId::from("zone-basic")),
            active_step_index: None,
            pending_close: false,
        }
    }

    fn catalog() -> ContentCatalog<&'static str> {
        let mut catalog = ContentCatalog::new();
        catalog.set_zone(ZoneId::from("zone-basic"), Some("visual"));
        catalog
    }

    fn configured() -> LayoutCoordinator {
        LayoutCoordinator::new(LayoutConfig {
            full_bleed: true,
            horizontal_shift: Some("calc(-25vw + 2rem)".to_owned()),
        })
    }

    #[test]
    fn mobile_is_always_closed() {
        let contract = configured().project(&open_snapshot(), ViewportClass::Mobile, &catalog());
        assert_eq!(contract, LayoutContract::closed());
    }

    #[test]
    fn desktop_mirrors_snapshot_and_forwards_config() {
        let contract = configured().project(&open_snapshot(), ViewportClass::Desktop, &catalog());
        assert!(contract.open);
        assert!(contract.full_bleed);
        assert_eq!(contract.horizontal_shift.as_deref(), Some("calc(-25vw + 2rem)"));
        assert_eq!(contract.content.unwrap().zone, Some("visual"));
    }

    #[test]
    fn desktop_closed_has_no_content() {
        let contract =
            configured().project(&ActivationSnapshot::closed(), ViewportClass::Desktop, &catalog());
        assert!(!contract.open);
        assert!(contract.content.is_none());
        assert!(contract.full_bleed);
    }

    #[test]
    fn pending_close_is_reported_as_closing() {
        let snapshot = ActivationSnapshot {
            pending_close: true,
            ..open_snapshot()
        };
        let contract = configured().project(&snapshot, ViewportClass::Desktop, &catalog());
        assert!(contract.open);
        assert!(contract.closing);
    }
}
