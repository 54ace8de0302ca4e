#![forbid(unsafe_code)]

//! Viewport size and mobile/desktop classification.
//!
//! The side canvas is a desktop-only affordance. Hosts that already run a
//! media query pass their own [`ViewportClass`]; everyone else can use
//! [`ViewportClass::classify`] with a width breakpoint.
//!
//! # Invariants
//!
//! 1. `classify(w, bp)` is `Desktop` iff `w >= bp`.
//! 2. Non-finite or negative widths classify as `Mobile`.

use std::fmt;

/// Default minimum width (CSS px) that counts as desktop.
pub const DEFAULT_DESKTOP_MIN_WIDTH: f64 = 1024.0;

/// Behavioral viewport class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ViewportClass {
    /// Narrow viewport: no side rail, no full-bleed breakout.
    Mobile,
    #[default]
    Desktop,
}

impl ViewportClass {
    /// Classify by width against `desktop_min_width`.
    #[must_use]
    pub fn classify(width: f64, desktop_min_width: f64) -> Self {
        if width.is_finite() && width >= desktop_min_width {
            Self::Desktop
        } else {
            Self::Mobile
        }
    }

    /// Whether this is the mobile class.
    #[must_use]
    pub const fn is_mobile(self) -> bool {
        matches!(self, Self::Mobile)
    }

    /// Stable lowercase label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Mobile => "mobile",
            Self::Desktop => "desktop",
        }
    }
}

impl fmt::Display for ViewportClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Viewport dimensions in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    /// Create a viewport.
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Classify against `desktop_min_width`.
    #[must_use]
    pub fn class(&self, desktop_min_width: f64) -> ViewportClass {
        ViewportClass::classify(self.width, desktop_min_width)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280.0, 800.0)
    }
}
