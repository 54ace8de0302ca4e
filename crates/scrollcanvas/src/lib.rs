#![forbid(unsafe_code)]

//! scrollcanvas public facade.
//!
//! Re-exports the types a page needs to declare activation zones, feed
//! viewport observations, and read the resulting layout contract.
//!
//! ```
//! use scrollcanvas::prelude::*;
//!
//! let ctx: CanvasContext<&'static str> =
//!     CanvasContext::new(CanvasConfig::default(), Viewport::new(1280.0, 800.0));
//! ctx.register_zone(ZoneId::from("intro"), ZoneMode::Single, Some("map"))
//!     .unwrap();
//! ctx.update_geometry(
//!     &SentinelId::zone("intro"),
//!     IntersectionEntry::visible(VerticalSpan::new(300.0, 500.0), 1.0, Duration::ZERO),
//! );
//! ctx.on_animation_frame(Duration::ZERO);
//! assert!(ctx.snapshot().is_active(&ZoneId::from("intro")));
//! let layout = ctx.layout();
//! assert!(layout.open);
//! assert_eq!(layout.content.and_then(|c| c.zone), Some("map"));
//! ```

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use scrollcanvas_core::observer::{
    HostObserver, IntersectionEntry, MarginValue, ObserverHandle, ObserverOptions, RootMargin,
    ViewportObserver,
};
pub use scrollcanvas_core::{
    ActivationSnapshot, Duration, GapId, SentinelId, VerticalSpan, ZoneId,
};

// --- Layout re-exports -----------------------------------------------------

pub use scrollcanvas_layout::{
    CanvasContent, ContentCatalog, LayoutConfig, LayoutContract, LayoutCoordinator, Viewport,
    ViewportClass,
};

// --- Runtime re-exports ----------------------------------------------------

pub use scrollcanvas_runtime::{
    ActivationConfig, ActivationState, ActivationTransition, CanvasConfig, CanvasContext,
    CanvasError, ConfigError, FrameOutcome, HeadingId, ReadingTracker, SentinelBridge,
    Subscription, ZoneMode,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error for facade users.
#[derive(Debug)]
pub enum Error {
    /// Registration or lifecycle failure.
    Canvas(CanvasError),
    /// Configuration failed to load or validate.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Canvas(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Canvas(err) => Some(err),
            Self::Config(err) => Some(err),
        }
    }
}

impl From<CanvasError> for Error {
    fn from(err: CanvasError) -> Self {
        Self::Canvas(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

/// Standard result type for facade APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        ActivationSnapshot, CanvasConfig, CanvasContext, Duration, Error, IntersectionEntry,
        LayoutContract, Result, SentinelBridge, SentinelId, VerticalSpan, Viewport,
        ViewportObserver, ZoneId, ZoneMode,
    };

    pub use crate::{core, layout, runtime};
}

pub use scrollcanvas_core as core;
pub use scrollcanvas_layout as layout;
pub use scrollcanvas_runtime as runtime;
#[cfg(feature = "web")]
pub use scrollcanvas_web as web;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_convert_and_expose_source() {
        let err: Error = CanvasError::TornDown.into();
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.to_string(), CanvasError::TornDown.to_string());
    }

    #[test]
    fn invalid_config_converts() {
        let err: Error = ConfigError::Invalid(vec!["bad".into()]).into();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("bad"));
    }
}
