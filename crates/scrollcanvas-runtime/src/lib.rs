#![forbid(unsafe_code)]

//! scrollcanvas runtime
//!
//! Decides when the companion canvas is shown and what it shows.
//!
//! # Key Components
//!
//! - [`ZoneRegistry`] - zones, steps, and gaps with their latest entries
//! - [`ActivationEngine`] - the `Closed / Open / ClosingPending` state machine
//! - [`CanvasContext`] - shared handle: frame coalescing, layout publishing
//! - [`SentinelBridge`] - mount/unmount lifecycle over a viewport observer
//! - [`ReadingTracker`] - table-of-contents reading position
//! - [`CanvasConfig`] - every tunable, loadable with `policy-config`
//!
//! # Role in scrollcanvas
//! The runtime sits between input (`scrollcanvas-core` observers) and
//! output (`scrollcanvas-layout` contracts). Hosts mount sentinels through
//! the bridge, call [`CanvasContext::on_animation_frame`] once per frame,
//! and render whatever the published [`LayoutContract`] says.
//!
//! [`LayoutContract`]: scrollcanvas_layout::LayoutContract

pub mod activation;
pub mod bridge;
pub mod config;
pub mod context;
pub mod publish;
pub mod reading;
pub mod registry;

pub use activation::{
    ActivationConfig, ActivationEngine, ActivationState, ActivationTransition, CloseTimer,
};
pub use bridge::SentinelBridge;
pub use config::{CanvasConfig, ConfigError};
pub use context::{CanvasContext, CanvasError, FrameOutcome, WeakCanvasContext};
pub use publish::{Published, Subscription};
pub use reading::{HeadingId, ReadingTracker};
pub use registry::{
    Generation, GeometryUpdate, RegistryError, ZoneMode, ZoneRecord, ZoneRegistry,
};
