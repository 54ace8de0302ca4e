#![forbid(unsafe_code)]

//! Core: geometry, sentinel ids, and viewport observation.
//!
//! # Role in scrollcanvas
//! `scrollcanvas-core` is the input layer. It defines what an observed region
//! is ([`sentinel::SentinelId`]), what the host reports about it
//! ([`observer::IntersectionEntry`]), and the adapter contract around the
//! host's intersection primitive ([`observer::ViewportObserver`]).
//!
//! # How it fits in the system
//! The runtime (`scrollcanvas-runtime`) feeds entries into its zone registry
//! and decision engine; the layout crate projects the resulting
//! [`snapshot::ActivationSnapshot`] for the presentation layer.

pub mod clock;
pub mod frame;
pub mod geometry;
pub mod observer;
pub mod sentinel;
pub mod snapshot;

pub use geometry::VerticalSpan;
pub use sentinel::{GapId, SentinelId, ZoneId};
pub use snapshot::ActivationSnapshot;

/// Re-exported so downstream crates share one duration type on every target.
pub use web_time::Duration;
