#![forbid(unsafe_code)]

//! Web bindings for scrollcanvas.
//!
//! Two ways in:
//!
//! - [`HostCore`]: a host-driven runner with no JS types. The page forwards
//!   JSON-encoded intersection entries and drives frames itself. Native
//!   tests and replay tooling use it directly.
//! - On `wasm32`, `CanvasRunner` exports [`HostCore`] through
//!   `wasm-bindgen`, and `DomIntersectionObserver` adapts the browser's
//!   `IntersectionObserver` to [`scrollcanvas_core::observer::ViewportObserver`]
//!   for pages that let Rust own the observers.

pub mod host_core;

pub use host_core::{FrameReport, HostCore, LayoutView, WebHostError};

#[cfg(target_arch = "wasm32")]
mod wasm;

#[cfg(target_arch = "wasm32")]
pub use wasm::{CanvasRunner, DomIntersectionObserver, intersection_observer_supported};
