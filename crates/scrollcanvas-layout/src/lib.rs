#![forbid(unsafe_code)]

//! Layout: viewport classification and the layout contract.
//!
//! The [`LayoutCoordinator`] turns an
//! [`ActivationSnapshot`](scrollcanvas_core::ActivationSnapshot) plus a
//! [`ViewportClass`] into the [`LayoutContract`] the presentation layer
//! renders. Content payloads come from a [`ContentCatalog`].

pub mod content;
pub mod coordinator;
pub mod viewport;

pub use content::{CanvasContent, ContentCatalog};
pub use coordinator::{LayoutConfig, LayoutContract, LayoutCoordinator};
pub use viewport::{DEFAULT_DESKTOP_MIN_WIDTH, Viewport, ViewportClass};
