#![forbid(unsafe_code)]

//! Table-of-contents reading position.
//!
//! [`ReadingTracker`] follows which heading the reader is in, using the same
//! intersection entries as the canvas zones. It is independent of the
//! activation engine: a page may run both side by side.
//!
//! # Selection
//!
//! 1. The last heading (registration order) whose top is at or above the
//!    activation line.
//! 2. Otherwise the first heading that is intersecting.
//! 3. Otherwise the previously active heading, if still registered.

use std::fmt;

use scrollcanvas_core::observer::IntersectionEntry;

use crate::registry::{GeometryUpdate, apply_entry};

/// Identifier of a tracked heading (typically the anchor slug).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeadingId(String);

impl HeadingId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for HeadingId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for HeadingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
struct Heading {
    id: HeadingId,
    depth: u8,
    entry: Option<IntersectionEntry>,
}

/// Tracks the active heading.
#[derive(Debug, Clone)]
pub struct ReadingTracker {
    /// Registration order.
    headings: Vec<Heading>,
    active: Option<HeadingId>,
    activation_line: f64,
}

impl Default for ReadingTracker {
    fn default() -> Self {
        Self::new(crate::activation::DEFAULT_ACTIVATION_LINE)
    }
}

impl ReadingTracker {
    /// Tracker using `activation_line` (fraction of viewport height).
    #[must_use]
    pub fn new(activation_line: f64) -> Self {
        Self {
            headings: Vec::new(),
            active: None,
            activation_line,
        }
    }

    /// Track a heading at nesting `depth` (1 for `h1`, ...). Re-registering
    /// an id moves it to the end and drops its geometry.
    pub fn register_heading(&mut self, id: HeadingId, depth: u8) {
        self.headings.retain(|h| h.id != id);
        self.headings.push(Heading {
            id,
            depth,
            entry: None,
        });
    }

    /// Stop tracking a heading. Returns whether it was tracked.
    pub fn unregister_heading(&mut self, id: &HeadingId) -> bool {
        let before = self.headings.len();
        self.headings.retain(|h| &h.id != id);
        if self.active.as_ref() == Some(id) {
            self.active = None;
        }
        self.headings.len() != before
    }

    /// Store a new entry for `id`.
    pub fn update(&mut self, id: &HeadingId, entry: IntersectionEntry) -> GeometryUpdate {
        if !entry.bounds.is_finite() || !entry.intersection_ratio.is_finite() {
            return GeometryUpdate::Malformed;
        }
        match self.headings.iter_mut().find(|h| &h.id == id) {
            Some(heading) => apply_entry(&mut heading.entry, entry),
            None => GeometryUpdate::UnknownSentinel,
        }
    }

    /// Recompute and return the active heading for `viewport_height`.
    pub fn active_heading(&mut self, viewport_height: f64) -> Option<&HeadingId> {
        let line = viewport_height * self.activation_line;
        let crossed = self
            .headings
            .iter()
            .rev()
            .find(|h| h.entry.is_some_and(|e| e.bounds.top <= line));
        let intersecting = || {
            self.headings
                .iter()
                .find(|h| h.entry.is_some_and(|e| e.is_intersecting))
        };
        if let Some(heading) = crossed.or_else(intersecting) {
            if self.active.as_ref() != Some(&heading.id) {
                tracing::debug!(
                    heading = %heading.id,
                    depth = heading.depth,
                    "reading position moved"
                );
                self.active = Some(heading.id.clone());
            }
        }
        self.active.as_ref()
    }

    /// Last computed active heading.
    #[must_use]
    pub fn active(&self) -> Option<&HeadingId> {
        self.active.as_ref()
    }

    /// Tracked headings with their depth, in registration order.
    pub fn headings(&self) -> impl Iterator<Item = (&HeadingId, u8)> {
        self.headings.iter().map(|h| (&h.id, h.depth))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.headings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrollcanvas_core::{Duration, VerticalSpan};

    fn at(top: f64, visible: bool, t: u64) -> IntersectionEntry {
        let bounds = VerticalSpan::new(top, top + 40.0);
        let when = Duration::from_millis(t);
        if visible {
            IntersectionEntry::visible(bounds, 1.0, when)
        } else {
            IntersectionEntry::hidden(bounds, when)
        }
    }

    fn tracker() -> ReadingTracker {
        let mut tracker = ReadingTracker::default();
        tracker.register_heading("intro".into(), 2);
        tracker.register_heading("usage".into(), 2);
        tracker.register_heading("api".into(), 3);
        tracker
    }

    #[test]
    fn last_crossed_heading_wins() {
        let mut t = tracker();
        t.update(&"intro".into(), at(-300.0, false, 0));
        t.update(&"usage".into(), at(100.0, true, 0));
        t.update(&"api".into(), at(700.0, true, 0));
        assert_eq!(t.active_heading(800.0), Some(&HeadingId::from("usage")));
    }

    #[test]
    fn falls_back_to_first_intersecting() {
        let mut t = tracker();
        t.update(&"usage".into(), at(500.0, true, 0));
        t.update(&"api".into(), at(700.0, true, 0));
        assert_eq!(t.active_heading(800.0), Some(&HeadingId::from("usage")));
    }

    #[test]
    fn keeps_previous_when_nothing_qualifies() {
        let mut t = tracker();
        t.update(&"api".into(), at(300.0, true, 0));
        assert_eq!(t.active_heading(800.0), Some(&HeadingId::from("api")));
        t.update(&"api".into(), at(900.0, false, 1));
        assert_eq!(t.active_heading(800.0), Some(&HeadingId::from("api")));
    }

    #[test]
    fn stale_and_unknown_updates_are_ignored() {
        let mut t = tracker();
        assert!(t.update(&"intro".into(), at(10.0, true, 5)).is_applied());
        assert_eq!(t.update(&"intro".into(), at(900.0, false, 4)), GeometryUpdate::Stale);
        assert_eq!(
            t.update(&"missing".into(), at(0.0, true, 6)),
            GeometryUpdate::UnknownSentinel
        );
    }

    #[test]
    fn unregistering_active_heading_clears_it() {
        let mut t = tracker();
        t.update(&"intro".into(), at(10.0, true, 0));
        t.active_heading(800.0);
        assert!(t.unregister_heading(&"intro".into()));
        assert_eq!(t.active(), None);
        assert_eq!(t.len(), 2);
    }
}
