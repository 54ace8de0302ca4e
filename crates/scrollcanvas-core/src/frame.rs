#![forbid(unsafe_code)]

//! Animation-frame coalescing for geometry updates.
//!
//! Fast scrolling produces bursts of intersection callbacks. Each one marks
//! the coalescer dirty; the host's animation-frame callback then takes the
//! dirty flag once, so activation is recomputed at most once per frame.
//!
//! # Usage
//!
//! ```
//! use scrollcanvas_core::frame::FrameCoalescer;
//!
//! let mut frames = FrameCoalescer::new();
//! assert!(frames.request()); // first update schedules a frame
//! assert!(!frames.request()); // later updates ride along
//! assert!(frames.take()); // the frame runs once
//! assert!(!frames.take()); // nothing left
//! ```

/// Coalesces evaluation requests into single frames.
///
/// # Invariants
///
/// 1. Between two `take()` calls that return `true`, at least one
///    `request()` happened.
/// 2. `request()` returns `true` only for the first request after a frame,
///    which is when a host should schedule `requestAnimationFrame`.
#[derive(Debug, Clone, Default)]
pub struct FrameCoalescer {
    pending: bool,
    /// Requests absorbed since the last frame.
    coalesced: u32,
    frames_run: u64,
}

impl FrameCoalescer {
    /// Create an idle coalescer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark work pending. Returns `true` if a frame must be scheduled.
    pub fn request(&mut self) -> bool {
        self.coalesced = self.coalesced.saturating_add(1);
        !std::mem::replace(&mut self.pending, true)
    }

    /// Consume the pending flag at frame time.
    ///
    /// Returns `true` if work was pending.
    pub fn take(&mut self) -> bool {
        if !self.pending {
            return false;
        }
        self.pending = false;
        self.coalesced = 0;
        self.frames_run += 1;
        true
    }

    /// Whether work is pending.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Requests absorbed into the currently pending frame.
    #[must_use]
    pub fn coalesced_requests(&self) -> u32 {
        self.coalesced
    }

    /// Number of frames that ran work.
    #[must_use]
    pub fn frames_run(&self) -> u64 {
        self.frames_run
    }

    /// Drop any pending work without running it.
    pub fn clear(&mut self) {
        self.pending = false;
        self.coalesced = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_runs_once() {
        let mut frames = FrameCoalescer::new();
        let scheduled = (0..50).filter(|_| frames.request()).count();
        assert_eq!(scheduled, 1);
        assert_eq!(frames.coalesced_requests(), 50);
        assert!(frames.take());
        assert!(!frames.take());
        assert_eq!(frames.frames_run(), 1);
    }

    #[test]
    fn clear_discards_pending() {
        let mut frames = FrameCoalescer::new();
        frames.request();
        frames.clear();
        assert!(!frames.is_pending());
        assert!(!frames.take());
        assert_eq!(frames.frames_run(), 0);
    }

    #[test]
    fn request_after_frame_schedules_again() {
        let mut frames = FrameCoalescer::new();
        assert!(frames.request());
        assert!(frames.take());
        assert!(frames.request());
    }
}
