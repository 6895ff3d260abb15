//! Time management utilities

use std::time::{Duration, Instant};

/// Frame clock handing out millisecond timestamps for animation.
///
/// Animation code works in whole milliseconds since the clock was created,
/// which keeps the arithmetic integral and lets tests drive time by hand.
pub struct FrameClock {
    start: Instant,
    frame_count: u64,
    last_frame_ms: u32,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    /// Create a new clock starting at zero
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            frame_count: 0,
            last_frame_ms: 0,
        }
    }

    /// Advance to the next frame and return its timestamp in milliseconds.
    ///
    /// Timestamps never go backwards even if the system clock does.
    pub fn tick(&mut self) -> u32 {
        let elapsed = u32::try_from(self.start.elapsed().as_millis()).unwrap_or(u32::MAX);
        self.last_frame_ms = elapsed.max(self.last_frame_ms);
        self.frame_count += 1;
        self.last_frame_ms
    }

    /// Timestamp of the most recent frame
    pub fn now_ms(&self) -> u32 {
        self.last_frame_ms
    }

    /// Number of frames ticked so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Wall-clock instant corresponding to a frame timestamp
    pub fn instant_at(&self, frame_ms: u32) -> Instant {
        self.start + Duration::from_millis(u64::from(frame_ms))
    }
}
