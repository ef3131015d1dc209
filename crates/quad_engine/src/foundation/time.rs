//! Time management utilities

use std::time::{Duration, Instant};

/// Wall-clock time since the first rendered frame
///
/// The clock starts on the first call to [`FrameClock::elapsed`], not at
/// construction, so setup time never shows up as animation.
#[derive(Debug, Default)]
pub struct FrameClock {
    start: Option<Instant>,
}

impl FrameClock {
    /// Create a clock that has not started yet
    pub fn new() -> Self {
        Self { start: None }
    }

    /// Time since the first call, starting it if needed
    pub fn elapsed(&mut self) -> Duration {
        self.elapsed_at(Instant::now())
    }

    /// Time since the first call as seen at `now`
    pub fn elapsed_at(&mut self, now: Instant) -> Duration {
        let start = *self.start.get_or_insert(now);
        now.saturating_duration_since(start)
    }

    /// Whether the first frame has been timed yet
    pub fn is_running(&self) -> bool {
        self.start.is_some()
    }
}

/// Counts frames and reports the rate once per reporting window
#[derive(Debug)]
pub struct FrameRateCounter {
    window_start: Option<Instant>,
    frames: u32,
    report_interval: Duration,
}

impl Default for FrameRateCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameRateCounter {
    /// Counter that reports every second
    pub fn new() -> Self {
        Self::with_interval(Duration::from_secs(1))
    }

    /// Counter with a custom reporting interval
    pub fn with_interval(report_interval: Duration) -> Self {
        Self {
            window_start: None,
            frames: 0,
            report_interval,
        }
    }

    /// Record one presented frame and log the rate when a window closes
    pub fn tick(&mut self) {
        if let Some(fps) = self.record_frame_at(Instant::now()) {
            log::info!("{fps:.0} fps");
        }
    }

    /// Record one frame presented at `now`
    ///
    /// Returns frames per second once `report_interval` has passed since the
    /// window opened, then starts a new window.
    pub fn record_frame_at(&mut self, now: Instant) -> Option<f32> {
        let start = *self.window_start.get_or_insert(now);
        self.frames += 1;

        let window = now.saturating_duration_since(start);
        if window < self.report_interval {
            return None;
        }

        let fps = self.frames as f32 / window.as_secs_f32();
        self.frames = 0;
        self.window_start = Some(now);
        Some(fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_clock_starts_on_first_frame() {
        let mut clock = FrameClock::new();
        assert!(!clock.is_running());

        let first = Instant::now() + Duration::from_secs(5);
        assert_eq!(clock.elapsed_at(first), Duration::ZERO);
        assert!(clock.is_running());
        assert_eq!(clock.elapsed_at(first + Duration::from_millis(250)), Duration::from_millis(250));
    }

    #[test]
    fn test_frame_rate_reported_once_per_window() {
        let mut counter = FrameRateCounter::new();
        let start = Instant::now();

        for frame in 0..59 {
            assert!(counter.record_frame_at(start + Duration::from_millis(frame * 16)).is_none());
        }
        let fps = counter.record_frame_at(start + Duration::from_secs(1)).unwrap();
        assert!((fps - 60.0).abs() < 0.01);

        // The next window starts fresh
        assert!(counter.record_frame_at(start + Duration::from_millis(1100)).is_none());
    }
}
