//! Frame statistics and periodic performance logging

use std::collections::VecDeque;
use std::time::Duration;

/// Number of frames averaged by [`FrameStats`]
const FRAME_SAMPLES: usize = 120;

/// Frame statistics tracker
#[derive(Debug)]
pub struct FrameStats {
    /// Frame time history for averaging
    frame_times: VecDeque<Duration>,
    /// Current FPS
    fps: f32,
    /// Average frame time in milliseconds
    avg_frame_time_ms: f32,
    /// Minimum frame time in milliseconds
    min_frame_time_ms: f32,
    /// Maximum frame time in milliseconds
    max_frame_time_ms: f32,
    /// Total frames rendered
    total_frames: u64,
}

impl FrameStats {
    /// Create a new frame stats tracker
    pub fn new() -> Self {
        Self {
            frame_times: VecDeque::with_capacity(FRAME_SAMPLES),
            fps: 0.0,
            avg_frame_time_ms: 0.0,
            min_frame_time_ms: 0.0,
            max_frame_time_ms: 0.0,
            total_frames: 0,
        }
    }

    /// Record a frame with the given delta time
    pub fn record_frame(&mut self, delta: Duration) {
        self.total_frames += 1;

        if self.frame_times.len() >= FRAME_SAMPLES {
            self.frame_times.pop_front();
        }
        self.frame_times.push_back(delta);

        self.update_stats();
    }

    fn update_stats(&mut self) {
        if self.frame_times.is_empty() {
            return;
        }

        let mut total = Duration::ZERO;
        let mut min = Duration::MAX;
        let mut max = Duration::ZERO;

        for &dt in &self.frame_times {
            total += dt;
            min = min.min(dt);
            max = max.max(dt);
        }

        let count = self.frame_times.len() as f32;
        let total_secs = total.as_secs_f32();

        if total_secs > 0.0 {
            self.avg_frame_time_ms = (total_secs / count) * 1000.0;
            self.fps = count / total_secs;
        } else {
            self.avg_frame_time_ms = 0.0;
            self.fps = 0.0;
        }

        self.min_frame_time_ms = min.as_secs_f32() * 1000.0;
        self.max_frame_time_ms = max.as_secs_f32() * 1000.0;
    }

    /// Get current FPS
    pub fn fps(&self) -> f32 {
        self.fps
    }

    /// Get average frame time in milliseconds
    pub fn avg_frame_time_ms(&self) -> f32 {
        self.avg_frame_time_ms
    }

    /// Get minimum frame time in milliseconds
    pub fn min_frame_time_ms(&self) -> f32 {
        self.min_frame_time_ms
    }

    /// Get maximum frame time in milliseconds
    pub fn max_frame_time_ms(&self) -> f32 {
        self.max_frame_time_ms
    }

    /// Get total frames rendered
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Get a formatted stats string
    pub fn format_stats(&self) -> String {
        format!(
            "average {:.3} ms/frame ({:.1} FPS), min {:.2} ms, max {:.2} ms",
            self.avg_frame_time_ms, self.fps, self.min_frame_time_ms, self.max_frame_time_ms
        )
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Frame statistics plus a throttled log report
#[derive(Debug)]
pub struct DebugInfo {
    /// Frame statistics
    pub frame_stats: FrameStats,
    /// Minimum time between two reports
    report_interval: Duration,
    /// Time accumulated since the last report
    since_report: Duration,
}

impl DebugInfo {
    /// Create new debug info reporting once per second
    pub fn new() -> Self {
        Self {
            frame_stats: FrameStats::new(),
            report_interval: Duration::from_secs(1),
            since_report: Duration::ZERO,
        }
    }

    /// Record a frame, logging the stats when the report interval has passed.
    ///
    /// Returns `true` when a report was emitted.
    pub fn record_frame(&mut self, delta: Duration) -> bool {
        self.frame_stats.record_frame(delta);
        self.since_report += delta;

        if self.since_report < self.report_interval {
            return false;
        }

        self.since_report = Duration::ZERO;
        log::debug!("{}", self.frame_stats.format_stats());
        true
    }
}

impl Default for DebugInfo {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_stats_average() {
        let mut stats = FrameStats::new();
        stats.record_frame(Duration::from_millis(10));
        stats.record_frame(Duration::from_millis(30));

        assert_eq!(stats.total_frames(), 2);
        assert!((stats.avg_frame_time_ms() - 20.0).abs() < 0.01);
        assert!((stats.fps() - 50.0).abs() < 0.1);
        assert!((stats.min_frame_time_ms() - 10.0).abs() < 0.01);
        assert!((stats.max_frame_time_ms() - 30.0).abs() < 0.01);
    }

    #[test]
    fn test_frame_stats_window_is_bounded() {
        let mut stats = FrameStats::new();
        for _ in 0..FRAME_SAMPLES {
            stats.record_frame(Duration::from_millis(100));
        }
        for _ in 0..FRAME_SAMPLES {
            stats.record_frame(Duration::from_millis(10));
        }

        // Old slow frames have been evicted
        assert!((stats.max_frame_time_ms() - 10.0).abs() < 0.01);
        assert_eq!(stats.total_frames(), 2 * FRAME_SAMPLES as u64);
    }

    #[test]
    fn test_report_is_throttled() {
        let mut debug = DebugInfo::new();
        assert!(!debug.record_frame(Duration::from_millis(400)));
        assert!(!debug.record_frame(Duration::from_millis(400)));
        assert!(debug.record_frame(Duration::from_millis(400)));
        assert!(!debug.record_frame(Duration::from_millis(400)));
    }
}
