//! Rolling frame-time statistics.

use std::collections::VecDeque;
use std::time::Duration;

use tracing::debug;

/// Frames in the rolling window
pub const STATS_WINDOW: usize = 60;

/// Snapshot of the rolling window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatsSummary {
    pub avg_fps: f64,
    pub min_fps: f64,
    pub max_fps: f64,
    pub avg_frame_ms: f64,
    /// Overruns since the session started
    pub overruns: u64,
    pub frames: u64,
}

#[derive(Debug, Clone)]
pub struct FrameStats {
    window: VecDeque<Duration>,
    frames: u64,
    overruns: u64,
    report_every: Option<u64>,
}

impl FrameStats {
    /// `report_every`: log a summary every N frames at debug level
    pub fn new(report_every: Option<u64>) -> Self {
        Self {
            window: VecDeque::with_capacity(STATS_WINDOW),
            frames: 0,
            overruns: 0,
            report_every,
        }
    }

    /// Record one tick's start-to-start duration
    pub fn record(&mut self, frame_time: Duration, overrun: bool) {
        if self.window.len() == STATS_WINDOW {
            self.window.pop_front();
        }
        self.window.push_back(frame_time);
        self.frames += 1;
        if overrun {
            self.overruns += 1;
        }

        if let Some(every) = self.report_every {
            if every > 0 && self.frames % every == 0 {
                let s = self.summary();
                debug!(
                    "{} frames: {:.1} fps avg ({:.1}..{:.1}), {:.2} ms/frame, {} overruns",
                    s.frames, s.avg_fps, s.min_fps, s.max_fps, s.avg_frame_ms, s.overruns
                );
            }
        }
    }

    pub fn summary(&self) -> StatsSummary {
        let fps = |d: &Duration| {
            let secs = d.as_secs_f64();
            if secs > 0.0 {
                1.0 / secs
            } else {
                0.0
            }
        };
        let total: Duration = self.window.iter().sum();
        let avg_frame = if self.window.is_empty() {
            0.0
        } else {
            total.as_secs_f64() / self.window.len() as f64
        };
        let min_fps = self.window.iter().map(fps).fold(f64::INFINITY, f64::min);
        StatsSummary {
            avg_fps: if avg_frame > 0.0 { 1.0 / avg_frame } else { 0.0 },
            min_fps: if min_fps.is_finite() { min_fps } else { 0.0 },
            max_fps: self.window.iter().map(fps).fold(0.0, f64::max),
            avg_frame_ms: avg_frame * 1000.0,
            overruns: self.overruns,
            frames: self.frames,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_over_window() {
        let mut stats = FrameStats::new(None);
        stats.record(Duration::from_millis(10), false);
        stats.record(Duration::from_millis(20), true);
        let s = stats.summary();
        assert_eq!(s.frames, 2);
        assert_eq!(s.overruns, 1);
        assert!((s.avg_frame_ms - 15.0).abs() < 1e-9);
        assert!((s.max_fps - 100.0).abs() < 1e-9);
        assert!((s.min_fps - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_window_is_bounded() {
        let mut stats = FrameStats::new(None);
        for _ in 0..STATS_WINDOW {
            stats.record(Duration::from_millis(100), false);
        }
        for _ in 0..STATS_WINDOW {
            stats.record(Duration::from_millis(10), false);
        }
        let s = stats.summary();
        assert_eq!(s.frames, 2 * STATS_WINDOW as u64);
        assert!((s.avg_fps - 100.0).abs() < 1e-6);
    }
}
