use web_time::{Duration, Instant};

/// Frame-delta clock with FPS calculation and optional frame limiting.
#[derive(Debug, Clone)]
pub struct FrameTiming {
    /// Target FPS (0 = unlimited)
    target_fps: u32,
    /// Minimum frame duration based on target FPS
    min_frame_duration: Duration,
    /// Baseline for the next delta
    last_frame: Instant,
    /// Smoothed FPS using exponential moving average
    smoothed_fps: f32,
    /// Smoothing factor (lower = smoother, 0.0-1.0)
    smoothing: f32,
}

impl FrameTiming {
    /// Create a new frame timer with the given FPS target (0 = unlimited).
    pub fn new(target_fps: u32, now: Instant) -> Self {
        let min_frame_duration = if target_fps > 0 {
            Duration::from_secs_f64(1.0 / f64::from(target_fps))
        } else {
            Duration::ZERO
        };

        Self {
            target_fps,
            min_frame_duration,
            last_frame: now,
            smoothed_fps: 60.0, // Start with reasonable default
            smoothing: 0.05,    // 5% new value, 95% old value
        }
    }

    /// Reset the delta baseline so the next frame does not see the time
    /// spent suspended.
    pub fn rearm(&mut self, now: Instant) {
        self.last_frame = now;
    }

    /// Whether enough time has passed since the last frame to render.
    pub fn should_render(&self, now: Instant) -> bool {
        if self.target_fps == 0 {
            return true;
        }
        now.saturating_duration_since(self.last_frame) >= self.min_frame_duration
    }

    /// Seconds since the previous frame; moves the baseline to `now`.
    pub fn tick(&mut self, now: Instant) -> f32 {
        let elapsed = now.saturating_duration_since(self.last_frame);
        self.last_frame = now;

        let frame_time = elapsed.as_secs_f32();
        if frame_time > 0.0 {
            let instant_fps = 1.0 / frame_time;
            self.smoothed_fps = self.smoothed_fps * (1.0 - self.smoothing)
                + instant_fps * self.smoothing;
        }
        frame_time
    }

    /// Get the current FPS (smoothed)
    pub fn fps(&self) -> f32 {
        self.smoothed_fps
    }
}
