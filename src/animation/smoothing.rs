//! Framerate-independent exponential smoothing.
//!
//! `current + (target - current) * (1 - e^(-rate * dt))`: two steps of
//! `dt/2` land where one step of `dt` does, for a constant target.

use glam::Vec3;

/// Fraction of the remaining distance covered in `dt` seconds at `rate`.
#[inline]
pub fn smoothing_factor(rate: f32, dt: f32) -> f32 {
    if dt <= 0.0 || rate <= 0.0 {
        return 0.0;
    }
    1.0 - (-rate * dt).exp()
}

/// Step a scalar toward `target`.
#[inline]
pub fn smooth_toward(current: f32, target: f32, dt: f32, rate: f32) -> f32 {
    current + (target - current) * smoothing_factor(rate, dt)
}

/// Step a point toward `target`.
#[inline]
pub fn smooth_vec3(current: Vec3, target: Vec3, dt: f32, rate: f32) -> Vec3 {
    current.lerp(target, smoothing_factor(rate, dt))
}

/// Rate that closes `fraction` of the gap in one frame at `hz`.
///
/// `0.85` at 60 Hz gives a rate of roughly 114/s.
pub fn rate_from_frame_fraction(fraction: f32, hz: f32) -> f32 {
    let fraction = fraction.clamp(0.0, 0.9999);
    -(1.0 - fraction).ln() * hz
}

/// A scalar that converges exponentially toward its target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothedParameter {
    /// Displayed value.
    pub current: f32,
    /// Value being approached.
    pub target: f32,
    /// Convergence rate (1/s).
    pub rate: f32,
}

impl SmoothedParameter {
    /// Parameter resting at `value`.
    pub fn new(value: f32, rate: f32) -> Self {
        Self {
            current: value,
            target: value,
            rate,
        }
    }

    /// Advance by `dt` seconds toward `target` and return the new value.
    pub fn step(&mut self, dt: f32) -> f32 {
        self.current = smooth_toward(self.current, self.target, dt, self.rate);
        self.current
    }

    /// Jump both current and target to `value`.
    pub fn snap(&mut self, value: f32) {
        self.current = value;
        self.target = value;
    }
}
