//! Lens blob controller: stage-driven scale with an idle pulse.

use std::f32::consts::TAU;

use super::smoothing::SmoothedParameter;
use super::AnimationStage;
use crate::geometry::{ArrangementParams, PositionGenerator};
use crate::host::{AnimationObserver, BlobVisual, LensEffect};
use crate::options::BlobOptions;

/// Scales the particle blob toward per-stage targets and forwards frame
/// updates to the lens and particle collaborators.
///
/// Group scale and particle scale are smoothed independently; both share
/// the same pulse multiplier.
pub struct LensBlobController {
    options: BlobOptions,
    stage: AnimationStage,
    scale: SmoothedParameter,
    particle_scale: SmoothedParameter,
    pulse_phase: f32,
    loop_count: u32,
    visual: Box<dyn BlobVisual>,
    lens: Box<dyn LensEffect>,
    observer: Box<dyn AnimationObserver>,
    initialized: bool,
    disposed: bool,
}

impl LensBlobController {
    /// Controller for `options`, pre-scaled by `responsive_scale`. The
    /// particle layout is generated once and pushed to `visual`.
    pub fn new(
        options: &BlobOptions,
        responsive_scale: f32,
        generator: &dyn PositionGenerator,
        mut visual: Box<dyn BlobVisual>,
        lens: Box<dyn LensEffect>,
        observer: Box<dyn AnimationObserver>,
    ) -> Self {
        let options = options.scaled(responsive_scale);
        let p = &options.particles;
        let particles = generator.generate(
            p.arrangement,
            &ArrangementParams {
                count: p.count,
                radius: p.radius,
                jitter: p.jitter,
                seed: p.seed,
            },
        );
        log::debug!(
            "{}: {} particles ({:?})",
            options.label,
            particles.len(),
            p.arrangement
        );
        visual.set_particles(&particles);

        Self {
            stage: AnimationStage::Idle,
            scale: SmoothedParameter::new(
                options.scale.initial,
                options.scale_rate,
            ),
            particle_scale: SmoothedParameter::new(
                options.particle_scale.initial,
                options.scale_rate,
            ),
            pulse_phase: 0.0,
            loop_count: 0,
            visual,
            lens,
            observer,
            initialized: false,
            disposed: false,
            options,
        }
    }

    /// Name used in logs and observer callbacks.
    pub fn label(&self) -> &str {
        &self.options.label
    }

    /// Stage last observed by this blob.
    pub fn current_stage(&self) -> AnimationStage {
        self.stage
    }

    /// Smoothed group scale.
    pub fn current_scale(&self) -> f32 {
        self.scale.current
    }

    /// Smoothed per-particle scale.
    pub fn current_particle_scale(&self) -> f32 {
        self.particle_scale.current
    }

    /// Completed loops since the last reset.
    pub fn loop_count(&self) -> u32 {
        self.loop_count
    }

    /// Accumulated pulse phase in radians, wrapped to `[0, 2π)`.
    pub fn pulse_phase(&self) -> f32 {
        self.pulse_phase
    }

    /// Whether `dispose` has run.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Current pulse multiplier in `[min_scale, max_scale]`, or 1 when the
    /// pulse is disabled.
    pub fn pulse_multiplier(&self) -> f32 {
        let pulse = &self.options.pulse;
        if !pulse.enabled {
            return 1.0;
        }
        let wave = 0.5 + 0.5 * self.pulse_phase.sin();
        pulse.min_scale + (pulse.max_scale - pulse.min_scale) * wave
    }

    /// `idle` at the initial scales. Must precede the first update.
    pub fn initialize_for_global_timing(&mut self) {
        self.stage = AnimationStage::Idle;
        self.scale.snap(self.options.scale.initial);
        self.particle_scale.snap(self.options.particle_scale.initial);
        self.initialized = true;
    }

    /// Full reset: initial scales, pulse phase and loop counter.
    pub fn reset_animation(&mut self) {
        self.initialize_for_global_timing();
        self.pulse_phase = 0.0;
        self.loop_count = 0;
        self.visual
            .set_scales(self.scale.current, self.particle_scale.current);
        log::debug!("{}: animation reset", self.options.label);
        self.observer.on_reset(&self.options.label);
    }

    /// Advance one frame with the manager's shared stage.
    pub fn update(&mut self, dt: f32, elapsed: Option<f64>, stage: AnimationStage) {
        if self.disposed {
            return;
        }
        if !self.initialized {
            log::warn!(
                "{}: update before initialize_for_global_timing",
                self.options.label
            );
            self.initialize_for_global_timing();
        }
        if stage != self.stage {
            self.enter_stage(stage, elapsed);
        }

        self.pulse_phase =
            (self.pulse_phase + self.options.pulse.speed * dt).rem_euclid(TAU);
        let pulse = self.pulse_multiplier();
        self.scale.target = self.options.scale.for_stage(self.stage) * pulse;
        self.particle_scale.target =
            self.options.particle_scale.for_stage(self.stage) * pulse;
        let group = self.scale.step(dt);
        let particle = self.particle_scale.step(dt);
        self.visual.set_scales(group, particle);

        let elapsed = elapsed.unwrap_or(0.0);
        self.lens.update(dt, elapsed);
        self.visual.update(dt, elapsed);
    }

    /// Release the visual and lens. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.lens.dispose();
        self.visual.dispose();
        log::debug!("{}: disposed", self.options.label);
    }

    fn enter_stage(&mut self, to: AnimationStage, elapsed: Option<f64>) {
        let from = self.stage;
        self.stage = to;
        log::debug!(
            "{}: {from} -> {to} at {:.2}s",
            self.options.label,
            elapsed.unwrap_or(0.0)
        );
        let label = &self.options.label;
        self.observer.on_stage_change(label, from, to);
        if to == AnimationStage::Completed {
            self.observer.on_animation_complete(label);
        }
        if AnimationStage::is_loop_edge(from, to) {
            self.loop_count += 1;
            self.observer.on_loop_complete(label, self.loop_count);
        }
    }
}
