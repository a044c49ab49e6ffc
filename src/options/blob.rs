use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::targets::StageTargets;
use crate::error::OrbitError;
use crate::geometry::Arrangement;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Pulse", inline)]
#[serde(default)]
/// Idle breathing oscillation multiplied into the blob scale targets.
pub struct PulseOptions {
    /// Whether the pulse is applied.
    pub enabled: bool,
    /// Multiplier at the trough of the sine.
    #[schemars(title = "Min Scale", range(min = 0.5, max = 1.5))]
    pub min_scale: f32,
    /// Multiplier at the crest of the sine.
    #[schemars(title = "Max Scale", range(min = 0.5, max = 1.5))]
    pub max_scale: f32,
    /// Phase advance in radians per second.
    #[schemars(title = "Pulse Speed", range(min = 0.0, max = 10.0))]
    pub speed: f32,
}

impl Default for PulseOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            min_scale: 0.96,
            max_scale: 1.04,
            speed: 1.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Particles", inline)]
#[serde(default)]
/// Particle layout pushed to the blob visual once at construction.
pub struct ParticleOptions {
    /// Arrangement generator.
    pub arrangement: Arrangement,
    /// Number of particles.
    #[schemars(range(min = 1, max = 100_000))]
    pub count: usize,
    /// Arrangement radius.
    pub radius: f32,
    /// Random displacement as a fraction of the radius.
    pub jitter: f32,
    /// Seed for the jittered arrangements.
    pub seed: u64,
}

impl Default for ParticleOptions {
    fn default() -> Self {
        Self {
            arrangement: Arrangement::Blob,
            count: 2000,
            radius: 1.0,
            jitter: 0.08,
            seed: 7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Blob", inline)]
#[serde(default)]
/// Configuration for the particle blob seen through the lens effect.
pub struct BlobOptions {
    /// Name used in logs and observer callbacks.
    pub label: String,
    /// Group scale per stage.
    pub scale: StageTargets,
    /// Per-particle scale per stage.
    pub particle_scale: StageTargets,
    /// Scale smoothing rate (1/s).
    #[schemars(title = "Scale Rate", range(min = 0.1, max = 30.0))]
    pub scale_rate: f32,
    /// Idle pulse.
    pub pulse: PulseOptions,
    /// Particle layout.
    pub particles: ParticleOptions,
}

impl Default for BlobOptions {
    fn default() -> Self {
        Self {
            label: "blob".to_owned(),
            scale: StageTargets {
                initial: 0.8,
                stage1: 1.0,
                stage2: 1.15,
                stage3: 1.3,
                stage4: 1.45,
                final_value: 1.5,
            },
            particle_scale: StageTargets::uniform(1.0),
            scale_rate: 3.0,
            pulse: PulseOptions::default(),
            particles: ParticleOptions::default(),
        }
    }
}

impl BlobOptions {
    /// Copy with the group scale table multiplied by `factor`.
    #[must_use]
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            scale: self.scale.scaled(factor),
            ..self.clone()
        }
    }

    pub(crate) fn validate(&self) -> Result<(), OrbitError> {
        self.scale.validate("blob.scale")?;
        self.particle_scale.validate("blob.particle_scale")?;
        if !(self.scale_rate.is_finite() && self.scale_rate > 0.0) {
            return Err(OrbitError::invalid("blob.scale_rate", "must be > 0"));
        }
        let pulse = &self.pulse;
        if !(pulse.min_scale.is_finite()
            && pulse.max_scale.is_finite()
            && pulse.min_scale >= 0.0
            && pulse.min_scale <= pulse.max_scale)
        {
            return Err(OrbitError::invalid(
                "blob.pulse",
                "requires 0 <= min_scale <= max_scale",
            ));
        }
        if !(self.particles.radius.is_finite() && self.particles.radius >= 0.0)
        {
            return Err(OrbitError::invalid("blob.particles.radius", "must be >= 0"));
        }
        Ok(())
    }
}
