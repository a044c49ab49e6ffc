//! Particle arrangements for the blob and logo clouds.
//!
//! Pure and deterministic: equal kind and params always yield the same
//! ordered positions.

use std::f32::consts::{PI, TAU};

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Shape a particle set is laid out in.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Arrangement {
    /// Fibonacci lattice on a sphere surface.
    Sphere,
    /// Evenly spaced on a circle in the XY plane.
    Ring,
    /// Uniformly filled ball.
    #[default]
    Blob,
    /// Sunflower spiral filling a disc in the XY plane.
    Disc,
}

/// Inputs for a generator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrangementParams {
    /// Number of particles.
    pub count: usize,
    /// Overall radius.
    pub radius: f32,
    /// Random displacement as a fraction of `radius`.
    pub jitter: f32,
    /// RNG seed.
    pub seed: u64,
}

/// A generated particle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticlePosition {
    /// Position relative to the arrangement center.
    pub position: Vec3,
    /// Order within the arrangement.
    pub index: usize,
}

/// Source of particle layouts.
pub trait PositionGenerator {
    /// Ordered positions for `kind`.
    fn generate(
        &self,
        kind: Arrangement,
        params: &ArrangementParams,
    ) -> Vec<ParticlePosition>;
}

/// The built-in arrangements.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardGenerator;

impl PositionGenerator for StandardGenerator {
    fn generate(
        &self,
        kind: Arrangement,
        params: &ArrangementParams,
    ) -> Vec<ParticlePosition> {
        generate_positions(kind, params)
    }
}

/// Generate `params.count` positions for `kind`.
pub fn generate_positions(
    kind: Arrangement,
    params: &ArrangementParams,
) -> Vec<ParticlePosition> {
    let mut rng = StdRng::seed_from_u64(params.seed);
    let n = params.count;
    let r = params.radius;
    let jitter = params.jitter * r;

    (0..n)
        .map(|index| {
            let base = match kind {
                Arrangement::Sphere => fibonacci_point(index, n) * r,
                Arrangement::Ring => {
                    let angle = TAU * index as f32 / n.max(1) as f32;
                    Vec3::new(angle.cos(), angle.sin(), 0.0) * r
                }
                Arrangement::Disc => sunflower_point(index, n) * r,
                Arrangement::Blob => ball_point(&mut rng) * r,
            };
            let offset = if jitter > 0.0 {
                Vec3::new(
                    rng.random_range(-1.0..1.0),
                    rng.random_range(-1.0..1.0),
                    rng.random_range(-1.0..1.0),
                ) * jitter
            } else {
                Vec3::ZERO
            };
            ParticlePosition {
                position: base + offset,
                index,
            }
        })
        .collect()
}

/// Point `i` of an `n`-point Fibonacci sphere lattice (unit radius).
fn fibonacci_point(i: usize, n: usize) -> Vec3 {
    if n <= 1 {
        return Vec3::Y;
    }
    let golden = PI * (3.0 - 5.0_f32.sqrt());
    let y = 1.0 - 2.0 * i as f32 / (n - 1) as f32;
    let ring = (1.0 - y * y).max(0.0).sqrt();
    let theta = golden * i as f32;
    Vec3::new(theta.cos() * ring, y, theta.sin() * ring)
}

/// Point `i` of an `n`-point Vogel spiral (unit disc).
fn sunflower_point(i: usize, n: usize) -> Vec3 {
    let golden = PI * (3.0 - 5.0_f32.sqrt());
    let rho = ((i as f32 + 0.5) / n.max(1) as f32).sqrt();
    let theta = golden * i as f32;
    Vec3::new(theta.cos() * rho, theta.sin() * rho, 0.0)
}

/// Uniform sample inside the unit ball.
fn ball_point(rng: &mut StdRng) -> Vec3 {
    let dir = loop {
        let v = Vec3::new(
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
        );
        let len2 = v.length_squared();
        if len2 > 1e-6 && len2 <= 1.0 {
            break v / len2.sqrt();
        }
    };
    let radius: f32 = rng.random::<f32>().cbrt();
    dir * radius
}
