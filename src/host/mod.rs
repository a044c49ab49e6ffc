//! Collaborator contracts between the animation core and its host.
//!
//! The core never draws, positions DOM nodes or talks to the browser
//! directly. It calls out through these traits and is called back through
//! [`crate::engine::OrbitSystemManager`]'s `on_frame`/`on_timer`/signal
//! handlers.

mod manual;

use std::time::Duration;

use glam::{Vec2, Vec3};
pub use manual::{ManualScheduler, ScheduledTimer};

use crate::animation::AnimationStage;
use crate::error::OrbitError;
use crate::geometry::ParticlePosition;

/// Identifier of a requested display frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRequest(pub u64);

/// Identifier of a scheduled one-shot timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(pub u64);

/// Deferred actions the manager schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Card reveal after the first render start.
    CardReveal,
    /// Text fade-in after a viewport-entry reset has settled.
    TextFadeIn,
}

/// Display-refresh and timer primitives of the host environment.
///
/// The host must deliver exactly one `on_frame` per outstanding
/// [`FrameRequest`] and one `on_timer` per outstanding [`TimerHandle`].
pub trait HostScheduler {
    /// Ask for one display frame.
    fn request_frame(&mut self) -> FrameRequest;
    /// Withdraw a frame request that has not fired yet.
    fn cancel_frame(&mut self, request: FrameRequest);
    /// Schedule a one-shot timer.
    fn set_timer(&mut self, delay: Duration, kind: TimerKind) -> TimerHandle;
    /// Cancel a timer that has not fired yet.
    fn clear_timer(&mut self, handle: TimerHandle);
}

/// Converts world positions to container pixel coordinates.
pub trait ScreenProjector {
    /// Screen position of `point`, or `None` while no camera or container
    /// is available. Queried fresh every frame.
    fn world_to_screen(&self, point: Vec3) -> Option<Vec2>;
}

/// One rendering layer (scene + camera pair).
pub trait RenderLayer {
    /// Draw the current GPU-resident state.
    fn render(&mut self) -> Result<(), OrbitError>;
    /// Release GPU resources. Called exactly once.
    fn dispose(&mut self) {}
}

/// Where a text label is drawn this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextPlacement {
    /// Pixel position inside the container.
    pub screen: Vec2,
    /// Opacity in `[0, 1]`; 0 when the projection was unusable.
    pub opacity: f32,
    /// Scale in `[0, 1]`.
    pub scale: f32,
}

/// Sphere meshes and text elements belonging to one ring.
pub trait RingVisual {
    /// New world positions for every sphere, in index order.
    fn set_sphere_positions(&mut self, positions: &[Vec3]);
    /// Place text label `index`.
    fn set_text(&mut self, index: usize, placement: TextPlacement);
    /// Detach text elements and release geometry/material handles.
    fn dispose(&mut self) {}
}

/// The particle groups rendered into the lens buffer.
pub trait BlobVisual {
    /// Initial particle layout.
    fn set_particles(&mut self, particles: &[ParticlePosition]);
    /// Group scale and per-particle scale for this frame.
    fn set_scales(&mut self, group_scale: f32, particle_scale: f32);
    /// Per-frame particle cloud update.
    fn update(&mut self, _dt: f32, _elapsed: f64) {}
    /// Release geometry and materials.
    fn dispose(&mut self) {}
}

/// The refractive lens overlay.
pub trait LensEffect {
    /// Per-frame lens update.
    fn update(&mut self, dt: f32, elapsed: f64);
    /// Release the render target and material.
    fn dispose(&mut self) {}
}

/// A live subscription to viewport/visibility signals.
pub trait SignalSubscription {
    /// Stop delivering signals. Called exactly once, from `dispose`.
    fn unsubscribe(&mut self);
}

/// Receives edge notifications. Never called per frame.
///
/// `source` is the label of the controller that saw the edge, or
/// `"manager"` for manager-level events.
pub trait AnimationObserver {
    /// The stage changed.
    fn on_stage_change(
        &mut self,
        _source: &str,
        _from: AnimationStage,
        _to: AnimationStage,
    ) {
    }
    /// A new loop began (`returning → stage1`).
    fn on_loop_complete(&mut self, _source: &str, _loop_count: u32) {}
    /// The cycle reached `completed`.
    fn on_animation_complete(&mut self, _source: &str) {}
    /// State was reset to its initial values.
    fn on_reset(&mut self, _source: &str) {}
    /// Cards should be revealed.
    fn on_reveal(&mut self) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl AnimationObserver for NoopObserver {}

/// Projector that always has a camera and maps `x/y` straight through with
/// an offset. Handy for headless runs.
#[derive(Debug, Clone, Copy)]
pub struct OrthoProjector {
    /// Pixels per world unit.
    pub pixels_per_unit: f32,
    /// Screen position of the world origin.
    pub origin: Vec2,
}

impl ScreenProjector for OrthoProjector {
    fn world_to_screen(&self, point: Vec3) -> Option<Vec2> {
        Some(self.origin + Vec2::new(point.x, -point.y) * self.pixels_per_unit)
    }
}
