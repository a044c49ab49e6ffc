//! Orbiting ring controller: sphere radius/rotation plus attached labels.

use std::f32::consts::TAU;

use glam::{Quat, Vec2, Vec3};
use rustc_hash::FxHashMap;

use super::smoothing::SmoothedParameter;
use super::text_fade::{FadeTiming, TextFadeSequencer, TextItemState};
use super::AnimationStage;
use crate::host::{
    AnimationObserver, RingVisual, ScreenProjector, TextPlacement,
};
use crate::options::RingOptions;

/// Snapshot of the ring's placement for one frame.
#[derive(Debug, Clone, Copy)]
struct RingFrame {
    center: Vec3,
    orientation: Quat,
    rotation: f32,
    radius: f32,
}

impl RingFrame {
    fn point(&self, angle: f32, radius: f32) -> Vec3 {
        let a = angle + self.rotation;
        self.center
            + self.orientation * Vec3::new(a.cos() * radius, a.sin() * radius, 0.0)
    }
}

/// Drives one ring from the shared stage: radius smoothing toward the
/// stage target, continuous rotation, sphere placement and label fades.
///
/// Owns its parameters exclusively; two rings only agree because they are
/// fed the same stage.
pub struct OrbitingRingController {
    options: RingOptions,
    stage: AnimationStage,
    radius: SmoothedParameter,
    rotation: f32,
    loop_count: u32,
    orientation: Quat,
    sphere_angles: Vec<f32>,
    sphere_positions: Vec<Vec3>,
    texts: TextFadeSequencer,
    text_rate: f32,
    placements: Vec<TextPlacement>,
    visual: Box<dyn RingVisual>,
    observer: Box<dyn AnimationObserver>,
    initialized: bool,
    disposed: bool,
}

impl OrbitingRingController {
    /// Controller for `options`, pre-scaled by `responsive_scale`.
    pub fn new(
        options: &RingOptions,
        responsive_scale: f32,
        visual: Box<dyn RingVisual>,
        observer: Box<dyn AnimationObserver>,
    ) -> Self {
        let options = options.scaled(responsive_scale);
        let n = options.sphere_count;
        let sphere_angles =
            (0..n).map(|i| TAU * i as f32 / n as f32).collect();

        let mut hide_by_index = FxHashMap::default();
        for rule in &options.hide_texts {
            let _ = hide_by_index.insert(rule.index, rule.stage);
        }
        let center = Vec3::from_array(options.center);
        let texts = TextFadeSequencer::new(
            &options.texts,
            hide_by_index,
            options.hide_texts_at_stage,
            FadeTiming {
                fade_in: options.text_fade_in_duration,
                fade_out: options.text_fade_out_duration,
            },
            center,
        );

        Self {
            stage: AnimationStage::Idle,
            radius: SmoothedParameter::new(
                options.radius.initial,
                options.radius_rate,
            ),
            rotation: options.rotation_offset,
            loop_count: 0,
            orientation: Quat::from_rotation_x(options.tilt),
            sphere_angles,
            sphere_positions: vec![center; n],
            text_rate: options.text_smoothing_rate(),
            placements: Vec::with_capacity(texts.len()),
            texts,
            visual,
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

    /// Stage last observed by this ring.
    pub fn current_stage(&self) -> AnimationStage {
        self.stage
    }

    /// Smoothed ring radius.
    pub fn current_radius(&self) -> f32 {
        self.radius.current
    }

    /// Radius the ring is converging toward.
    pub fn target_radius(&self) -> f32 {
        self.radius.target
    }

    /// Ring rotation in radians.
    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    /// Completed loops since the last reset.
    pub fn loop_count(&self) -> u32 {
        self.loop_count
    }

    /// Label state.
    pub fn texts(&self) -> &[TextItemState] {
        self.texts.items()
    }

    /// Fade sequencer for the labels.
    pub fn text_sequencer(&self) -> &TextFadeSequencer {
        &self.texts
    }

    /// Sphere positions written last frame.
    pub fn sphere_positions(&self) -> &[Vec3] {
        &self.sphere_positions
    }

    /// Label placements written last frame.
    pub fn placements(&self) -> &[TextPlacement] {
        &self.placements
    }

    /// Whether `dispose` has run.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Put the ring in its pre-run state: `idle` at the initial radius.
    /// Must precede the first [`Self::update`].
    pub fn initialize_for_global_timing(&mut self) {
        self.stage = AnimationStage::Idle;
        self.radius.snap(self.options.radius.initial);
        self.initialized = true;
    }

    /// Full reset: initial radius, rotation offset, loop counter and every
    /// label back to visible at its original position.
    pub fn reset_animation(&mut self) {
        self.initialize_for_global_timing();
        self.rotation = self.options.rotation_offset;
        self.loop_count = 0;
        self.texts.reset();
        self.layout_spheres();
        log::debug!("{}: animation reset", self.options.label);
        self.observer.on_reset(&self.options.label);
    }

    /// Advance one frame with the manager's shared stage.
    pub fn update(
        &mut self,
        dt: f32,
        elapsed: Option<f64>,
        stage: AnimationStage,
        projector: &dyn ScreenProjector,
    ) {
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

        self.rotation += self.options.rotation_speed * dt;
        let _ = self.radius.step(dt);
        self.layout_spheres();

        let center = Vec3::from_array(self.options.center);
        self.texts.step(self.stage, dt, center);
        let frame = self.frame();
        let (text_radius, angle_of) = self.text_layout();
        self.texts.track_targets(
            |i| frame.point(angle_of(i), text_radius),
            dt,
            self.text_rate,
        );

        self.write_texts(projector);
    }

    /// Snap every label to its freshly computed ring position, skipping the
    /// smoothing that would otherwise fly it in from a stale position.
    pub fn resync_text_positions(&mut self) {
        let frame = self.frame();
        let (text_radius, angle_of) = self.text_layout();
        self.texts
            .resync(|i| frame.point(angle_of(i), text_radius));
    }

    /// Force every label into fading-in from zero over `duration` seconds.
    pub fn fade_in_texts(&mut self, duration: f32) {
        self.texts.fade_in_all(duration);
    }

    /// Hide every label until the next forced fade-in.
    pub fn hide_texts(&mut self) {
        self.texts.hold_all_hidden();
    }

    /// Release the visual. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.visual.dispose();
        self.placements.clear();
        log::debug!("{}: disposed", self.options.label);
    }

    fn enter_stage(&mut self, to: AnimationStage, elapsed: Option<f64>) {
        let from = self.stage;
        self.stage = to;
        self.radius.target = self.options.radius.for_stage(to);
        log::debug!(
            "{}: {from} -> {to} at {:.2}s (radius target {:.2})",
            self.options.label,
            elapsed.unwrap_or(0.0),
            self.radius.target
        );

        let label = &self.options.label;
        self.observer.on_stage_change(label, from, to);
        if to == AnimationStage::Completed {
            self.observer.on_animation_complete(label);
        }
        if AnimationStage::is_loop_edge(from, to) {
            self.loop_count += 1;
            self.rotation = self.options.rotation_offset;
            self.observer.on_loop_complete(label, self.loop_count);
        }
    }

    fn frame(&self) -> RingFrame {
        RingFrame {
            center: Vec3::from_array(self.options.center),
            orientation: self.orientation,
            rotation: self.rotation,
            radius: self.radius.current,
        }
    }

    /// Label radius and a per-index angle function.
    fn text_layout(&self) -> (f32, impl Fn(usize) -> f32) {
        let count = self.texts.len().max(1) as f32;
        let offset = self.options.text_angle_offset;
        (
            self.radius.current + self.options.text_offset,
            move |i: usize| offset + TAU * i as f32 / count,
        )
    }

    fn layout_spheres(&mut self) {
        let frame = self.frame();
        for (pos, angle) in
            self.sphere_positions.iter_mut().zip(&self.sphere_angles)
        {
            *pos = frame.point(*angle, frame.radius);
        }
        self.visual.set_sphere_positions(&self.sphere_positions);
    }

    fn write_texts(&mut self, projector: &dyn ScreenProjector) {
        self.placements.clear();
        for idx in 0..self.texts.len() {
            let Some(view) = self.texts.view(idx) else {
                continue;
            };
            let placement = match usable_screen_point(
                projector.world_to_screen(view.position),
            ) {
                Some(screen) => TextPlacement {
                    screen,
                    opacity: view.opacity,
                    scale: view.scale,
                },
                None => TextPlacement {
                    screen: Vec2::ZERO,
                    opacity: 0.0,
                    scale: view.scale,
                },
            };
            self.visual.set_text(idx, placement);
            self.placements.push(placement);
        }
    }
}

/// A projection is usable when present, finite, non-negative and not the
/// "never computed" origin.
fn usable_screen_point(p: Option<Vec2>) -> Option<Vec2> {
    p.filter(|p| {
        p.is_finite() && p.x >= 0.0 && p.y >= 0.0 && *p != Vec2::ZERO
    })
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::host::{NoopObserver, OrthoProjector};
    use crate::options::TextHideRule;

    #[derive(Default)]
    struct Recorded {
        spheres: Vec<Vec3>,
        texts: Vec<(usize, TextPlacement)>,
        disposed: u32,
    }

    struct RecordingVisual(Rc<RefCell<Recorded>>);

    impl RingVisual for RecordingVisual {
        fn set_sphere_positions(&mut self, positions: &[Vec3]) {
            self.0.borrow_mut().spheres = positions.to_vec();
        }
        fn set_text(&mut self, index: usize, placement: TextPlacement) {
            self.0.borrow_mut().texts.push((index, placement));
        }
        fn dispose(&mut self) {
            self.0.borrow_mut().disposed += 1;
        }
    }

    struct NoCamera;

    impl ScreenProjector for NoCamera {
        fn world_to_screen(&self, _point: Vec3) -> Option<Vec2> {
            None
        }
    }

    struct OriginProjector;

    impl ScreenProjector for OriginProjector {
        fn world_to_screen(&self, _point: Vec3) -> Option<Vec2> {
            Some(Vec2::ZERO)
        }
    }

    const PROJECTOR: OrthoProjector = OrthoProjector {
        pixels_per_unit: 100.0,
        origin: Vec2::new(400.0, 300.0),
    };
    const DT: f32 = 1.0 / 60.0;

    fn ring_options() -> RingOptions {
        RingOptions {
            label: "test".to_owned(),
            sphere_count: 4,
            texts: vec!["A".to_owned(), "B".to_owned()],
            hide_texts: vec![TextHideRule {
                index: 0,
                stage: AnimationStage::Stage4,
            }],
            text_fade_out_duration: 0.3,
            ..RingOptions::default()
        }
    }

    fn ring(options: &RingOptions) -> (OrbitingRingController, Rc<RefCell<Recorded>>) {
        let rec = Rc::new(RefCell::new(Recorded::default()));
        let mut ring = OrbitingRingController::new(
            options,
            1.0,
            Box::new(RecordingVisual(rec.clone())),
            Box::new(NoopObserver),
        );
        ring.initialize_for_global_timing();
        (ring, rec)
    }

    #[test]
    fn radius_converges_to_stage_target() {
        let (mut ring, _) = ring(&ring_options());
        assert_eq!(ring.current_radius(), 1.0);
        for _ in 0..120 {
            ring.update(DT, Some(3.5), AnimationStage::Stage2, &PROJECTOR);
        }
        assert_eq!(ring.target_radius(), 1.8);
        assert!((ring.current_radius() - 1.8).abs() < 0.01);
    }

    #[test]
    fn idle_and_returning_use_initial_radius_completed_uses_final() {
        let (mut ring, _) = ring(&ring_options());
        ring.update(DT, Some(13.0), AnimationStage::Completed, &PROJECTOR);
        assert_eq!(ring.target_radius(), 2.8);
        ring.update(DT, Some(14.0), AnimationStage::Returning, &PROJECTOR);
        assert_eq!(ring.target_radius(), 1.0);
    }

    #[test]
    fn hidden_text_fades_out_at_its_stage() {
        let (mut ring, _) = ring(&ring_options());
        for _ in 0..18 {
            ring.update(DT, Some(10.0), AnimationStage::Stage4, &PROJECTOR);
        }
        let fade = ring.text_sequencer().effective_fade(0);
        assert_eq!(fade.opacity, 0.0);
        assert!(fade.has_faded);
        assert_eq!(ring.text_sequencer().effective_fade(1).opacity, 1.0);
    }

    #[test]
    fn loop_edge_counts_and_resets_rotation() {
        let mut options = ring_options();
        options.rotation_offset = 0.5;
        let (mut ring, _) = ring(&options);
        ring.update(DT, Some(1.0), AnimationStage::Stage1, &PROJECTOR);
        ring.update(0.5, Some(14.0), AnimationStage::Returning, &PROJECTOR);
        assert!(ring.rotation() > 0.5);
        ring.update(0.0, Some(15.0), AnimationStage::Stage1, &PROJECTOR);
        assert_eq!(ring.loop_count(), 1);
        assert_eq!(ring.rotation(), 0.5);
    }

    #[test]
    fn spheres_sit_on_the_smoothed_radius() {
        let (mut ring, rec) = ring(&ring_options());
        ring.update(DT, Some(0.1), AnimationStage::Stage1, &PROJECTOR);
        let r = ring.current_radius();
        let spheres = rec.borrow().spheres.clone();
        assert_eq!(spheres.len(), 4);
        for s in spheres {
            assert!((s.length() - r).abs() < 1e-4);
        }
    }

    #[test]
    fn missing_camera_hides_text_for_the_frame() {
        let (mut ring, _) = ring(&ring_options());
        ring.update(DT, Some(0.1), AnimationStage::Stage1, &NoCamera);
        assert!(ring.placements().iter().all(|p| p.opacity == 0.0));
        // Internal fade state is untouched, so the next good frame shows it.
        ring.update(DT, Some(0.2), AnimationStage::Stage1, &PROJECTOR);
        assert!(ring.placements().iter().all(|p| p.opacity == 1.0));
    }

    #[test]
    fn origin_projection_counts_as_invalid() {
        let (mut ring, _) = ring(&ring_options());
        ring.update(DT, Some(0.1), AnimationStage::Stage1, &OriginProjector);
        assert!(ring.placements().iter().all(|p| p.opacity == 0.0));
    }

    #[test]
    fn resync_places_labels_on_target() {
        let (mut ring, _) = ring(&ring_options());
        ring.resync_text_positions();
        let expected_r = ring.current_radius() + 0.35;
        for item in ring.texts() {
            assert_eq!(item.position, item.target_position);
            assert_eq!(item.smoothed_position, item.target_position);
            assert!((item.position.length() - expected_r).abs() < 1e-4);
        }
    }

    #[test]
    fn dispose_is_idempotent() {
        let (mut ring, rec) = ring(&ring_options());
        ring.dispose();
        ring.dispose();
        assert_eq!(rec.borrow().disposed, 1);
        assert!(ring.is_disposed());
    }
}
