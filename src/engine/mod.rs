//! Top-level orchestration: one elapsed clock, one stage per tick, many
//! controllers.
//!
//! [`OrbitSystemManager`] owns the global start time and the render gate.
//! On every permitted frame it derives the stage once, hands the same value
//! to every ring and the blob, and only then asks the render layers to draw.

mod accessors;
mod control;
mod tick;

use rustc_hash::FxHashMap;
use web_time::{Duration, Instant};

use crate::animation::{
    AnimationStage, LensBlobController, OrbitingRingController, StageClock,
};
use crate::error::OrbitError;
use crate::geometry::PositionGenerator;
use crate::host::{
    AnimationObserver, BlobVisual, HostScheduler, LensEffect, RenderLayer,
    RingVisual, ScreenProjector, SignalSubscription, TimerHandle, TimerKind,
};
use crate::lifecycle::RenderLifecycleGate;
use crate::options::{LifecycleOptions, Options};

/// Host collaborators for one ring, in the same order as `Options::rings`.
pub struct RingBinding {
    /// Receives sphere positions and label placements.
    pub visual: Box<dyn RingVisual>,
    /// Edge notifications from this ring.
    pub observer: Box<dyn AnimationObserver>,
}

/// Host collaborators for the lens blob.
pub struct BlobBinding {
    /// Particle groups.
    pub visual: Box<dyn BlobVisual>,
    /// Refractive overlay.
    pub lens: Box<dyn LensEffect>,
    /// Edge notifications from the blob.
    pub observer: Box<dyn AnimationObserver>,
}

/// Everything the manager needs from its host.
pub struct HostBindings {
    /// Frame and timer primitives.
    pub scheduler: Box<dyn HostScheduler>,
    /// World → screen projection, queried fresh every frame.
    pub projector: Box<dyn ScreenProjector>,
    /// Layers drawn after all controllers are updated, in order.
    pub layers: Vec<Box<dyn RenderLayer>>,
    /// One binding per configured ring.
    pub rings: Vec<RingBinding>,
    /// Present exactly when a blob is configured.
    pub blob: Option<BlobBinding>,
    /// Particle layout source for the blob.
    pub generator: Box<dyn PositionGenerator>,
    /// Manager-level notifications (stage edges, reveal).
    pub observer: Box<dyn AnimationObserver>,
    /// Viewport/visibility signal subscription, released on dispose.
    pub subscription: Option<Box<dyn SignalSubscription>>,
}

/// Source label for manager-level observer callbacks.
pub const MANAGER_SOURCE: &str = "manager";

/// Shared-clock animation manager.
pub struct OrbitSystemManager {
    options: Options,
    clock: StageClock,
    start_time: Option<Instant>,
    elapsed: Option<f64>,
    stage: AnimationStage,
    gate: RenderLifecycleGate,
    rings: Vec<OrbitingRingController>,
    blob: Option<LensBlobController>,
    layers: Vec<Box<dyn RenderLayer>>,
    projector: Box<dyn ScreenProjector>,
    scheduler: Box<dyn HostScheduler>,
    observer: Box<dyn AnimationObserver>,
    subscription: Option<Box<dyn SignalSubscription>>,
    /// Outstanding deferred actions. `None` means the timer was cancelled
    /// by a pause and is re-armed on the next render start.
    deferred: FxHashMap<TimerKind, Option<TimerHandle>>,
    reveal_on_render: bool,
    frames_rendered: u64,
    started: bool,
    disposed: bool,
}

impl OrbitSystemManager {
    /// Validate `options`, build one controller per configured ring plus the
    /// optional blob, and wait for [`Self::start`].
    ///
    /// # Errors
    ///
    /// [`OrbitError::InvalidConfig`] for out-of-range options,
    /// [`OrbitError::HostMismatch`] when the bindings do not line up with
    /// the configured rings and blob.
    pub fn new(
        options: Options,
        bindings: HostBindings,
        now: Instant,
    ) -> Result<Self, OrbitError> {
        options.validate()?;
        if bindings.rings.len() != options.rings.len() {
            return Err(OrbitError::HostMismatch(format!(
                "{} ring bindings for {} configured rings",
                bindings.rings.len(),
                options.rings.len()
            )));
        }
        if bindings.blob.is_some() != options.blob.is_some() {
            return Err(OrbitError::HostMismatch(format!(
                "blob binding {} but blob options {}",
                presence(bindings.blob.is_some()),
                presence(options.blob.is_some())
            )));
        }

        let HostBindings {
            mut scheduler,
            projector,
            layers,
            rings: ring_bindings,
            blob: blob_binding,
            generator,
            observer,
            subscription,
        } = bindings;

        let scale = options.responsive_scale;
        let mut rings: Vec<_> = options
            .rings
            .iter()
            .zip(ring_bindings)
            .map(|(ring, b)| {
                OrbitingRingController::new(ring, scale, b.visual, b.observer)
            })
            .collect();
        for ring in &mut rings {
            ring.initialize_for_global_timing();
        }

        let blob = match (options.blob.as_ref(), blob_binding) {
            (Some(blob), Some(b)) => {
                let mut controller = LensBlobController::new(
                    blob,
                    scale,
                    generator.as_ref(),
                    b.visual,
                    b.lens,
                    b.observer,
                );
                controller.initialize_for_global_timing();
                Some(controller)
            }
            _ => None,
        };

        // Closed until start().
        let mut gate = RenderLifecycleGate::new(&options.lifecycle, now);
        let _ = gate.set_host_paused(true, now, scheduler.as_mut());

        log::info!(
            "orbit system ready: {} ring(s), blob {}, cycle {:.2}s",
            rings.len(),
            presence(blob.is_some()),
            options.timing.total_length()
        );

        Ok(Self {
            clock: StageClock::new(options.timing.clone()),
            start_time: None,
            elapsed: None,
            stage: AnimationStage::Idle,
            gate,
            rings,
            blob,
            layers,
            projector,
            scheduler,
            observer,
            subscription,
            deferred: FxHashMap::default(),
            reveal_on_render: false,
            frames_rendered: 0,
            started: false,
            disposed: false,
            options,
        })
    }
}

fn presence(present: bool) -> &'static str {
    if present {
        "present"
    } else {
        "absent"
    }
}

fn deferred_delay(lifecycle: &LifecycleOptions, kind: TimerKind) -> Duration {
    match kind {
        TimerKind::CardReveal => {
            Duration::from_millis(lifecycle.card_reveal_delay_ms)
        }
        TimerKind::TextFadeIn => {
            Duration::from_millis(lifecycle.text_fade_delay_ms)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::{Vec2, Vec3};
    use web_time::{Duration, Instant};

    use super::*;
    use crate::geometry::{ParticlePosition, StandardGenerator};
    use crate::host::{ManualScheduler, NoopObserver, OrthoProjector, TextPlacement};
    use crate::options::{
        BlobOptions, ParticleOptions, RingOptions, StageDurations, TextHideRule,
    };

    #[derive(Default)]
    struct Log {
        ring_disposed: u32,
        blob_disposed: u32,
        lens_disposed: u32,
        layer_disposed: u32,
        renders: u32,
        unsubscribed: u32,
        reveals: u32,
        resets: u32,
        stages: Vec<(AnimationStage, AnimationStage)>,
    }

    type Shared = Rc<RefCell<Log>>;

    struct Visual(Shared);

    impl RingVisual for Visual {
        fn set_sphere_positions(&mut self, _positions: &[Vec3]) {}
        fn set_text(&mut self, _index: usize, _placement: TextPlacement) {}
        fn dispose(&mut self) {
            self.0.borrow_mut().ring_disposed += 1;
        }
    }

    struct Particles(Shared);

    impl BlobVisual for Particles {
        fn set_particles(&mut self, _particles: &[ParticlePosition]) {}
        fn set_scales(&mut self, _group_scale: f32, _particle_scale: f32) {}
        fn dispose(&mut self) {
            self.0.borrow_mut().blob_disposed += 1;
        }
    }

    struct Lens(Shared);

    impl LensEffect for Lens {
        fn update(&mut self, _dt: f32, _elapsed: f64) {}
        fn dispose(&mut self) {
            self.0.borrow_mut().lens_disposed += 1;
        }
    }

    struct Layer {
        log: Shared,
        fail: bool,
    }

    impl RenderLayer for Layer {
        fn render(&mut self) -> Result<(), OrbitError> {
            self.log.borrow_mut().renders += 1;
            if self.fail {
                Err(OrbitError::Render("context lost".to_owned()))
            } else {
                Ok(())
            }
        }
        fn dispose(&mut self) {
            self.log.borrow_mut().layer_disposed += 1;
        }
    }

    struct Subscription(Shared);

    impl SignalSubscription for Subscription {
        fn unsubscribe(&mut self) {
            self.0.borrow_mut().unsubscribed += 1;
        }
    }

    struct Observer(Shared);

    impl AnimationObserver for Observer {
        fn on_stage_change(
            &mut self,
            _source: &str,
            from: AnimationStage,
            to: AnimationStage,
        ) {
            self.0.borrow_mut().stages.push((from, to));
        }
        fn on_reset(&mut self, _source: &str) {
            self.0.borrow_mut().resets += 1;
        }
        fn on_reveal(&mut self) {
            self.0.borrow_mut().reveals += 1;
        }
    }

    fn unit_options() -> Options {
        Options {
            timing: StageDurations {
                stage1: 1.0,
                stage2: 1.0,
                stage3: 1.0,
                stage4: 1.0,
                return_delay: 0.0,
                return_duration: 1.0,
                auto_loop: true,
            },
            lifecycle: LifecycleOptions {
                initially_in_viewport: true,
                ..LifecycleOptions::default()
            },
            rings: vec![RingOptions {
                label: "ring".to_owned(),
                texts: vec!["Fast".to_owned(), "Small".to_owned()],
                hide_texts: vec![TextHideRule {
                    index: 0,
                    stage: AnimationStage::Stage4,
                }],
                text_fade_out_duration: 0.3,
                ..RingOptions::default()
            }],
            blob: Some(BlobOptions {
                particles: ParticleOptions {
                    count: 64,
                    ..ParticleOptions::default()
                },
                ..BlobOptions::default()
            }),
            responsive_scale: 1.0,
        }
    }

    fn bindings(
        options: &Options,
        sched: &ManualScheduler,
        log: &Shared,
        failing_layer: bool,
    ) -> HostBindings {
        HostBindings {
            scheduler: Box::new(sched.clone()),
            projector: Box::new(OrthoProjector {
                pixels_per_unit: 100.0,
                origin: Vec2::new(400.0, 300.0),
            }),
            layers: vec![Box::new(Layer {
                log: log.clone(),
                fail: failing_layer,
            })],
            rings: options
                .rings
                .iter()
                .map(|_| RingBinding {
                    visual: Box::new(Visual(log.clone())),
                    observer: Box::new(NoopObserver),
                })
                .collect(),
            blob: options.blob.as_ref().map(|_| BlobBinding {
                visual: Box::new(Particles(log.clone())),
                lens: Box::new(Lens(log.clone())),
                observer: Box::new(NoopObserver),
            }),
            generator: Box::new(StandardGenerator),
            observer: Box::new(Observer(log.clone())),
            subscription: Some(Box::new(Subscription(log.clone()))),
        }
    }

    struct Fixture {
        manager: OrbitSystemManager,
        sched: ManualScheduler,
        log: Shared,
        t0: Instant,
    }

    impl Fixture {
        fn new(options: Options) -> Self {
            Self::build(options, false)
        }

        fn build(options: Options, failing_layer: bool) -> Self {
            let t0 = Instant::now();
            let sched = ManualScheduler::new(t0);
            let log = Shared::default();
            let bindings = bindings(&options, &sched, &log, failing_layer);
            let manager = OrbitSystemManager::new(options, bindings, t0).unwrap();
            Self {
                manager,
                sched,
                log,
                t0,
            }
        }

        fn at(&self, secs: f64) -> Instant {
            self.t0 + Duration::from_secs_f64(secs)
        }

        fn start(&mut self) {
            self.manager.start(self.t0);
        }

        fn pump(&mut self, secs: f64) -> bool {
            let now = self.at(secs);
            self.sched.pump(&mut self.manager, now)
        }

        /// Deliver frames at `n / 60` seconds for every `n` in `range`.
        fn frames(&mut self, range: std::ops::RangeInclusive<u32>) {
            for n in range {
                let _ = self.pump(f64::from(n) / 60.0);
            }
        }

        fn viewport(&mut self, entered: bool, secs: f64) {
            let now = self.at(secs);
            self.sched.set_now(now);
            self.manager.handle_viewport_change(entered, now);
        }

        fn visibility(&mut self, visible: bool, secs: f64) {
            let now = self.at(secs);
            self.sched.set_now(now);
            self.manager.handle_visibility_change(visible, now);
        }

        fn timer_kinds(&self) -> Vec<TimerKind> {
            self.sched.pending_timers().iter().map(|t| t.kind).collect()
        }
    }

    #[test]
    fn scenario_unit_durations_stage_sequence() {
        let mut fx = Fixture::new(unit_options());
        fx.start();
        let expected = [
            AnimationStage::Stage1,
            AnimationStage::Stage2,
            AnimationStage::Stage3,
            AnimationStage::Stage4,
            AnimationStage::Returning,
            AnimationStage::Stage1,
        ];
        for (t, want) in expected.iter().enumerate() {
            assert!(fx.pump(t as f64), "no frame at t = {t}");
            assert_eq!(fx.manager.current_stage(), *want, "t = {t}");
            for ring in fx.manager.rings() {
                assert_eq!(ring.current_stage(), *want);
            }
            assert_eq!(fx.manager.blob().unwrap().current_stage(), *want);
        }
        assert_eq!(fx.manager.rings()[0].loop_count(), 1);
        assert_eq!(fx.manager.blob().unwrap().loop_count(), 1);

        let stages = fx.log.borrow().stages.clone();
        assert_eq!(stages.first(), Some(&(AnimationStage::Idle, AnimationStage::Stage1)));
        assert!(stages.contains(&(AnimationStage::Stage4, AnimationStage::Returning)));
        assert!(!stages.iter().any(|(_, to)| *to == AnimationStage::Completed));
    }

    #[test]
    fn scenario_indexed_text_fades_out_at_stage4() {
        let mut fx = Fixture::new(unit_options());
        fx.start();
        // Up to the last stage3 frame, then 0.3s (18 frames) of stage4.
        fx.frames(0..=179);
        assert_eq!(fx.manager.current_stage(), AnimationStage::Stage3);
        assert_eq!(fx.manager.rings()[0].texts()[0].fade.opacity, 1.0);
        fx.frames(180..=197);

        assert_eq!(fx.manager.current_stage(), AnimationStage::Stage4);
        let texts = fx.manager.rings()[0].texts();
        assert_eq!(texts[0].fade.opacity, 0.0);
        assert!(texts[0].fade.has_faded);
        assert!(!texts[0].fade.is_fading_out);
        // The unruled label is untouched.
        assert_eq!(texts[1].fade.opacity, 1.0);
    }

    #[test]
    fn scenario_viewport_reentry_matches_fresh_start() {
        let mut fx = Fixture::new(unit_options());
        fx.start();
        fx.frames(0..=150);
        let grown = fx.manager.rings()[0].current_radius();
        assert!(grown > fx.manager.options().rings[0].radius.initial);

        fx.viewport(false, 2.5);
        assert!(!fx.manager.is_rendering());
        fx.viewport(true, 10.0);
        assert!(fx.manager.is_rendering());

        let mut fresh = Fixture::new(unit_options());
        fresh.start();

        let (a, b) = (&fx.manager.rings()[0], &fresh.manager.rings()[0]);
        assert_eq!(a.current_radius(), b.current_radius());
        assert_eq!(a.rotation(), b.rotation());
        assert_eq!(a.loop_count(), 0);
        assert_eq!(a.current_stage(), AnimationStage::Idle);
        let (a, b) = (fx.manager.blob().unwrap(), fresh.manager.blob().unwrap());
        assert_eq!(a.current_scale(), b.current_scale());
        assert_eq!(a.current_particle_scale(), b.current_particle_scale());
        assert_eq!(fx.manager.elapsed(), Some(0.0));

        // Labels wait for the settle delay before fading back in.
        assert!(fx.timer_kinds().contains(&TimerKind::TextFadeIn));
        assert_eq!(fx.manager.rings()[0].texts()[1].fade.opacity, 0.0);
        assert!(fx.pump(10.0 + 1.0 / 60.0));
        assert_eq!(fx.manager.current_stage(), AnimationStage::Stage1);
        fx.frames(602..=720);
        assert_eq!(fx.manager.rings()[0].texts()[1].fade.opacity, 1.0);
    }

    #[test]
    fn visibility_resume_continues_mid_cycle() {
        let mut fx = Fixture::new(unit_options());
        fx.start();
        fx.frames(0..=90);
        fx.visibility(false, 1.5);
        fx.visibility(true, 1.6);
        assert!(fx.pump(1.7));
        let elapsed = fx.manager.elapsed().unwrap();
        assert!((elapsed - 1.7).abs() < 1e-6, "elapsed {elapsed}");
        assert_eq!(fx.manager.current_stage(), AnimationStage::Stage2);
    }

    #[test]
    fn stale_frame_is_ignored() {
        let mut fx = Fixture::new(unit_options());
        fx.start();
        let stale = fx.sched.take_frame().unwrap();
        fx.visibility(false, 0.0);
        fx.visibility(true, 0.0);

        fx.manager.on_frame(stale, fx.at(0.1));
        assert_eq!(fx.manager.frames_rendered(), 0);
        assert_eq!(fx.sched.pending_frames().len(), 1);
    }

    #[test]
    fn frames_never_overlap_and_gate_holds() {
        let mut fx = Fixture::new(unit_options());
        fx.start();
        for n in 1..600u32 {
            let t = f64::from(n) / 60.0;
            if n % 37 == 0 {
                let visible = fx.manager.is_page_visible();
                fx.visibility(!visible, t);
            }
            if n % 53 == 0 {
                let inside = fx.manager.is_in_viewport();
                fx.viewport(!inside, t);
            }
            let _ = fx.pump(t);
            assert!(fx.sched.pending_frames().len() <= 1);
            assert_eq!(
                fx.manager.is_rendering(),
                fx.manager.is_in_viewport() && fx.manager.is_page_visible()
            );
            if !fx.manager.is_rendering() {
                assert!(fx.sched.pending_frames().is_empty());
                assert!(fx.sched.pending_timers().is_empty());
            }
        }
    }

    #[test]
    fn pause_cancels_timers_and_resume_rearms() {
        let mut fx = Fixture::new(unit_options());
        fx.start();
        let mut kinds = fx.timer_kinds();
        kinds.sort_by_key(|k| *k == TimerKind::CardReveal);
        assert_eq!(kinds, vec![TimerKind::TextFadeIn, TimerKind::CardReveal]);

        fx.sched.set_now(fx.at(1.0));
        fx.manager.pause(fx.at(1.0));
        assert!(!fx.manager.is_rendering());
        assert!(fx.sched.pending_timers().is_empty());
        assert!(fx.sched.pending_frames().is_empty());

        fx.sched.set_now(fx.at(2.0));
        fx.manager.resume(fx.at(2.0));
        assert!(fx.manager.is_rendering());
        assert_eq!(fx.sched.pending_timers().len(), 2);

        let _ = fx.pump(2.6);
        assert_eq!(fx.log.borrow().reveals, 1);
        assert!(fx.sched.pending_timers().is_empty());
        // Resume is not a reset.
        assert!(fx.manager.elapsed().unwrap() > 2.5);
    }

    #[test]
    fn pause_and_resume_follow_the_host_clock() {
        let mut fx = Fixture::new(unit_options());
        fx.start();
        let later = fx.at(500.0);
        fx.sched.set_now(later);
        fx.manager.pause(later);
        assert!(!fx.manager.is_rendering());

        fx.manager.resume(later);
        assert!(fx.pump(500.016));
        let elapsed = fx.manager.elapsed().unwrap();
        assert!((elapsed - 500.016).abs() < 1e-6, "elapsed {elapsed}");
    }

    #[test]
    fn reveal_waits_for_first_render_start() {
        let mut options = unit_options();
        options.lifecycle.initially_in_viewport = false;
        let mut fx = Fixture::new(options);
        fx.start();
        assert!(!fx.manager.is_rendering());
        assert!(fx.sched.pending_timers().is_empty());

        fx.viewport(true, 1.0);
        assert!(fx.timer_kinds().contains(&TimerKind::CardReveal));
        let _ = fx.pump(1.6);
        assert_eq!(fx.log.borrow().reveals, 1);

        fx.viewport(false, 2.0);
        fx.viewport(true, 3.0);
        let _ = fx.pump(4.0);
        assert_eq!(fx.log.borrow().reveals, 1);
    }

    #[test]
    fn nothing_renders_before_start() {
        let mut fx = Fixture::new(unit_options());
        fx.viewport(true, 0.0);
        fx.visibility(true, 0.0);
        assert!(!fx.manager.is_rendering());
        assert!(fx.sched.pending_frames().is_empty());
        fx.manager.resume(fx.at(0.5));
        assert!(!fx.manager.is_rendering());
        assert_eq!(fx.manager.current_stage(), AnimationStage::Idle);
    }

    #[test]
    fn dispose_releases_everything_once() {
        let mut fx = Fixture::new(unit_options());
        fx.start();
        fx.frames(0..=10);
        fx.manager.dispose();
        fx.manager.dispose();

        {
            let log = fx.log.borrow();
            assert_eq!(log.ring_disposed, 1);
            assert_eq!(log.blob_disposed, 1);
            assert_eq!(log.lens_disposed, 1);
            assert_eq!(log.layer_disposed, 1);
            assert_eq!(log.unsubscribed, 1);
        }
        assert!(fx.manager.is_disposed());
        assert!(!fx.manager.is_rendering());
        assert!(fx.sched.pending_frames().is_empty());
        assert!(fx.sched.pending_timers().is_empty());

        // Late signals and callbacks do nothing.
        fx.viewport(true, 1.0);
        fx.manager.start(fx.at(1.0));
        assert!(!fx.pump(1.5));
        fx.manager.attach_subscription(Box::new(Subscription(fx.log.clone())));
        assert_eq!(fx.log.borrow().unsubscribed, 2);
    }

    #[test]
    fn render_failure_is_not_fatal() {
        let mut fx = Fixture::build(unit_options(), true);
        fx.start();
        fx.frames(0..=9);
        assert_eq!(fx.log.borrow().renders, 10);
        assert_eq!(fx.manager.frames_rendered(), 10);
        assert!(fx.manager.is_rendering());
        assert_eq!(fx.sched.pending_frames().len(), 1);
    }

    #[test]
    fn frame_delta_is_capped_after_a_stall() {
        let mut fx = Fixture::new(unit_options());
        fx.start();
        let _ = fx.pump(0.0);
        let before = fx.manager.rings()[0].rotation();
        let _ = fx.pump(1.5);
        let turned = fx.manager.rings()[0].rotation() - before;
        let speed = fx.manager.options().rings[0].rotation_speed;
        assert!((turned - speed * 0.1).abs() < 1e-5, "turned {turned}");
    }

    #[test]
    fn mismatched_bindings_are_rejected() {
        let options = unit_options();
        let sched = ManualScheduler::new(Instant::now());
        let log = Shared::default();
        let mut b = bindings(&options, &sched, &log, false);
        let _ = b.rings.pop();
        let err = OrbitSystemManager::new(options.clone(), b, Instant::now());
        assert!(matches!(err, Err(OrbitError::HostMismatch(_))));

        let mut b = bindings(&options, &sched, &log, false);
        b.blob = None;
        let err = OrbitSystemManager::new(options, b, Instant::now());
        assert!(matches!(err, Err(OrbitError::HostMismatch(_))));
    }

    #[test]
    fn invalid_options_are_rejected() {
        let mut options = unit_options();
        options.timing.stage2 = 0.0;
        let sched = ManualScheduler::new(Instant::now());
        let log = Shared::default();
        let b = bindings(&options, &sched, &log, false);
        match OrbitSystemManager::new(options, b, Instant::now()) {
            Err(OrbitError::InvalidConfig(msg)) => {
                assert!(msg.contains("timing.stage2"));
            }
            _ => panic!("expected InvalidConfig"),
        }
    }

    #[test]
    fn start_resets_and_notifies() {
        let mut fx = Fixture::new(unit_options());
        fx.start();
        // start() reset plus the first viewport entry reset.
        assert_eq!(fx.log.borrow().resets, 2);
        assert_eq!(fx.manager.elapsed(), Some(0.0));
        assert!(fx.manager.is_started());
    }
}
