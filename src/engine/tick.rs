//! Per-frame work.

use web_time::Instant;

use super::{OrbitSystemManager, MANAGER_SOURCE};
use crate::animation::AnimationStage;
use crate::host::FrameRequest;
use crate::lifecycle::FrameDecision;

impl OrbitSystemManager {
    /// Frame callback from the host. Only the outstanding request does any
    /// work; a stale one neither updates nor reschedules.
    pub fn on_frame(&mut self, request: FrameRequest, now: Instant) {
        if self.disposed {
            return;
        }
        match self.gate.begin_frame(request, now) {
            FrameDecision::Stale => return,
            FrameDecision::Throttled => {}
            FrameDecision::Run { delta } => self.tick(delta, now),
        }
        self.gate.end_frame(self.scheduler.as_mut());
    }

    /// Derive the stage once, update every controller with it, then render.
    fn tick(&mut self, dt: f32, now: Instant) {
        let elapsed = self
            .start_time
            .map(|start| now.saturating_duration_since(start).as_secs_f64());
        let stage = self.clock.stage_at(elapsed);
        self.elapsed = elapsed;
        if stage != self.stage {
            self.enter_stage(stage);
        }

        for ring in &mut self.rings {
            ring.update(dt, elapsed, stage, self.projector.as_ref());
        }
        if let Some(blob) = self.blob.as_mut() {
            blob.update(dt, elapsed, stage);
        }

        for (i, layer) in self.layers.iter_mut().enumerate() {
            if let Err(e) = layer.render() {
                log::warn!("render layer {i} failed: {e}");
            }
        }
        self.frames_rendered += 1;
    }

    fn enter_stage(&mut self, to: AnimationStage) {
        let from = self.stage;
        self.stage = to;
        log::debug!(
            "stage {from} -> {to} at {:.3}s",
            self.elapsed.unwrap_or(0.0)
        );
        self.observer.on_stage_change(MANAGER_SOURCE, from, to);
        if to == AnimationStage::Completed {
            self.observer.on_animation_complete(MANAGER_SOURCE);
        }
    }
}
