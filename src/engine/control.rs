//! Host lifecycle surface: start/pause/resume/dispose, signal handlers and
//! deferred actions.

use web_time::Instant;

use super::{deferred_delay, OrbitSystemManager, MANAGER_SOURCE};
use crate::animation::AnimationStage;
use crate::host::{SignalSubscription, TimerHandle, TimerKind};
use crate::lifecycle::{GateCause, GateTransition};

// ── Lifecycle ──

impl OrbitSystemManager {
    /// Full reset and start of the global clock. Rendering begins as soon
    /// as the element is in the viewport and the page is visible.
    pub fn start(&mut self, now: Instant) {
        if self.disposed {
            return;
        }
        self.clear_deferred();
        self.reset_all(now);
        self.started = true;
        self.reveal_on_render = true;
        log::info!("orbit system started");

        let transition =
            self.gate
                .set_host_paused(false, now, self.scheduler.as_mut());
        self.apply_transition(transition, now);
        if self.gate.is_rendering() && self.reveal_on_render {
            // Gate was already open; this still counts as the first start.
            self.arm_reveal();
        }
    }

    /// Stop rendering without resetting. Pending frames and timers are
    /// cancelled.
    pub fn pause(&mut self, now: Instant) {
        if self.disposed || !self.started {
            return;
        }
        let transition =
            self.gate.set_host_paused(true, now, self.scheduler.as_mut());
        self.apply_transition(transition, now);
    }

    /// Undo [`Self::pause`]. Continues mid-cycle unless the element entered
    /// the viewport while paused.
    pub fn resume(&mut self, now: Instant) {
        if self.disposed || !self.started {
            return;
        }
        let transition =
            self.gate
                .set_host_paused(false, now, self.scheduler.as_mut());
        self.apply_transition(transition, now);
    }

    /// Terminal teardown. Cancels every pending callback, unsubscribes from
    /// signals and releases every controller and layer exactly once.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.gate.shutdown(self.scheduler.as_mut());
        self.clear_deferred();
        if let Some(mut subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        for ring in &mut self.rings {
            ring.dispose();
        }
        if let Some(blob) = self.blob.as_mut() {
            blob.dispose();
        }
        for layer in &mut self.layers {
            layer.dispose();
        }
        log::info!(
            "orbit system disposed after {} frame(s)",
            self.frames_rendered
        );
    }

    /// Take ownership of the viewport/visibility subscription, releasing
    /// any previous one. After dispose it is released immediately.
    pub fn attach_subscription(
        &mut self,
        mut subscription: Box<dyn SignalSubscription>,
    ) {
        if self.disposed {
            subscription.unsubscribe();
            return;
        }
        if let Some(mut old) = self.subscription.replace(subscription) {
            old.unsubscribe();
        }
    }
}

// ── Signals ──

impl OrbitSystemManager {
    /// Viewport intersection edge from the host.
    pub fn handle_viewport_change(&mut self, entered: bool, now: Instant) {
        if self.disposed {
            return;
        }
        let transition =
            self.gate
                .set_in_viewport(entered, now, self.scheduler.as_mut());
        self.apply_transition(transition, now);
    }

    /// Page visibility edge from the host.
    pub fn handle_visibility_change(&mut self, visible: bool, now: Instant) {
        if self.disposed {
            return;
        }
        let transition =
            self.gate
                .set_page_visible(visible, now, self.scheduler.as_mut());
        self.apply_transition(transition, now);
    }

    /// Timer callback from the host. Handles that are no longer pending
    /// are ignored.
    pub fn on_timer(&mut self, handle: TimerHandle, _now: Instant) {
        if self.disposed {
            return;
        }
        let Some(kind) = self
            .deferred
            .iter()
            .find_map(|(kind, h)| (*h == Some(handle)).then_some(*kind))
        else {
            log::trace!("ignoring stale timer {handle:?}");
            return;
        };
        let _ = self.deferred.remove(&kind);

        match kind {
            TimerKind::CardReveal => {
                log::debug!("revealing cards");
                self.observer.on_reveal();
            }
            TimerKind::TextFadeIn => {
                let duration = self.options.lifecycle.entry_text_fade_duration;
                for ring in &mut self.rings {
                    ring.fade_in_texts(duration);
                }
            }
        }
    }

    fn apply_transition(&mut self, transition: GateTransition, now: Instant) {
        match transition {
            GateTransition::Unchanged => {}
            GateTransition::Started(cause) => {
                if cause == GateCause::Viewport && self.started {
                    self.viewport_entry_reset(now);
                }
                self.rearm_deferred();
                if self.reveal_on_render {
                    self.arm_reveal();
                }
            }
            GateTransition::Stopped(_) => self.suspend_deferred(),
        }
    }

    /// Restart the cycle from zero after the element comes back into view.
    fn viewport_entry_reset(&mut self, now: Instant) {
        log::debug!("viewport entry: full reset");
        self.reset_all(now);
        for ring in &mut self.rings {
            ring.resync_text_positions();
            ring.hide_texts();
        }
        self.arm(TimerKind::TextFadeIn);
    }

    /// Clock origin to `now`; every controller back to its initial state.
    pub(super) fn reset_all(&mut self, now: Instant) {
        self.start_time = Some(now);
        self.elapsed = Some(0.0);
        self.stage = AnimationStage::Idle;
        for ring in &mut self.rings {
            ring.reset_animation();
        }
        if let Some(blob) = self.blob.as_mut() {
            blob.reset_animation();
        }
        self.observer.on_reset(MANAGER_SOURCE);
    }
}

// ── Deferred actions ──

impl OrbitSystemManager {
    fn arm_reveal(&mut self) {
        self.reveal_on_render = false;
        self.arm(TimerKind::CardReveal);
    }

    /// Schedule `kind`, replacing an outstanding timer of the same kind.
    /// While the gate is shut the action is recorded and armed on the next
    /// render start.
    fn arm(&mut self, kind: TimerKind) {
        if let Some(Some(old)) = self.deferred.remove(&kind) {
            self.scheduler.clear_timer(old);
        }
        let handle = self.gate.is_rendering().then(|| {
            self.scheduler
                .set_timer(deferred_delay(&self.options.lifecycle, kind), kind)
        });
        let _ = self.deferred.insert(kind, handle);
    }

    fn rearm_deferred(&mut self) {
        for (kind, slot) in &mut self.deferred {
            if slot.is_none() {
                *slot = Some(self.scheduler.set_timer(
                    deferred_delay(&self.options.lifecycle, *kind),
                    *kind,
                ));
            }
        }
    }

    fn suspend_deferred(&mut self) {
        for slot in self.deferred.values_mut() {
            if let Some(handle) = slot.take() {
                self.scheduler.clear_timer(handle);
            }
        }
    }

    fn clear_deferred(&mut self) {
        self.suspend_deferred();
        self.deferred.clear();
    }
}
