//! Render-loop gating on viewport intersection and page visibility.
//!
//! `rendering` may only be true while the element is in the viewport, the
//! page is visible and the host has not paused. Frames are requested one at
//! a time; a frame callback that arrives after the gate closed (or that is
//! not the outstanding request) does nothing and does not reschedule.

mod frame_timing;

pub use frame_timing::FrameTiming;
use web_time::Instant;

use crate::host::{FrameRequest, HostScheduler};
use crate::options::LifecycleOptions;

/// Input that caused a gate transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateCause {
    /// Viewport intersection changed (or changed while the gate was shut).
    Viewport,
    /// Page visibility changed.
    Visibility,
    /// Explicit host pause/resume.
    Host,
}

/// Result of feeding an input to the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateTransition {
    /// `rendering` did not change.
    Unchanged,
    /// `rendering` went false → true.
    Started(GateCause),
    /// `rendering` went true → false.
    Stopped(GateCause),
}

/// What to do with a delivered frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameDecision {
    /// Not the outstanding request, or the gate closed since it was
    /// scheduled. Do nothing and do not reschedule.
    Stale,
    /// Too early for the frame limit; reschedule without work.
    Throttled,
    /// Run the frame with this clamped delta in seconds.
    Run {
        /// Seconds since the previous frame.
        delta: f32,
    },
}

/// Render lifecycle state plus the frame-delta clock.
#[derive(Debug)]
pub struct RenderLifecycleGate {
    in_viewport: bool,
    page_visible: bool,
    host_paused: bool,
    rendering: bool,
    viewport_entry_pending: bool,
    pending_frame: Option<FrameRequest>,
    timing: FrameTiming,
    max_delta: f32,
}

impl RenderLifecycleGate {
    /// Closed gate seeded with the configured initial inputs. Call
    /// [`Self::open_if_ready`] to start rendering when they allow it.
    pub fn new(options: &LifecycleOptions, now: Instant) -> Self {
        Self {
            in_viewport: options.initially_in_viewport,
            page_visible: options.initially_visible,
            host_paused: false,
            rendering: false,
            viewport_entry_pending: options.initially_in_viewport,
            pending_frame: None,
            timing: FrameTiming::new(options.target_fps, now),
            max_delta: options.max_frame_delta,
        }
    }

    /// Whether frames are currently being produced.
    pub fn is_rendering(&self) -> bool {
        self.rendering
    }

    /// Last known viewport intersection.
    pub fn is_in_viewport(&self) -> bool {
        self.in_viewport
    }

    /// Last known page visibility.
    pub fn is_page_visible(&self) -> bool {
        self.page_visible
    }

    /// Whether the host paused rendering explicitly.
    pub fn is_host_paused(&self) -> bool {
        self.host_paused
    }

    /// Outstanding frame request, if any.
    pub fn pending_frame(&self) -> Option<FrameRequest> {
        self.pending_frame
    }

    /// Smoothed frames per second.
    pub fn fps(&self) -> f32 {
        self.timing.fps()
    }

    fn inputs_allow(&self) -> bool {
        self.in_viewport && self.page_visible && !self.host_paused
    }

    /// Record viewport intersection.
    pub fn set_in_viewport(
        &mut self,
        in_viewport: bool,
        now: Instant,
        scheduler: &mut dyn HostScheduler,
    ) -> GateTransition {
        if in_viewport && !self.in_viewport {
            self.viewport_entry_pending = true;
        }
        self.in_viewport = in_viewport;
        self.reconcile(GateCause::Viewport, now, scheduler)
    }

    /// Record page visibility.
    pub fn set_page_visible(
        &mut self,
        visible: bool,
        now: Instant,
        scheduler: &mut dyn HostScheduler,
    ) -> GateTransition {
        self.page_visible = visible;
        self.reconcile(GateCause::Visibility, now, scheduler)
    }

    /// Record an explicit host pause or resume.
    pub fn set_host_paused(
        &mut self,
        paused: bool,
        now: Instant,
        scheduler: &mut dyn HostScheduler,
    ) -> GateTransition {
        self.host_paused = paused;
        self.reconcile(GateCause::Host, now, scheduler)
    }

    /// Start rendering if the current inputs allow it.
    pub fn open_if_ready(
        &mut self,
        now: Instant,
        scheduler: &mut dyn HostScheduler,
    ) -> GateTransition {
        self.reconcile(GateCause::Host, now, scheduler)
    }

    fn reconcile(
        &mut self,
        cause: GateCause,
        now: Instant,
        scheduler: &mut dyn HostScheduler,
    ) -> GateTransition {
        match (self.rendering, self.inputs_allow()) {
            (false, true) => {
                self.rendering = true;
                self.timing.rearm(now);
                self.request(scheduler);
                // A viewport entry that happened while another input held
                // the gate shut still counts as a viewport entry.
                let cause = if std::mem::take(&mut self.viewport_entry_pending)
                {
                    GateCause::Viewport
                } else {
                    cause
                };
                log::debug!("render loop started ({cause:?})");
                GateTransition::Started(cause)
            }
            (true, false) => {
                self.rendering = false;
                self.cancel(scheduler);
                log::debug!("render loop stopped ({cause:?})");
                GateTransition::Stopped(cause)
            }
            _ => GateTransition::Unchanged,
        }
    }

    /// Validate a delivered frame and compute its delta.
    pub fn begin_frame(
        &mut self,
        request: FrameRequest,
        now: Instant,
    ) -> FrameDecision {
        if self.pending_frame != Some(request) {
            log::trace!("ignoring stale frame {request:?}");
            return FrameDecision::Stale;
        }
        self.pending_frame = None;
        if !self.rendering || !self.inputs_allow() {
            return FrameDecision::Stale;
        }
        if !self.timing.should_render(now) {
            return FrameDecision::Throttled;
        }
        FrameDecision::Run {
            delta: self.timing.tick(now).min(self.max_delta),
        }
    }

    /// Schedule the next frame if still rendering.
    pub fn end_frame(&mut self, scheduler: &mut dyn HostScheduler) {
        if self.rendering && self.pending_frame.is_none() {
            self.request(scheduler);
        }
    }

    /// Stop for good, cancelling any outstanding frame.
    pub fn shutdown(&mut self, scheduler: &mut dyn HostScheduler) {
        self.rendering = false;
        self.host_paused = true;
        self.cancel(scheduler);
    }

    fn request(&mut self, scheduler: &mut dyn HostScheduler) {
        if self.pending_frame.is_none() {
            self.pending_frame = Some(scheduler.request_frame());
        }
    }

    fn cancel(&mut self, scheduler: &mut dyn HostScheduler) {
        if let Some(request) = self.pending_frame.take() {
            scheduler.cancel_frame(request);
        }
    }
}

#[cfg(test)]
mod tests {
    use web_time::Duration;

    use super::*;
    use crate::host::ManualScheduler;

    fn gate(now: Instant) -> (RenderLifecycleGate, ManualScheduler) {
        let options = LifecycleOptions::default();
        (RenderLifecycleGate::new(&options, now), ManualScheduler::new(now))
    }

    #[test]
    fn rendering_requires_both_inputs_for_every_sequence() {
        let now = Instant::now();
        // Every sequence of 6 edge events over the two inputs.
        for mask in 0u32..(1 << 12) {
            let (mut gate, mut sched) = gate(now);
            for step in 0..6 {
                let bits = (mask >> (step * 2)) & 0b11;
                let value = bits & 0b10 != 0;
                let _ = if bits & 0b01 == 0 {
                    gate.set_in_viewport(value, now, &mut sched)
                } else {
                    gate.set_page_visible(value, now, &mut sched)
                };
                assert_eq!(
                    gate.is_rendering(),
                    gate.is_in_viewport() && gate.is_page_visible(),
                    "mask {mask:#b} step {step}"
                );
                assert!(sched.pending_frames().len() <= 1);
            }
        }
    }

    #[test]
    fn viewport_entry_is_reported_as_cause() {
        let now = Instant::now();
        let (mut gate, mut sched) = gate(now);
        assert_eq!(
            gate.set_in_viewport(true, now, &mut sched),
            GateTransition::Started(GateCause::Viewport)
        );
        assert_eq!(
            gate.set_page_visible(false, now, &mut sched),
            GateTransition::Stopped(GateCause::Visibility)
        );
        assert_eq!(
            gate.set_page_visible(true, now, &mut sched),
            GateTransition::Started(GateCause::Visibility)
        );
    }

    #[test]
    fn entry_while_hidden_still_counts_as_viewport_entry() {
        let now = Instant::now();
        let (mut gate, mut sched) = gate(now);
        let _ = gate.set_page_visible(false, now, &mut sched);
        assert_eq!(
            gate.set_in_viewport(true, now, &mut sched),
            GateTransition::Unchanged
        );
        assert_eq!(
            gate.set_page_visible(true, now, &mut sched),
            GateTransition::Started(GateCause::Viewport)
        );
    }

    #[test]
    fn stale_frame_does_not_reschedule() {
        let now = Instant::now();
        let (mut gate, mut sched) = gate(now);
        let _ = gate.set_in_viewport(true, now, &mut sched);
        let first = sched.take_frame().unwrap();
        // Hide and show again within the same tick: a fresh request replaces
        // the first one.
        let _ = gate.set_page_visible(false, now, &mut sched);
        let _ = gate.set_page_visible(true, now, &mut sched);
        assert_eq!(gate.begin_frame(first, now), FrameDecision::Stale);
        assert_eq!(sched.pending_frames().len(), 1);
    }

    #[test]
    fn resume_rearms_delta_baseline() {
        let now = Instant::now();
        let (mut gate, mut sched) = gate(now);
        let _ = gate.set_in_viewport(true, now, &mut sched);
        let _ = gate.set_page_visible(false, now, &mut sched);
        let later = now + Duration::from_secs(60);
        let _ = gate.set_page_visible(true, later, &mut sched);
        let frame = sched.take_frame().unwrap();
        let decision =
            gate.begin_frame(frame, later + Duration::from_millis(16));
        match decision {
            FrameDecision::Run { delta } => assert!(delta < 0.02),
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn delta_is_clamped() {
        let now = Instant::now();
        let (mut gate, mut sched) = gate(now);
        let _ = gate.set_in_viewport(true, now, &mut sched);
        let frame = sched.take_frame().unwrap();
        let decision = gate.begin_frame(frame, now + Duration::from_secs(2));
        assert_eq!(decision, FrameDecision::Run { delta: 0.1 });
    }

    #[test]
    fn host_pause_blocks_rendering() {
        let now = Instant::now();
        let (mut gate, mut sched) = gate(now);
        let _ = gate.set_in_viewport(true, now, &mut sched);
        assert_eq!(
            gate.set_host_paused(true, now, &mut sched),
            GateTransition::Stopped(GateCause::Host)
        );
        assert!(sched.pending_frames().is_empty());
        assert_eq!(
            gate.set_host_paused(false, now, &mut sched),
            GateTransition::Started(GateCause::Host)
        );
    }
}
