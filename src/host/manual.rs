//! Deterministic in-memory scheduler for tests and headless simulation.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use web_time::Instant;

use super::{FrameRequest, HostScheduler, TimerHandle, TimerKind};
use crate::engine::OrbitSystemManager;

/// A timer waiting in a [`ManualScheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTimer {
    /// Handle returned to the manager.
    pub handle: TimerHandle,
    /// Deferred action.
    pub kind: TimerKind,
    /// When the timer becomes due.
    pub due: Instant,
}

#[derive(Debug)]
struct Queue {
    now: Instant,
    next_id: u64,
    frames: Vec<FrameRequest>,
    timers: Vec<ScheduledTimer>,
    frames_requested: u64,
}

/// Scheduler whose frames and timers fire only when pumped.
///
/// Clones share one queue, so a test can keep a handle while the manager
/// owns another.
#[derive(Debug, Clone)]
pub struct ManualScheduler {
    queue: Rc<RefCell<Queue>>,
}

impl ManualScheduler {
    /// Empty scheduler whose clock reads `now`.
    pub fn new(now: Instant) -> Self {
        Self {
            queue: Rc::new(RefCell::new(Queue {
                now,
                next_id: 1,
                frames: Vec::new(),
                timers: Vec::new(),
                frames_requested: 0,
            })),
        }
    }

    /// Move the scheduler clock used to compute timer due times.
    pub fn set_now(&self, now: Instant) {
        self.queue.borrow_mut().now = now;
    }

    /// Outstanding frame requests.
    pub fn pending_frames(&self) -> Vec<FrameRequest> {
        self.queue.borrow().frames.clone()
    }

    /// Outstanding timers, earliest first.
    pub fn pending_timers(&self) -> Vec<ScheduledTimer> {
        let mut timers = self.queue.borrow().timers.clone();
        timers.sort_by_key(|t| t.due);
        timers
    }

    /// Total frames ever requested.
    pub fn frames_requested(&self) -> u64 {
        self.queue.borrow().frames_requested
    }

    /// Remove and return the oldest outstanding frame request.
    pub fn take_frame(&self) -> Option<FrameRequest> {
        let mut q = self.queue.borrow_mut();
        if q.frames.is_empty() {
            None
        } else {
            Some(q.frames.remove(0))
        }
    }

    /// Remove and return every timer due at or before `now`, earliest first.
    pub fn take_due_timers(&self, now: Instant) -> Vec<ScheduledTimer> {
        let mut q = self.queue.borrow_mut();
        let timers = std::mem::take(&mut q.timers);
        let (mut due, rest): (Vec<_>, Vec<_>) =
            timers.into_iter().partition(|t| t.due <= now);
        q.timers = rest;
        due.sort_by_key(|t| t.due);
        due
    }

    /// Deliver everything due at `now` to `manager`: timers first, then the
    /// pending frame. Returns whether a frame was delivered.
    pub fn pump(&self, manager: &mut OrbitSystemManager, now: Instant) -> bool {
        self.set_now(now);
        for timer in self.take_due_timers(now) {
            manager.on_timer(timer.handle, now);
        }
        match self.take_frame() {
            Some(request) => {
                manager.on_frame(request, now);
                true
            }
            None => false,
        }
    }

    /// Pump at a fixed frame interval from `start` for `duration`, returning
    /// the time of the last pump.
    pub fn run_for(
        &self,
        manager: &mut OrbitSystemManager,
        start: Instant,
        duration: Duration,
        frame_interval: Duration,
    ) -> Instant {
        let mut now = start;
        let end = start + duration;
        while now < end {
            now += frame_interval;
            let _ = self.pump(manager, now);
        }
        now
    }
}

impl HostScheduler for ManualScheduler {
    fn request_frame(&mut self) -> FrameRequest {
        let mut q = self.queue.borrow_mut();
        let request = FrameRequest(q.next_id);
        q.next_id += 1;
        q.frames_requested += 1;
        q.frames.push(request);
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        self.queue.borrow_mut().frames.retain(|f| *f != request);
    }

    fn set_timer(&mut self, delay: Duration, kind: TimerKind) -> TimerHandle {
        let mut q = self.queue.borrow_mut();
        let handle = TimerHandle(q.next_id);
        q.next_id += 1;
        let due = q.now + delay;
        q.timers.push(ScheduledTimer { handle, kind, due });
        handle
    }

    fn clear_timer(&mut self, handle: TimerHandle) {
        self.queue.borrow_mut().timers.retain(|t| t.handle != handle);
    }
}
