//! Read-only probes for [`OrbitSystemManager`].

use super::OrbitSystemManager;
use crate::animation::{
    AnimationStage, LensBlobController, OrbitingRingController,
};
use crate::options::Options;

impl OrbitSystemManager {
    /// Whether frames are currently being produced.
    pub fn is_rendering(&self) -> bool {
        self.gate.is_rendering()
    }

    /// Last known viewport intersection.
    pub fn is_in_viewport(&self) -> bool {
        self.gate.is_in_viewport()
    }

    /// Last known page visibility.
    pub fn is_page_visible(&self) -> bool {
        self.gate.is_page_visible()
    }

    /// Whether [`Self::start`] has run.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Whether [`Self::dispose`] has run.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Stage of the most recent tick (`Idle` before the first one).
    pub fn current_stage(&self) -> AnimationStage {
        self.stage
    }

    /// Seconds since the clock origin as of the most recent tick.
    pub fn elapsed(&self) -> Option<f64> {
        self.elapsed
    }

    /// Smoothed frames per second.
    pub fn fps(&self) -> f32 {
        self.gate.fps()
    }

    /// Frames that ran a full update.
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Ring controllers in configuration order.
    pub fn rings(&self) -> &[OrbitingRingController] {
        &self.rings
    }

    /// Blob controller, if configured.
    pub fn blob(&self) -> Option<&LensBlobController> {
        self.blob.as_ref()
    }

    /// Validated options the manager was built with.
    pub fn options(&self) -> &Options {
        &self.options
    }
}
