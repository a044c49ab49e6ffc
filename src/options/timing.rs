use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::OrbitError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Timing", inline)]
#[serde(default)]
/// Per-stage durations (seconds) and loop behavior for the global clock.
pub struct StageDurations {
    /// Length of stage 1 in seconds.
    #[schemars(title = "Stage 1", range(min = 0.1, max = 30.0))]
    pub stage1: f64,
    /// Length of stage 2 in seconds.
    #[schemars(title = "Stage 2", range(min = 0.1, max = 30.0))]
    pub stage2: f64,
    /// Length of stage 3 in seconds.
    #[schemars(title = "Stage 3", range(min = 0.1, max = 30.0))]
    pub stage3: f64,
    /// Length of stage 4 in seconds.
    #[schemars(title = "Stage 4", range(min = 0.1, max = 30.0))]
    pub stage4: f64,
    /// Hold after stage 4 before `returning` begins. Zero collapses the
    /// `completed` window.
    #[schemars(title = "Return Delay", range(min = 0.0, max = 30.0))]
    pub return_delay: f64,
    /// Length of the `returning` stage.
    #[schemars(title = "Return Duration", range(min = 0.1, max = 30.0))]
    pub return_duration: f64,
    /// Repeat the cycle; otherwise lock at stage 4.
    #[schemars(title = "Auto Loop")]
    pub auto_loop: bool,
}

impl Default for StageDurations {
    fn default() -> Self {
        Self {
            stage1: 3.0,
            stage2: 3.0,
            stage3: 3.0,
            stage4: 3.0,
            return_delay: 1.0,
            return_duration: 2.0,
            auto_loop: true,
        }
    }
}

impl StageDurations {
    /// Sum of the four growth stages.
    pub fn cycle_length(&self) -> f64 {
        self.stage1 + self.stage2 + self.stage3 + self.stage4
    }

    /// Full loop length including the return delay and return stage.
    pub fn total_length(&self) -> f64 {
        self.cycle_length() + self.return_delay + self.return_duration
    }

    pub(crate) fn validate(&self) -> Result<(), OrbitError> {
        for (field, value) in [
            ("timing.stage1", self.stage1),
            ("timing.stage2", self.stage2),
            ("timing.stage3", self.stage3),
            ("timing.stage4", self.stage4),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(OrbitError::invalid(field, "must be > 0"));
            }
        }
        if !(self.return_delay.is_finite() && self.return_delay >= 0.0) {
            return Err(OrbitError::invalid("timing.return_delay", "must be >= 0"));
        }
        if self.auto_loop
            && !(self.return_duration.is_finite() && self.return_duration > 0.0)
        {
            return Err(OrbitError::invalid(
                "timing.return_duration",
                "must be > 0 when auto_loop is set",
            ));
        }
        Ok(())
    }
}
