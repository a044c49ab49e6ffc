use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::animation::AnimationStage;
use crate::error::OrbitError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(inline)]
#[serde(default)]
/// One target value per stage. `idle` and `returning` share `initial`;
/// `completed` uses `final_value`.
pub struct StageTargets {
    /// Target while idle and while returning.
    pub initial: f32,
    /// Target during stage 1.
    pub stage1: f32,
    /// Target during stage 2.
    pub stage2: f32,
    /// Target during stage 3.
    pub stage3: f32,
    /// Target during stage 4.
    pub stage4: f32,
    /// Target while completed.
    #[serde(rename = "final")]
    pub final_value: f32,
}

impl Default for StageTargets {
    fn default() -> Self {
        Self::uniform(1.0)
    }
}

impl StageTargets {
    /// Same target for every stage.
    pub const fn uniform(value: f32) -> Self {
        Self {
            initial: value,
            stage1: value,
            stage2: value,
            stage3: value,
            stage4: value,
            final_value: value,
        }
    }

    /// Target for `stage`.
    pub fn for_stage(&self, stage: AnimationStage) -> f32 {
        match stage {
            AnimationStage::Idle | AnimationStage::Returning => self.initial,
            AnimationStage::Stage1 => self.stage1,
            AnimationStage::Stage2 => self.stage2,
            AnimationStage::Stage3 => self.stage3,
            AnimationStage::Stage4 => self.stage4,
            AnimationStage::Completed => self.final_value,
        }
    }

    /// Every target multiplied by `factor`.
    #[must_use]
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            initial: self.initial * factor,
            stage1: self.stage1 * factor,
            stage2: self.stage2 * factor,
            stage3: self.stage3 * factor,
            stage4: self.stage4 * factor,
            final_value: self.final_value * factor,
        }
    }

    pub(crate) fn validate(&self, field: &str) -> Result<(), OrbitError> {
        let values = [
            self.initial,
            self.stage1,
            self.stage2,
            self.stage3,
            self.stage4,
            self.final_value,
        ];
        if values.iter().all(|v| v.is_finite() && *v >= 0.0) {
            Ok(())
        } else {
            Err(OrbitError::invalid(field, "targets must be finite and >= 0"))
        }
    }
}
