use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::targets::StageTargets;
use crate::animation::AnimationStage;
use crate::error::OrbitError;

/// Hide one text label (by index) when the clock reaches `stage`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct TextHideRule {
    /// Label index within the ring.
    pub index: usize,
    /// Stage at which the label fades out.
    pub stage: AnimationStage,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Ring", inline)]
#[serde(default)]
/// Configuration for one orbiting ring of spheres and its text labels.
pub struct RingOptions {
    /// Name used in logs and observer callbacks.
    pub label: String,
    /// Number of spheres distributed evenly around the ring.
    #[schemars(title = "Spheres", range(min = 1, max = 256))]
    pub sphere_count: usize,
    /// Ring radius per stage.
    pub radius: StageTargets,
    /// Radius smoothing rate (1/s).
    #[schemars(title = "Radius Rate", range(min = 0.1, max = 30.0))]
    pub radius_rate: f32,
    /// Continuous rotation in radians per second.
    #[schemars(title = "Rotation Speed", range(min = -5.0, max = 5.0))]
    pub rotation_speed: f32,
    /// Rotation applied on reset and at the start of every loop (radians).
    #[schemars(title = "Rotation Offset")]
    pub rotation_offset: f32,
    /// Tilt of the ring plane around the X axis (radians).
    #[schemars(skip)]
    pub tilt: f32,
    /// Ring center in world space.
    #[schemars(skip)]
    pub center: [f32; 3],
    /// Text shown around the ring, one label per entry.
    pub texts: Vec<String>,
    /// Extra distance between the ring and its labels.
    #[schemars(title = "Text Offset", range(min = 0.0, max = 5.0))]
    pub text_offset: f32,
    /// Angular offset of label 0 relative to the ring rotation (radians).
    #[schemars(skip)]
    pub text_angle_offset: f32,
    /// Fraction of the remaining distance a label closes per 60 Hz frame.
    #[schemars(title = "Text Smoothing", range(min = 0.01, max = 0.99))]
    pub text_position_smoothing: f32,
    /// Seconds for a label to fade in.
    #[schemars(title = "Text Fade In", range(min = 0.05, max = 5.0))]
    pub text_fade_in_duration: f32,
    /// Seconds for a label to fade out.
    #[schemars(title = "Text Fade Out", range(min = 0.05, max = 5.0))]
    pub text_fade_out_duration: f32,
    /// Per-label hide stages.
    pub hide_texts: Vec<TextHideRule>,
    /// Legacy ring-wide hide stage for labels without their own rule.
    pub hide_texts_at_stage: Option<AnimationStage>,
}

impl Default for RingOptions {
    fn default() -> Self {
        Self {
            label: "ring".to_owned(),
            sphere_count: 12,
            radius: StageTargets {
                initial: 1.0,
                stage1: 1.4,
                stage2: 1.8,
                stage3: 2.2,
                stage4: 2.6,
                final_value: 2.8,
            },
            radius_rate: 5.0,
            rotation_speed: 0.25,
            rotation_offset: 0.0,
            tilt: 0.0,
            center: [0.0; 3],
            texts: Vec::new(),
            text_offset: 0.35,
            text_angle_offset: 0.0,
            text_position_smoothing: 0.85,
            text_fade_in_duration: 0.5,
            text_fade_out_duration: 0.3,
            hide_texts: Vec::new(),
            hide_texts_at_stage: None,
        }
    }
}

impl RingOptions {
    /// Copy with radii and text offset multiplied by `factor`.
    #[must_use]
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            radius: self.radius.scaled(factor),
            text_offset: self.text_offset * factor,
            center: self.center.map(|c| c * factor),
            ..self.clone()
        }
    }

    /// Text smoothing expressed as a rate in 1/s.
    pub fn text_smoothing_rate(&self) -> f32 {
        crate::animation::smoothing::rate_from_frame_fraction(
            self.text_position_smoothing,
            60.0,
        )
    }

    pub(crate) fn validate(&self, idx: usize) -> Result<(), OrbitError> {
        let field = |name: &str| format!("rings[{idx}].{name}");
        self.radius.validate(&field("radius"))?;
        if self.sphere_count == 0 {
            return Err(OrbitError::invalid(&field("sphere_count"), "must be >= 1"));
        }
        for (name, value) in [
            ("radius_rate", self.radius_rate),
            ("text_fade_in_duration", self.text_fade_in_duration),
            ("text_fade_out_duration", self.text_fade_out_duration),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(OrbitError::invalid(&field(name), "must be > 0"));
            }
        }
        if !(self.text_offset.is_finite() && self.text_offset >= 0.0) {
            return Err(OrbitError::invalid(&field("text_offset"), "must be >= 0"));
        }
        if !(self.text_position_smoothing > 0.0
            && self.text_position_smoothing < 1.0)
        {
            return Err(OrbitError::invalid(
                &field("text_position_smoothing"),
                "must be in (0, 1)",
            ));
        }
        if let Some(rule) =
            self.hide_texts.iter().find(|r| r.index >= self.texts.len())
        {
            return Err(OrbitError::invalid(
                &field("hide_texts"),
                &format!("index {} has no text label", rule.index),
            ));
        }
        // Idle is never observed after the first update, and a stage-1 hide
        // would re-fade right after the loop fade-in.
        let unusable = |stage: AnimationStage| {
            matches!(stage, AnimationStage::Idle | AnimationStage::Stage1)
        };
        if let Some(rule) = self.hide_texts.iter().find(|r| unusable(r.stage)) {
            return Err(OrbitError::invalid(
                &field("hide_texts"),
                &format!("index {} cannot hide at {}", rule.index, rule.stage),
            ));
        }
        if let Some(stage) = self.hide_texts_at_stage.filter(|s| unusable(*s)) {
            return Err(OrbitError::invalid(
                &field("hide_texts_at_stage"),
                &format!("cannot hide at {stage}"),
            ));
        }
        Ok(())
    }
}
