use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::OrbitError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Lifecycle", inline)]
#[serde(default)]
/// Render-loop gating and deferred-action timing.
pub struct LifecycleOptions {
    /// Delay between the first render start after `start()` and the card
    /// reveal notification, in milliseconds.
    #[schemars(title = "Card Reveal Delay (ms)", range(min = 0, max = 5000))]
    pub card_reveal_delay_ms: u64,
    /// Settle delay between a viewport-entry reset and the text fade-in,
    /// in milliseconds.
    #[schemars(title = "Text Fade Delay (ms)", range(min = 0, max = 5000))]
    pub text_fade_delay_ms: u64,
    /// Duration of the fade-in kicked off after a viewport-entry reset.
    #[schemars(title = "Entry Fade Duration", range(min = 0.05, max = 5.0))]
    pub entry_text_fade_duration: f32,
    /// Largest frame delta handed to controllers, in seconds.
    #[schemars(skip)]
    pub max_frame_delta: f32,
    /// Frame rate cap (0 = unlimited).
    #[schemars(title = "Target FPS", range(min = 0, max = 240))]
    pub target_fps: u32,
    /// Whether the host element starts inside the viewport.
    #[schemars(skip)]
    pub initially_in_viewport: bool,
    /// Whether the page starts visible.
    #[schemars(skip)]
    pub initially_visible: bool,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            card_reveal_delay_ms: 500,
            text_fade_delay_ms: 300,
            entry_text_fade_duration: 0.6,
            max_frame_delta: 0.1,
            target_fps: 0,
            initially_in_viewport: false,
            initially_visible: true,
        }
    }
}

impl LifecycleOptions {
    pub(crate) fn validate(&self) -> Result<(), OrbitError> {
        if !(self.entry_text_fade_duration.is_finite()
            && self.entry_text_fade_duration > 0.0)
        {
            return Err(OrbitError::invalid(
                "lifecycle.entry_text_fade_duration",
                "must be > 0",
            ));
        }
        if !(self.max_frame_delta.is_finite() && self.max_frame_delta > 0.0) {
            return Err(OrbitError::invalid(
                "lifecycle.max_frame_delta",
                "must be > 0",
            ));
        }
        Ok(())
    }
}
