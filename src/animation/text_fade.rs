//! Stage-gated text label fading.
//!
//! Each label walks `stable-visible → fading-out → stable-hidden →
//! fading-in → stable-visible`. Fade-out is triggered when the clock sits on
//! the label's hide stage, fade-in when the clock re-enters `stage1` after a
//! fade. While fading out, the label collapses linearly from its last stable
//! position toward the ring origin, keyed to `1 - opacity` so both finish
//! together.

use glam::Vec3;
use rustc_hash::FxHashMap;

use super::smoothing::smooth_vec3;
use super::AnimationStage;

/// Values closer than this to 0 or 1 snap, so accumulated frame deltas
/// that sum to the fade duration always finish the fade.
const FADE_EPSILON: f32 = 1e-4;

/// Visible phase of a fade channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadePhase {
    /// Fully shown and tracking its ring position.
    StableVisible,
    /// Shrinking toward the ring origin.
    FadingOut,
    /// Fully hidden until the next loop.
    StableHidden,
    /// Growing back in at its original position.
    FadingIn,
}

/// Fade transition started during a [`FadeState::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeEvent {
    /// Nothing started this step.
    None,
    /// Fade-out began.
    FadeOutStarted,
    /// Fade-in began; the label snaps back to its original position.
    FadeInStarted,
}

/// Opacity/scale state machine for one fade channel.
///
/// `is_fading_in` and `is_fading_out` are never both true. `has_faded` is
/// set throughout fading-out and stable-hidden and cleared when fading in
/// starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeState {
    /// Current opacity in `[0, 1]`.
    pub opacity: f32,
    /// Current scale in `[0, 1]`.
    pub scale: f32,
    /// Growing back in.
    pub is_fading_in: bool,
    /// Shrinking out.
    pub is_fading_out: bool,
    /// Faded this cycle; blocks re-fading until the next `stage1` entry.
    pub has_faded: bool,
    fade_in_duration: Option<f32>,
    last_stage: Option<AnimationStage>,
}

impl Default for FadeState {
    fn default() -> Self {
        Self::visible()
    }
}

impl FadeState {
    /// Fully shown, not fading.
    pub const fn visible() -> Self {
        Self {
            opacity: 1.0,
            scale: 1.0,
            is_fading_in: false,
            is_fading_out: false,
            has_faded: false,
            fade_in_duration: None,
            last_stage: None,
        }
    }

    /// Current phase derived from the flags.
    pub fn phase(&self) -> FadePhase {
        if self.is_fading_out {
            FadePhase::FadingOut
        } else if self.is_fading_in {
            FadePhase::FadingIn
        } else if self.has_faded {
            FadePhase::StableHidden
        } else {
            FadePhase::StableVisible
        }
    }

    /// Collapse progress while fading out.
    pub fn collapse_progress(&self) -> f32 {
        (1.0 - self.opacity).clamp(0.0, 1.0)
    }

    /// Back to fully visible, forgetting the last observed stage.
    pub fn reset(&mut self) {
        *self = Self::visible();
    }

    /// Start fading in from zero over `duration` seconds, regardless of the
    /// stage gating.
    pub fn force_fade_in(&mut self, duration: f32) {
        self.opacity = 0.0;
        self.scale = 0.0;
        self.begin_fade_in(Some(duration));
    }

    /// Hide without fading and without marking the channel as faded.
    pub fn hold_hidden(&mut self) {
        self.opacity = 0.0;
        self.scale = 0.0;
        self.is_fading_in = false;
        self.is_fading_out = false;
        self.has_faded = false;
    }

    fn begin_fade_in(&mut self, duration: Option<f32>) {
        self.is_fading_out = false;
        self.is_fading_in = true;
        self.has_faded = false;
        self.fade_in_duration = duration;
    }

    /// Evaluate stage triggers and advance any active fade by `dt`.
    pub fn step(
        &mut self,
        stage: AnimationStage,
        hide_stage: AnimationStage,
        dt: f32,
        timing: FadeTiming,
    ) -> FadeEvent {
        let entered_stage1 = stage == AnimationStage::Stage1
            && self.last_stage != Some(AnimationStage::Stage1);
        self.last_stage = Some(stage);

        let mut event = FadeEvent::None;
        if stage == hide_stage && !self.has_faded {
            self.is_fading_in = false;
            self.is_fading_out = true;
            self.has_faded = true;
            event = FadeEvent::FadeOutStarted;
        } else if entered_stage1 && self.has_faded {
            self.begin_fade_in(None);
            event = FadeEvent::FadeInStarted;
        }

        self.advance(dt, timing);
        event
    }

    /// Progress an active fade without evaluating stage triggers.
    pub fn advance(&mut self, dt: f32, timing: FadeTiming) {
        if self.is_fading_out {
            let step = dt / timing.fade_out;
            self.opacity = snap_low(self.opacity - step);
            self.scale = snap_low(self.scale - step);
            if self.opacity <= 0.0 && self.scale <= 0.0 {
                self.is_fading_out = false;
            }
        } else if self.is_fading_in {
            let duration = self.fade_in_duration.unwrap_or(timing.fade_in);
            let step = dt / duration;
            self.opacity = snap_high(self.opacity + step);
            self.scale = snap_high(self.scale + step);
            if self.opacity >= 1.0 && self.scale >= 1.0 {
                self.is_fading_in = false;
                self.fade_in_duration = None;
            }
        }
    }
}

fn snap_low(v: f32) -> f32 {
    if v <= FADE_EPSILON {
        0.0
    } else {
        v
    }
}

fn snap_high(v: f32) -> f32 {
    if v >= 1.0 - FADE_EPSILON {
        1.0
    } else {
        v
    }
}

/// Fade durations in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeTiming {
    /// Seconds to fade in.
    pub fade_in: f32,
    /// Seconds to fade out.
    pub fade_out: f32,
}

/// Which fade channel drives a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeSource {
    /// The label's own per-index rule.
    Own,
    /// The ring-wide legacy hide stage.
    Shared,
    /// No rule; shown unless a forced hide/fade-in is running.
    Unfaded,
}

/// Per-label state owned by a ring.
#[derive(Debug, Clone, PartialEq)]
pub struct TextItemState {
    /// Label index within its ring.
    pub index: usize,
    /// Label text.
    pub text: String,
    /// Displayed position.
    pub position: Vec3,
    /// Last stable position before any fade.
    pub original_position: Vec3,
    /// Freshly computed ring position for this frame.
    pub target_position: Vec3,
    /// Exponentially smoothed position.
    pub smoothed_position: Vec3,
    /// The label's own fade channel (unused while the shared channel drives
    /// it).
    pub fade: FadeState,
    source: FadeSource,
}

impl TextItemState {
    /// Which channel drives this label.
    pub fn source(&self) -> FadeSource {
        self.source
    }

    fn place(&mut self, p: Vec3) {
        self.position = p;
        self.smoothed_position = p;
    }
}

/// Channel in effect for `item`; unruled labels use their own channel,
/// which only ever moves when forced.
fn channel(item: &TextItemState, shared: &FadeState) -> FadeState {
    match item.source {
        FadeSource::Own | FadeSource::Unfaded => item.fade,
        FadeSource::Shared => *shared,
    }
}

/// Read-only per-frame view of a label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextView {
    /// Displayed position.
    pub position: Vec3,
    /// Effective opacity.
    pub opacity: f32,
    /// Effective scale.
    pub scale: f32,
}

/// Fade sequencing for every label of one ring.
///
/// Per-index rules and the legacy ring-wide hide stage are stepped
/// independently every tick; a label with its own rule ignores the shared
/// channel.
#[derive(Debug, Clone)]
pub struct TextFadeSequencer {
    items: Vec<TextItemState>,
    hide_by_index: FxHashMap<usize, AnimationStage>,
    shared_hide_stage: Option<AnimationStage>,
    shared: FadeState,
    timing: FadeTiming,
}

impl TextFadeSequencer {
    /// Sequencer over `texts`, all starting visible at `origin`.
    pub fn new(
        texts: &[String],
        hide_by_index: FxHashMap<usize, AnimationStage>,
        shared_hide_stage: Option<AnimationStage>,
        timing: FadeTiming,
        origin: Vec3,
    ) -> Self {
        let items = texts
            .iter()
            .enumerate()
            .map(|(index, text)| {
                let source = if hide_by_index.contains_key(&index) {
                    FadeSource::Own
                } else if shared_hide_stage.is_some() {
                    FadeSource::Shared
                } else {
                    FadeSource::Unfaded
                };
                TextItemState {
                    index,
                    text: text.clone(),
                    position: origin,
                    original_position: origin,
                    target_position: origin,
                    smoothed_position: origin,
                    fade: FadeState::visible(),
                    source,
                }
            })
            .collect();
        Self {
            items,
            hide_by_index,
            shared_hide_stage,
            shared: FadeState::visible(),
            timing,
        }
    }

    /// All labels.
    pub fn items(&self) -> &[TextItemState] {
        &self.items
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the ring has no labels.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The legacy ring-wide channel.
    pub fn shared_fade(&self) -> &FadeState {
        &self.shared
    }

    /// Fade channel in effect for label `idx`.
    pub fn effective_fade(&self, idx: usize) -> FadeState {
        self.items
            .get(idx)
            .map_or_else(FadeState::visible, |item| self.fade_of(item))
    }

    fn fade_of(&self, item: &TextItemState) -> FadeState {
        channel(item, &self.shared)
    }

    /// Per-frame view of label `idx`.
    pub fn view(&self, idx: usize) -> Option<TextView> {
        let item = self.items.get(idx)?;
        let fade = self.fade_of(item);
        Some(TextView {
            position: item.position,
            opacity: fade.opacity,
            scale: fade.scale,
        })
    }

    /// Step every fade channel for `stage` and apply collapse/snap
    /// positioning. `origin` is the point labels collapse toward.
    pub fn step(&mut self, stage: AnimationStage, dt: f32, origin: Vec3) {
        let timing = self.timing;
        let shared_event = match self.shared_hide_stage {
            Some(hide) => self.shared.step(stage, hide, dt, timing),
            None => FadeEvent::None,
        };
        let shared = self.shared;

        for item in &mut self.items {
            let (fade, event) = match item.source {
                FadeSource::Own => {
                    let hide = self
                        .hide_by_index
                        .get(&item.index)
                        .copied()
                        .unwrap_or(AnimationStage::Idle);
                    let event = item.fade.step(stage, hide, dt, timing);
                    (item.fade, event)
                }
                FadeSource::Shared => (shared, shared_event),
                FadeSource::Unfaded => {
                    item.fade.advance(dt, timing);
                    continue;
                }
            };

            if event == FadeEvent::FadeInStarted {
                item.place(item.original_position);
            } else if fade.is_fading_out || fade.phase() == FadePhase::StableHidden
            {
                let p = item
                    .original_position
                    .lerp(origin, fade.collapse_progress());
                item.place(p);
            }
        }
    }

    /// Record this frame's ring positions and smooth every stable-visible
    /// label toward its target.
    pub fn track_targets<F>(&mut self, target_for: F, dt: f32, rate: f32)
    where
        F: Fn(usize) -> Vec3,
    {
        let shared = self.shared;
        for item in &mut self.items {
            item.target_position = target_for(item.index);
            let fade = channel(item, &shared);
            if fade.phase() == FadePhase::StableVisible {
                item.smoothed_position = smooth_vec3(
                    item.smoothed_position,
                    item.target_position,
                    dt,
                    rate,
                );
                item.position = item.smoothed_position;
                item.original_position = item.position;
            }
        }
    }

    /// Jump every label to its target without interpolation. Labels that
    /// are collapsed stay collapsed but will re-enter at the fresh target.
    pub fn resync<F>(&mut self, target_for: F)
    where
        F: Fn(usize) -> Vec3,
    {
        let shared = self.shared;
        for item in &mut self.items {
            let target = target_for(item.index);
            item.target_position = target;
            item.original_position = target;
            let fade = channel(item, &shared);
            if !fade.has_faded {
                item.place(target);
            }
        }
    }

    /// Force every channel into fading-in from zero over `duration`.
    pub fn fade_in_all(&mut self, duration: f32) {
        self.shared.force_fade_in(duration);
        for item in &mut self.items {
            item.fade.force_fade_in(duration);
            item.place(item.original_position);
        }
    }

    /// Hide every label without marking it faded, pending a forced fade-in.
    pub fn hold_all_hidden(&mut self) {
        self.shared.hold_hidden();
        for item in &mut self.items {
            item.fade.hold_hidden();
        }
    }

    /// Every label back to fully visible at its original position.
    pub fn reset(&mut self) {
        self.shared.reset();
        for item in &mut self.items {
            item.fade.reset();
            item.place(item.original_position);
        }
    }

    /// Advance fades that are already running without evaluating stage
    /// triggers.
    pub fn advance_only(&mut self, dt: f32) {
        let timing = self.timing;
        self.shared.advance(dt, timing);
        for item in &mut self.items {
            item.fade.advance(dt, timing);
        }
    }
}
