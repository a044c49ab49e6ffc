//! Stage-driven animation: the shared clock, smoothing primitives, label
//! fades and the per-object controllers that consume them.

pub mod blob;
pub mod ring;
pub mod smoothing;
pub mod stage;
pub mod text_fade;

pub use blob::LensBlobController;
pub use ring::OrbitingRingController;
pub use smoothing::SmoothedParameter;
pub use stage::{stage_for_elapsed, AnimationStage, StageClock};
pub use text_fade::{FadeState, TextFadeSequencer, TextItemState};
