//! Animation stages and the elapsed-time → stage mapping.
//!
//! The stage is never stored as independent state anywhere in the crate:
//! every tick re-derives it from the manager's single elapsed value.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::options::StageDurations;

/// Discrete phase of the shared animation cycle.
///
/// Ordered: `Idle → Stage1 → Stage2 → Stage3 → Stage4 → Completed →
/// Returning → Stage1 …`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum AnimationStage {
    /// Resting state before the run starts.
    #[default]
    Idle,
    /// First growth stage.
    Stage1,
    /// Second growth stage.
    Stage2,
    /// Third growth stage.
    Stage3,
    /// Fourth growth stage; terminal hold when looping is disabled.
    Stage4,
    /// Brief hold after stage 4.
    Completed,
    /// Transition back to the initial radius/scale before the next loop.
    Returning,
}

impl AnimationStage {
    /// Every stage in cycle order.
    pub const ALL: [Self; 7] = [
        Self::Idle,
        Self::Stage1,
        Self::Stage2,
        Self::Stage3,
        Self::Stage4,
        Self::Completed,
        Self::Returning,
    ];

    /// Lower-case name, matching the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Stage1 => "stage1",
            Self::Stage2 => "stage2",
            Self::Stage3 => "stage3",
            Self::Stage4 => "stage4",
            Self::Completed => "completed",
            Self::Returning => "returning",
        }
    }

    /// Whether this edge restarts the cycle (`returning → stage1`).
    pub fn is_loop_edge(from: Self, to: Self) -> bool {
        from == Self::Returning && to == Self::Stage1
    }
}

impl fmt::Display for AnimationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps elapsed seconds since the global start to an [`AnimationStage`].
#[derive(Debug, Clone, PartialEq)]
pub struct StageClock {
    durations: StageDurations,
}

impl StageClock {
    /// Clock over the given per-stage durations.
    pub fn new(durations: StageDurations) -> Self {
        Self { durations }
    }

    /// Durations this clock partitions time with.
    pub fn durations(&self) -> &StageDurations {
        &self.durations
    }

    /// Stage for `elapsed` seconds, or `Idle` when the run has not started
    /// (`None`).
    pub fn stage_at(&self, elapsed: Option<f64>) -> AnimationStage {
        elapsed.map_or(AnimationStage::Idle, |e| {
            stage_for_elapsed(e, &self.durations)
        })
    }
}

/// Pure stage lookup for a started run.
///
/// Intervals are half-open, so an exact boundary belongs to the later
/// stage. With `auto_loop` off, anything past the four growth stages locks
/// at `Stage4`; `Completed` and `Returning` are unreachable in that mode.
///
/// Boundaries are compared in whole nanoseconds so that summed decimal
/// durations (`0.1 + 0.2`) land exactly where elapsed time does.
pub fn stage_for_elapsed(elapsed: f64, d: &StageDurations) -> AnimationStage {
    let elapsed = to_nanos(elapsed);
    let lengths = [
        (to_nanos(d.stage1), AnimationStage::Stage1),
        (to_nanos(d.stage2), AnimationStage::Stage2),
        (to_nanos(d.stage3), AnimationStage::Stage3),
        (to_nanos(d.stage4), AnimationStage::Stage4),
        (to_nanos(d.return_delay), AnimationStage::Completed),
    ];
    let cycle: u64 = lengths[..4].iter().map(|(len, _)| len).sum();
    if !d.auto_loop && elapsed >= cycle {
        return AnimationStage::Stage4;
    }

    let total = cycle + to_nanos(d.return_delay) + to_nanos(d.return_duration);
    let t = if d.auto_loop && total > 0 {
        elapsed % total
    } else {
        elapsed
    };

    let mut end = 0;
    for (len, stage) in lengths {
        end += len;
        if t < end {
            return stage;
        }
    }
    AnimationStage::Returning
}

/// Seconds to whole nanoseconds, the resolution of `Instant` differences.
fn to_nanos(secs: f64) -> u64 {
    (secs.max(0.0) * 1e9).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn durations(auto_loop: bool) -> StageDurations {
        StageDurations {
            stage1: 1.0,
            stage2: 1.0,
            stage3: 1.0,
            stage4: 1.0,
            return_delay: 0.0,
            return_duration: 1.0,
            auto_loop,
        }
    }

    #[test]
    fn not_started_is_idle() {
        let clock = StageClock::new(durations(true));
        assert_eq!(clock.stage_at(None), AnimationStage::Idle);
    }

    #[test]
    fn boundary_belongs_to_later_stage() {
        let d = StageDurations {
            stage1: 3.0,
            ..StageDurations::default()
        };
        assert_eq!(stage_for_elapsed(2.999, &d), AnimationStage::Stage1);
        assert_eq!(stage_for_elapsed(3.0, &d), AnimationStage::Stage2);
    }

    #[test]
    fn scenario_unit_durations() {
        let d = durations(true);
        let expected = [
            AnimationStage::Stage1,
            AnimationStage::Stage2,
            AnimationStage::Stage3,
            AnimationStage::Stage4,
            // zero-width completed window
            AnimationStage::Returning,
            AnimationStage::Stage1,
        ];
        for (t, want) in expected.iter().enumerate() {
            assert_eq!(stage_for_elapsed(t as f64, &d), *want, "t = {t}");
        }
    }

    #[test]
    fn completed_window_with_return_delay() {
        let d = StageDurations {
            return_delay: 0.5,
            ..durations(true)
        };
        assert_eq!(stage_for_elapsed(4.0, &d), AnimationStage::Completed);
        assert_eq!(stage_for_elapsed(4.49, &d), AnimationStage::Completed);
        assert_eq!(stage_for_elapsed(4.5, &d), AnimationStage::Returning);
    }

    #[test]
    fn decimal_boundaries_belong_to_later_stage() {
        let d = StageDurations {
            stage1: 0.1,
            stage2: 0.2,
            stage3: 0.3,
            ..StageDurations::default()
        };
        assert_eq!(stage_for_elapsed(0.099, &d), AnimationStage::Stage1);
        assert_eq!(stage_for_elapsed(0.1, &d), AnimationStage::Stage2);
        assert_eq!(stage_for_elapsed(0.3, &d), AnimationStage::Stage3);
        assert_eq!(stage_for_elapsed(0.6, &d), AnimationStage::Stage4);
    }

    #[test]
    fn instant_derived_elapsed_hits_boundaries() {
        use web_time::{Duration, Instant};

        let d = StageDurations {
            stage1: 0.1,
            stage2: 0.2,
            ..StageDurations::default()
        };
        let t0 = Instant::now();
        let at = |ms| {
            (t0 + Duration::from_millis(ms))
                .saturating_duration_since(t0)
                .as_secs_f64()
        };
        assert_eq!(stage_for_elapsed(at(99), &d), AnimationStage::Stage1);
        assert_eq!(stage_for_elapsed(at(100), &d), AnimationStage::Stage2);
        assert_eq!(stage_for_elapsed(at(299), &d), AnimationStage::Stage2);
        assert_eq!(stage_for_elapsed(at(300), &d), AnimationStage::Stage3);
    }

    #[test]
    fn looping_is_periodic() {
        let d = StageDurations::default();
        let total = d.total_length();
        for i in 0..200 {
            let e = f64::from(i) * 0.37 + 0.011;
            assert_eq!(
                stage_for_elapsed(e, &d),
                stage_for_elapsed(e + total, &d),
                "elapsed {e}"
            );
        }
    }

    #[test]
    fn non_looping_locks_at_stage4() {
        let d = durations(false);
        for e in [4.0, 4.2, 5.0, 9.9, 1000.0] {
            assert_eq!(stage_for_elapsed(e, &d), AnimationStage::Stage4);
        }
        assert_eq!(stage_for_elapsed(3.5, &d), AnimationStage::Stage4);
        assert_eq!(stage_for_elapsed(0.5, &d), AnimationStage::Stage1);
    }

    #[test]
    fn serialized_names_match_display() {
        for stage in AnimationStage::ALL {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{stage}\""));
        }
    }
}
