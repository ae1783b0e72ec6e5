/// Processing plans: pure values describing what will be done to an asset.
///
/// Plans are computed from measurements before any audio is touched and
/// carry enough context to be validated and executed without re-measuring.
use serde::{Deserialize, Serialize};

use crate::error::{MasterError, Result};
use crate::metrics::QuietWindow;
use crate::targets::MasteringTargets;
use crate::{ROOM_TONE_MAX_SECONDS, ROOM_TONE_MIN_SECONDS};

/// Tolerance for float drift in plan arithmetic, in seconds.
const PLAN_EPSILON: f64 = 1e-6;

/// Seconds to drop from each edge of an asset.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrimPlan {
    /// Seconds removed from the head
    pub head_seconds: f64,
    /// Seconds removed from the tail
    pub tail_seconds: f64,
}

impl TrimPlan {
    /// A plan that removes nothing
    pub fn none() -> Self {
        Self::default()
    }

    /// Create a new trim plan
    pub fn new(head_seconds: f64, tail_seconds: f64) -> Self {
        Self {
            head_seconds,
            tail_seconds,
        }
    }

    /// Whether the plan removes nothing
    pub fn is_noop(&self) -> bool {
        self.head_seconds <= PLAN_EPSILON && self.tail_seconds <= PLAN_EPSILON
    }

    /// Duration left once the plan is applied to `duration_seconds`
    pub fn remaining(&self, duration_seconds: f64) -> f64 {
        duration_seconds - self.head_seconds - self.tail_seconds
    }

    /// Offsets must be non-negative and must leave a positive remainder
    pub fn validate(&self, duration_seconds: f64) -> Result<()> {
        if self.head_seconds < 0.0 || self.tail_seconds < 0.0 {
            return Err(MasterError::internal(format!(
                "trim offsets must be non-negative: head {} s, tail {} s",
                self.head_seconds, self.tail_seconds
            )));
        }
        if self.remaining(duration_seconds) <= PLAN_EPSILON {
            return Err(MasterError::internal(format!(
                "trim of {} s + {} s leaves nothing of a {} s asset",
                self.head_seconds, self.tail_seconds, duration_seconds
            )));
        }
        Ok(())
    }
}

/// Gain decision for one asset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GainPlan {
    /// Gain to apply in dB, may be negative
    pub gain_db: f64,
    /// Limiter ceiling in dBFS, always set regardless of gain
    pub limiter_db: f64,
    /// True when the plan relies on the limiter to hold the ceiling
    pub expects_limiting: bool,
}

impl GainPlan {
    /// A no-op gain with the limiter still armed at `limiter_db`
    pub fn unity(limiter_db: f64) -> Self {
        Self {
            gain_db: 0.0,
            limiter_db,
            expects_limiting: false,
        }
    }
}

/// Where padding audio comes from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ToneSource {
    /// Cut from a quiet window inside the asset itself
    Extract(QuietWindow),
    /// Synthesized low-level noise bed at the given RMS level
    Synthesize {
        /// Bed level in dBFS
        level_db: f64,
    },
}

impl ToneSource {
    /// Expected RMS level of the sourced tone in dBFS
    pub fn level_db(&self) -> f64 {
        match self {
            ToneSource::Extract(window) => window.rms_db,
            ToneSource::Synthesize { level_db } => *level_db,
        }
    }
}

/// Padding decision for one asset (or one split part).
///
/// `None` on an edge means that edge already carries qualifying tone and
/// nothing is inserted there.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoomTonePlan {
    /// Tone to insert at the head, if any
    pub head_seconds: Option<f64>,
    /// Tone to insert at the tail, if any
    pub tail_seconds: Option<f64>,
    /// Where the tone audio comes from
    pub source: ToneSource,
}

impl RoomTonePlan {
    /// Total seconds the plan adds to the asset
    pub fn added_seconds(&self) -> f64 {
        self.head_seconds.unwrap_or(0.0) + self.tail_seconds.unwrap_or(0.0)
    }

    /// Whether the plan inserts nothing
    pub fn is_noop(&self) -> bool {
        self.head_seconds.is_none() && self.tail_seconds.is_none()
    }

    /// Inserted durations must sit inside the legal window
    pub fn validate(&self) -> Result<()> {
        for (edge, seconds) in [("head", self.head_seconds), ("tail", self.tail_seconds)] {
            if let Some(seconds) = seconds {
                if !(ROOM_TONE_MIN_SECONDS..=ROOM_TONE_MAX_SECONDS).contains(&seconds) {
                    return Err(MasterError::internal(format!(
                        "{edge} room tone {} s outside [{ROOM_TONE_MIN_SECONDS}, \
                         {ROOM_TONE_MAX_SECONDS}] s",
                        seconds
                    )));
                }
            }
        }
        Ok(())
    }
}

/// One split part on the processed timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartDescriptor {
    /// 1-based part index in timeline order
    pub index: u32,
    /// Start offset on the processed timeline, in seconds
    pub start_seconds: f64,
    /// End offset on the processed timeline, in seconds
    pub end_seconds: f64,
    /// Seconds shared with the preceding part (zero for part 1)
    pub overlap_seconds: f64,
}

impl PartDescriptor {
    /// Part length including the shared overlap
    pub fn duration(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }

    /// Part length minus the overlap shared with the preceding part
    pub fn unique_span(&self) -> f64 {
        self.duration() - self.overlap_seconds
    }
}

/// Everything decided for one asset before any audio is touched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingPlan {
    /// Edge silence to drop
    pub trim: TrimPlan,
    /// Gain and limiter decision
    pub gain: GainPlan,
    /// Padding decision for the outer edges
    pub room_tone: RoomTonePlan,
    /// Split parts on the processed timeline; empty when no split is needed
    pub parts: Vec<PartDescriptor>,
    /// Predicted duration after trim and padding, in seconds
    pub processed_seconds: f64,
}

impl ProcessingPlan {
    /// Number of files this plan will produce
    pub fn output_count(&self) -> usize {
        self.parts.len().max(1)
    }

    /// Whether the asset splits into parts
    pub fn is_split(&self) -> bool {
        !self.parts.is_empty()
    }

    /// Cross-check the plan against the asset duration and the targets.
    ///
    /// A failure here is a planner bug, not an operator error.
    pub fn validate(&self, source_seconds: f64, targets: &MasteringTargets) -> Result<()> {
        self.trim.validate(source_seconds)?;
        self.room_tone.validate()?;

        let expected =
            self.trim.remaining(source_seconds) + self.room_tone.added_seconds();
        if (expected - self.processed_seconds).abs() > PLAN_EPSILON {
            return Err(MasterError::internal(format!(
                "processed duration {} s does not match trim+padding arithmetic {} s",
                self.processed_seconds, expected
            )));
        }

        if self.parts.is_empty() {
            return Ok(());
        }

        let mut covered = 0.0;
        for (i, part) in self.parts.iter().enumerate() {
            if part.index as usize != i + 1 {
                return Err(MasterError::internal(format!(
                    "part indices must be dense from 1, found {} at position {}",
                    part.index, i
                )));
            }
            if part.unique_span() > targets.max_part_seconds + PLAN_EPSILON {
                return Err(MasterError::internal(format!(
                    "part {} unique span {} s exceeds the {} s limit",
                    part.index,
                    part.unique_span(),
                    targets.max_part_seconds
                )));
            }
            if i == 0 {
                if part.start_seconds.abs() > PLAN_EPSILON || part.overlap_seconds != 0.0 {
                    return Err(MasterError::internal(
                        "part 1 must start at zero with no inherited overlap".to_string(),
                    ));
                }
            } else {
                let prev = &self.parts[i - 1];
                let expected_start = prev.end_seconds - part.overlap_seconds;
                if (part.start_seconds - expected_start).abs() > PLAN_EPSILON {
                    return Err(MasterError::internal(format!(
                        "part {} starts at {} s, expected {} s for a {} s overlap",
                        part.index, part.start_seconds, expected_start, part.overlap_seconds
                    )));
                }
            }
            covered += part.unique_span();
        }

        // Union of parts minus overlaps must reconstruct the timeline exactly.
        if (covered - self.processed_seconds).abs() > 1e-3 {
            return Err(MasterError::internal(format!(
                "parts cover {} s of a {} s timeline",
                covered, self.processed_seconds
            )));
        }

        let last = &self.parts[self.parts.len() - 1];
        if (last.end_seconds - self.processed_seconds).abs() > PLAN_EPSILON {
            return Err(MasterError::internal(format!(
                "last part ends at {} s, timeline is {} s",
                last.end_seconds, self.processed_seconds
            )));
        }

        Ok(())
    }
}
