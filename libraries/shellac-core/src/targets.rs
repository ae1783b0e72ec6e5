/// The numeric contract every output must meet
use serde::{Deserialize, Serialize};

use crate::error::{MasterError, Result};
use crate::{
    DEFAULT_MAX_EDGE_SILENCE_SECONDS, DEFAULT_MAX_PART_SECONDS, DEFAULT_OVERLAP_SECONDS,
    DEFAULT_ROOM_TONE_SECONDS, DEFAULT_SAMPLE_CAP_SECONDS, DEFAULT_SILENCE_THRESHOLD_DB,
    NOISE_FLOOR_CEILING_DB, PEAK_CEILING_DB, RMS_CEILING_DB, RMS_FLOOR_DB,
    ROOM_TONE_MAX_SECONDS, ROOM_TONE_MIN_SECONDS, SYNTH_TONE_DB,
};

/// Compliance targets and decision thresholds for one run.
///
/// The defaults are the retail audiobook submission numbers; everything is
/// adjustable but validated against the hard [1,5] second room-tone window
/// and basic ordering rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasteringTargets {
    /// Lower edge of the legal RMS band in dBFS
    pub rms_floor_db: f64,
    /// Upper edge of the legal RMS band in dBFS
    pub rms_ceiling_db: f64,
    /// Peak ceiling in dBFS; the limiter is always pinned here
    pub peak_ceiling_db: f64,
    /// Maximum RMS over room-tone windows in dBFS
    pub noise_floor_ceiling_db: f64,
    /// Level treated as silence when scanning edges, in dBFS
    pub silence_threshold_db: f64,
    /// Edge silence allowed to remain after trimming, in seconds
    pub max_edge_silence_seconds: f64,
    /// Room tone to ensure at head and tail, in seconds
    pub room_tone_seconds: f64,
    /// Per-part duration limit in seconds
    pub max_part_seconds: f64,
    /// Overlap shared by adjacent split parts, in seconds
    pub overlap_seconds: f64,
    /// Retail-sample duration cap in seconds
    pub sample_cap_seconds: f64,
    /// RMS level of the synthesized room-tone bed in dBFS
    pub synth_tone_db: f64,
}

impl Default for MasteringTargets {
    fn default() -> Self {
        Self {
            rms_floor_db: RMS_FLOOR_DB,
            rms_ceiling_db: RMS_CEILING_DB,
            peak_ceiling_db: PEAK_CEILING_DB,
            noise_floor_ceiling_db: NOISE_FLOOR_CEILING_DB,
            silence_threshold_db: DEFAULT_SILENCE_THRESHOLD_DB,
            max_edge_silence_seconds: DEFAULT_MAX_EDGE_SILENCE_SECONDS,
            room_tone_seconds: DEFAULT_ROOM_TONE_SECONDS,
            max_part_seconds: DEFAULT_MAX_PART_SECONDS,
            overlap_seconds: DEFAULT_OVERLAP_SECONDS,
            sample_cap_seconds: DEFAULT_SAMPLE_CAP_SECONDS,
            synth_tone_db: SYNTH_TONE_DB,
        }
    }
}

impl MasteringTargets {
    /// Midpoint of the RMS band, the first-choice gain target
    pub fn rms_mid_db(&self) -> f64 {
        (self.rms_floor_db + self.rms_ceiling_db) / 2.0
    }

    /// Whether `rms_db` sits inside the legal band (inclusive)
    pub fn rms_band_contains(&self, rms_db: f64) -> bool {
        rms_db >= self.rms_floor_db && rms_db <= self.rms_ceiling_db
    }

    /// Check internal consistency before a run starts
    pub fn validate(&self) -> Result<()> {
        if self.rms_floor_db >= self.rms_ceiling_db {
            return Err(MasterError::config(format!(
                "RMS band is empty: floor {} dB >= ceiling {} dB",
                self.rms_floor_db, self.rms_ceiling_db
            )));
        }
        if self.peak_ceiling_db <= self.rms_ceiling_db {
            return Err(MasterError::config(format!(
                "peak ceiling {} dB must sit above the RMS band ceiling {} dB",
                self.peak_ceiling_db, self.rms_ceiling_db
            )));
        }
        if !(ROOM_TONE_MIN_SECONDS..=ROOM_TONE_MAX_SECONDS).contains(&self.room_tone_seconds) {
            return Err(MasterError::config(format!(
                "room tone must be between {ROOM_TONE_MIN_SECONDS} and {ROOM_TONE_MAX_SECONDS} \
                 seconds, got {}",
                self.room_tone_seconds
            )));
        }
        if self.max_edge_silence_seconds < 0.0 {
            return Err(MasterError::config(
                "max edge silence must not be negative".to_string(),
            ));
        }
        if self.silence_threshold_db <= self.noise_floor_ceiling_db {
            return Err(MasterError::config(format!(
                "silence threshold {} dB must sit above the noise-floor ceiling {} dB",
                self.silence_threshold_db, self.noise_floor_ceiling_db
            )));
        }
        if self.synth_tone_db > self.noise_floor_ceiling_db {
            return Err(MasterError::config(format!(
                "synthesized tone level {} dB must not exceed the noise-floor ceiling {} dB",
                self.synth_tone_db, self.noise_floor_ceiling_db
            )));
        }
        if self.overlap_seconds < 0.0 || self.overlap_seconds >= self.max_part_seconds {
            return Err(MasterError::config(format!(
                "overlap {} s must be non-negative and shorter than the part limit {} s",
                self.overlap_seconds, self.max_part_seconds
            )));
        }
        if self.max_part_seconds <= 0.0 {
            return Err(MasterError::config(
                "part duration limit must be positive".to_string(),
            ));
        }
        if self.sample_cap_seconds <= 0.0 {
            return Err(MasterError::config(
                "sample cap must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
