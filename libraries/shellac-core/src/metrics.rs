/// Level measurements and silence structure
use serde::{Deserialize, Serialize};

/// Level measurements for an asset or intermediate.
///
/// Produced by the engine's analyze operation. Recomputed after any
/// transformation that can change levels; in particular, re-measurement
/// after gain application is mandatory, never assumed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Overall RMS level in dBFS
    pub rms_db: f64,
    /// Peak sample level in dBFS
    pub peak_db: f64,
    /// RMS level of the quietest portions in dBFS
    pub noise_floor_db: f64,
    /// Duration in seconds
    pub duration_seconds: f64,
}

impl Metrics {
    /// Create a new measurement
    pub fn new(rms_db: f64, peak_db: f64, noise_floor_db: f64, duration_seconds: f64) -> Self {
        Self {
            rms_db,
            peak_db,
            noise_floor_db,
            duration_seconds,
        }
    }

    /// Gain available before the peak reaches `ceiling_db`
    pub fn headroom_db(&self, ceiling_db: f64) -> f64 {
        ceiling_db - self.peak_db
    }

    /// Whether applying `gain_db` cleanly would push the peak past `ceiling_db`
    pub fn will_clip_at_gain(&self, gain_db: f64, ceiling_db: f64) -> bool {
        self.peak_db + gain_db > ceiling_db
    }

    /// Predicted measurement after a clean (unlimited) gain change
    pub fn shifted(&self, gain_db: f64) -> Self {
        Self {
            rms_db: self.rms_db + gain_db,
            peak_db: self.peak_db + gain_db,
            noise_floor_db: self.noise_floor_db + gain_db,
            duration_seconds: self.duration_seconds,
        }
    }

    /// Whether the level fields are real measurements.
    ///
    /// Digital silence measures as negative infinity; planners must not
    /// arithmetic on it.
    pub fn is_measurable(&self) -> bool {
        self.rms_db.is_finite() && self.peak_db.is_finite()
    }
}

/// One quiet region inside an asset, on that asset's own timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuietWindow {
    /// Offset of the window start in seconds
    pub start_seconds: f64,
    /// Window length in seconds
    pub duration_seconds: f64,
    /// Measured RMS level over the window in dBFS
    pub rms_db: f64,
}

impl QuietWindow {
    /// Create a new window
    pub fn new(start_seconds: f64, duration_seconds: f64, rms_db: f64) -> Self {
        Self {
            start_seconds,
            duration_seconds,
            rms_db,
        }
    }

    /// The same window shifted earlier by `seconds` (after a head trim)
    pub fn shifted_back(&self, seconds: f64) -> Self {
        Self {
            start_seconds: (self.start_seconds - seconds).max(0.0),
            ..*self
        }
    }
}

/// Quiet runs anchored at one edge of an asset.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EdgeRun {
    /// Run length at the silence threshold, in seconds
    pub seconds: f64,
    /// Run length at the noise-floor ceiling, in seconds.
    ///
    /// Always ≤ `seconds`; this is the stretch quiet enough to already
    /// count as room tone.
    pub tone_seconds: f64,
}

impl EdgeRun {
    /// Create a new edge run
    pub fn new(seconds: f64, tone_seconds: f64) -> Self {
        Self {
            seconds,
            tone_seconds,
        }
    }
}

/// Silence structure of an asset, as probed by the engine.
///
/// Edge runs are anchored at the head/tail; `quiet_window` is the longest
/// run at the noise-floor ceiling that does not overlap either edge run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SilenceScan {
    /// Quiet runs at the head
    pub head: EdgeRun,
    /// Quiet runs at the tail
    pub tail: EdgeRun,
    /// Longest interior window usable as a room-tone source
    pub quiet_window: Option<QuietWindow>,
    /// True when nothing above the silence threshold exists anywhere
    pub all_silent: bool,
}

impl SilenceScan {
    /// A scan reporting signal everywhere (no quiet runs at all)
    pub fn none() -> Self {
        Self {
            head: EdgeRun::default(),
            tail: EdgeRun::default(),
            quiet_window: None,
            all_silent: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headroom_and_clip_prediction() {
        let m = Metrics::new(-30.0, -6.0, -70.0, 600.0);
        assert_eq!(m.headroom_db(-3.0), 3.0);
        assert!(!m.will_clip_at_gain(3.0, -3.0));
        assert!(m.will_clip_at_gain(3.5, -3.0));
    }

    #[test]
    fn shifted_moves_all_levels_but_not_duration() {
        let m = Metrics::new(-30.0, -6.0, -70.0, 600.0);
        let up = m.shifted(9.5);
        assert_eq!(up.rms_db, -20.5);
        assert_eq!(up.peak_db, 3.5);
        assert_eq!(up.noise_floor_db, -60.5);
        assert_eq!(up.duration_seconds, 600.0);
    }

    #[test]
    fn silence_is_not_measurable() {
        let m = Metrics::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY, 10.0);
        assert!(!m.is_measurable());
        assert!(Metrics::new(-20.0, -4.0, -65.0, 10.0).is_measurable());
    }

    #[test]
    fn quiet_window_shift_clamps_at_zero() {
        let w = QuietWindow::new(4.0, 3.0, -66.0);
        assert_eq!(w.shifted_back(1.5).start_seconds, 2.5);
        assert_eq!(w.shifted_back(10.0).start_seconds, 0.0);
        assert_eq!(w.shifted_back(1.5).rms_db, -66.0);
    }
}
