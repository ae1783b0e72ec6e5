//! Gain planning against the RMS band and peak ceiling.
//!
//! The band is the contract, not the midpoint: when peak headroom will
//! not carry the RMS all the way to the midpoint, any landing inside the
//! band is accepted. The limiter is armed at the ceiling on every plan,
//! as a net against transients introduced by later stages.

use std::path::Path;

use shellac_core::{GainPlan, MasterError, MasteringTargets, Metrics, Result};

/// Slack allowed when verifying re-measured levels, in dB.
///
/// Gain is exact scaling, but limiting and padding shift overall RMS
/// slightly between the plan and the re-measurement.
const VERIFY_TOLERANCE_DB: f64 = 0.5;

/// Compute the single gain adjustment for an asset.
///
/// Decision ladder:
/// 1. a source already peaking above the ceiling is flagged for operator
///    attention, never quietly limited into shape;
/// 2. gain to the band midpoint, when headroom allows it cleanly;
/// 3. otherwise all available headroom, when that still lands inside the
///    band;
/// 4. otherwise gain to the band top, letting the limiter hold the
///    ceiling.
pub fn plan_gain(metrics: &Metrics, targets: &MasteringTargets, source: &Path) -> Result<GainPlan> {
    if !metrics.is_measurable() {
        return Err(MasterError::degenerate(
            source,
            "levels are not measurable (digital silence)",
        ));
    }

    let ceiling = targets.peak_ceiling_db;

    if metrics.peak_db > ceiling {
        return Err(MasterError::peak_violation(
            source,
            format!(
                "source peak {:.1} dB already exceeds the {:.1} dB ceiling at zero gain",
                metrics.peak_db, ceiling
            ),
        ));
    }

    let to_midpoint = targets.rms_mid_db() - metrics.rms_db;
    if !metrics.will_clip_at_gain(to_midpoint, ceiling) {
        return Ok(GainPlan {
            gain_db: to_midpoint,
            limiter_db: ceiling,
            expects_limiting: false,
        });
    }

    let headroom = metrics.headroom_db(ceiling);
    if targets.rms_band_contains(metrics.rms_db + headroom) {
        tracing::debug!(
            file = %source.display(),
            gain_db = headroom,
            "headroom stops short of the band midpoint"
        );
        return Ok(GainPlan {
            gain_db: headroom,
            limiter_db: ceiling,
            expects_limiting: false,
        });
    }

    let to_band_top = targets.rms_ceiling_db - metrics.rms_db;
    tracing::warn!(
        file = %source.display(),
        gain_db = to_band_top,
        peak_db = metrics.peak_db,
        "gain rides the limiter to reach the band"
    );
    Ok(GainPlan {
        gain_db: to_band_top,
        limiter_db: ceiling,
        expects_limiting: true,
    })
}

/// Check re-measured levels against the contract.
///
/// Called on the mandatory post-gain measurement; a miss here means the
/// asset cannot be delivered and is reported like a clipped source.
pub fn verify_levels(after: &Metrics, targets: &MasteringTargets, source: &Path) -> Result<()> {
    if after.peak_db > targets.peak_ceiling_db + VERIFY_TOLERANCE_DB {
        return Err(MasterError::peak_violation(
            source,
            format!(
                "post-gain peak {:.1} dB exceeds the {:.1} dB ceiling",
                after.peak_db, targets.peak_ceiling_db
            ),
        ));
    }

    let low = targets.rms_floor_db - VERIFY_TOLERANCE_DB;
    let high = targets.rms_ceiling_db + VERIFY_TOLERANCE_DB;
    if after.rms_db < low || after.rms_db > high {
        return Err(MasterError::peak_violation(
            source,
            format!(
                "post-gain RMS {:.1} dB sits outside the [{:.1}, {:.1}] dB band",
                after.rms_db, targets.rms_floor_db, targets.rms_ceiling_db
            ),
        ));
    }

    Ok(())
}
