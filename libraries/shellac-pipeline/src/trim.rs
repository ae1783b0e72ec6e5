//! Edge-silence trim planning.
//!
//! Trims the excess, never everything: edge silence is reduced to the
//! configured allowance, and silence already at or under the allowance is
//! left alone so an already-compliant asset passes through untouched.

use std::path::Path;

use shellac_core::{MasterError, MasteringTargets, Result, SilenceScan, TrimPlan};

/// Decide how much edge silence to drop.
///
/// `duration_seconds` is the length of the scanned intermediate. An asset
/// with no signal above the silence threshold has no usable content and
/// is rejected rather than planned away to nothing.
pub fn plan_trim(
    scan: &SilenceScan,
    duration_seconds: f64,
    targets: &MasteringTargets,
    source: &Path,
) -> Result<TrimPlan> {
    if scan.all_silent {
        return Err(MasterError::degenerate(
            source,
            "entire asset is silence at the configured threshold",
        ));
    }

    let allowance = targets.max_edge_silence_seconds;
    let plan = TrimPlan::new(
        (scan.head.seconds - allowance).max(0.0),
        (scan.tail.seconds - allowance).max(0.0),
    );

    if plan.remaining(duration_seconds) <= 0.0 {
        // Edge runs covering the whole file should already have been
        // reported as all-silent by the scan; treat the residue the same.
        return Err(MasterError::degenerate(
            source,
            format!(
                "edge silence of {} s + {} s covers the whole {} s asset",
                scan.head.seconds, scan.tail.seconds, duration_seconds
            ),
        ));
    }

    plan.validate(duration_seconds)?;

    if !plan.is_noop() {
        tracing::debug!(
            file = %source.display(),
            head = plan.head_seconds,
            tail = plan.tail_seconds,
            "trimming excess edge silence"
        );
    }

    Ok(plan)
}
