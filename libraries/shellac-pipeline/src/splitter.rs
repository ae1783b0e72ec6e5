//! Partitioning of over-duration assets.
//!
//! Parts tile the processed timeline with a fixed overlap between every
//! adjacent pair, so playback continues across a cut without losing
//! audio. The last part absorbs the remainder and may be much shorter.

use shellac_core::{MasteringTargets, PartDescriptor};

/// Partition a processed timeline into parts.
///
/// Returns an empty vector when the duration fits inside the limit.
/// Otherwise each part's unique (non-overlapping) span stays within the
/// limit and the union of parts minus overlaps reconstructs the timeline
/// exactly; the minimum part count achieving that is used.
pub fn plan_parts(processed_seconds: f64, targets: &MasteringTargets) -> Vec<PartDescriptor> {
    let max = targets.max_part_seconds;
    if processed_seconds <= max {
        return Vec::new();
    }

    let overlap = targets.overlap_seconds;
    // Every part after the first advances the timeline by max − overlap.
    let step = max - overlap;
    let count = ((processed_seconds - overlap) / step).ceil() as u32;

    let mut parts = Vec::with_capacity(count as usize);
    for i in 0..count {
        let start = f64::from(i) * step;
        let end = (start + max).min(processed_seconds);
        parts.push(PartDescriptor {
            index: i + 1,
            start_seconds: start,
            end_seconds: end,
            overlap_seconds: if i == 0 { 0.0 } else { overlap },
        });
    }

    tracing::info!(
        duration_seconds = processed_seconds,
        limit_seconds = max,
        parts = parts.len(),
        "asset exceeds the part limit and will be split"
    );
    parts
}
