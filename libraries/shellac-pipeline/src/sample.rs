//! Retail sample source selection.
//!
//! The sample is a capped cut of already-delivered audio, so it inherits
//! compliance from the outputs it is built from and never looks at raw
//! input again.

use std::path::Path;

use shellac_core::Role;

use crate::orchestrator::FinishedOutput;

/// Stem of the sample file; it carries no ordinal prefix.
pub const RETAIL_SAMPLE_STEM: &str = "Retail_Sample";

/// Pick the delivered files the sample is cut from.
///
/// `outputs` must already be in sequence order. The sample starts at the
/// head of the Opening output and continues into the first Body output;
/// with no Opening it starts at the first Body instead. Split assets
/// contribute their first part only. Returns `None` when the run
/// delivered neither an Opening nor a Body, in which case no sample can
/// be made.
pub fn select_sample_sources(outputs: &[FinishedOutput]) -> Option<Vec<&Path>> {
    let lead_part = |o: &&FinishedOutput| matches!(o.part, None | Some(1));

    let opening = outputs
        .iter()
        .filter(|o| o.role == Role::Opening)
        .find(lead_part);
    let body = outputs
        .iter()
        .filter(|o| o.role.is_body())
        .find(lead_part);

    let segments: Vec<&Path> = [opening, body]
        .into_iter()
        .flatten()
        .map(|o| o.path.as_path())
        .collect();
    if segments.is_empty() {
        None
    } else {
        Some(segments)
    }
}
