//! Output naming: sanitized stems and ordinal prefixes.
//!
//! Delivered names use letters, digits and underscores only, carry a
//! zero-padded ordinal prefix in role order, and append a part suffix
//! for split outputs. Every output of a run, parts included, takes its
//! own consecutive ordinal so the emitted set sorts into playback order.

use std::collections::HashSet;

use shellac_core::{MasterError, Result, Role};

/// Stem used when sanitization leaves nothing behind.
const FALLBACK_STEM: &str = "Section";

/// Reduce a raw file stem to the delivery charset.
///
/// Every character outside `[A-Za-z0-9]` becomes an underscore, runs of
/// underscores collapse to one, and edge underscores are dropped.
pub fn sanitize_stem(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_was_gap = true;
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_was_gap = false;
        } else if !last_was_gap {
            out.push('_');
            last_was_gap = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    if out.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        out
    }
}

/// Final stem for an asset given its role.
///
/// Credits roles carry fixed stems; body sections keep their sanitized
/// source stem.
pub fn role_stem(role: Role, source_stem: &str) -> String {
    match role {
        Role::Opening => "Opening_Credits".to_string(),
        Role::Closing => "Closing_Credits".to_string(),
        Role::Body(_) => sanitize_stem(source_stem),
    }
}

/// Fail when two outputs would share a stem.
///
/// Ordinal prefixes would keep the full names distinct, but colliding
/// stems mean two different sources sanitize to the same label and the
/// operator has to rename rather than trust the ordering.
pub fn ensure_distinct_stems<'a>(stems: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for stem in stems {
        if !seen.insert(stem) {
            return Err(MasterError::naming_conflict(format!(
                "two inputs both produce the stem \"{stem}\""
            )));
        }
    }
    Ok(())
}

/// Hands out the ordinal prefixes for a run.
///
/// Owned by the orchestrator and consulted in one ordering pass after all
/// plans exist, so the prefix width can account for every output the run
/// will emit.
#[derive(Debug)]
pub struct Sequencer {
    next: u32,
    width: usize,
}

impl Sequencer {
    /// Create a sequencer sized for `total_outputs` files.
    ///
    /// Prefixes are at least two digits wide and grow when a run emits
    /// one hundred or more files.
    pub fn new(total_outputs: usize) -> Self {
        let width = total_outputs.to_string().len().max(2);
        Self { next: 1, width }
    }

    /// Take the next ordinal prefix, zero padded.
    pub fn assign(&mut self) -> String {
        let prefix = format!("{:0width$}", self.next, width = self.width);
        self.next += 1;
        prefix
    }
}

/// Assemble a delivered file name from its pieces.
pub fn output_file_name(prefix: &str, stem: &str, part: Option<u32>, extension: &str) -> String {
    match part {
        Some(part) => format!("{prefix}_{stem}_Part{part}.{extension}"),
        None => format!("{prefix}_{stem}.{extension}"),
    }
}
