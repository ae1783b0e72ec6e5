//! Room-tone padding decisions.
//!
//! Every delivered file must open and close on a stretch of low-level
//! ambience rather than a hard cut. Padding is inserted, never overlaid,
//! so the plan lengthens the asset by whatever it adds.

use shellac_core::{MasteringTargets, RoomTonePlan, SilenceScan, ToneSource, TrimPlan};

/// Decide head/tail padding for one asset.
///
/// The scan must have been taken with its floor threshold at the level
/// that counts as tone in the finished output (the noise-floor ceiling
/// minus any planned gain); edge tone lengths and the interior window are
/// consumed here without re-checking levels.
///
/// Edge rule: after the trim, an edge keeping at least the configured
/// tone duration of qualifying quiet needs nothing; any other edge gets a
/// full configured-duration insert. Source rule: the interior quiet
/// window is used when it is long enough to cut the tone from, otherwise
/// a synthesized bed is used.
pub fn plan_room_tone(
    scan: &SilenceScan,
    trim: &TrimPlan,
    targets: &MasteringTargets,
) -> RoomTonePlan {
    let needed = targets.room_tone_seconds;

    let head_kept = (scan.head.tone_seconds - trim.head_seconds).max(0.0);
    let tail_kept = (scan.tail.tone_seconds - trim.tail_seconds).max(0.0);

    let head_seconds = (head_kept < needed).then_some(needed);
    let tail_seconds = (tail_kept < needed).then_some(needed);

    let source = match scan.quiet_window {
        Some(window) if window.duration_seconds >= needed => {
            // Window coordinates move with the head trim.
            ToneSource::Extract(window.shifted_back(trim.head_seconds))
        }
        _ => ToneSource::Synthesize {
            level_db: targets.synth_tone_db,
        },
    };

    let plan = RoomTonePlan {
        head_seconds,
        tail_seconds,
        source,
    };
    if !plan.is_noop() {
        tracing::debug!(
            head = ?plan.head_seconds,
            tail = ?plan.tail_seconds,
            synthesized = matches!(plan.source, ToneSource::Synthesize { .. }),
            "room tone will be inserted"
        );
    }
    plan
}

/// Padding for one part of a split asset.
///
/// A cut boundary lands mid-program, so the freshly exposed edges always
/// need a full insert; the outermost edges already carry the asset-level
/// padding. Parts are padded from a synthesized bed so no window
/// bookkeeping has to survive the cut.
pub fn part_boundary_plan(
    is_first: bool,
    is_last: bool,
    targets: &MasteringTargets,
) -> RoomTonePlan {
    RoomTonePlan {
        head_seconds: (!is_first).then_some(targets.room_tone_seconds),
        tail_seconds: (!is_last).then_some(targets.room_tone_seconds),
        source: ToneSource::Synthesize {
            level_db: targets.synth_tone_db,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shellac_core::{EdgeRun, QuietWindow};

    fn targets() -> MasteringTargets {
        MasteringTargets::default()
    }

    fn scan(head_tone: f64, tail_tone: f64, window: Option<QuietWindow>) -> SilenceScan {
        SilenceScan {
            head: EdgeRun::new(head_tone + 1.0, head_tone),
            tail: EdgeRun::new(tail_tone + 1.0, tail_tone),
            quiet_window: window,
            all_silent: false,
        }
    }

    #[test]
    fn bare_edges_get_full_inserts() {
        let plan = plan_room_tone(&scan(0.0, 0.0, None), &TrimPlan::none(), &targets());
        assert_eq!(plan.head_seconds, Some(2.0));
        assert_eq!(plan.tail_seconds, Some(2.0));
        assert!(matches!(
            plan.source,
            ToneSource::Synthesize { level_db } if level_db == -70.0
        ));
    }

    #[test]
    fn qualifying_edges_are_left_alone() {
        let plan = plan_room_tone(&scan(3.0, 2.0, None), &TrimPlan::none(), &targets());
        assert!(plan.is_noop());
    }

    #[test]
    fn trim_that_eats_the_tone_forces_an_insert() {
        // 4 s of head tone minus a 3 s trim keeps only 1 s, under the
        // 2 s target; the tail keeps its full 2.5 s.
        let plan = plan_room_tone(&scan(4.0, 2.5, None), &TrimPlan::new(3.0, 0.0), &targets());
        assert_eq!(plan.head_seconds, Some(2.0));
        assert_eq!(plan.tail_seconds, None);
    }

    #[test]
    fn long_window_is_used_as_the_source() {
        let window = QuietWindow::new(40.0, 3.5, -66.0);
        let plan = plan_room_tone(
            &scan(0.0, 0.0, Some(window)),
            &TrimPlan::new(1.5, 0.0),
            &targets(),
        );
        match plan.source {
            ToneSource::Extract(w) => {
                assert_eq!(w.start_seconds, 38.5);
                assert_eq!(w.duration_seconds, 3.5);
            }
            ToneSource::Synthesize { .. } => panic!("expected extraction"),
        }
    }

    #[test]
    fn short_window_falls_back_to_synthesis() {
        let window = QuietWindow::new(40.0, 1.2, -68.0);
        let plan = plan_room_tone(&scan(0.0, 0.0, Some(window)), &TrimPlan::none(), &targets());
        assert!(matches!(plan.source, ToneSource::Synthesize { .. }));
    }

    #[test]
    fn part_boundaries_pad_only_the_cut_edges() {
        let t = targets();
        let first = part_boundary_plan(true, false, &t);
        assert_eq!(first.head_seconds, None);
        assert_eq!(first.tail_seconds, Some(2.0));

        let middle = part_boundary_plan(false, false, &t);
        assert_eq!(middle.head_seconds, Some(2.0));
        assert_eq!(middle.tail_seconds, Some(2.0));

        let last = part_boundary_plan(false, true, &t);
        assert_eq!(last.head_seconds, Some(2.0));
        assert_eq!(last.tail_seconds, None);

        assert!(part_boundary_plan(true, true, &t).is_noop());
    }
}
