//! Integration tests for the complete mastering workflow
//!
//! Full orchestrator runs against the in-memory engine. Input files
//! exist on disk so discovery is real, while the audio itself stays
//! symbolic and every engine operation is observable.

use std::fs;
use std::path::{Path, PathBuf};

use shellac_core::{MasterError, Role};
use shellac_pipeline::test_utils::{FakeAudio, MemoryEngine};
use shellac_pipeline::{Orchestrator, RunConfig, Stage};
use tempfile::TempDir;

/// Create an empty placeholder file the scanner can discover.
fn touch(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"").unwrap();
    path
}

fn prefix_of(file_name: &str) -> u32 {
    file_name
        .split('_')
        .next()
        .and_then(|p| p.parse().ok())
        .unwrap()
}

#[test]
fn full_book_is_mastered_in_role_order() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let engine = MemoryEngine::new();

    // Discovery is lexicographic: chapters first, then credits, then intro.
    let ch_a = touch(input.path(), "Chapter_A.wav");
    let ch_b = touch(input.path(), "Chapter_B.wav");
    let credits = touch(input.path(), "Credits_Final.wav");
    let intro = touch(input.path(), "Intro_Take3.wav");

    // Quiet opening that needs the limiter, a headroom-bounded chapter,
    // a compliant chapter, and loud credits that need attenuation.
    engine.register(&intro, FakeAudio::speech(45.0, -30.0, -6.0));
    engine.register(&ch_a, FakeAudio::speech(600.0, -26.5, -7.0));
    engine.register(&ch_b, FakeAudio::speech(600.0, -20.5, -6.0));
    engine.register(&credits, FakeAudio::speech(40.0, -15.0, -4.0));

    let config = RunConfig::new(input.path(), output.path());
    let report = Orchestrator::new(&engine, config).run().unwrap();

    assert!(report.is_clean());
    assert_eq!(report.assets_in, 4);
    assert_eq!(report.outputs.len(), 4);

    let names: Vec<&str> = report.outputs.iter().map(|o| o.file_name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "01_Opening_Credits.mp3",
            "02_Chapter_A.mp3",
            "03_Chapter_B.mp3",
            "04_Closing_Credits.mp3",
        ]
    );
    let roles: Vec<Role> = report.outputs.iter().map(|o| o.role).collect();
    assert_eq!(
        roles,
        vec![Role::Opening, Role::Body(1), Role::Body(2), Role::Closing]
    );

    // Prefixes strictly increase with no gaps.
    let prefixes: Vec<u32> = names.iter().map(|n| prefix_of(n)).collect();
    assert_eq!(prefixes, vec![1, 2, 3, 4]);

    // Every output landed in the band under the ceiling, padded by 2 s
    // per edge, encoded mono MP3 with tags from its own source.
    for out in &report.outputs {
        let audio = engine.audio(&out.path).unwrap();
        assert!(audio.encoded, "{} not encoded", out.file_name);
        assert_eq!(audio.channels, 1);
        assert_eq!(audio.sample_rate, 44_100);
        assert!(
            audio.rms_db >= -23.0 && audio.rms_db <= -18.0,
            "{} RMS {} outside band",
            out.file_name,
            audio.rms_db
        );
        assert!(audio.peak_db <= -3.0);
        assert_eq!(audio.tagged_from.as_deref(), Some(out.source.as_path()));
    }

    let opening = engine.audio(&report.outputs[0].path).unwrap();
    assert_eq!(opening.duration_seconds, 49.0);
    assert_eq!(report.outputs[0].source, intro);
    let chapter = engine.audio(&report.outputs[1].path).unwrap();
    assert_eq!(chapter.duration_seconds, 604.0);

    // Retail sample: opening plus first body, capped at five minutes.
    let sample_path = report.retail_sample.as_ref().unwrap();
    assert_eq!(sample_path.file_name().unwrap(), "Retail_Sample.mp3");
    let sample = engine.audio(sample_path).unwrap();
    assert!(sample.encoded);
    assert_eq!(sample.duration_seconds, 300.0);
}

#[test]
fn overlong_asset_splits_with_fresh_boundary_padding() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let engine = MemoryEngine::new();

    // 130 minutes of compliant audio; with 4 s of padding it exceeds the
    // 120 minute limit and splits in two.
    let long = touch(input.path(), "Chapter_Long.wav");
    engine.register(&long, FakeAudio::speech(7800.0, -20.5, -6.0));

    let config = RunConfig::new(input.path(), output.path());
    let report = Orchestrator::new(&engine, config).run().unwrap();

    assert!(report.is_clean());
    let names: Vec<&str> = report.outputs.iter().map(|o| o.file_name.as_str()).collect();
    assert_eq!(
        names,
        vec!["01_Chapter_Long_Part1.mp3", "02_Chapter_Long_Part2.mp3"]
    );
    assert_eq!(report.outputs[0].part, Some(1));
    assert_eq!(report.outputs[1].part, Some(2));

    // Part 1 carries the original head pad plus a fresh tail pad; part 2
    // the mirror image. The shared second straddles the cut.
    let part1 = engine.audio(&report.outputs[0].path).unwrap();
    let part2 = engine.audio(&report.outputs[1].path).unwrap();
    assert_eq!(part1.duration_seconds, 7202.0);
    assert_eq!(part2.duration_seconds, 607.0);

    // A single body asset still yields a sample, from its first part.
    let sample = engine.audio(report.retail_sample.as_ref().unwrap()).unwrap();
    assert_eq!(sample.duration_seconds, 300.0);
}

#[test]
fn degenerate_and_clipped_assets_are_skipped_not_fatal() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let engine = MemoryEngine::new();

    let good = touch(input.path(), "Chapter_1.wav");
    let silent = touch(input.path(), "Chapter_2.wav");
    let hot = touch(input.path(), "Chapter_3.wav");
    engine.register(&good, FakeAudio::speech(600.0, -20.5, -6.0));
    engine.register(&silent, FakeAudio::silent(30.0));
    engine.register(&hot, FakeAudio::speech(60.0, -20.0, -1.0));

    let config = RunConfig::new(input.path(), output.path());
    let report = Orchestrator::new(&engine, config).run().unwrap();

    assert!(!report.is_clean());
    assert_eq!(report.assets_in, 3);
    assert_eq!(report.outputs.len(), 1);
    assert_eq!(report.outputs[0].source, good);
    assert_eq!(report.failures.len(), 2);

    for failure in &report.failures {
        assert_eq!(failure.stage, Stage::Plan);
    }
    assert!(report
        .failures
        .iter()
        .any(|f| matches!(f.error, MasterError::DegenerateAsset { .. })));
    assert!(report
        .failures
        .iter()
        .any(|f| matches!(f.error, MasterError::PeakViolation { .. })));

    // The surviving body still produces a retail sample.
    assert!(report.retail_sample.is_some());
}

#[test]
fn transient_engine_failures_are_retried_once() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let engine = MemoryEngine::new();

    let ch = touch(input.path(), "Chapter_1.wav");
    engine.register(&ch, FakeAudio::speech(300.0, -20.5, -6.0));
    engine.fail_next("analyze", 1);

    let config = RunConfig::new(input.path(), output.path());
    let report = Orchestrator::new(&engine, config).run().unwrap();

    assert!(report.is_clean());
    assert_eq!(report.outputs.len(), 1);
    assert!(engine.calls("analyze") >= 2);
}

#[test]
fn persistent_engine_failures_skip_the_asset() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let engine = MemoryEngine::new();

    let ch1 = touch(input.path(), "Chapter_1.wav");
    let ch2 = touch(input.path(), "Chapter_2.wav");
    engine.register(&ch1, FakeAudio::speech(300.0, -20.5, -6.0));
    engine.register(&ch2, FakeAudio::speech(300.0, -20.5, -6.0));
    // Both the first attempt and the retry fail for the first encode.
    // One worker keeps the failing calls on one asset.
    engine.fail_next("encode", 2);

    let mut config = RunConfig::new(input.path(), output.path());
    config.workers = Some(1);
    let report = Orchestrator::new(&engine, config).run().unwrap();

    assert_eq!(report.outputs.len(), 1);
    assert_eq!(report.outputs[0].source, ch2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].source, ch1);
    assert_eq!(report.failures[0].stage, Stage::Encode);
}

#[test]
fn explicit_designation_overrides_filename_hints() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let engine = MemoryEngine::new();

    let ch = touch(input.path(), "Chapter_1.wav");
    let intro = touch(input.path(), "Intro.wav");
    engine.register(&ch, FakeAudio::speech(300.0, -20.5, -6.0));
    engine.register(&intro, FakeAudio::speech(40.0, -20.5, -6.0));

    let mut config = RunConfig::new(input.path(), output.path());
    config.opening = Some(PathBuf::from("Chapter_1.wav"));
    let report = Orchestrator::new(&engine, config).run().unwrap();

    // The designated file takes Opening; the hinted Intro.wav is demoted
    // to a body section and keeps its own stem.
    assert_eq!(report.outputs[0].source, ch);
    assert_eq!(report.outputs[0].file_name, "01_Opening_Credits.mp3");
    assert_eq!(report.outputs[1].source, intro);
    assert_eq!(report.outputs[1].file_name, "02_Intro.mp3");
}

#[test]
fn colliding_stems_abort_the_run() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let engine = MemoryEngine::new();

    let a = touch(input.path(), "Ch 1.wav");
    let b = touch(input.path(), "Ch_1.wav");
    engine.register(&a, FakeAudio::speech(300.0, -20.5, -6.0));
    engine.register(&b, FakeAudio::speech(300.0, -20.5, -6.0));

    let config = RunConfig::new(input.path(), output.path());
    let err = Orchestrator::new(&engine, config).run().unwrap_err();
    assert!(matches!(err, MasterError::NamingConflict(_)));
    assert!(err.is_run_fatal());
}

#[test]
fn compliant_padded_asset_passes_through_untouched() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let engine = MemoryEngine::new();

    // In-band levels, short quiet edges already at tone level: nothing
    // to trim, no gain, no padding. Re-running the pipeline on its own
    // output changes nothing.
    let ch = touch(input.path(), "Chapter_1.wav");
    engine.register(
        &ch,
        FakeAudio::speech(600.0, -20.5, -6.0)
            .with_edge_runs(3.0, 2.5)
            .with_edge_level(-65.0),
    );

    let mut config = RunConfig::new(input.path(), output.path());
    config.restore = None;
    let report = Orchestrator::new(&engine, config).run().unwrap();

    assert!(report.is_clean());
    let out = engine.audio(&report.outputs[0].path).unwrap();
    assert_eq!(out.duration_seconds, 600.0);
    assert_eq!(out.rms_db, -20.5);

    assert_eq!(engine.calls("restore"), 0);
    assert_eq!(engine.calls("trim"), 0);
    assert_eq!(engine.calls("apply_gain"), 0);
    assert_eq!(engine.calls("insert_padding"), 0);
}

#[test]
fn edge_silence_beyond_the_cap_is_trimmed_to_the_cap() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    let engine = MemoryEngine::new();

    // 12 s of head silence at -65 dB: 7 s go, 5 s stay, and the stay
    // already counts as room tone so only the tail needs padding.
    let ch = touch(input.path(), "Chapter_1.wav");
    engine.register(
        &ch,
        FakeAudio::speech(600.0, -20.5, -6.0)
            .with_edge_runs(12.0, 0.0)
            .with_edge_level(-65.0),
    );

    let mut config = RunConfig::new(input.path(), output.path());
    config.restore = None;
    let report = Orchestrator::new(&engine, config).run().unwrap();

    assert!(report.is_clean());
    let out = engine.audio(&report.outputs[0].path).unwrap();
    // 600 - 7 trimmed + 2 tail pad
    assert_eq!(out.duration_seconds, 595.0);
    assert_eq!(engine.calls("trim"), 1);
    assert_eq!(engine.calls("insert_padding"), 1);
}

#[test]
fn missing_input_directory_is_fatal() {
    let scratch = TempDir::new().unwrap();
    let engine = MemoryEngine::new();

    let config = RunConfig::new(scratch.path().join("nope"), scratch.path().join("out"));
    let err = Orchestrator::new(&engine, config).run().unwrap_err();
    assert!(matches!(err, MasterError::Input(_)));
}

#[test]
fn input_directory_without_audio_is_fatal() {
    let input = TempDir::new().unwrap();
    let output = TempDir::new().unwrap();
    touch(input.path(), "notes.txt");
    let engine = MemoryEngine::new();

    let config = RunConfig::new(input.path(), output.path());
    let err = Orchestrator::new(&engine, config).run().unwrap_err();
    assert!(matches!(err, MasterError::Input(_)));
}
