//! End-to-end checks against real ffmpeg binaries.
//!
//! Every test no-ops when ffmpeg/ffprobe are absent so the suite stays
//! green on hosts without the tools installed.

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use shellac_core::{AudioEngine, EncodeFormat, RestoreFilters, ToneSource};
use shellac_ffmpeg::{FfmpegConfig, FfmpegEngine};

fn engine() -> Option<FfmpegEngine> {
    match FfmpegEngine::discover(FfmpegConfig::default()) {
        Ok(engine) => Some(engine),
        Err(_) => {
            eprintln!("skipping: ffmpeg/ffprobe not installed");
            None
        }
    }
}

/// Renders `seconds` of a 440 Hz mono sine to a wav file.
fn sine_fixture(dir: &Path, name: &str, seconds: f64) -> PathBuf {
    let path = dir.join(name);
    let spec = format!("sine=frequency=440:sample_rate=44100:duration={seconds}");
    let rendered = Command::new("ffmpeg")
        .args(["-y", "-f", "lavfi", "-i", &spec])
        .args(["-af", "volume=0.5", "-c:a", "pcm_s16le"])
        .arg(&path)
        .output()
        .expect("spawn ffmpeg");
    assert!(
        rendered.status.success(),
        "fixture render failed: {}",
        String::from_utf8_lossy(&rendered.stderr)
    );
    path
}

#[test]
fn probes_and_measures_a_rendered_tone() {
    let Some(engine) = engine() else { return };
    let dir = TempDir::new().unwrap();
    let tone = sine_fixture(dir.path(), "tone.wav", 3.0);

    let info = engine.probe(&tone).unwrap();
    assert!((info.duration_seconds - 3.0).abs() < 0.2);
    assert_eq!(info.sample_rate, 44100);
    assert_eq!(info.channels, 1);
    assert!(info.format.contains("wav"));

    let metrics = engine.analyze(&tone).unwrap();
    assert!(metrics.is_measurable());
    assert!(metrics.rms_db < metrics.peak_db);
    assert!(metrics.peak_db <= 0.1);
}

#[test]
fn trim_cut_and_gain_reshape_the_signal() {
    let Some(engine) = engine() else { return };
    let dir = TempDir::new().unwrap();
    let tone = sine_fixture(dir.path(), "tone.wav", 5.0);
    let before = engine.analyze(&tone).unwrap();

    let trimmed = dir.path().join("trimmed.wav");
    engine.trim(&tone, 1.0, 1.0, &trimmed).unwrap();
    let info = engine.probe(&trimmed).unwrap();
    assert!((info.duration_seconds - 3.0).abs() < 0.2);

    let cut = dir.path().join("cut.wav");
    engine.cut(&tone, 0.5, 2.0, &cut).unwrap();
    let info = engine.probe(&cut).unwrap();
    assert!((info.duration_seconds - 2.0).abs() < 0.2);

    let quieter = dir.path().join("quieter.wav");
    engine.apply_gain(&tone, -6.0, -3.0, &quieter).unwrap();
    let after = engine.analyze(&quieter).unwrap();
    assert!((after.rms_db - (before.rms_db - 6.0)).abs() < 1.0);

    // Trimming away more than the file holds is refused.
    let overcut = dir.path().join("overcut.wav");
    assert!(engine.trim(&tone, 3.0, 3.0, &overcut).is_err());
}

#[test]
fn padding_is_heard_by_the_silence_scanner() {
    let Some(engine) = engine() else { return };
    let dir = TempDir::new().unwrap();
    let tone = sine_fixture(dir.path(), "tone.wav", 4.0);

    let padded = dir.path().join("padded.wav");
    let source = ToneSource::Synthesize { level_db: -70.0 };
    engine.insert_padding(&tone, 2.0, 2.0, &source, &padded).unwrap();
    let info = engine.probe(&padded).unwrap();
    assert!((info.duration_seconds - 8.0).abs() < 0.3);

    // The pads read as silence at -50 dB and as tone at the -60 floor.
    let scan = engine.scan_silence(&padded, -50.0, -60.0).unwrap();
    assert!(!scan.all_silent);
    assert!((scan.head.seconds - 2.0).abs() < 0.5, "head {}", scan.head.seconds);
    assert!((scan.tail.seconds - 2.0).abs() < 0.5, "tail {}", scan.tail.seconds);
    assert!(scan.head.tone_seconds > 1.0);
    assert!(scan.tail.tone_seconds > 1.0);

    let delivered = dir.path().join("delivered.mp3");
    engine
        .encode(&padded, &EncodeFormat::default(), None, &delivered)
        .unwrap();
    let info = engine.probe(&delivered).unwrap();
    assert!(info.format.contains("mp3"));
    assert_eq!(info.sample_rate, 44100);
    assert_eq!(info.channels, 1);
    assert!((info.duration_seconds - 8.0).abs() < 0.5);
}

#[test]
fn restoration_and_excerpt_round_out_the_surface() {
    let Some(engine) = engine() else { return };
    let dir = TempDir::new().unwrap();
    let first = sine_fixture(dir.path(), "first.wav", 2.5);
    let second = sine_fixture(dir.path(), "second.wav", 2.5);

    let restored = dir.path().join("restored.wav");
    engine
        .restore(&first, &RestoreFilters::default(), &restored)
        .unwrap();
    let info = engine.probe(&restored).unwrap();
    assert!((info.duration_seconds - 2.5).abs() < 0.3);

    // Two 2.5 s inputs against a 3 s cap yield a 3 s excerpt.
    let sample = dir.path().join("sample.mp3");
    engine
        .excerpt(&[&first, &second], 3.0, &EncodeFormat::default(), &sample)
        .unwrap();
    let info = engine.probe(&sample).unwrap();
    assert!(info.format.contains("mp3"));
    assert!((info.duration_seconds - 3.0).abs() < 0.3);
}
