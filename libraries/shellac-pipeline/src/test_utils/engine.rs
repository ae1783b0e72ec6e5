//! Symbolic in-memory audio engine.
//!
//! Audio is modeled as a bundle of numbers (levels, durations, quiet
//! runs) keyed by path. Every engine operation rewrites those numbers
//! the way the real filters change real audio, which is enough for the
//! planners and the orchestrator to be tested end to end.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use shellac_core::{
    AudioEngine, EdgeRun, EncodeFormat, MasterError, Metrics, ProbeInfo, QuietWindow,
    RestoreFilters, Result, SilenceScan, ToneSource,
};

const EPSILON: f64 = 1e-9;

/// Symbolic description of one audio file.
#[derive(Debug, Clone, PartialEq)]
pub struct FakeAudio {
    /// Duration in seconds
    pub duration_seconds: f64,
    /// Overall RMS level in dBFS
    pub rms_db: f64,
    /// Peak level in dBFS
    pub peak_db: f64,
    /// Noise-floor level in dBFS
    pub noise_floor_db: f64,
    /// Quiet run length at the head, in seconds
    pub head_run_seconds: f64,
    /// Quiet run length at the tail, in seconds
    pub tail_run_seconds: f64,
    /// RMS level of the edge quiet runs in dBFS
    pub edge_level_db: f64,
    /// Interior quiet window, if the asset has one
    pub quiet_window: Option<QuietWindow>,
    /// Head padding inserted by `insert_padding`, in seconds
    pub head_pad_seconds: f64,
    /// Tail padding inserted by `insert_padding`, in seconds
    pub tail_pad_seconds: f64,
    /// Level of inserted padding in dBFS
    pub pad_level_db: f64,
    /// True when nothing in the asset rises above silence
    pub all_silent: bool,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Channel count
    pub channels: u16,
    /// Container/codec name
    pub format: String,
    /// Set by `encode`
    pub encoded: bool,
    /// Set by `restore`
    pub restored: bool,
    /// Metadata source recorded by `encode`
    pub tagged_from: Option<PathBuf>,
}

impl FakeAudio {
    /// A spoken-word asset with the given levels and a clean -70 dB floor.
    pub fn speech(duration_seconds: f64, rms_db: f64, peak_db: f64) -> Self {
        Self {
            duration_seconds,
            rms_db,
            peak_db,
            noise_floor_db: -70.0,
            head_run_seconds: 0.0,
            tail_run_seconds: 0.0,
            edge_level_db: -70.0,
            quiet_window: None,
            head_pad_seconds: 0.0,
            tail_pad_seconds: 0.0,
            pad_level_db: f64::NEG_INFINITY,
            all_silent: false,
            sample_rate: 44_100,
            channels: 1,
            format: "wav".to_string(),
            encoded: false,
            restored: false,
            tagged_from: None,
        }
    }

    /// An asset with nothing above the silence threshold anywhere.
    pub fn silent(duration_seconds: f64) -> Self {
        Self {
            rms_db: f64::NEG_INFINITY,
            peak_db: f64::NEG_INFINITY,
            noise_floor_db: f64::NEG_INFINITY,
            head_run_seconds: duration_seconds,
            tail_run_seconds: duration_seconds,
            all_silent: true,
            ..Self::speech(duration_seconds, 0.0, 0.0)
        }
    }

    /// Set quiet run lengths at both edges (at the edge level).
    pub fn with_edge_runs(mut self, head_seconds: f64, tail_seconds: f64) -> Self {
        self.head_run_seconds = head_seconds;
        self.tail_run_seconds = tail_seconds;
        self
    }

    /// Set the RMS level of the edge quiet runs.
    pub fn with_edge_level(mut self, level_db: f64) -> Self {
        self.edge_level_db = level_db;
        self
    }

    /// Give the asset an interior quiet window.
    pub fn with_quiet_window(mut self, window: QuietWindow) -> Self {
        self.quiet_window = Some(window);
        self
    }
}

#[derive(Debug, Default)]
struct Inner {
    files: HashMap<PathBuf, FakeAudio>,
    injected_failures: HashMap<String, u32>,
    call_counts: HashMap<String, u32>,
}

/// In-memory [`AudioEngine`] keyed by path.
///
/// Thread safe; orchestrator worker pools drive it exactly like the real
/// engine. Failures can be injected per operation to exercise retry and
/// skip paths.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    inner: Mutex<Inner>,
}

impl MemoryEngine {
    /// Create an empty engine
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fake audio file at `path`
    pub fn register(&self, path: impl Into<PathBuf>, audio: FakeAudio) {
        self.lock().files.insert(path.into(), audio);
    }

    /// Snapshot of the fake audio at `path`, if present
    pub fn audio(&self, path: &Path) -> Option<FakeAudio> {
        self.lock().files.get(path).cloned()
    }

    /// Whether a file exists at `path`
    pub fn exists(&self, path: &Path) -> bool {
        self.lock().files.contains_key(path)
    }

    /// Make the next `times` calls of `operation` fail with an engine error
    pub fn fail_next(&self, operation: &str, times: u32) {
        self.lock()
            .injected_failures
            .insert(operation.to_string(), times);
    }

    /// How many times `operation` has been called
    pub fn calls(&self, operation: &str) -> u32 {
        self.lock().call_counts.get(operation).copied().unwrap_or(0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enter(&self, operation: &str) -> Result<()> {
        let mut inner = self.lock();
        *inner.call_counts.entry(operation.to_string()).or_insert(0) += 1;
        if let Some(remaining) = inner.injected_failures.get_mut(operation) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(MasterError::engine(format!(
                    "injected {operation} failure"
                )));
            }
        }
        Ok(())
    }

    fn fetch(&self, path: &Path) -> Result<FakeAudio> {
        self.lock()
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| MasterError::engine(format!("no such asset: {}", path.display())))
    }
}

impl AudioEngine for MemoryEngine {
    fn probe(&self, path: &Path) -> Result<ProbeInfo> {
        self.enter("probe")?;
        let audio = self.fetch(path)?;
        Ok(ProbeInfo {
            duration_seconds: audio.duration_seconds,
            sample_rate: audio.sample_rate,
            channels: audio.channels,
            format: audio.format,
        })
    }

    fn analyze(&self, path: &Path) -> Result<Metrics> {
        self.enter("analyze")?;
        let audio = self.fetch(path)?;
        Ok(Metrics::new(
            audio.rms_db,
            audio.peak_db,
            audio.noise_floor_db,
            audio.duration_seconds,
        ))
    }

    fn scan_silence(&self, path: &Path, silence_db: f64, floor_db: f64) -> Result<SilenceScan> {
        self.enter("scan_silence")?;
        let audio = self.fetch(path)?;

        let run_at = |run: f64, level: f64, threshold: f64| {
            if level <= threshold {
                run
            } else {
                0.0
            }
        };
        let head = EdgeRun::new(
            run_at(audio.head_run_seconds, audio.edge_level_db, silence_db),
            run_at(audio.head_run_seconds, audio.edge_level_db, floor_db),
        );
        let tail = EdgeRun::new(
            run_at(audio.tail_run_seconds, audio.edge_level_db, silence_db),
            run_at(audio.tail_run_seconds, audio.edge_level_db, floor_db),
        );
        let quiet_window = audio.quiet_window.filter(|w| w.rms_db <= floor_db);

        Ok(SilenceScan {
            head,
            tail,
            quiet_window,
            all_silent: audio.all_silent,
        })
    }

    fn restore(&self, input: &Path, _filters: &RestoreFilters, output: &Path) -> Result<()> {
        self.enter("restore")?;
        let mut audio = self.fetch(input)?;
        audio.restored = true;
        self.lock().files.insert(output.to_path_buf(), audio);
        Ok(())
    }

    fn trim(
        &self,
        input: &Path,
        head_seconds: f64,
        tail_seconds: f64,
        output: &Path,
    ) -> Result<()> {
        self.enter("trim")?;
        let mut audio = self.fetch(input)?;
        if head_seconds + tail_seconds >= audio.duration_seconds {
            return Err(MasterError::engine(format!(
                "trim of {} s + {} s consumes the whole {} s input",
                head_seconds, tail_seconds, audio.duration_seconds
            )));
        }
        audio.duration_seconds -= head_seconds + tail_seconds;
        audio.head_run_seconds = (audio.head_run_seconds - head_seconds).max(0.0);
        audio.tail_run_seconds = (audio.tail_run_seconds - tail_seconds).max(0.0);
        audio.quiet_window = audio.quiet_window.and_then(|w| {
            let moved = w.shifted_back(head_seconds);
            (moved.start_seconds + moved.duration_seconds <= audio.duration_seconds + EPSILON)
                .then_some(moved)
        });
        self.lock().files.insert(output.to_path_buf(), audio);
        Ok(())
    }

    fn apply_gain(
        &self,
        input: &Path,
        gain_db: f64,
        limiter_db: f64,
        output: &Path,
    ) -> Result<()> {
        self.enter("apply_gain")?;
        let mut audio = self.fetch(input)?;
        audio.rms_db += gain_db;
        audio.peak_db = (audio.peak_db + gain_db).min(limiter_db);
        audio.noise_floor_db += gain_db;
        audio.edge_level_db += gain_db;
        if let Some(w) = audio.quiet_window.as_mut() {
            w.rms_db += gain_db;
        }
        self.lock().files.insert(output.to_path_buf(), audio);
        Ok(())
    }

    fn insert_padding(
        &self,
        input: &Path,
        head_seconds: f64,
        tail_seconds: f64,
        source: &ToneSource,
        output: &Path,
    ) -> Result<()> {
        self.enter("insert_padding")?;
        let mut audio = self.fetch(input)?;
        let level = source.level_db();
        if let ToneSource::Extract(window) = source {
            let end = window.start_seconds + window.duration_seconds;
            if end > audio.duration_seconds + EPSILON {
                return Err(MasterError::engine(format!(
                    "tone window [{}, {}) lies outside the {} s input",
                    window.start_seconds, end, audio.duration_seconds
                )));
            }
        }
        audio.duration_seconds += head_seconds + tail_seconds;
        audio.head_run_seconds += head_seconds;
        audio.tail_run_seconds += tail_seconds;
        if head_seconds > 0.0 {
            audio.head_pad_seconds = head_seconds;
        }
        if tail_seconds > 0.0 {
            audio.tail_pad_seconds = tail_seconds;
        }
        if head_seconds > 0.0 || tail_seconds > 0.0 {
            audio.pad_level_db = level;
            audio.noise_floor_db = audio.noise_floor_db.min(level);
        }
        audio.quiet_window = audio
            .quiet_window
            .map(|w| QuietWindow::new(w.start_seconds + head_seconds, w.duration_seconds, w.rms_db));
        self.lock().files.insert(output.to_path_buf(), audio);
        Ok(())
    }

    fn cut(
        &self,
        input: &Path,
        start_seconds: f64,
        duration_seconds: f64,
        output: &Path,
    ) -> Result<()> {
        self.enter("cut")?;
        let audio = self.fetch(input)?;
        let end = (start_seconds + duration_seconds).min(audio.duration_seconds);
        let length = end - start_seconds;
        if length <= 0.0 {
            return Err(MasterError::engine(format!(
                "cut [{start_seconds}, {end}) lies outside the {} s input",
                audio.duration_seconds
            )));
        }

        let mut slice = audio.clone();
        slice.duration_seconds = length;
        slice.quiet_window = None;
        slice.head_pad_seconds = 0.0;
        slice.tail_pad_seconds = 0.0;

        let in_head_pad = end <= audio.head_pad_seconds + EPSILON;
        let in_tail_pad =
            start_seconds >= audio.duration_seconds - audio.tail_pad_seconds - EPSILON;
        if in_head_pad || in_tail_pad {
            // A slice taken entirely inside inserted padding measures at
            // the pad level.
            slice.rms_db = audio.pad_level_db;
            slice.peak_db = audio.pad_level_db;
            slice.noise_floor_db = audio.pad_level_db;
            slice.head_run_seconds = length;
            slice.tail_run_seconds = length;
        } else {
            slice.head_run_seconds = if start_seconds <= EPSILON {
                audio.head_run_seconds.min(length)
            } else {
                0.0
            };
            slice.tail_run_seconds = if end >= audio.duration_seconds - EPSILON {
                audio.tail_run_seconds.min(length)
            } else {
                0.0
            };
        }

        self.lock().files.insert(output.to_path_buf(), slice);
        Ok(())
    }

    fn encode(
        &self,
        input: &Path,
        format: &EncodeFormat,
        tags_from: Option<&Path>,
        output: &Path,
    ) -> Result<()> {
        self.enter("encode")?;
        let mut audio = self.fetch(input)?;
        audio.encoded = true;
        audio.sample_rate = format.sample_rate_hz;
        audio.channels = format.channels.count();
        audio.format = format.codec.extension().to_string();
        audio.tagged_from = tags_from.map(Path::to_path_buf);
        self.lock().files.insert(output.to_path_buf(), audio);
        Ok(())
    }

    fn excerpt(
        &self,
        inputs: &[&Path],
        cap_seconds: f64,
        format: &EncodeFormat,
        output: &Path,
    ) -> Result<()> {
        self.enter("excerpt")?;
        let first = inputs
            .first()
            .ok_or_else(|| MasterError::engine("excerpt needs at least one input"))?;
        let mut combined = self.fetch(first)?;
        let mut total = combined.duration_seconds;
        for path in &inputs[1..] {
            total += self.fetch(path)?.duration_seconds;
        }
        combined.duration_seconds = total.min(cap_seconds);
        combined.encoded = true;
        combined.format = format.codec.extension().to_string();
        self.lock().files.insert(output.to_path_buf(), combined);
        Ok(())
    }
}
