/// The audio engine capability consumed by the pipeline.
///
/// Every measurement and transformation goes through this trait so the
/// decision logic can be driven by an in-memory implementation in tests
/// and by an ffmpeg-backed implementation in production.
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::metrics::{Metrics, SilenceScan};
use crate::plan::ToneSource;
use crate::types::Channels;
use crate::{DEFAULT_BITRATE_KBPS, DEFAULT_SAMPLE_RATE_HZ};

/// Output codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    /// MPEG-1 Layer III via libmp3lame, constant bitrate
    Mp3,
}

impl AudioCodec {
    /// File extension for the codec
    pub fn extension(&self) -> &'static str {
        match self {
            AudioCodec::Mp3 => "mp3",
        }
    }
}

/// Final encoding parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EncodeFormat {
    /// Output codec
    pub codec: AudioCodec,
    /// Constant bitrate in kbps
    pub bitrate_kbps: u32,
    /// Output sample rate in Hz
    pub sample_rate_hz: u32,
    /// Output channel layout
    pub channels: Channels,
}

impl Default for EncodeFormat {
    fn default() -> Self {
        Self {
            codec: AudioCodec::Mp3,
            bitrate_kbps: DEFAULT_BITRATE_KBPS,
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            channels: Channels::Mono,
        }
    }
}

/// Switches for the pre-master restoration chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestoreFilters {
    /// High-pass cutoff in Hz (rumble removal)
    pub highpass_hz: u32,
    /// Low-pass cutoff in Hz (hiss shelf)
    pub lowpass_hz: u32,
    /// Remove clicks and pops
    pub declick: bool,
    /// Broadband denoise floor in dBFS
    pub denoise_floor_db: f64,
    /// Gentle 2:1 compression above the band ceiling
    pub compress: bool,
}

impl Default for RestoreFilters {
    fn default() -> Self {
        Self {
            highpass_hz: 80,
            lowpass_hz: 12_000,
            declick: true,
            denoise_floor_db: -35.0,
            compress: true,
        }
    }
}

/// Container and stream facts for a source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeInfo {
    /// Duration in seconds
    pub duration_seconds: f64,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Channel count
    pub channels: u16,
    /// Container/codec name
    pub format: String,
}

/// Narrow interface to the external audio engine.
///
/// All operations are blocking; implementations bound each call with a
/// timeout and must be callable from multiple worker threads at once.
/// Operations that produce audio write to `output` and never modify
/// `input`.
pub trait AudioEngine: Send + Sync {
    /// Probe container and stream facts for a source file
    fn probe(&self, path: &Path) -> Result<ProbeInfo>;

    /// Measure RMS, peak, and noise-floor levels
    fn analyze(&self, path: &Path) -> Result<Metrics>;

    /// Probe the silence structure: edge runs at `silence_db`, edge runs
    /// and interior windows at `floor_db`
    fn scan_silence(&self, path: &Path, silence_db: f64, floor_db: f64) -> Result<SilenceScan>;

    /// Apply the restoration chain
    fn restore(&self, input: &Path, filters: &RestoreFilters, output: &Path) -> Result<()>;

    /// Drop seconds from the edges
    fn trim(&self, input: &Path, head_seconds: f64, tail_seconds: f64, output: &Path)
        -> Result<()>;

    /// Apply gain with the limiter pinned at `limiter_db`
    fn apply_gain(&self, input: &Path, gain_db: f64, limiter_db: f64, output: &Path)
        -> Result<()>;

    /// Insert padding at the edges (insertion, not overlay; zero on an
    /// edge inserts nothing there)
    fn insert_padding(
        &self,
        input: &Path,
        head_seconds: f64,
        tail_seconds: f64,
        source: &ToneSource,
        output: &Path,
    ) -> Result<()>;

    /// Cut `[start, start+duration)` out of the input timeline
    fn cut(&self, input: &Path, start_seconds: f64, duration_seconds: f64, output: &Path)
        -> Result<()>;

    /// Encode to the final delivery format, passing through metadata tags
    /// from `tags_from` when given
    fn encode(
        &self,
        input: &Path,
        format: &EncodeFormat,
        tags_from: Option<&Path>,
        output: &Path,
    ) -> Result<()>;

    /// Concatenate already-encoded outputs and keep the first
    /// `cap_seconds` of the result
    fn excerpt(
        &self,
        inputs: &[&Path],
        cap_seconds: f64,
        format: &EncodeFormat,
        output: &Path,
    ) -> Result<()>;
}
