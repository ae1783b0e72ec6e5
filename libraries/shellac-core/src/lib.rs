//! Shellac Core
//!
//! Engine-agnostic building blocks for the mastering pipeline.
//!
//! This crate defines:
//! - **Domain Types**: `AudioAsset`, `Role`, `Metrics`, `SilenceScan`
//! - **Plans**: `TrimPlan`, `GainPlan`, `RoomTonePlan`, `PartDescriptor`,
//!   `ProcessingPlan` — pure values built before any audio is touched
//! - **Targets**: `MasteringTargets`, the numeric contract outputs must meet
//! - **Engine Seam**: the `AudioEngine` trait every measurement and
//!   transformation goes through, so the decision logic can be exercised
//!   against an in-memory engine
//! - **Error Handling**: unified `MasterError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use shellac_core::{MasteringTargets, Metrics};
//!
//! let targets = MasteringTargets::default();
//! let metrics = Metrics::new(-20.5, -6.0, -65.0, 300.0);
//!
//! assert!(targets.rms_band_contains(metrics.rms_db));
//! assert!(metrics.peak_db <= targets.peak_ceiling_db);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod engine;
pub mod error;
pub mod metrics;
pub mod plan;
pub mod targets;
pub mod types;

// Re-export commonly used types
pub use engine::{AudioCodec, AudioEngine, EncodeFormat, ProbeInfo, RestoreFilters};
pub use error::{MasterError, Result};
pub use metrics::{EdgeRun, Metrics, QuietWindow, SilenceScan};
pub use plan::{GainPlan, PartDescriptor, ProcessingPlan, RoomTonePlan, ToneSource, TrimPlan};
pub use targets::MasteringTargets;
pub use types::{AudioAsset, Channels, Role};

/// Lower edge of the legal RMS band in dBFS.
pub const RMS_FLOOR_DB: f64 = -23.0;

/// Upper edge of the legal RMS band in dBFS.
pub const RMS_CEILING_DB: f64 = -18.0;

/// Peak ceiling in dBFS. The limiter is always pinned here.
pub const PEAK_CEILING_DB: f64 = -3.0;

/// Maximum allowed RMS level over room-tone windows in dBFS.
pub const NOISE_FLOOR_CEILING_DB: f64 = -60.0;

/// Shortest legal room-tone padding in seconds.
pub const ROOM_TONE_MIN_SECONDS: f64 = 1.0;

/// Longest legal room-tone padding in seconds.
pub const ROOM_TONE_MAX_SECONDS: f64 = 5.0;

/// Default room-tone padding in seconds.
pub const DEFAULT_ROOM_TONE_SECONDS: f64 = 2.0;

/// Default level treated as silence when scanning edges, in dBFS.
pub const DEFAULT_SILENCE_THRESHOLD_DB: f64 = -50.0;

/// Default edge silence allowed to remain after trimming, in seconds.
pub const DEFAULT_MAX_EDGE_SILENCE_SECONDS: f64 = 5.0;

/// Default per-part duration limit in seconds (120 minutes).
pub const DEFAULT_MAX_PART_SECONDS: f64 = 120.0 * 60.0;

/// Default overlap shared by adjacent split parts, in seconds.
pub const DEFAULT_OVERLAP_SECONDS: f64 = 1.0;

/// Default retail-sample duration cap in seconds (5 minutes).
pub const DEFAULT_SAMPLE_CAP_SECONDS: f64 = 300.0;

/// RMS level of the synthesized room-tone bed in dBFS.
///
/// Ten dB under the noise-floor ceiling: clearly non-silent, never close
/// to the limit.
pub const SYNTH_TONE_DB: f64 = -70.0;

/// Default MP3 bitrate in kbps.
pub const DEFAULT_BITRATE_KBPS: u32 = 256;

/// Default output sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 44_100;
