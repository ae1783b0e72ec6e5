//! Shellac Mastering Pipeline
//!
//! Decision and orchestration logic for turning a folder of raw
//! spoken-word recordings into delivery-compliant audiobook files.
//!
//! # Architecture
//!
//! - `scanner`: input discovery (supported extensions, deterministic order)
//! - `classifier`: structural role assignment (opening/body/closing)
//! - `trim`: edge-silence trim planning
//! - `gain`: gain and limiter planning against the loudness band
//! - `room_tone`: head/tail padding decisions and tone sourcing
//! - `splitter`: fixed-overlap partitioning of over-long assets
//! - `namer`: sanitized stems and ordinal-prefixed output names
//! - `sample`: retail sample source selection
//! - `orchestrator`: batch execution over a worker pool
//! - `test_utils`: symbolic in-memory audio engine for tests
//!
//! Planning is pure: every decision is computed from measurements before
//! any audio is touched, so plans unit-test against fixture values. Only
//! the orchestrator's execution phase calls mutating engine operations.
//!
//! # Example
//!
//! ```rust,no_run
//! use shellac_pipeline::{Orchestrator, RunConfig};
//! use shellac_pipeline::test_utils::MemoryEngine;
//!
//! # fn example() -> shellac_core::Result<()> {
//! let engine = MemoryEngine::new();
//! let config = RunConfig::new("/audio/raw", "/audio/mastered");
//! let report = Orchestrator::new(&engine, config).run()?;
//! println!("delivered {} files", report.outputs.len());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod classifier;
pub mod gain;
pub mod namer;
pub mod orchestrator;
pub mod room_tone;
pub mod sample;
pub mod scanner;
pub mod splitter;
pub mod test_utils;
pub mod trim;

pub use classifier::{classify, ClassifiedAsset};
pub use gain::{plan_gain, verify_levels};
pub use namer::{ensure_distinct_stems, output_file_name, role_stem, sanitize_stem, Sequencer};
pub use orchestrator::{
    AssetFailure, FinishedOutput, Orchestrator, RunConfig, RunReport, Stage,
};
pub use room_tone::{part_boundary_plan, plan_room_tone};
pub use sample::{select_sample_sources, RETAIL_SAMPLE_STEM};
pub use scanner::{is_audio_file, AssetScanner, SUPPORTED_EXTENSIONS};
pub use splitter::plan_parts;
pub use trim::plan_trim;
