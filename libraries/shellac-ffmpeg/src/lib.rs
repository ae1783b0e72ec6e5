//! FFmpeg-backed audio engine.
//!
//! Implements the pipeline's engine capability by shelling out to
//! `ffmpeg` and `ffprobe`: measurement through the astats and
//! silencedetect filters, rendering through trim, volume, limiter and
//! concat chains, delivery through libmp3lame. Every invocation runs
//! with stdio captured and is killed past a configurable timeout.

#![forbid(unsafe_code)]

mod parse;
mod runner;

pub mod engine;

pub use engine::{FfmpegConfig, FfmpegEngine};
