//! Test utilities for pipeline testing
//!
//! Provides a symbolic in-memory audio engine so decision logic and
//! orchestration can be exercised without spawning any external process.

pub mod engine;

pub use engine::*;
