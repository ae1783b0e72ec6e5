//! Shellac CLI Library
//!
//! Flag parsing, layered configuration, and run-report rendering for the
//! `shellac` binary.
//!
//! This library exposes the binary's components for testing purposes.

pub mod cli;
pub mod config;
pub mod report;

// Re-export commonly used types for convenience
pub use cli::Cli;
pub use config::AppConfig;
pub use report::render_report;
