/// Core error types for the mastering pipeline
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias using `MasterError`
pub type Result<T> = std::result::Result<T, MasterError>;

/// Core error type for the mastering pipeline
#[derive(Error, Debug)]
pub enum MasterError {
    /// Missing, unreadable, or unsupported input
    #[error("Input error: {0}")]
    Input(String),

    /// Ambiguous or contradictory role assignment
    #[error("Classification error: {0}")]
    Classification(String),

    /// Asset with no usable audio content
    #[error("Degenerate asset {}: {reason}", path.display())]
    DegenerateAsset {
        /// Source file the asset was read from
        path: PathBuf,
        /// What made the asset unusable
        reason: String,
    },

    /// Source or post-gain levels breach the compliance contract
    #[error("Peak violation in {}: {detail}", path.display())]
    PeakViolation {
        /// Source file the asset was read from
        path: PathBuf,
        /// Which level missed which bound
        detail: String,
    },

    /// An engine call failed
    #[error("Engine error: {0}")]
    Engine(String),

    /// An engine call exceeded its deadline
    #[error("Engine timeout after {seconds}s in {operation}")]
    EngineTimeout {
        /// Engine operation that stalled
        operation: String,
        /// Deadline that was exceeded
        seconds: u64,
    },

    /// Two inputs resolve to the same output name
    #[error("Naming conflict: {0}")]
    NamingConflict(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// A pipeline invariant was broken (a bug, not an operator error)
    #[error("Internal error: {0}")]
    Internal(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MasterError {
    /// Create an input error
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    /// Create a classification error
    pub fn classification(msg: impl Into<String>) -> Self {
        Self::Classification(msg.into())
    }

    /// Create a degenerate-asset error
    pub fn degenerate(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::DegenerateAsset {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a peak-violation error
    pub fn peak_violation(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        Self::PeakViolation {
            path: path.into(),
            detail: detail.into(),
        }
    }

    /// Create an engine error
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }

    /// Create an engine timeout error
    pub fn engine_timeout(operation: impl Into<String>, seconds: u64) -> Self {
        Self::EngineTimeout {
            operation: operation.into(),
            seconds,
        }
    }

    /// Create a naming conflict error
    pub fn naming_conflict(msg: impl Into<String>) -> Self {
        Self::NamingConflict(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal consistency error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this failure aborts the whole run.
    ///
    /// Everything else is asset-local: the asset is skipped and reported
    /// while sibling pipelines continue.
    pub fn is_run_fatal(&self) -> bool {
        matches!(
            self,
            Self::Classification(_) | Self::NamingConflict(_) | Self::Config(_)
        )
    }

    /// Whether one retry with backoff is worth attempting.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Engine(_) | Self::EngineTimeout { .. })
    }

    /// Attach the asset path to a bare engine failure for reporting.
    pub fn for_asset(self, path: &Path) -> Self {
        match self {
            Self::Engine(msg) => Self::Engine(format!("{}: {msg}", path.display())),
            other => other,
        }
    }
}
