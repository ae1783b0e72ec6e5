/// Asset and role types
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Output channel layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channels {
    /// Single channel
    Mono,
    /// Two channels
    Stereo,
}

impl Channels {
    /// Number of channels
    pub fn count(&self) -> u16 {
        match self {
            Channels::Mono => 1,
            Channels::Stereo => 2,
        }
    }

    /// Lowercase name, as accepted on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Channels::Mono => "mono",
            Channels::Stereo => "stereo",
        }
    }
}

impl std::str::FromStr for Channels {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "mono" => Ok(Channels::Mono),
            "stereo" => Ok(Channels::Stereo),
            _ => Err(format!("expected 'mono' or 'stereo', got '{s}'")),
        }
    }
}

/// Immutable reference to a source recording.
///
/// Created once at input enumeration and never mutated; every stage reads
/// from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioAsset {
    /// Source file path
    pub path: PathBuf,
    /// Duration in seconds, as probed
    pub duration_seconds: f64,
    /// Source sample rate in Hz
    pub sample_rate: u32,
    /// Source channel count
    pub channels: u16,
    /// Container/codec name reported by the probe
    pub format: String,
}

impl AudioAsset {
    /// Create a new asset reference
    pub fn new(
        path: impl Into<PathBuf>,
        duration_seconds: f64,
        sample_rate: u32,
        channels: u16,
        format: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            duration_seconds,
            sample_rate,
            channels,
            format: format.into(),
        }
    }

    /// File stem used for role hints and output naming
    pub fn stem(&self) -> &str {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
    }

    /// File name for log lines and failure reports
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Whether `candidate` designates this asset (full path or bare file name)
    pub fn matches_path(&self, candidate: &Path) -> bool {
        if self.path == candidate {
            return true;
        }
        let bare = candidate
            .parent()
            .map_or(true, |p| p.as_os_str().is_empty());
        match (self.path.file_name(), candidate.file_name()) {
            (Some(a), Some(b)) => bare && a == b,
            _ => false,
        }
    }
}

/// Structural role of an asset within the finished book.
///
/// Assigned once by the classifier; downstream stages branch on the
/// variant and never re-inspect filenames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Opening credits, first in sequence
    Opening,
    /// Numbered body section, 1-based and dense
    Body(u32),
    /// Closing credits, last in sequence
    Closing,
}

impl Role {
    /// Ordering key: Opening, then Body in index order, then Closing
    pub fn sort_key(&self) -> (u8, u32) {
        match self {
            Role::Opening => (0, 0),
            Role::Body(index) => (1, *index),
            Role::Closing => (2, 0),
        }
    }

    /// Whether this is a body section
    pub fn is_body(&self) -> bool {
        matches!(self, Role::Body(_))
    }

    /// Human-readable label for logs and reports
    pub fn label(&self) -> String {
        match self {
            Role::Opening => "Opening".to_string(),
            Role::Body(index) => format!("Body {index}"),
            Role::Closing => "Closing".to_string(),
        }
    }
}
