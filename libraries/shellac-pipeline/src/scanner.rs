//! Input discovery for source recordings

use std::path::{Path, PathBuf};

use shellac_core::{MasterError, Result};
use walkdir::WalkDir;

/// Supported source file extensions
pub const SUPPORTED_EXTENSIONS: &[&str] = &["wav", "mp3", "flac", "m4a", "aac", "aiff", "aif"];

/// Scanner for source recordings in an input directory.
///
/// Discovery order is lexicographic by path so body numbering is
/// deterministic across runs. The input directory is read flat by
/// default; chapter folders are not expected to nest.
pub struct AssetScanner {
    /// Whether to follow symbolic links
    follow_links: bool,

    /// Maximum depth to traverse
    max_depth: usize,
}

impl Default for AssetScanner {
    fn default() -> Self {
        Self {
            follow_links: false,
            max_depth: 1,
        }
    }
}

impl AssetScanner {
    /// Create a new scanner
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to follow symbolic links
    pub fn follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Set maximum directory depth to traverse
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Scan the input directory for source recordings.
    ///
    /// Returns the supported files in lexicographic order. An unreadable
    /// or missing directory, or a directory without a single supported
    /// file, is fatal for the run.
    pub fn scan(&self, path: &Path) -> Result<Vec<PathBuf>> {
        if !path.exists() {
            return Err(MasterError::input(format!(
                "input directory not found: {}",
                path.display()
            )));
        }

        if !path.is_dir() {
            return Err(MasterError::input(format!(
                "{} is not a directory",
                path.display()
            )));
        }

        let mut sources = Vec::new();
        let walker = WalkDir::new(path)
            .follow_links(self.follow_links)
            .max_depth(self.max_depth);

        for entry in walker.into_iter() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!("skipping unreadable entry under {}: {err}", path.display());
                    continue;
                }
            };

            if entry.path().is_dir() {
                continue;
            }

            if is_audio_file(entry.path()) {
                sources.push(entry.path().to_path_buf());
            }
        }

        sources.sort();

        if sources.is_empty() {
            return Err(MasterError::input(format!(
                "no supported audio files found in {}",
                path.display()
            )));
        }

        tracing::info!(
            count = sources.len(),
            dir = %path.display(),
            "discovered source recordings"
        );
        Ok(sources)
    }
}

/// Check if a file is a supported source recording
pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn recognizes_supported_extensions() {
        assert!(is_audio_file(Path::new("chapter.wav")));
        assert!(is_audio_file(Path::new("chapter.WAV")));
        assert!(is_audio_file(Path::new("chapter.aiff")));
        assert!(is_audio_file(Path::new("chapter.m4a")));
        assert!(!is_audio_file(Path::new("chapter.ogg")));
        assert!(!is_audio_file(Path::new("notes.txt")));
        assert!(!is_audio_file(Path::new("chapter")));
    }

    #[test]
    fn scan_is_flat_and_sorted() {
        let temp = TempDir::new().unwrap();
        let base = temp.path();

        fs::write(base.join("02_Chapter.wav"), b"fake").unwrap();
        fs::write(base.join("01_Intro.wav"), b"fake").unwrap();
        fs::write(base.join("notes.txt"), b"not audio").unwrap();

        let subdir = base.join("rejects");
        fs::create_dir(&subdir).unwrap();
        fs::write(subdir.join("take2.wav"), b"fake").unwrap();

        let files = AssetScanner::new().scan(base).unwrap();

        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("01_Intro.wav"));
        assert!(files[1].ends_with("02_Chapter.wav"));
    }

    #[test]
    fn empty_directory_is_fatal() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("notes.txt"), b"not audio").unwrap();

        let err = AssetScanner::new().scan(temp.path()).unwrap_err();
        assert!(matches!(err, MasterError::Input(_)));
    }

    #[test]
    fn missing_directory_is_fatal() {
        let temp = TempDir::new().unwrap();
        let gone = temp.path().join("gone");

        let err = AssetScanner::new().scan(&gone).unwrap_err();
        assert!(matches!(err, MasterError::Input(_)));
    }

    #[test]
    fn deeper_files_are_found_when_asked() {
        let temp = TempDir::new().unwrap();
        let base = temp.path();

        fs::write(base.join("top.wav"), b"fake").unwrap();
        let subdir = base.join("nested");
        fs::create_dir(&subdir).unwrap();
        fs::write(subdir.join("deep.wav"), b"fake").unwrap();

        let flat = AssetScanner::new().scan(base).unwrap();
        assert_eq!(flat.len(), 1);

        let deep = AssetScanner::new().max_depth(2).scan(base).unwrap();
        assert_eq!(deep.len(), 2);
    }
}
