/// Command-line flags; every flag overrides the file/environment layer
use std::path::PathBuf;

use clap::Parser;

use shellac_core::Channels;

use crate::config::AppConfig;

#[derive(Debug, Parser)]
#[command(name = "shellac")]
#[command(about = "Master a folder of narration into compliant audiobook files", long_about = None)]
pub struct Cli {
    /// Directory of raw recordings
    #[arg(short, long)]
    pub input_dir: Option<PathBuf>,

    /// Directory receiving the mastered files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output channel layout (mono or stereo)
    #[arg(long)]
    pub channels: Option<Channels>,

    /// MP3 bitrate in kbps
    #[arg(long)]
    pub bitrate: Option<u32>,

    /// Room tone at each edge, in seconds (1-5)
    #[arg(long)]
    pub room_tone: Option<f64>,

    /// Longest single output, in minutes
    #[arg(long)]
    pub max_minutes: Option<f64>,

    /// Overlap between split parts, in seconds
    #[arg(long)]
    pub overlap: Option<f64>,

    /// File to treat as the opening credits
    #[arg(long)]
    pub opening: Option<PathBuf>,

    /// File to treat as the closing credits
    #[arg(long)]
    pub closing: Option<PathBuf>,

    /// Skip the restoration chain before measurement
    #[arg(long)]
    pub no_restore: bool,

    /// Parallel asset pipelines (defaults to available cores)
    #[arg(long)]
    pub workers: Option<usize>,
}

impl Cli {
    /// Fold explicit flags over the loaded configuration
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(dir) = &self.input_dir {
            config.io.input_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.io.output_dir = dir.clone();
        }
        if let Some(channels) = self.channels {
            config.delivery.channels = channels;
        }
        if let Some(bitrate) = self.bitrate {
            config.delivery.bitrate_kbps = bitrate;
        }
        if let Some(seconds) = self.room_tone {
            config.mastering.room_tone_seconds = seconds;
        }
        if let Some(minutes) = self.max_minutes {
            config.mastering.max_part_minutes = minutes;
        }
        if let Some(seconds) = self.overlap {
            config.mastering.overlap_seconds = seconds;
        }
        if let Some(path) = &self.opening {
            config.io.opening = Some(path.clone());
        }
        if let Some(path) = &self.closing {
            config.io.closing = Some(path.clone());
        }
        if self.no_restore {
            config.mastering.restore = false;
        }
        if let Some(workers) = self.workers {
            config.io.workers = Some(workers);
        }
    }
}
