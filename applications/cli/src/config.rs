/// Layered tool configuration: defaults, TOML file, environment
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use shellac_core::{Channels, EncodeFormat, MasterError, MasteringTargets, Result};
use shellac_ffmpeg::FfmpegConfig;
use shellac_pipeline::RunConfig;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default = "default_io")]
    pub io: IoSettings,

    #[serde(default = "default_mastering")]
    pub mastering: MasteringSettings,

    #[serde(default = "default_delivery")]
    pub delivery: DeliverySettings,

    #[serde(default = "default_engine")]
    pub engine: EngineSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IoSettings {
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// File to treat as the opening credits, overriding filename hints
    #[serde(default)]
    pub opening: Option<PathBuf>,

    /// File to treat as the closing credits, overriding filename hints
    #[serde(default)]
    pub closing: Option<PathBuf>,

    /// Parallel asset pipelines; defaults to available cores
    #[serde(default)]
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MasteringSettings {
    /// Room tone guaranteed at each edge, in seconds (1-5)
    #[serde(default = "default_room_tone_seconds")]
    pub room_tone_seconds: f64,

    /// Longest single output, in minutes
    #[serde(default = "default_max_part_minutes")]
    pub max_part_minutes: f64,

    /// Overlap between split parts, in seconds
    #[serde(default = "default_overlap_seconds")]
    pub overlap_seconds: f64,

    /// Run the restoration chain before measurement
    #[serde(default = "default_restore")]
    pub restore: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeliverySettings {
    #[serde(default = "default_channels")]
    pub channels: Channels,

    #[serde(default = "default_bitrate_kbps")]
    pub bitrate_kbps: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineSettings {
    /// Explicit ffmpeg binary; discovered on PATH when absent
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Explicit ffprobe binary; discovered on PATH when absent
    #[serde(default)]
    pub ffprobe_path: Option<PathBuf>,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl AppConfig {
    /// Load configuration from file and environment.
    ///
    /// An explicit path must exist; otherwise `shellac.toml` in the
    /// working directory is used when present. Environment variables
    /// override the file: `SHELLAC_MASTERING__ROOM_TONE_SECONDS` maps
    /// to `mastering.room_tone_seconds`.
    pub fn load(explicit: Option<&std::path::Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(MasterError::config(format!(
                        "configuration file {} does not exist",
                        path.display()
                    )));
                }
                settings = settings.add_source(config::File::from(path.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from("shellac.toml");
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("SHELLAC")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = settings
            .build()
            .map_err(|e| MasterError::config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| MasterError::config(e.to_string()))
    }

    /// Validate configuration before any engine call
    pub fn validate(&self) -> Result<()> {
        self.targets().validate()?;

        if self.delivery.bitrate_kbps == 0 {
            return Err(MasterError::config("bitrate must be positive"));
        }
        if self.io.workers == Some(0) {
            return Err(MasterError::config("worker count must be positive"));
        }
        if self.engine.timeout_seconds == 0 {
            return Err(MasterError::config("engine timeout must be positive"));
        }

        Ok(())
    }

    /// Compliance targets with the configured timing knobs applied
    pub fn targets(&self) -> MasteringTargets {
        MasteringTargets {
            room_tone_seconds: self.mastering.room_tone_seconds,
            max_part_seconds: self.mastering.max_part_minutes * 60.0,
            overlap_seconds: self.mastering.overlap_seconds,
            ..MasteringTargets::default()
        }
    }

    /// Delivery encoding parameters
    pub fn encode_format(&self) -> EncodeFormat {
        EncodeFormat {
            bitrate_kbps: self.delivery.bitrate_kbps,
            channels: self.delivery.channels,
            ..EncodeFormat::default()
        }
    }

    /// Batch run configuration for the orchestrator
    pub fn run_config(&self) -> RunConfig {
        let mut run = RunConfig::new(self.io.input_dir.clone(), self.io.output_dir.clone());
        run.targets = self.targets();
        run.format = self.encode_format();
        if !self.mastering.restore {
            run.restore = None;
        }
        run.opening = self.io.opening.clone();
        run.closing = self.io.closing.clone();
        run.workers = self.io.workers;
        run
    }

    /// Engine discovery settings
    pub fn engine_config(&self) -> FfmpegConfig {
        FfmpegConfig {
            ffmpeg_path: self.engine.ffmpeg_path.clone(),
            ffprobe_path: self.engine.ffprobe_path.clone(),
            timeout: Duration::from_secs(self.engine.timeout_seconds),
        }
    }
}

// Default values
fn default_io() -> IoSettings {
    IoSettings {
        input_dir: default_input_dir(),
        output_dir: default_output_dir(),
        opening: None,
        closing: None,
        workers: None,
    }
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("./recordings")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./mastered")
}

fn default_mastering() -> MasteringSettings {
    MasteringSettings {
        room_tone_seconds: default_room_tone_seconds(),
        max_part_minutes: default_max_part_minutes(),
        overlap_seconds: default_overlap_seconds(),
        restore: default_restore(),
    }
}

fn default_room_tone_seconds() -> f64 {
    shellac_core::DEFAULT_ROOM_TONE_SECONDS
}

fn default_max_part_minutes() -> f64 {
    shellac_core::DEFAULT_MAX_PART_SECONDS / 60.0
}

fn default_overlap_seconds() -> f64 {
    shellac_core::DEFAULT_OVERLAP_SECONDS
}

fn default_restore() -> bool {
    true
}

fn default_delivery() -> DeliverySettings {
    DeliverySettings {
        channels: default_channels(),
        bitrate_kbps: default_bitrate_kbps(),
    }
}

fn default_channels() -> Channels {
    Channels::Mono
}

fn default_bitrate_kbps() -> u32 {
    shellac_core::DEFAULT_BITRATE_KBPS
}

fn default_engine() -> EngineSettings {
    EngineSettings {
        ffmpeg_path: None,
        ffprobe_path: None,
        timeout_seconds: default_timeout_seconds(),
    }
}

fn default_timeout_seconds() -> u64 {
    600
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            io: default_io(),
            mastering: default_mastering(),
            delivery: default_delivery(),
            engine: default_engine(),
        }
    }
}
