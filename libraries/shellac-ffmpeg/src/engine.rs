//! The engine implementation: one method per tool capability.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use tempfile::TempDir;

use shellac_core::{
    AudioCodec, AudioEngine, EncodeFormat, MasterError, Metrics, ProbeInfo, RestoreFilters,
    Result, SilenceScan, ToneSource,
};

use crate::parse::{self, SilenceSpan};
use crate::runner::run_tool;

/// Bound on any single tool invocation.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Minimum quiet run silencedetect reports, in seconds.
const MIN_RUN_SECONDS: f64 = 0.1;

/// Sample codec for intermediate files between stages.
const INTERMEDIATE_CODEC: &str = "pcm_f32le";

/// Where to find the tools and how long to let them run.
#[derive(Debug, Clone)]
pub struct FfmpegConfig {
    /// Explicit ffmpeg binary; discovered on PATH when `None`
    pub ffmpeg_path: Option<PathBuf>,
    /// Explicit ffprobe binary; discovered on PATH when `None`
    pub ffprobe_path: Option<PathBuf>,
    /// Kill-and-fail bound for a single invocation
    pub timeout: Duration,
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            ffprobe_path: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Audio engine shelling out to ffmpeg and ffprobe.
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    timeout: Duration,
}

impl FfmpegEngine {
    /// Resolve both tools, failing before any audio is touched.
    pub fn discover(config: FfmpegConfig) -> Result<Self> {
        let ffmpeg = resolve("ffmpeg", config.ffmpeg_path)?;
        let ffprobe = resolve("ffprobe", config.ffprobe_path)?;
        tracing::info!(
            ffmpeg = %ffmpeg.display(),
            ffprobe = %ffprobe.display(),
            "audio tools resolved"
        );
        Ok(Self {
            ffmpeg,
            ffprobe,
            timeout: config.timeout,
        })
    }

    fn run_ffmpeg(&self, operation: &str, args: Vec<String>) -> Result<Output> {
        run_tool(&self.ffmpeg, operation, &args, self.timeout)
    }

    fn detect_spans(
        &self,
        path: &Path,
        threshold_db: f64,
        total_seconds: f64,
    ) -> Result<Vec<SilenceSpan>> {
        let filter = format!("silencedetect=noise={threshold_db}dB:d={MIN_RUN_SECONDS}");
        let output = self.run_ffmpeg(
            "scan_silence",
            vec![
                "-hide_banner".into(),
                "-i".into(),
                path_arg(path),
                "-af".into(),
                filter,
                "-f".into(),
                "null".into(),
                "-".into(),
            ],
        )?;
        Ok(parse::parse_silencedetect(
            &String::from_utf8_lossy(&output.stderr),
            total_seconds,
        ))
    }

    /// Render one padding segment to `out`, matching the input's sample
    /// rate and channel count so concat accepts it.
    fn render_tone(
        &self,
        input: &Path,
        source: &ToneSource,
        seconds: f64,
        info: &ProbeInfo,
        out: &Path,
    ) -> Result<()> {
        match source {
            ToneSource::Synthesize { level_db } => {
                let spec = format!(
                    "anoisesrc=r={}:colour=pink:amplitude={:.6}",
                    info.sample_rate,
                    db_to_linear(*level_db)
                );
                self.run_ffmpeg(
                    "insert_padding",
                    vec![
                        "-y".into(),
                        "-f".into(),
                        "lavfi".into(),
                        "-t".into(),
                        seconds.to_string(),
                        "-i".into(),
                        spec,
                        "-ac".into(),
                        info.channels.to_string(),
                        "-c:a".into(),
                        INTERMEDIATE_CODEC.into(),
                        path_arg(out),
                    ],
                )?;
            }
            ToneSource::Extract(window) => {
                if window.duration_seconds + 1e-6 < seconds {
                    return Err(MasterError::engine(format!(
                        "tone window of {} s cannot fill a {} s pad",
                        window.duration_seconds, seconds
                    )));
                }
                self.run_ffmpeg(
                    "insert_padding",
                    vec![
                        "-y".into(),
                        "-ss".into(),
                        window.start_seconds.to_string(),
                        "-t".into(),
                        seconds.to_string(),
                        "-i".into(),
                        path_arg(input),
                        "-c:a".into(),
                        INTERMEDIATE_CODEC.into(),
                        path_arg(out),
                    ],
                )?;
            }
        }
        Ok(())
    }
}

impl AudioEngine for FfmpegEngine {
    fn probe(&self, path: &Path) -> Result<ProbeInfo> {
        let output = run_tool(
            &self.ffprobe,
            "probe",
            &[
                "-v".into(),
                "quiet".into(),
                "-print_format".into(),
                "json".into(),
                "-show_format".into(),
                "-show_streams".into(),
                path_arg(path),
            ],
            self.timeout,
        )?;
        parse::parse_probe(&String::from_utf8_lossy(&output.stdout))
    }

    fn analyze(&self, path: &Path) -> Result<Metrics> {
        let info = self.probe(path)?;
        let output = self.run_ffmpeg(
            "analyze",
            vec![
                "-hide_banner".into(),
                "-i".into(),
                path_arg(path),
                "-af".into(),
                "astats=measure_perchannel=none".into(),
                "-f".into(),
                "null".into(),
                "-".into(),
            ],
        )?;
        let levels = parse::parse_astats(&String::from_utf8_lossy(&output.stderr))?;
        tracing::debug!(
            file = %path.display(),
            rms = levels.rms_db,
            peak = levels.peak_db,
            floor = levels.noise_floor_db,
            "measured"
        );
        Ok(Metrics::new(
            levels.rms_db,
            levels.peak_db,
            levels.noise_floor_db,
            info.duration_seconds,
        ))
    }

    fn scan_silence(&self, path: &Path, silence_db: f64, floor_db: f64) -> Result<SilenceScan> {
        let info = self.probe(path)?;
        let silence = self.detect_spans(path, silence_db, info.duration_seconds)?;
        let floor = self.detect_spans(path, floor_db, info.duration_seconds)?;
        Ok(parse::compose_scan(
            &silence,
            &floor,
            info.duration_seconds,
            floor_db,
        ))
    }

    fn restore(&self, input: &Path, filters: &RestoreFilters, output: &Path) -> Result<()> {
        self.run_ffmpeg(
            "restore",
            vec![
                "-y".into(),
                "-i".into(),
                path_arg(input),
                "-af".into(),
                restoration_chain(filters),
                "-c:a".into(),
                INTERMEDIATE_CODEC.into(),
                path_arg(output),
            ],
        )?;
        Ok(())
    }

    fn trim(
        &self,
        input: &Path,
        head_seconds: f64,
        tail_seconds: f64,
        output: &Path,
    ) -> Result<()> {
        let info = self.probe(input)?;
        let keep = info.duration_seconds - head_seconds - tail_seconds;
        if keep <= 0.0 {
            return Err(MasterError::engine(format!(
                "trim of {head_seconds} s + {tail_seconds} s consumes the whole {} s input",
                info.duration_seconds
            )));
        }
        self.run_ffmpeg(
            "trim",
            vec![
                "-y".into(),
                "-ss".into(),
                head_seconds.to_string(),
                "-t".into(),
                keep.to_string(),
                "-i".into(),
                path_arg(input),
                "-c:a".into(),
                INTERMEDIATE_CODEC.into(),
                path_arg(output),
            ],
        )?;
        Ok(())
    }

    fn apply_gain(
        &self,
        input: &Path,
        gain_db: f64,
        limiter_db: f64,
        output: &Path,
    ) -> Result<()> {
        // alimiter takes a linear ceiling; level=false keeps it from
        // re-normalizing the output.
        let filter = format!(
            "volume={gain_db}dB,alimiter=limit={:.6}:level=false",
            db_to_linear(limiter_db)
        );
        self.run_ffmpeg(
            "apply_gain",
            vec![
                "-y".into(),
                "-i".into(),
                path_arg(input),
                "-af".into(),
                filter,
                "-c:a".into(),
                INTERMEDIATE_CODEC.into(),
                path_arg(output),
            ],
        )?;
        Ok(())
    }

    fn insert_padding(
        &self,
        input: &Path,
        head_seconds: f64,
        tail_seconds: f64,
        source: &ToneSource,
        output: &Path,
    ) -> Result<()> {
        let info = self.probe(input)?;
        let scratch = TempDir::new()?;

        let mut inputs: Vec<PathBuf> = Vec::with_capacity(3);
        if head_seconds > 0.0 {
            let head = scratch.path().join("head_tone.wav");
            self.render_tone(input, source, head_seconds, &info, &head)?;
            inputs.push(head);
        }
        inputs.push(input.to_path_buf());
        if tail_seconds > 0.0 {
            let tail = scratch.path().join("tail_tone.wav");
            self.render_tone(input, source, tail_seconds, &info, &tail)?;
            inputs.push(tail);
        }

        if inputs.len() == 1 {
            // Zero pads still produce the output file.
            self.run_ffmpeg(
                "insert_padding",
                vec![
                    "-y".into(),
                    "-i".into(),
                    path_arg(input),
                    "-c:a".into(),
                    INTERMEDIATE_CODEC.into(),
                    path_arg(output),
                ],
            )?;
            return Ok(());
        }

        let mut args: Vec<String> = vec!["-y".into()];
        for file in &inputs {
            args.push("-i".into());
            args.push(path_arg(file));
        }
        args.push("-filter_complex".into());
        args.push(concat_spec(inputs.len(), "padded"));
        args.push("-map".into());
        args.push("[padded]".into());
        args.push("-c:a".into());
        args.push(INTERMEDIATE_CODEC.into());
        args.push(path_arg(output));
        self.run_ffmpeg("insert_padding", args)?;
        Ok(())
    }

    fn cut(
        &self,
        input: &Path,
        start_seconds: f64,
        duration_seconds: f64,
        output: &Path,
    ) -> Result<()> {
        self.run_ffmpeg(
            "cut",
            vec![
                "-y".into(),
                "-ss".into(),
                start_seconds.to_string(),
                "-t".into(),
                duration_seconds.to_string(),
                "-i".into(),
                path_arg(input),
                "-c:a".into(),
                INTERMEDIATE_CODEC.into(),
                path_arg(output),
            ],
        )?;
        Ok(())
    }

    fn encode(
        &self,
        input: &Path,
        format: &EncodeFormat,
        tags_from: Option<&Path>,
        output: &Path,
    ) -> Result<()> {
        let mut args: Vec<String> = vec!["-y".into(), "-i".into(), path_arg(input)];
        if let Some(tags) = tags_from {
            args.push("-i".into());
            args.push(path_arg(tags));
        }
        args.push("-map".into());
        args.push("0:a".into());
        args.push("-map_metadata".into());
        args.push(if tags_from.is_some() { "1" } else { "0" }.into());
        args.extend(codec_args(format));
        args.push(path_arg(output));
        self.run_ffmpeg("encode", args)?;
        Ok(())
    }

    fn excerpt(
        &self,
        inputs: &[&Path],
        cap_seconds: f64,
        format: &EncodeFormat,
        output: &Path,
    ) -> Result<()> {
        if inputs.is_empty() {
            return Err(MasterError::engine("excerpt needs at least one input"));
        }
        let mut args: Vec<String> = vec!["-y".into()];
        for file in inputs {
            args.push("-i".into());
            args.push(path_arg(file));
        }
        args.push("-filter_complex".into());
        args.push(concat_spec(inputs.len(), "joined"));
        args.push("-map".into());
        args.push("[joined]".into());
        args.push("-t".into());
        args.push(cap_seconds.to_string());
        args.extend(codec_args(format));
        args.push(path_arg(output));
        self.run_ffmpeg("excerpt", args)?;
        Ok(())
    }
}

fn resolve(tool: &str, explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(path) => {
            if path.is_file() {
                Ok(path)
            } else {
                Err(MasterError::config(format!(
                    "{tool} is not at the configured path {}",
                    path.display()
                )))
            }
        }
        None => which::which(tool).map_err(|_| {
            MasterError::config(format!(
                "{tool} was not found on PATH; install ffmpeg and ffprobe"
            ))
        }),
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

fn concat_spec(inputs: usize, label: &str) -> String {
    let taps: String = (0..inputs).map(|i| format!("[{i}:a]")).collect();
    format!("{taps}concat=n={inputs}:v=0:a=1[{label}]")
}

fn restoration_chain(filters: &RestoreFilters) -> String {
    let mut chain = vec![
        format!("highpass=f={}", filters.highpass_hz),
        format!("lowpass=f={}", filters.lowpass_hz),
    ];
    if filters.declick {
        chain.push("adeclick".to_string());
    }
    chain.push(format!("afftdn=nf={}", filters.denoise_floor_db));
    if filters.compress {
        chain.push("acompressor=threshold=-18dB:ratio=2:attack=5:release=250".to_string());
    }
    chain.join(",")
}

fn codec_args(format: &EncodeFormat) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-ar".into(),
        format.sample_rate_hz.to_string(),
        "-ac".into(),
        format.channels.count().to_string(),
    ];
    match format.codec {
        AudioCodec::Mp3 => {
            args.extend([
                "-c:a".into(),
                "libmp3lame".into(),
                "-b:a".into(),
                format!("{}k", format.bitrate_kbps),
                "-compression_level".into(),
                "0".into(),
                "-write_xing".into(),
                "0".into(),
                "-id3v2_version".into(),
                "3".into(),
            ]);
        }
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_restoration_chain_in_filter_order() {
        let chain = restoration_chain(&RestoreFilters::default());
        assert_eq!(
            chain,
            "highpass=f=80,lowpass=f=12000,adeclick,afftdn=nf=-35,\
             acompressor=threshold=-18dB:ratio=2:attack=5:release=250"
        );
    }

    #[test]
    fn restoration_chain_honors_switches() {
        let filters = RestoreFilters {
            declick: false,
            compress: false,
            ..RestoreFilters::default()
        };
        assert_eq!(
            restoration_chain(&filters),
            "highpass=f=80,lowpass=f=12000,afftdn=nf=-35"
        );
    }

    #[test]
    fn db_conversion_matches_known_points() {
        assert!((db_to_linear(-3.0) - 0.7079).abs() < 1e-4);
        assert!((db_to_linear(-70.0) - 0.000316).abs() < 1e-6);
        assert_eq!(db_to_linear(0.0), 1.0);
    }

    #[test]
    fn concat_spec_enumerates_taps() {
        assert_eq!(concat_spec(3, "padded"), "[0:a][1:a][2:a]concat=n=3:v=0:a=1[padded]");
        assert_eq!(concat_spec(1, "joined"), "[0:a]concat=n=1:v=0:a=1[joined]");
    }

    #[test]
    fn retail_codec_args_pin_the_delivery_format() {
        let args = codec_args(&EncodeFormat::default());
        let joined = args.join(" ");
        assert!(joined.contains("-c:a libmp3lame"));
        assert!(joined.contains("-b:a 256k"));
        assert!(joined.contains("-ar 44100"));
        assert!(joined.contains("-ac 1"));
        assert!(joined.contains("-write_xing 0"));
    }

    #[test]
    fn explicit_tool_paths_are_checked_up_front() {
        let config = FfmpegConfig {
            ffmpeg_path: Some(PathBuf::from("/no/such/ffmpeg")),
            ..FfmpegConfig::default()
        };
        let err = FfmpegEngine::discover(config).unwrap_err();
        assert!(err.is_run_fatal());
        assert!(err.to_string().contains("/no/such/ffmpeg"));
    }
}
