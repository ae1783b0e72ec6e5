//! Parsers for ffprobe JSON and ffmpeg filter log output.
//!
//! Everything here is pure text handling so it can be tested against
//! captured tool output without the tools installed.

use shellac_core::{EdgeRun, MasterError, ProbeInfo, QuietWindow, Result, SilenceScan};

/// Slack when deciding whether a quiet span touches an edge, in seconds.
///
/// silencedetect timestamps drift by a frame or two around decoder
/// padding; spans this close to an edge count as anchored there.
const EDGE_EPSILON: f64 = 0.05;

/// Level summary from an astats pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct AstatsLevels {
    pub rms_db: f64,
    pub peak_db: f64,
    pub noise_floor_db: f64,
}

/// One region below a detection threshold, in seconds on the input
/// timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SilenceSpan {
    pub start: f64,
    pub end: f64,
}

impl SilenceSpan {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Extract stream facts from `ffprobe -print_format json` output.
pub(crate) fn parse_probe(json: &str) -> Result<ProbeInfo> {
    let value: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| MasterError::engine(format!("unparseable ffprobe output: {e}")))?;

    let format = value.get("format");
    let duration_seconds = format
        .and_then(|f| f.get("duration"))
        .and_then(serde_json::Value::as_str)
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| MasterError::engine("probe reported no parseable duration"))?;

    let stream = value
        .get("streams")
        .and_then(serde_json::Value::as_array)
        .and_then(|streams| {
            streams.iter().find(|s| {
                s.get("codec_type").and_then(serde_json::Value::as_str) == Some("audio")
            })
        })
        .ok_or_else(|| MasterError::engine("probe found no audio stream"))?;

    let sample_rate = stream
        .get("sample_rate")
        .and_then(serde_json::Value::as_str)
        .and_then(|s| s.parse::<u32>().ok())
        .ok_or_else(|| MasterError::engine("probe reported no sample rate"))?;
    let channels = stream
        .get("channels")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| MasterError::engine("probe reported no channel count"))?
        as u16;

    let format_name = format
        .and_then(|f| f.get("format_name"))
        .and_then(serde_json::Value::as_str)
        .unwrap_or("unknown")
        .to_string();

    Ok(ProbeInfo {
        duration_seconds,
        sample_rate,
        channels,
        format: format_name,
    })
}

/// Pull the overall level summary out of astats stderr output.
///
/// astats prints per-channel sections before the Overall section; keys
/// repeat, and the last occurrence of each is the overall value.
pub(crate) fn parse_astats(stderr: &str) -> Result<AstatsLevels> {
    let mut rms = None;
    let mut peak = None;
    let mut floor = None;
    let mut trough = None;

    for line in stderr.lines() {
        if let Some(v) = keyed_value(line, "RMS level dB") {
            rms = Some(v);
        } else if let Some(v) = keyed_value(line, "Peak level dB") {
            peak = Some(v);
        } else if let Some(v) = keyed_value(line, "Noise floor dB") {
            floor = Some(v);
        } else if let Some(v) = keyed_value(line, "RMS trough dB") {
            trough = Some(v);
        }
    }

    let rms_db = rms.ok_or_else(|| MasterError::engine("astats output carries no RMS level"))?;
    let peak_db = peak.ok_or_else(|| MasterError::engine("astats output carries no peak level"))?;
    Ok(AstatsLevels {
        rms_db,
        peak_db,
        // Older builds omit the noise floor measure; the RMS trough is
        // the closest stand-in.
        noise_floor_db: floor.or(trough).unwrap_or(f64::NEG_INFINITY),
    })
}

/// Collect quiet spans from silencedetect stderr output.
///
/// A silence run still open at end of input has no `silence_end` line;
/// it is closed at `total_seconds`.
pub(crate) fn parse_silencedetect(stderr: &str, total_seconds: f64) -> Vec<SilenceSpan> {
    let mut spans = Vec::new();
    let mut open: Option<f64> = None;

    for line in stderr.lines() {
        if let Some(v) = keyed_value(line, "silence_start") {
            open = Some(v);
        } else if let Some(v) = keyed_value(line, "silence_end") {
            if let Some(start) = open.take() {
                spans.push(SilenceSpan { start, end: v });
            }
        }
    }
    if let Some(start) = open {
        spans.push(SilenceSpan {
            start,
            end: total_seconds,
        });
    }
    spans
}

/// Combine the two detection passes into the scan the planners consume.
///
/// `silence` holds spans at the silence threshold, `floor` spans at the
/// noise-floor ceiling. The floor threshold is the stricter one, so
/// floor runs never extend past silence runs (clamped against drift).
pub(crate) fn compose_scan(
    silence: &[SilenceSpan],
    floor: &[SilenceSpan],
    total_seconds: f64,
    floor_db: f64,
) -> SilenceScan {
    let (head, tail) = edge_runs(silence, total_seconds);
    let (head_tone, tail_tone) = edge_runs(floor, total_seconds);
    let all_silent = silence
        .iter()
        .any(|s| s.start <= EDGE_EPSILON && s.end >= total_seconds - EDGE_EPSILON);

    // The window level is not measured separately; it qualified at the
    // scan threshold, which is recorded as its level bound.
    let quiet_window = longest_interior(floor, total_seconds)
        .map(|s| QuietWindow::new(s.start, s.duration(), floor_db));

    SilenceScan {
        head: EdgeRun::new(head, head_tone.min(head)),
        tail: EdgeRun::new(tail, tail_tone.min(tail)),
        quiet_window,
        all_silent,
    }
}

fn edge_runs(spans: &[SilenceSpan], total_seconds: f64) -> (f64, f64) {
    let head = spans
        .iter()
        .find(|s| s.start <= EDGE_EPSILON)
        .map_or(0.0, |s| s.end.min(total_seconds));
    let tail = spans
        .iter()
        .find(|s| s.end >= total_seconds - EDGE_EPSILON)
        .map_or(0.0, |s| total_seconds - s.start.max(0.0));
    (head, tail)
}

fn longest_interior(spans: &[SilenceSpan], total_seconds: f64) -> Option<SilenceSpan> {
    spans
        .iter()
        .filter(|s| s.start > EDGE_EPSILON && s.end < total_seconds - EDGE_EPSILON)
        .max_by(|a, b| a.duration().total_cmp(&b.duration()))
        .copied()
}

/// Value after `key` on a log line, tolerating the module prefix and a
/// trailing field separated by `|`.
fn keyed_value(line: &str, key: &str) -> Option<f64> {
    let (_, rest) = line.split_once(key)?;
    let token = rest
        .trim_start_matches(':')
        .trim_start()
        .split(|c: char| c.is_whitespace() || c == '|')
        .next()?;
    token.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROBE_JSON: &str = r#"{
        "streams": [
            {
                "index": 0,
                "codec_name": "pcm_s16le",
                "codec_type": "audio",
                "sample_rate": "44100",
                "channels": 1
            }
        ],
        "format": {
            "filename": "chapter.wav",
            "format_name": "wav",
            "duration": "614.250000",
            "bit_rate": "705600"
        }
    }"#;

    const ASTATS_STDERR: &str = "\
[Parsed_astats_0 @ 0x5599e3b4f2c0] Channel: 1\n\
[Parsed_astats_0 @ 0x5599e3b4f2c0] Peak level dB: -5.877712\n\
[Parsed_astats_0 @ 0x5599e3b4f2c0] RMS level dB: -21.339914\n\
[Parsed_astats_0 @ 0x5599e3b4f2c0] Overall\n\
[Parsed_astats_0 @ 0x5599e3b4f2c0] DC offset: 0.000002\n\
[Parsed_astats_0 @ 0x5599e3b4f2c0] Peak level dB: -6.021000\n\
[Parsed_astats_0 @ 0x5599e3b4f2c0] RMS level dB: -20.481534\n\
[Parsed_astats_0 @ 0x5599e3b4f2c0] RMS trough dB: -64.911213\n\
[Parsed_astats_0 @ 0x5599e3b4f2c0] Noise floor dB: -61.204987\n\
[Parsed_astats_0 @ 0x5599e3b4f2c0] Number of samples: 27088200\n";

    const SILENCE_STDERR: &str = "\
[silencedetect @ 0x55f0a1b2c3d0] silence_start: 0\n\
[silencedetect @ 0x55f0a1b2c3d0] silence_end: 3.2 | silence_duration: 3.2\n\
size=N/A time=00:02:30.00 bitrate=N/A speed= 512x\n\
[silencedetect @ 0x55f0a1b2c3d0] silence_start: 88.75\n\
[silencedetect @ 0x55f0a1b2c3d0] silence_end: 92.5 | silence_duration: 3.75\n\
[silencedetect @ 0x55f0a1b2c3d0] silence_start: 147.25\n";

    #[test]
    fn probe_json_yields_stream_facts() {
        let info = parse_probe(PROBE_JSON).unwrap();
        assert_eq!(info.duration_seconds, 614.25);
        assert_eq!(info.sample_rate, 44_100);
        assert_eq!(info.channels, 1);
        assert_eq!(info.format, "wav");
    }

    #[test]
    fn probe_without_audio_stream_is_an_error() {
        let json = r#"{"streams": [{"codec_type": "video"}], "format": {"duration": "1.0"}}"#;
        assert!(parse_probe(json).is_err());
        assert!(parse_probe("not json").is_err());
    }

    #[test]
    fn astats_takes_the_overall_section() {
        let levels = parse_astats(ASTATS_STDERR).unwrap();
        assert_eq!(levels.rms_db, -20.481534);
        assert_eq!(levels.peak_db, -6.021);
        assert_eq!(levels.noise_floor_db, -61.204987);
    }

    #[test]
    fn astats_falls_back_to_the_rms_trough() {
        let stderr = "\
[Parsed_astats_0 @ 0x1] Overall\n\
[Parsed_astats_0 @ 0x1] Peak level dB: -4.0\n\
[Parsed_astats_0 @ 0x1] RMS level dB: -19.5\n\
[Parsed_astats_0 @ 0x1] RMS trough dB: -66.0\n";
        let levels = parse_astats(stderr).unwrap();
        assert_eq!(levels.noise_floor_db, -66.0);
    }

    #[test]
    fn astats_parses_digital_silence_as_negative_infinity() {
        let stderr = "\
[Parsed_astats_0 @ 0x1] Overall\n\
[Parsed_astats_0 @ 0x1] Peak level dB: -inf\n\
[Parsed_astats_0 @ 0x1] RMS level dB: -inf\n";
        let levels = parse_astats(stderr).unwrap();
        assert!(levels.rms_db.is_infinite());
        assert!(levels.peak_db.is_infinite());
    }

    #[test]
    fn astats_without_levels_is_an_error() {
        assert!(parse_astats("frame=  100 fps=0.0").is_err());
    }

    #[test]
    fn silencedetect_pairs_and_closes_spans() {
        let spans = parse_silencedetect(SILENCE_STDERR, 150.0);
        assert_eq!(
            spans,
            vec![
                SilenceSpan {
                    start: 0.0,
                    end: 3.2
                },
                SilenceSpan {
                    start: 88.75,
                    end: 92.5
                },
                SilenceSpan {
                    start: 147.25,
                    end: 150.0
                },
            ]
        );
    }

    #[test]
    fn scan_composition_anchors_edges_and_picks_the_longest_window() {
        let silence = parse_silencedetect(SILENCE_STDERR, 150.0);
        let floor = vec![
            SilenceSpan {
                start: 0.0,
                end: 2.8,
            },
            SilenceSpan {
                start: 89.0,
                end: 91.0,
            },
            SilenceSpan {
                start: 147.5,
                end: 150.0,
            },
        ];

        let scan = compose_scan(&silence, &floor, 150.0, -62.0);
        assert_eq!(scan.head.seconds, 3.2);
        assert_eq!(scan.head.tone_seconds, 2.8);
        assert_eq!(scan.tail.seconds, 150.0 - 147.25);
        assert_eq!(scan.tail.tone_seconds, 2.5);
        assert!(!scan.all_silent);

        let window = scan.quiet_window.unwrap();
        assert_eq!(window.start_seconds, 89.0);
        assert_eq!(window.duration_seconds, 2.0);
        assert_eq!(window.rms_db, -62.0);
    }

    #[test]
    fn scan_with_one_covering_span_is_all_silent() {
        let spans = vec![SilenceSpan {
            start: 0.0,
            end: 30.0,
        }];
        let scan = compose_scan(&spans, &spans, 30.0, -60.0);
        assert!(scan.all_silent);
        assert_eq!(scan.head.seconds, 30.0);
        assert_eq!(scan.tail.seconds, 30.0);
        assert!(scan.quiet_window.is_none());
    }

    #[test]
    fn scan_with_no_spans_reports_signal_everywhere() {
        let scan = compose_scan(&[], &[], 60.0, -60.0);
        assert_eq!(scan.head, EdgeRun::default());
        assert_eq!(scan.tail, EdgeRun::default());
        assert!(scan.quiet_window.is_none());
        assert!(!scan.all_silent);
    }

    #[test]
    fn tone_runs_never_exceed_silence_runs() {
        // Drifted floor span ending a hair past the silence span.
        let silence = vec![SilenceSpan {
            start: 0.0,
            end: 3.0,
        }];
        let floor = vec![SilenceSpan {
            start: 0.0,
            end: 3.04,
        }];
        let scan = compose_scan(&silence, &floor, 100.0, -60.0);
        assert_eq!(scan.head.tone_seconds, scan.head.seconds);
    }
}
