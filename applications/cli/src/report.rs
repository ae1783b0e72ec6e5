/// End-of-run summary printed beneath the log output
use std::fmt::Write as _;
use std::path::Path;

use chrono::Utc;

use shellac_pipeline::RunReport;

/// Render the run summary: one line per delivered file, one per
/// failure, then totals and the retail sample location.
pub fn render_report(report: &RunReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "\nShellac run {}",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out);

    for output in &report.outputs {
        let _ = writeln!(
            out,
            "  {:<44} {:>9}  from {}",
            output.file_name,
            format_clock(output.duration_seconds),
            file_name(&output.source)
        );
    }
    for failure in &report.failures {
        let _ = writeln!(
            out,
            "  FAILED {} at {}: {}",
            file_name(&failure.source),
            failure.stage.label(),
            failure.error
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Delivered {} of {} assets into {} files ({} failed).",
        report.processed_assets(),
        report.assets_in,
        report.outputs.len(),
        report.failures.len()
    );
    if let Some(sample) = &report.retail_sample {
        let _ = writeln!(out, "Retail sample: {}", sample.display());
    }

    out
}

fn file_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

fn format_clock(seconds: f64) -> String {
    let total = seconds.round() as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}
