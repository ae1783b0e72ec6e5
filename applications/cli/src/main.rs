/// Shellac - batch audiobook mastering
use std::process::ExitCode;

use clap::Parser;
use shellac_cli::cli::Cli;
use shellac_cli::config::AppConfig;
use shellac_cli::report::render_report;
use shellac_ffmpeg::FfmpegEngine;
use shellac_pipeline::Orchestrator;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<ExitCode> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "shellac=info,shellac_core=info,shellac_pipeline=info,shellac_ffmpeg=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    cli.apply_to(&mut config);
    config.validate()?;

    let engine = FfmpegEngine::discover(config.engine_config())?;
    let report = Orchestrator::new(&engine, config.run_config()).run()?;

    print!("{}", render_report(&report));

    if report.is_clean() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
