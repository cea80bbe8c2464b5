mod bootstrap;

use anyhow::{Context, Result};
use report_core::settings::Settings;
use report_runtime::orchestrator::{PipelineConfig, ReportPipeline};

fn main() -> Result<()> {
    let settings = Settings::load();

    bootstrap::setup_logging(&settings.log_level)?;
    settings.validate()?;

    tracing::info!("Report filter v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Inputs: {}, output: {}",
        settings.data_dir.display(),
        settings.output.display()
    );

    let pipeline = ReportPipeline::new(PipelineConfig::from(&settings));

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let outcome = pipeline
        .run(&mut out)
        .context("report consolidation failed")?;

    tracing::info!(
        "Done: {} parsed, {} dropped, {} exported across {} services",
        outcome.total_parsed(),
        outcome.dropped,
        outcome.exported,
        outcome.counts.len()
    );

    Ok(())
}
