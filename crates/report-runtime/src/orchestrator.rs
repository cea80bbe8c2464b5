//! The consolidation pipeline.
//!
//! Runs strictly in order: collect (tabular, then markup, then
//! object-notation) → filter → sort → aggregate → export → summarize. Any
//! failure aborts the run; nothing after the failing stage executes, so a
//! parse error never touches the export file.

use std::io::Write;
use std::path::{Path, PathBuf};

use report_core::error::{ReportError, Result};
use report_core::formatting::SUMMARY_HEADER;
use report_core::models::{Report, SourceFormat};
use report_core::settings::Settings;
use report_core::time_utils::TimeCodec;
use report_data::aggregator::ServiceCounts;
use report_data::markup::MarkupParser;
use report_data::object_notation::ObjectNotationParser;
use report_data::reader::{load_reports, ReportParser};
use report_data::tabular::TabularParser;
use report_data::writer::export_to_file;

// ── PipelineConfig ────────────────────────────────────────────────────────────

/// Input and output locations for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub tabular_input: PathBuf,
    pub markup_input: PathBuf,
    pub object_notation_input: PathBuf,
    /// Consolidated export path.
    pub output_path: PathBuf,
}

impl PipelineConfig {
    /// Config with the conventional file names under `data_dir`.
    pub fn in_dir(data_dir: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            tabular_input: data_dir.join("reports.csv"),
            markup_input: data_dir.join("reports.xml"),
            object_notation_input: data_dir.join("reports.json"),
            output_path: output_path.into(),
        }
    }

    /// Path of the input for `format`.
    pub fn input_path(&self, format: SourceFormat) -> &Path {
        match format {
            SourceFormat::Tabular => &self.tabular_input,
            SourceFormat::Markup => &self.markup_input,
            SourceFormat::ObjectNotation => &self.object_notation_input,
        }
    }
}

impl From<&Settings> for PipelineConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            tabular_input: settings.input_path(SourceFormat::Tabular),
            markup_input: settings.input_path(SourceFormat::Markup),
            object_notation_input: settings.input_path(SourceFormat::ObjectNotation),
            output_path: settings.output.clone(),
        }
    }
}

// ── PipelineOutcome ───────────────────────────────────────────────────────────

/// What a successful run did.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Reports parsed from each input, in visiting order.
    pub parsed: Vec<(SourceFormat, usize)>,
    /// Reports removed by the validity filter.
    pub dropped: usize,
    /// Reports written to the export.
    pub exported: usize,
    /// Per-service counts over the exported reports.
    pub counts: ServiceCounts,
}

impl PipelineOutcome {
    /// Total reports read across all inputs.
    pub fn total_parsed(&self) -> usize {
        self.parsed.iter().map(|(_, n)| n).sum()
    }
}

// ── Stages ────────────────────────────────────────────────────────────────────

/// Drop every report that serviced no packets. Relative order is kept.
pub fn filter_valid(reports: Vec<Report>) -> Vec<Report> {
    reports.into_iter().filter(Report::is_valid).collect()
}

/// Stable ascending sort by request time.
pub fn sort_by_request_time(reports: &mut [Report]) {
    reports.sort_by_key(Report::request_time);
}

/// Print the summary header and one line per service.
pub fn write_summary<W: Write>(out: &mut W, counts: &ServiceCounts) -> Result<()> {
    writeln!(out, "{}", SUMMARY_HEADER)?;
    for line in counts.summary_lines() {
        writeln!(out, "{}", line)?;
    }
    out.flush()?;
    Ok(())
}

// ── ReportPipeline ────────────────────────────────────────────────────────────

/// Runs the full consolidation for one [`PipelineConfig`].
///
/// # Example
/// ```no_run
/// use report_runtime::orchestrator::{PipelineConfig, ReportPipeline};
///
/// let pipeline = ReportPipeline::new(PipelineConfig::in_dir("./reports", "output.csv"));
/// let outcome = pipeline.run(&mut std::io::stdout()).expect("pipeline failed");
/// println!("exported {} reports", outcome.exported);
/// ```
pub struct ReportPipeline {
    config: PipelineConfig,
    codec: TimeCodec,
}

impl ReportPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            codec: TimeCodec::new(),
        }
    }

    /// Parse all three inputs and concatenate them in visiting order.
    pub fn collect(&self) -> Result<(Vec<Report>, Vec<(SourceFormat, usize)>)> {
        let mut reports = Vec::new();
        let mut parsed = Vec::with_capacity(SourceFormat::ALL.len());

        for format in SourceFormat::ALL {
            let path = self.config.input_path(format);
            let batch = match format {
                SourceFormat::Tabular => self.load(&TabularParser::new(self.codec), path)?,
                SourceFormat::Markup => self.load(&MarkupParser::new(self.codec), path)?,
                SourceFormat::ObjectNotation => {
                    self.load(&ObjectNotationParser::new(self.codec), path)?
                }
            };
            parsed.push((format, batch.len()));
            reports.extend(batch);
        }

        Ok((reports, parsed))
    }

    fn load<P: ReportParser>(&self, parser: &P, path: &Path) -> Result<Vec<Report>> {
        let reports = load_reports(parser, path)?;
        let format = P::FORMAT;
        tracing::info!(
            format = %format,
            count = reports.len(),
            "parsed {}",
            path.display()
        );
        Ok(reports)
    }

    /// Run every stage, writing the summary to `summary_out`.
    pub fn run<W: Write>(&self, summary_out: &mut W) -> Result<PipelineOutcome> {
        let (reports, parsed) = self
            .collect()
            .map_err(|e| abort("collect", e))?;

        let total = reports.len();
        let mut reports = filter_valid(reports);
        let dropped = total - reports.len();
        tracing::info!(kept = reports.len(), dropped, "filtered reports");

        sort_by_request_time(&mut reports);

        let counts = ServiceCounts::from_reports(&reports);
        tracing::debug!(services = counts.len(), "aggregated service counts");

        export_to_file(&self.config.output_path, &reports, &self.codec)
            .map_err(|e| abort("export", e))?;
        tracing::info!(
            rows = reports.len(),
            "export written to {}",
            self.config.output_path.display()
        );

        write_summary(summary_out, &counts).map_err(|e| abort("summarize", e))?;

        Ok(PipelineOutcome {
            parsed,
            dropped,
            exported: reports.len(),
            counts,
        })
    }
}

fn abort(stage: &str, err: ReportError) -> ReportError {
    tracing::error!(stage, error = %err, "pipeline aborted");
    err
}

// ── Tests ─────────────────────────────────────────────────────────────────────
