//! End-to-end report run: extract → narrate → assemble → render.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDate};
use tracing::{info, instrument, warn};

use crmreport_salesforce::{CrmSource, extract_all};
use crmreport_shared::{AppConfig, DataSummary, ReportError, ReportId, ReportLabels, Result};

use crate::assembler::assemble;
use crate::enrichment::{NarrativeGenerator, generate_sections, placeholder_sections};
use crate::prompts::{SectionKind, build_prompts};

/// Inputs for one report run.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Where the PDF is written. Parent directories are created.
    pub output_path: PathBuf,
    pub labels: ReportLabels,
    /// Report date; today (local time) when unset.
    pub date: Option<NaiveDate>,
}

impl ReportConfig {
    /// Build from the app config, with an optional output path override.
    pub fn from_app(config: &AppConfig, output: Option<PathBuf>) -> Self {
        Self {
            output_path: output.unwrap_or_else(|| config.output.report_path()),
            labels: config.report.clone(),
            date: None,
        }
    }
}

/// Result of a report run.
#[derive(Debug)]
pub struct ReportResult {
    pub report_id: ReportId,
    pub output_path: PathBuf,
    pub summary: DataSummary,
    /// Sections rendered with the unavailable sentinel.
    pub degraded_sections: Vec<SectionKind>,
    /// Whether narrative generation was skipped in favor of placeholder text.
    pub ai_skipped: bool,
    pub page_count: usize,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called before each narrative section is requested.
    fn section_started(&self, section: SectionKind, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &ReportResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn section_started(&self, _section: SectionKind, _current: usize, _total: usize) {}
    fn done(&self, _result: &ReportResult) {}
}

/// Run the full report pipeline.
///
/// 1. Extract all entities from `source`
/// 2. Generate the six narrative sections, or placeholder text when `generator` is `None`
/// 3. Assemble layout blocks
/// 4. Paginate and write the PDF
///
/// Extraction and write failures abort the run. Generation failures only
/// degrade the affected sections.
#[instrument(skip_all, fields(output = %config.output_path.display()))]
pub async fn run_report<S, G>(
    config: &ReportConfig,
    source: &S,
    generator: Option<&G>,
    progress: &dyn ProgressReporter,
) -> Result<ReportResult>
where
    S: CrmSource + Sync,
    G: NarrativeGenerator + Sync,
{
    let start = Instant::now();
    let report_id = ReportId::new();
    let date = config.date.unwrap_or_else(|| Local::now().date_naive());

    info!(%report_id, "starting report run");

    // --- Phase 1: Extraction ---
    progress.phase("Extracting CRM data");
    let data = extract_all(source).await?;
    let summary = data.summary();

    // --- Phase 2: Narrative ---
    let (sections, ai_skipped) = match generator {
        Some(generator) => {
            progress.phase("Generating AI analysis");
            let prompts = build_prompts(&data)?;
            (generate_sections(generator, &prompts, progress).await, false)
        }
        None => {
            info!("AI enrichment skipped, using placeholder text");
            (placeholder_sections(&summary, date), true)
        }
    };

    let degraded_sections = sections.degraded();
    if !degraded_sections.is_empty() {
        warn!(count = degraded_sections.len(), "some sections were rendered without analysis");
    }

    // --- Phase 3: Assembly ---
    progress.phase("Assembling document");
    let blocks = assemble(&sections, &data, &config.labels, date);

    // --- Phase 4: Render ---
    progress.phase("Writing PDF");
    let output_path = config.output_path.clone();
    let footer_label = config.labels.footer_label.clone();
    let title = format!("{} {}", config.labels.title, config.labels.subtitle);
    let page_count = tokio::task::spawn_blocking({
        let output_path = output_path.clone();
        move || crmreport_pdf::render_to_file(&blocks, &output_path, &footer_label, &title)
    })
    .await
    .map_err(|e| ReportError::Render(format!("render task failed: {e}")))??;

    let result = ReportResult {
        report_id,
        output_path,
        summary,
        degraded_sections,
        ai_skipped,
        page_count,
        elapsed: start.elapsed(),
    };

    info!(
        pages = result.page_count,
        elapsed_ms = result.elapsed.as_millis() as u64,
        "report complete"
    );

    progress.done(&result);
    Ok(result)
}
