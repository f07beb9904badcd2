//! The `run` and `inspect` commands.

use super::PipelineError;
use super::config::RunConfig;
use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use merton::{BatchOrchestrator, VERSION};
use merton_data::{DataError, Panel, TradingCalendar};
use merton_model::{Method, solver_for};
use merton_output::{ExportFormat, Exporter, MethodSummary, PanelSummary, ResultTable, RunSummary};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// File name of the run summary.
const SUMMARY_FILE: &str = "run_summary.json";

/// Inputs of a batch run.
#[derive(Debug)]
pub(crate) struct RunRequest {
    pub(crate) panel: PathBuf,
    pub(crate) calendar: Option<PathBuf>,
    pub(crate) derive_calendar: bool,
    pub(crate) output_dir: PathBuf,
    pub(crate) methods: Vec<Method>,
    pub(crate) config: RunConfig,
    pub(crate) timings: bool,
    pub(crate) progress: bool,
}

fn load_calendar(request: &RunRequest, panel: &Panel) -> Result<TradingCalendar, PipelineError> {
    let calendar = match (&request.calendar, request.derive_calendar) {
        (Some(path), _) => {
            info!(path = %path.display(), "Reading trading calendar");
            TradingCalendar::from_path(path)?
        }
        (None, true) => {
            warn!("Deriving the trading calendar from panel dates");
            panel.derive_calendar()?
        }
        (None, false) => return Err(PipelineError::MissingCalendar),
    };

    if let Some((first, last)) = panel.date_range()
        && !calendar.covers(first, last)
    {
        warn!(
            calendar_first = %calendar.first(),
            calendar_last = %calendar.last(),
            panel_first = %first,
            panel_last = %last,
            "Trading calendar does not span the panel"
        );
    }
    info!(
        trading_days = calendar.len(),
        first = %calendar.first(),
        last = %calendar.last(),
        "Trading calendar ready"
    );
    Ok(calendar)
}

fn progress_bar(len: usize, visible: bool) -> Result<ProgressBar, PipelineError> {
    if !visible {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(len as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("█▓░"),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

/// Run every requested method and write the outputs.
pub(crate) fn run_batch(request: RunRequest) -> Result<RunSummary, PipelineError> {
    let started_at = Local::now();
    let started = Instant::now();
    info!(version = VERSION, started_at = %started_at.to_rfc3339(), "Merton run started");

    let RunConfig { model, engine } = request.config.clone();
    model.validate()?;

    let panel = Panel::from_path(&request.panel)?;
    if panel.is_empty() {
        return Err(DataError::EmptyPanel.into());
    }
    let calendar = load_calendar(&request, &panel)?;
    info!(lag = %model.lag, "Look-back convention");

    std::fs::create_dir_all(&request.output_dir)?;
    let orchestrator = BatchOrchestrator::new(engine)?;

    let mut methods = Vec::with_capacity(request.methods.len());
    for method in &request.methods {
        let solver = solver_for(*method, model);
        let pb = progress_bar(panel.groups().len(), request.progress)?;
        pb.set_message(format!("{} method", method));

        let output =
            orchestrator.run_with_progress(panel.groups(), &calendar, solver.as_ref(), |_| {
                pb.inc(1);
            })?;
        pb.finish_with_message(format!("{}: {} rows", method, output.results.len()));

        let mut table = ResultTable::new(*method, &output.results);
        if !request.timings {
            table = table.without_timings();
        }
        let path = request.output_dir.join(table.file_name());
        table.export_to_file(&path, ExportFormat::Pipe)?;
        info!(%method, rows = table.len(), path = %path.display(), "Result table written");

        methods.push(MethodSummary::new(&output.results, output.diagnostics));
    }

    let summary = RunSummary {
        version: VERSION.to_string(),
        started_at: started_at.to_rfc3339(),
        lag_convention: model.lag.to_string(),
        derived_calendar: request.calendar.is_none(),
        panel: PanelSummary::new(panel.stats(), panel.groups().len()),
        methods,
    };
    let summary_path = request.output_dir.join(SUMMARY_FILE);
    summary.export_to_file(&summary_path, ExportFormat::PrettyJson)?;

    info!(
        finished_at = %Local::now().to_rfc3339(),
        elapsed_secs = started.elapsed().as_secs_f64(),
        summary = %summary_path.display(),
        "Merton run finished"
    );
    Ok(summary)
}

/// Print panel statistics without running a model.
pub(crate) fn inspect(panel_path: &Path) -> Result<(), PipelineError> {
    let panel = Panel::from_path(panel_path)?;
    let stats = panel.stats();

    println!("Panel: {}", panel_path.display());
    println!("  rows read:              {}", stats.rows_read);
    println!("  dropped (missing E):    {}", stats.dropped_missing_equity);
    println!("  dropped (zero E/D/rf):  {}", stats.dropped_zero_inputs);
    println!("  duplicate keys:         {}", stats.duplicate_keys);
    println!("  rows kept:              {}", stats.rows_kept);
    println!("  firm groups:            {}", panel.groups().len());
    match panel.date_range() {
        Some((first, last)) => println!("  date range:             {} to {}", first, last),
        None => println!("  date range:             (empty)"),
    }

    let longest = panel.groups().iter().max_by_key(|g| g.len());
    if let Some(group) = longest {
        println!("  longest group:          {} ({} rows)", group.key(), group.len());
    }
    Ok(())
}
