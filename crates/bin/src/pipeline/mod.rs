//! Run pipeline: configuration, logging and the batch run itself.
//!
//! Loads the panel and trading calendar, runs each requested method through
//! the batch engine and writes the result tables and run summary.

pub(crate) mod config;
pub(crate) mod logging;
pub(crate) mod run;

use merton::EngineError;
use merton_data::DataError;
use merton_model::ConfigError;
use merton_output::ExportError;

/// Error type for pipeline operations.
#[derive(Debug, thiserror::Error)]
pub(crate) enum PipelineError {
    /// Panel or calendar could not be loaded.
    #[error("Data error: {0}")]
    Data(#[from] DataError),
    /// Invalid model configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Engine could not start.
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
    /// Results could not be written.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),
    /// Configuration file could not be parsed.
    #[error("Config file error: {0}")]
    ConfigFile(#[from] serde_json::Error),
    /// Filesystem error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Progress bar template error.
    #[error("Progress bar error: {0}")]
    Progress(#[from] indicatif::style::TemplateError),
    /// Neither a calendar file nor `--derive-calendar` was given.
    #[error("No trading calendar: pass --calendar or --derive-calendar")]
    MissingCalendar,
}
