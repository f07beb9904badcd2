//! Parallel fan-out over firm groups.

use super::group::{GroupOutput, process_group};
use merton_data::{FirmGroup, TradingCalendar};
use merton_model::{BatchDiagnostics, ConfigError, MertonSolver, Method, SolverResult};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;
use tracing::info;

/// Errors that stop a batch before it starts.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The worker pool could not be built
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] ThreadPoolBuildError),

    /// The solver's model configuration is invalid
    #[error("Invalid model configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Worker threads; 0 uses the available parallelism
    pub threads: usize,
}

/// All rows of one method, sorted by firm key and date.
#[derive(Debug, Clone)]
pub struct BatchOutput {
    /// Method run
    pub method: Method,
    /// Result table rows
    pub results: Vec<SolverResult>,
    /// Batch totals
    pub diagnostics: BatchDiagnostics,
}

/// Runs a solver over every firm group on a fixed-size worker pool.
#[derive(Debug)]
pub struct BatchOrchestrator {
    pool: ThreadPool,
}

impl BatchOrchestrator {
    /// Build the worker pool.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .thread_name(|i| format!("merton-worker-{}", i))
            .build()?;
        Ok(Self { pool })
    }

    /// Worker threads in the pool.
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Run `solver` over `groups`.
    pub fn run(
        &self,
        groups: &[FirmGroup],
        calendar: &TradingCalendar,
        solver: &dyn MertonSolver,
    ) -> Result<BatchOutput, EngineError> {
        self.run_with_progress(groups, calendar, solver, |_| {})
    }

    /// Run `solver` over `groups`, calling `on_group` as each group finishes.
    ///
    /// `on_group` is called from worker threads in completion order.
    pub fn run_with_progress<F>(
        &self,
        groups: &[FirmGroup],
        calendar: &TradingCalendar,
        solver: &dyn MertonSolver,
        on_group: F,
    ) -> Result<BatchOutput, EngineError>
    where
        F: Fn(&GroupOutput) + Sync,
    {
        solver.config().validate()?;
        let method = solver.method();
        let threads = self.threads();
        info!(%method, groups = groups.len(), threads, "Starting batch");

        let started = Instant::now();
        let outputs: Vec<GroupOutput> = self.pool.install(|| {
            groups
                .par_iter()
                .map(|group| {
                    let output = process_group(group, calendar, solver);
                    on_group(&output);
                    output
                })
                .collect()
        });

        let mut diagnostics = BatchDiagnostics::new(method, threads);
        let mut results = Vec::with_capacity(outputs.iter().map(|o| o.results.len()).sum());
        for output in outputs {
            diagnostics.record(&output.diagnostics);
            results.extend(output.results);
        }
        results.sort_by(|a, b| a.key.cmp(&b.key).then(a.date.cmp(&b.date)));
        diagnostics.wall_secs = started.elapsed().as_secs_f64();

        info!(
            %method,
            rows = results.len(),
            non_converged = diagnostics.totals.non_converged,
            skipped = diagnostics.totals.skipped(),
            wall_secs = diagnostics.wall_secs,
            "Batch finished"
        );

        Ok(BatchOutput {
            method,
            results,
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use merton_model::{ModelConfig, solver_for};

    #[test]
    fn test_pool_size_is_configurable() {
        let engine = BatchOrchestrator::new(EngineConfig { threads: 3 }).unwrap();
        assert_eq!(engine.threads(), 3);
    }

    #[test]
    fn test_invalid_model_config_is_rejected() {
        let config = ModelConfig {
            max_iter: 0,
            ..Default::default()
        };
        let solver = solver_for(Method::Iterated, config);
        let calendar =
            TradingCalendar::new(vec![chrono::NaiveDate::from_ymd_opt(2000, 1, 3).unwrap()]).unwrap();
        let engine = BatchOrchestrator::new(EngineConfig { threads: 1 }).unwrap();
        assert!(matches!(
            engine.run(&[], &calendar, solver.as_ref()),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn test_empty_batch_gives_empty_table() {
        let solver = solver_for(Method::Simultaneous, ModelConfig::default());
        let calendar =
            TradingCalendar::new(vec![chrono::NaiveDate::from_ymd_opt(2000, 1, 3).unwrap()]).unwrap();
        let engine = BatchOrchestrator::new(EngineConfig::default()).unwrap();
        let output = engine.run(&[], &calendar, solver.as_ref()).unwrap();
        assert!(output.results.is_empty());
        assert_eq!(output.diagnostics.groups, 0);
    }
}
