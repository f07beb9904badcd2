#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/merton/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod diagnostics;
pub mod pricing;
pub mod root;
pub mod solver;
pub mod volatility;
pub mod window;

// Re-export main types
pub use config::{ConfigError, ModelConfig, RootConfig};
pub use diagnostics::{BatchDiagnostics, GroupDiagnostics};
pub use root::RootFindingError;
pub use solver::{
    Estimate, IteratedSolver, MertonSolver, Method, SimultaneousSolver, SolverError, SolverResult,
    solver_for,
};
pub use volatility::VolatilityEstimate;
pub use window::{EvaluationWindow, evaluation_window, month_end_dates};
