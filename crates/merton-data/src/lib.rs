#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/merton/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod calendar;
pub mod error;
pub mod observation;
pub mod panel;

pub use calendar::{DEFAULT_LOOKBACK_DAYS, LagConvention, TradingCalendar};
pub use error::{DataError, Result};
pub use observation::{FirmGroup, FirmKey, ModelInputs, Observation};
pub use panel::{LoadStats, Panel};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
