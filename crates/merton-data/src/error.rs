//! Error types for data operations.

use thiserror::Error;

/// Result type for data operations.
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur while loading the panel or the trading calendar.
#[derive(Debug, Error)]
pub enum DataError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Delimited-file reader error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Data parsing error
    #[error("Parse error at line {line}: {reason}")]
    Parse {
        /// 1-based line number in the source file
        line: u64,
        /// What could not be parsed
        reason: String,
    },

    /// A required column is missing from the header
    #[error("Missing required column '{column}' in {source_name}")]
    MissingColumn {
        /// Column name (or accepted aliases)
        column: String,
        /// Which input the column was expected in
        source_name: String,
    },

    /// The trading calendar holds no dates
    #[error("Trading calendar is empty")]
    EmptyCalendar,

    /// The panel holds no usable observations after filtering
    #[error("Panel contains no usable observations")]
    EmptyPanel,
}
