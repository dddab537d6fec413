//! Error types for the candidate-selection engine.

use thiserror::Error;

/// Errors that can occur while validating caller-supplied input tables.
///
/// These are fatal: a missing or malformed column is a programming error in
/// the caller, not a property of the data, so it is surfaced rather than
/// silently degraded.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// A required column is absent from the supplied table.
    #[error("missing required column: {0}")]
    MissingColumn(String),

    /// A column is present but has the wrong length relative to the table's
    /// row count.
    #[error("column '{column}' has length {found}, expected {expected}")]
    LengthMismatch {
        /// Name of the offending column.
        column: String,
        /// Length the table's row count requires.
        expected: usize,
        /// Length actually observed.
        found: usize,
    },

    /// A requested calibrated column (`rt_calibrated`, `mobility_calibrated`,
    /// `mz_calibrated`) was selected via [`crate::config::ColumnChoice`] but
    /// is not present on the table.
    #[error("calibrated column '{0}' was requested but is not present")]
    MissingCalibratedColumn(String),

    /// Fragment index ranges on the precursor table are not non-overlapping
    /// and contiguous as required by the data model.
    #[error("fragment range for precursor row {row} is invalid: [{start}, {stop})")]
    InvalidFragmentRange {
        /// Row index in the precursor table.
        row: usize,
        /// Start of the claimed fragment range.
        start: u32,
        /// (Exclusive) stop of the claimed fragment range.
        stop: u32,
    },
}

/// Top-level error type for the engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Input validation failed before any group processing started.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// A worker thread in the [`crate::executor::ParallelExecutor`] panicked.
    /// Per the engine's error philosophy, this aborts the run and discards
    /// any partial output rather than returning it.
    #[error("worker panicked while processing elution group {elution_group_idx}: {message}")]
    WorkerPanic {
        /// Elution group being processed when the panic occurred.
        elution_group_idx: u32,
        /// Panic payload, downcast to a string where possible.
        message: String,
    },
}
