use std::path::PathBuf;

use thiserror::Error;

/// Conditions the presentation layer must be able to distinguish from
/// ordinary I/O or parse failures.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// One or both source exports are absent. Reported once, before any
    /// table is touched.
    #[error("data unavailable: source file {0:?} not found")]
    DataUnavailable(PathBuf),
    /// A column the pipeline depends on is missing from the header row.
    #[error("column '{0}' not found in table headers")]
    MissingColumn(String),
}
