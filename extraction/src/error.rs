//! Error types for the extraction pipeline.

use thiserror::Error;

/// Errors that can occur while running the extraction pipeline.
///
/// Per-object numerical problems (degenerate ellipses, non-convergent radius
/// searches) are never reported here; they are encoded as flag bits and
/// sentinel values in the affected catalog rows so a handful of pathological
/// objects cannot abort a run.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Array dimensions {actual:?} do not match image dimensions {expected:?}")]
    InvalidDimensions {
        /// Image shape as (rows, cols)
        expected: (usize, usize),
        /// Offending array's shape as (rows, cols)
        actual: (usize, usize),
    },

    #[error("Filter kernel must have odd dimensions, got {0}x{1}")]
    EvenKernel(usize, usize),
}
