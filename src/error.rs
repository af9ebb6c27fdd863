use thiserror::Error;

/// Errors returned by the SNN clustering pipeline.
///
/// Every variant is raised before any index or graph is built; a failed call
/// leaves nothing behind.
#[derive(Debug, Error)]
pub enum Error {
    /// Input slice is empty.
    #[error("empty input")]
    EmptyInput,

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Human-readable explanation.
        message: &'static str,
    },

    /// Not enough points to find `k` neighbors distinct from each query.
    #[error(
        "insufficient points: k = {k} needs at least {needed} points, but dataset has {n_items}",
        needed = .k + 1
    )]
    InsufficientPoints {
        /// Requested neighbors per point.
        k: usize,
        /// Number of items in the dataset.
        n_items: usize,
    },

    /// Points in a dataset have inconsistent dimensionality.
    #[error("dimension mismatch at row {row}: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimensionality (taken from the first row).
        expected: usize,
        /// Found dimensionality.
        found: usize,
        /// Offending row.
        row: usize,
    },

    /// A coordinate is NaN or infinite.
    #[error("non-finite coordinate at row {row}")]
    NonFiniteCoordinate {
        /// Offending row.
        row: usize,
    },

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error rejects the parameters (or the amount of data they
    /// require) rather than the shape of the input rows.
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(
            self,
            Error::EmptyInput | Error::InvalidParameter { .. } | Error::InsufficientPoints { .. }
        )
    }
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;
