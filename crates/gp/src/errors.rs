use thiserror::Error;

/// A result type for GP posterior computations
pub type Result<T> = std::result::Result<T, GpError>;

/// An error when using a [`GaussianProcess`](crate::GaussianProcess) model
#[derive(Error, Debug)]
pub enum GpError {
    /// When two points do not live in the same space
    #[error("Dimension mismatch: expected {expected} components, got {actual}")]
    DimensionMismatch {
        /// Expected number of components
        expected: usize,
        /// Actual number of components
        actual: usize,
    },
    /// When the covariance matrix cannot be factorized, typically due to
    /// duplicate points sampled with zero noise. The caller may add jitter
    /// or reject the offending point; inputs are never perturbed silently.
    #[error("Singular covariance matrix: {0}")]
    SingularCovariance(#[from] linfa_linalg::LinalgError),
    /// When an error is due to a bad value
    #[error("InvalidValue error: {0}")]
    InvalidValue(String),
}
