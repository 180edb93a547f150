use thiserror::Error;

/// A result type for the batch point-selection engine
pub type Result<T> = std::result::Result<T, NextPointsError>;

/// An error for the Constant Liar batch point-selection engine
#[derive(Error, Debug)]
pub enum NextPointsError {
    /// When the domain bounds or another input fail validation before any
    /// computation begins
    #[error("Invalid domain: {0}")]
    InvalidDomain(String),
    /// When the acquisition surface is flat or non-improving. This is a
    /// legitimate terminal signal, not a hard failure: callers should treat
    /// it as "converged, no further improvement expected". Carries the best
    /// (non-positive) expected improvement found.
    #[error("No improvement found: best expected improvement {0} is not positive")]
    NoImprovementFound(f64),
    /// When a GP model computation fails
    #[error(transparent)]
    GpError(#[from] nextpoint_gp::GpError),
}
