//! Error types for diffstat

use thiserror::Error;

/// diffstat error type
#[derive(Error, Debug)]
pub enum Error {
    /// Inverse-transform input outside its bounded interval.
    #[error("Domain error: {0}")]
    Domain(String),

    /// A bounds pair with lower >= upper (or non-finite endpoints).
    #[error("Degenerate bounds: {0}")]
    DegenerateBounds(String),

    /// Input contract violation (unknown p-value key, length mismatch, ...).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The optimizer exhausted its iteration/tolerance budget.
    ///
    /// Never retried internally; retry policy (different initial point,
    /// relaxed tolerance) belongs to the caller.
    #[error("Fit did not converge: {0}")]
    FitNonConvergence(String),

    /// Numerical failure outside the categories above.
    #[error("Computation error: {0}")]
    Computation(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
