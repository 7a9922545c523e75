//! Collaborator traits for diffstat
//!
//! This module defines the trait seam between the fit/inference core and
//! the statistical model it operates on: inference logic depends on these
//! traits, never on a concrete model implementation.
//!
//! Both traits are generic over [`Scalar`] so that a model written once
//! evaluates with `f64` and differentiates with [`Dual`](ds_ad::dual::Dual)
//! through the same code path.

use crate::Result;
use ds_ad::scalar::Scalar;

/// A differentiable statistical model over a fixed-length parameter vector.
///
/// Parameter vectors are ordered; component 0 is the signal-strength
/// parameter (POI). Two coordinate systems exist for the same vector:
/// the *bounded* one described by [`suggested_bounds`](Self::suggested_bounds)
/// and the unconstrained one used internally by the fit component.
pub trait DensityModel<S: Scalar>: Send + Sync {
    /// Number of parameters.
    fn n_params(&self) -> usize;

    /// Per-component (lower, upper) bounds, positionally matching the
    /// parameter vector. Must satisfy `lower < upper` for every component.
    fn suggested_bounds(&self) -> Vec<(f64, f64)>;

    /// Log-density of `data` under `pars` (bounded space).
    fn logpdf(&self, pars: &[S], data: &[S]) -> Result<S>;

    /// Expected (Asimov) dataset under `pars`, including any auxiliary
    /// (constraint) observations.
    fn expected_data(&self, pars: &[S]) -> Result<Vec<S>>;
}

/// Builds a model (and its background-only parameter point) from upstream
/// parameters, e.g. the weights of a network that shapes histogram yields.
///
/// `Hyper` is the builder-specific configuration block (bandwidths, bin
/// edges, luminosity scales, ...). The fit and inference components pass it
/// through untouched.
pub trait ModelMaker: Send + Sync {
    /// Builder-specific hyperparameter block, passed through opaquely.
    type Hyper: Sync;

    /// Model type produced for scalar `S`.
    type Model<S: Scalar>: DensityModel<S>;

    /// Construct a model and its background-only (null hypothesis)
    /// parameter point from upstream parameters.
    fn make<S: Scalar>(
        &self,
        upstream: &[S],
        hyper: Option<&Self::Hyper>,
    ) -> Result<(Self::Model<S>, Vec<S>)>;
}
