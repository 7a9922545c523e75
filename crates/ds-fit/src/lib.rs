//! # ds-fit
//!
//! The transform and fit components of diffstat.
//!
//! - [`transforms`] — bijective mappings between an axis-aligned bounded box
//!   and unconstrained space, used to reparameterize fit variables.
//! - [`optimizer`] — a thin L-BFGS wrapper (argmin) behind the
//!   [`optimizer::ObjectiveFunction`] trait, with box constraints via
//!   clamping and a projected-gradient rule at active bounds.
//! - [`fit`] — constrained and global maximum-likelihood fits over a
//!   [`DensityModel`](ds_core::DensityModel), differentiable with respect to
//!   upstream parameters via the implicit function theorem.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod fit;
pub mod optimizer;
pub mod transforms;

pub use fit::{ConstrainedFit, GlobalFit, SolverConfig};
pub use optimizer::{LbfgsbOptimizer, ObjectiveFunction, OptimizationResult, OptimizerConfig};
