//! # ds-ad
//!
//! Forward-mode automatic differentiation for diffstat.
//!
//! Provides:
//! - [`dual::Dual`] numbers (one tangent per pass — efficient for the small
//!   parameter counts of this core)
//! - the [`scalar::Scalar`] trait for writing likelihood/transform code once
//!   and reusing it for both evaluation and gradient computation

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dual;
pub mod scalar;

pub use dual::Dual;
pub use scalar::Scalar;
