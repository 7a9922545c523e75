//! # ds-inference
//!
//! The apex of diffstat: the expected-CLs statistic as a differentiable
//! function of upstream model parameters.
//!
//! [`ExpectedCls`] orchestrates model construction, Asimov-data generation,
//! the constrained profile fit, and the analytic CLs/CLsb/CLb assembly;
//! [`ExpectedCls::evaluate_with_grad`] propagates exact derivatives back to
//! the upstream parameters through the whole chain.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod expected_cls;

pub use expected_cls::{ExpectedCls, PValue, parse_pvalues};

// The reparameterization transforms are part of this crate's public
// surface; model builders use them to seed fits in unconstrained space.
pub use ds_fit::transforms;
