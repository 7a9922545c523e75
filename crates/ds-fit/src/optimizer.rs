//! L-BFGS minimization of negative log-likelihoods.
//!
//! argmin's L-BFGS is unconstrained; the box constraints of a fit are
//! imposed around it by [`FeasibleBox`]: every trial point is clamped into
//! the box before evaluation, and at an active bound the gradient component
//! pointing further outside is zeroed so the line search never probes the
//! flat clamped region. A component with infinite bounds is unconstrained.
//!
//! Objectives must supply an exact gradient — fit problems compute theirs
//! with one forward-mode pass per component, and nothing here falls back to
//! finite differences.

use argmin::core::{CostFunction, Executor, Gradient, State, TerminationReason, TerminationStatus};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use ds_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Width of the band at an interval end inside which a bound counts as
/// active for gradient projection.
const ACTIVE_BOUND_EPS: f64 = 1e-12;

/// L-BFGS settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Iteration budget.
    pub max_iter: u64,
    /// Convergence tolerance on the gradient norm.
    pub tol: f64,
    /// History length of the inverse-Hessian approximation.
    pub m: usize,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self { max_iter: 1000, tol: 1e-6, m: 10 }
    }
}

/// Outcome of a minimization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    /// Best parameters found, clamped into the box.
    pub parameters: Vec<f64>,
    /// Objective value at the best parameters.
    pub fval: f64,
    /// Iterations used.
    pub n_iter: u64,
    /// Whether the solver reported convergence, as opposed to exhausting
    /// its iteration budget or failing a line search.
    pub converged: bool,
    /// Solver termination message.
    pub message: String,
}

impl fmt::Display for OptimizationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.converged { "converged" } else { self.message.as_str() };
        write!(f, "nll = {:.6} after {} iterations ({status})", self.fval, self.n_iter)
    }
}

/// A smooth objective with an exact gradient.
pub trait ObjectiveFunction: Send + Sync {
    /// Objective value at `params`.
    fn eval(&self, params: &[f64]) -> Result<f64>;

    /// Exact gradient at `params`.
    fn gradient(&self, params: &[f64]) -> Result<Vec<f64>>;
}

/// An axis-aligned box of per-component bounds.
#[derive(Clone, Copy)]
struct FeasibleBox<'a> {
    bounds: &'a [(f64, f64)],
}

impl FeasibleBox<'_> {
    fn clamp(&self, params: &[f64]) -> Vec<f64> {
        params.iter().zip(self.bounds).map(|(&v, &(lo, hi))| v.clamp(lo, hi)).collect()
    }

    /// Zero gradient components that point outside at an active bound, so
    /// the quasi-Newton direction stays feasible.
    fn project(&self, params: &[f64], grad: &mut [f64]) {
        for ((&x, &(lo, hi)), g) in params.iter().zip(self.bounds).zip(grad.iter_mut()) {
            let outward_low = x <= lo + ACTIVE_BOUND_EPS && *g > 0.0;
            let outward_high = x >= hi - ACTIVE_BOUND_EPS && *g < 0.0;
            if outward_low || outward_high {
                *g = 0.0;
            }
        }
    }
}

/// Adapter presenting a clamped [`ObjectiveFunction`] to argmin.
struct BoundedObjective<'a, O> {
    objective: &'a O,
    feasible: FeasibleBox<'a>,
}

impl<O: ObjectiveFunction> CostFunction for BoundedObjective<'_, O> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, params: &Self::Param) -> std::result::Result<f64, argmin::core::Error> {
        let clamped = self.feasible.clamp(params);
        self.objective.eval(&clamped).map_err(argmin::core::Error::new)
    }
}

impl<O: ObjectiveFunction> Gradient for BoundedObjective<'_, O> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(
        &self,
        params: &Self::Param,
    ) -> std::result::Result<Vec<f64>, argmin::core::Error> {
        let clamped = self.feasible.clamp(params);
        let mut g = self.objective.gradient(&clamped).map_err(argmin::core::Error::new)?;
        self.feasible.project(&clamped, &mut g);
        Ok(g)
    }
}

/// L-BFGS with box constraints via clamping.
pub struct LbfgsbOptimizer {
    config: OptimizerConfig,
}

impl LbfgsbOptimizer {
    /// Create an optimizer with the given settings.
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Minimize `objective` over the box described by `bounds`, starting
    /// from `init`. Use infinite bounds for unconstrained components.
    pub fn minimize<O: ObjectiveFunction>(
        &self,
        objective: &O,
        init: &[f64],
        bounds: &[(f64, f64)],
    ) -> Result<OptimizationResult> {
        if init.len() != bounds.len() {
            return Err(Error::InvalidArgument(format!(
                "init length {} != bounds length {}",
                init.len(),
                bounds.len()
            )));
        }
        let feasible = FeasibleBox { bounds };
        let start = feasible.clamp(init);

        // argmin's cost-change test defaults to machine epsilon, which NLL
        // magnitudes never reach; tie it to the gradient tolerance so cost
        // stagnation terminates as convergence instead of running out the
        // iteration budget.
        let cost_tol =
            if self.config.tol > 0.0 { (0.1 * self.config.tol).max(1e-12) } else { 0.0 };
        let solver = LBFGS::new(MoreThuenteLineSearch::new(), self.config.m)
            .with_tolerance_grad(self.config.tol)
            .map_err(|e| Error::InvalidArgument(format!("gradient tolerance: {e}")))?
            .with_tolerance_cost(cost_tol)
            .map_err(|e| Error::InvalidArgument(format!("cost tolerance: {e}")))?;

        let run = Executor::new(BoundedObjective { objective, feasible }, solver)
            .configure(|state| state.param(start).max_iters(self.config.max_iter))
            .run()
            .map_err(|e| Error::Computation(format!("L-BFGS run failed: {e}")))?;

        let state = run.state();
        let best = state
            .get_best_param()
            .ok_or_else(|| Error::Computation("minimizer returned no parameters".to_string()))?;
        let termination = state.get_termination_status();
        Ok(OptimizationResult {
            parameters: feasible.clamp(best),
            fval: state.get_best_cost(),
            n_iter: state.get_iter(),
            converged: matches!(
                termination,
                TerminationStatus::Terminated(
                    TerminationReason::SolverConverged | TerminationReason::TargetCostReached
                )
            ),
            message: termination.to_string(),
        })
    }
}
