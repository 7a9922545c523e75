//! Constrained and global maximum-likelihood fits over a [`DensityModel`],
//! differentiable with respect to upstream parameters.
//!
//! A fit builds the model from `(upstream, hyper)` via the [`ModelMaker`],
//! generates the expected (Asimov) dataset at the builder's background-only
//! point, and minimizes the negative log-density over the free components.
//! [`ConstrainedFit`] holds component 0 (the signal strength) at a fixed
//! value; [`GlobalFit`] leaves everything free.
//!
//! `fit_and_grad` additionally returns `dθ*/dφ` from the implicit function
//! theorem at the stationarity condition `∇_θ NLL(θ*, φ) = 0`:
//! `dθ*_free/dφ = -H⁻¹ B`, with the free-block Hessian `H` assembled by
//! forward differences of the exact forward-mode gradient and the mixed
//! block `B = ∂²NLL/∂θ∂φ` by forward differences of the exact `∂NLL/∂φ`.
//! Loop iterations of the optimizer are never differentiated through.

use crate::optimizer::{LbfgsbOptimizer, ObjectiveFunction, OptimizerConfig};
use crate::transforms;
use ds_ad::{Dual, Scalar};
use ds_core::{DensityModel, Error, ModelMaker, Result, config};
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Relative distance from the interval ends at which transformed fits
/// start. Keeps the initial point off the sine map's flat spots.
const TRANSFORM_INIT_MARGIN: f64 = 1e-6;

/// Settings shared by [`ConstrainedFit`] and [`GlobalFit`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Optimize free components in unconstrained space through the sin
    /// reparameterization ([`transforms::to_bounded`]) instead of bounds
    /// clamping. Removes boundary effects from the fit landscape.
    pub pdf_transform: bool,
    /// L-BFGS settings.
    pub optimizer: OptimizerConfig,
}

/// Model, Asimov data, and pin bookkeeping for one fit invocation.
///
/// Holds the model twice — once over `f64` for objective values and once
/// over [`Dual`] with constant upstream for exact objective gradients.
struct FitProblem<M: ModelMaker> {
    model: M::Model<f64>,
    model_d: M::Model<Dual>,
    data: Vec<f64>,
    data_d: Vec<Dual>,
    bounds: Vec<(f64, f64)>,
    /// Component 0 held at this value (bounded space, never transformed),
    /// or `None` for a global fit.
    pinned: Option<f64>,
    pdf_transform: bool,
}

impl<M: ModelMaker> FitProblem<M> {
    fn offset(&self) -> usize {
        usize::from(self.pinned.is_some())
    }

    fn free_bounds(&self) -> &[(f64, f64)] {
        &self.bounds[self.offset()..]
    }

    /// Reassemble the full parameter vector from the free components,
    /// reinstating the pinned value exactly.
    fn full_params<S: Scalar>(&self, free: &[S]) -> Vec<S> {
        match self.pinned {
            Some(v) => {
                let mut pars = Vec::with_capacity(free.len() + 1);
                pars.push(S::from_f64(v));
                pars.extend_from_slice(free);
                pars
            }
            None => free.to_vec(),
        }
    }

    /// Exact NLL gradient over the free components in *bounded* space,
    /// independent of the `pdf_transform` setting. One forward-mode pass
    /// per component.
    fn grad_bounded(&self, free: &[f64]) -> Result<Vec<f64>> {
        (0..free.len())
            .map(|j| {
                let free_d: Vec<Dual> = free
                    .iter()
                    .enumerate()
                    .map(|(i, &v)| if i == j { Dual::var(v) } else { Dual::constant(v) })
                    .collect();
                let pars = self.full_params(&free_d);
                Ok((-self.model_d.logpdf(&pars, &self.data_d)?).dot)
            })
            .collect()
    }
}

impl<M: ModelMaker> ObjectiveFunction for FitProblem<M> {
    fn eval(&self, x: &[f64]) -> Result<f64> {
        let free = if self.pdf_transform {
            transforms::to_bounded_vec(x, self.free_bounds())?
        } else {
            x.to_vec()
        };
        let pars = self.full_params(&free);
        Ok(-self.model.logpdf(&pars, &self.data)?)
    }

    fn gradient(&self, x: &[f64]) -> Result<Vec<f64>> {
        (0..x.len())
            .map(|j| {
                let xd: Vec<Dual> = x
                    .iter()
                    .enumerate()
                    .map(|(i, &v)| if i == j { Dual::var(v) } else { Dual::constant(v) })
                    .collect();
                let free = if self.pdf_transform {
                    transforms::to_bounded_vec(&xd, self.free_bounds())?
                } else {
                    xd
                };
                let pars = self.full_params(&free);
                Ok((-self.model_d.logpdf(&pars, &self.data_d)?).dot)
            })
            .collect()
    }
}

fn build_problem<M: ModelMaker>(
    maker: &M,
    upstream: &[f64],
    hyper: Option<&M::Hyper>,
    pinned: Option<f64>,
    pdf_transform: bool,
) -> Result<FitProblem<M>> {
    let (model, bonlypars) = maker.make::<f64>(upstream, hyper)?;
    if bonlypars.len() != model.n_params() {
        return Err(Error::InvalidArgument(format!(
            "background-only point length {} != model parameter count {}",
            bonlypars.len(),
            model.n_params()
        )));
    }
    let bounds = model.suggested_bounds();
    if bounds.len() != model.n_params() {
        return Err(Error::InvalidArgument(format!(
            "bounds length {} != model parameter count {}",
            bounds.len(),
            model.n_params()
        )));
    }
    transforms::check_bounds(&bounds)?;

    let data = model.expected_data(&bonlypars)?;
    let data_d: Vec<Dual> = data.iter().map(|&v| Dual::constant(v)).collect();
    let upstream_d: Vec<Dual> = upstream.iter().map(|&v| Dual::constant(v)).collect();
    let (model_d, _) = maker.make::<Dual>(&upstream_d, hyper)?;

    Ok(FitProblem { model, model_d, data, data_d, bounds, pinned, pdf_transform })
}

/// Minimize the problem's NLL starting from a full-length bounded-space
/// `init`, returning the full bounded-space optimum.
fn minimize_problem<M: ModelMaker>(
    problem: &FitProblem<M>,
    init: &[f64],
    config: &SolverConfig,
) -> Result<Vec<f64>> {
    if init.len() != problem.bounds.len() {
        return Err(Error::InvalidArgument(format!(
            "init length {} != model parameter count {}",
            init.len(),
            problem.bounds.len()
        )));
    }

    let mut free_init: Vec<f64> = init[problem.offset()..]
        .iter()
        .zip(problem.free_bounds())
        .map(|(&v, &(lo, hi))| v.clamp(lo, hi))
        .collect();
    if free_init.is_empty() {
        return Ok(problem.full_params(&free_init));
    }
    if config.pdf_transform {
        // The sine map is flat at the interval ends (cos(±π/2) = 0), so a
        // start exactly on a bound has zero transform-space gradient no
        // matter how far away the optimum is. Start strictly inside.
        for (v, &(lo, hi)) in free_init.iter_mut().zip(problem.free_bounds()) {
            let margin = TRANSFORM_INIT_MARGIN * (hi - lo);
            *v = v.clamp(lo + margin, hi - margin);
        }
    }

    // Stationarity at the start is decided in bounded space with the
    // gradient projected at active bounds, never in transform space where
    // the flat interval ends would fake it. A start already at the optimum
    // is common on Asimov data when the pin equals the generating value;
    // the line search has no descent direction there, so return it as-is.
    let g0 = problem.grad_bounded(&free_init)?;
    let g0_norm = g0
        .iter()
        .zip(&free_init)
        .zip(problem.free_bounds())
        .map(|((&g, &v), &(lo, hi))| {
            if (v <= lo && g > 0.0) || (v >= hi && g < 0.0) { 0.0 } else { g * g }
        })
        .sum::<f64>()
        .sqrt();
    if config.optimizer.tol > 0.0 && g0_norm <= config.optimizer.tol {
        return Ok(problem.full_params(&free_init));
    }

    let (x0, opt_bounds) = if config.pdf_transform {
        let x0 = transforms::to_inf_vec(&free_init, problem.free_bounds())?;
        (x0, vec![(f64::NEG_INFINITY, f64::INFINITY); free_init.len()])
    } else {
        (free_init, problem.free_bounds().to_vec())
    };

    let optimizer = LbfgsbOptimizer::new(config.optimizer.clone());
    let opt = optimizer.minimize(problem, &x0, &opt_bounds)?;
    if !opt.converged {
        log::warn!("fit did not converge after {} iterations: {}", opt.n_iter, opt.message);
        return Err(Error::FitNonConvergence(opt.message));
    }

    let free = if config.pdf_transform {
        transforms::to_bounded_vec(&opt.parameters, problem.free_bounds())?
    } else {
        opt.parameters
    };
    Ok(problem.full_params(&free))
}

/// `dθ*/dφ` at a bounded-space optimum `theta`, one column per upstream
/// component (the pinned component's row is zero).
///
/// The linear systems are assembled in bounded space; the optimum of a
/// transformed fit is the same stationary point, so the result does not
/// depend on `pdf_transform`.
fn implicit_jacobian<M: ModelMaker>(
    maker: &M,
    problem: &FitProblem<M>,
    upstream: &[f64],
    hyper: Option<&M::Hyper>,
    theta: &[f64],
) -> Result<Vec<Vec<f64>>> {
    let offset = problem.offset();
    let n = theta.len();
    let free: Vec<f64> = theta[offset..].to_vec();
    let n_free = free.len();
    let n_up = upstream.len();
    if n_free == 0 || n_up == 0 {
        return Ok(vec![vec![0.0; n]; n_up]);
    }

    let fd_step = config::global().fd_step;

    // Free-block Hessian by forward differences of the exact gradient.
    let grad0 = problem.grad_bounded(&free)?;
    let mut hess = DMatrix::zeros(n_free, n_free);
    let mut plus = free.clone();
    for j in 0..n_free {
        let eps = fd_step * free[j].abs().max(1.0);
        plus[j] = free[j] + eps;
        let grad_plus = problem.grad_bounded(&plus)?;
        plus[j] = free[j];
        for i in 0..n_free {
            hess[(i, j)] = (grad_plus[i] - grad0[i]) / eps;
        }
    }
    let ht = hess.transpose();
    hess = (&hess + &ht) * 0.5;

    let hinv = invert_hessian(&hess, n_free).ok_or_else(|| {
        Error::Computation("singular curvature at the fit point; implicit gradients unavailable".to_string())
    })?;

    // Mixed block B, one upstream component per column. Each column seeds
    // the upstream component in forward mode; the seeded model and its
    // Asimov data are rebuilt once per column (the data depends on φ too)
    // and reused across the finite-difference points in θ.
    let columns: Vec<Result<Vec<f64>>> = (0..n_up)
        .into_par_iter()
        .map(|k| {
            let seeded: Vec<Dual> = upstream
                .iter()
                .enumerate()
                .map(|(i, &v)| if i == k { Dual::var(v) } else { Dual::constant(v) })
                .collect();
            let (model_k, bonly_k) = maker.make::<Dual>(&seeded, hyper)?;
            let data_k = model_k.expected_data(&bonly_k)?;

            let dnll_dphi = |free_pt: &[f64]| -> Result<f64> {
                let free_d: Vec<Dual> = free_pt.iter().map(|&v| Dual::constant(v)).collect();
                let pars = problem.full_params(&free_d);
                Ok((-model_k.logpdf(&pars, &data_k)?).dot)
            };

            let h0 = dnll_dphi(&free)?;
            let mut b_col = DVector::zeros(n_free);
            let mut probe = free.clone();
            for i in 0..n_free {
                let eps = fd_step * free[i].abs().max(1.0);
                probe[i] = free[i] + eps;
                b_col[i] = (dnll_dphi(&probe)? - h0) / eps;
                probe[i] = free[i];
            }

            let dfree = -(&hinv * b_col);
            let mut col = vec![0.0; n];
            for i in 0..n_free {
                col[offset + i] = dfree[i];
            }
            Ok(col)
        })
        .collect();

    columns.into_iter().collect()
}

/// Invert the free-block Hessian via Cholesky with geometric diagonal
/// damping, falling back to an LU inverse. Returns `None` when every
/// attempt produces non-finite or non-positive variances.
fn invert_hessian(hessian: &DMatrix<f64>, n: usize) -> Option<DMatrix<f64>> {
    let identity = DMatrix::identity(n, n);
    let diag_scale = (0..n).map(|i| hessian[(i, i)].abs()).fold(0.0_f64, f64::max).max(1.0);

    let mut h_damped = hessian.clone();
    let mut damping = 0.0_f64;
    let max_attempts = 10;

    for attempt in 0..max_attempts {
        if let Some(chol) = nalgebra::linalg::Cholesky::new(h_damped.clone()) {
            return Some(chol.solve(&identity));
        }
        if attempt + 1 == max_attempts {
            break;
        }
        let next_damping = if damping == 0.0 { diag_scale * 1e-9 } else { damping * 10.0 };
        let add = next_damping - damping;
        for i in 0..n {
            h_damped[(i, i)] += add;
        }
        damping = next_damping;
    }

    let inv = h_damped.lu().try_inverse()?;
    for i in 0..n {
        let v = inv[(i, i)];
        if !(v.is_finite() && v > 0.0) {
            return None;
        }
    }
    Some(inv)
}

/// Maximum-likelihood fit with the signal-strength component (index 0)
/// pinned at a caller-supplied value.
///
/// The pinned value stays in bounded space and is never clamped or
/// transformed, so values outside `bounds[0]` are permitted.
pub struct ConstrainedFit<'a, M: ModelMaker> {
    maker: &'a M,
    config: SolverConfig,
}

impl<'a, M: ModelMaker> ConstrainedFit<'a, M> {
    /// Create a constrained fitter over `maker`.
    pub fn new(maker: &'a M, config: SolverConfig) -> Self {
        Self { maker, config }
    }

    /// Minimize the NLL over components `1..n` with component 0 held at
    /// `fixed_value`. `init` is a full-length bounded-space starting point
    /// (its component 0 is ignored). Returns the full bounded-space optimum
    /// with the pinned value reinstated exactly.
    pub fn fit(
        &self,
        init: &[f64],
        upstream: &[f64],
        hyper: Option<&M::Hyper>,
        fixed_value: f64,
    ) -> Result<Vec<f64>> {
        let problem = build_problem(
            self.maker,
            upstream,
            hyper,
            Some(fixed_value),
            self.config.pdf_transform,
        )?;
        minimize_problem(&problem, init, &self.config)
    }

    /// Like [`fit`](Self::fit), additionally returning `dθ*/dφ` — one
    /// column (full parameter length) per upstream component, computed via
    /// the implicit function theorem. The pinned row is zero.
    pub fn fit_and_grad(
        &self,
        init: &[f64],
        upstream: &[f64],
        hyper: Option<&M::Hyper>,
        fixed_value: f64,
    ) -> Result<(Vec<f64>, Vec<Vec<f64>>)> {
        let problem = build_problem(
            self.maker,
            upstream,
            hyper,
            Some(fixed_value),
            self.config.pdf_transform,
        )?;
        let theta = minimize_problem(&problem, init, &self.config)?;
        let jac = implicit_jacobian(self.maker, &problem, upstream, hyper, &theta)?;
        Ok((theta, jac))
    }
}

/// Maximum-likelihood fit over the full parameter vector.
///
/// Unused by the default CLs path, which substitutes the builder's known
/// background-only point for the global optimum on Asimov data.
pub struct GlobalFit<'a, M: ModelMaker> {
    maker: &'a M,
    config: SolverConfig,
}

impl<'a, M: ModelMaker> GlobalFit<'a, M> {
    /// Create a global fitter over `maker`.
    pub fn new(maker: &'a M, config: SolverConfig) -> Self {
        Self { maker, config }
    }

    /// Minimize the NLL over all components from a full-length bounded-space
    /// starting point.
    pub fn fit(
        &self,
        init: &[f64],
        upstream: &[f64],
        hyper: Option<&M::Hyper>,
    ) -> Result<Vec<f64>> {
        let problem =
            build_problem(self.maker, upstream, hyper, None, self.config.pdf_transform)?;
        minimize_problem(&problem, init, &self.config)
    }

    /// Like [`fit`](Self::fit), additionally returning `dθ*/dφ` per
    /// upstream component via the implicit function theorem.
    pub fn fit_and_grad(
        &self,
        init: &[f64],
        upstream: &[f64],
        hyper: Option<&M::Hyper>,
    ) -> Result<(Vec<f64>, Vec<Vec<f64>>)> {
        let problem =
            build_problem(self.maker, upstream, hyper, None, self.config.pdf_transform)?;
        let theta = minimize_problem(&problem, init, &self.config)?;
        let jac = implicit_jacobian(self.maker, &problem, upstream, hyper, &theta)?;
        Ok((theta, jac))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Gaussian least-squares model with predictions
    /// `[phi * (mu + theta), theta]` and background-only point `[0, 1]`.
    ///
    /// On Asimov data `[phi, 1]` the constrained optimum at `mu = t` is
    /// closed-form: `theta* = 1 - t*phi^2/(1 + phi^2)`, with
    /// `dtheta*/dphi = -2*t*phi/(1 + phi^2)^2`.
    struct LinearModel<S: Scalar> {
        phi: S,
    }

    impl<S: Scalar> DensityModel<S> for LinearModel<S> {
        fn n_params(&self) -> usize {
            2
        }

        fn suggested_bounds(&self) -> Vec<(f64, f64)> {
            vec![(-1.0, 10.0), (-10.0, 10.0)]
        }

        fn logpdf(&self, pars: &[S], data: &[S]) -> Result<S> {
            let preds = self.expected_data(pars)?;
            let half = S::from_f64(0.5);
            Ok(-preds
                .iter()
                .zip(data.iter())
                .map(|(&p, &d)| {
                    let r = p - d;
                    half * r * r
                })
                .sum::<S>())
        }

        fn expected_data(&self, pars: &[S]) -> Result<Vec<S>> {
            Ok(vec![self.phi * (pars[0] + pars[1]), pars[1]])
        }
    }

    struct LinearMaker;

    impl ModelMaker for LinearMaker {
        type Hyper = ();
        type Model<S: Scalar> = LinearModel<S>;

        fn make<S: Scalar>(
            &self,
            upstream: &[S],
            _hyper: Option<&()>,
        ) -> Result<(LinearModel<S>, Vec<S>)> {
            Ok((LinearModel { phi: upstream[0] }, vec![S::from_f64(0.0), S::from_f64(1.0)]))
        }
    }

    fn theta_star(phi: f64, t: f64) -> f64 {
        1.0 - t * phi * phi / (1.0 + phi * phi)
    }

    #[test]
    fn test_constrained_fit_matches_closed_form() {
        let maker = LinearMaker;
        let fitter = ConstrainedFit::new(&maker, SolverConfig::default());
        let (phi, t) = (2.0, 0.5);

        let theta = fitter.fit(&[t, 1.0], &[phi], None, t).unwrap();
        assert_eq!(theta[0], t, "pinned value must be reinstated exactly");
        assert_relative_eq!(theta[1], theta_star(phi, t), epsilon = 1e-4);
    }

    #[test]
    fn test_transform_mode_agrees_with_clamped_mode() {
        let maker = LinearMaker;
        let (phi, t) = (2.0, 0.5);

        let plain = ConstrainedFit::new(&maker, SolverConfig::default())
            .fit(&[t, 1.0], &[phi], None, t)
            .unwrap();
        let transformed = ConstrainedFit::new(
            &maker,
            SolverConfig { pdf_transform: true, ..Default::default() },
        )
        .fit(&[t, 1.0], &[phi], None, t)
        .unwrap();

        assert_relative_eq!(plain[1], transformed[1], epsilon = 1e-4);
    }

    #[test]
    fn test_fit_and_grad_matches_closed_form() {
        let maker = LinearMaker;
        let fitter = ConstrainedFit::new(&maker, SolverConfig::default());
        let (phi, t) = (2.0, 0.5);

        let (theta, jac) = fitter.fit_and_grad(&[t, 1.0], &[phi], None, t).unwrap();
        assert_relative_eq!(theta[1], theta_star(phi, t), epsilon = 1e-4);

        // dtheta*/dphi = -2*t*phi/(1 + phi^2)^2 = -0.08 at phi=2, t=0.5
        let expected = -2.0 * t * phi / (1.0 + phi * phi).powi(2);
        assert_eq!(jac.len(), 1);
        assert_eq!(jac[0][0], 0.0, "pinned component has zero derivative");
        assert_relative_eq!(jac[0][1], expected, epsilon = 1e-3);
    }

    #[test]
    fn test_global_fit_recovers_background_point() {
        // On Asimov data the global optimum is the background-only truth
        // point for every phi, so its upstream derivative is zero.
        let maker = LinearMaker;
        let fitter = GlobalFit::new(&maker, SolverConfig::default());

        let (theta, jac) = fitter.fit_and_grad(&[0.3, 0.8], &[2.0], None).unwrap();
        assert_relative_eq!(theta[0], 0.0, epsilon = 1e-4);
        assert_relative_eq!(theta[1], 1.0, epsilon = 1e-4);
        assert_relative_eq!(jac[0][0], 0.0, epsilon = 1e-3);
        assert_relative_eq!(jac[0][1], 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_pinned_value_outside_bounds_is_permitted() {
        // The pin stays in bounded space and is never checked against
        // bounds[0]; only the free components are constrained.
        let maker = LinearMaker;
        let (phi, t) = (2.0, -2.0);

        for pdf_transform in [false, true] {
            let fitter = ConstrainedFit::new(
                &maker,
                SolverConfig { pdf_transform, ..Default::default() },
            );
            let theta = fitter.fit(&[t, 1.0], &[phi], None, t).unwrap();
            assert_eq!(theta[0], t);
            assert_relative_eq!(theta[1], theta_star(phi, t), epsilon = 1e-4);
        }
    }

    /// One free nuisance with a Gaussian NLL centered at 2, on an interval
    /// whose lower end is exactly the common init value of 1.
    struct BoundStartModel;

    impl<S: Scalar> DensityModel<S> for BoundStartModel {
        fn n_params(&self) -> usize {
            2
        }

        fn suggested_bounds(&self) -> Vec<(f64, f64)> {
            vec![(-1.0, 10.0), (1.0, 10.0)]
        }

        fn logpdf(&self, pars: &[S], data: &[S]) -> Result<S> {
            let r = pars[1] - data[0];
            Ok(-(S::from_f64(0.5) * r * r))
        }

        fn expected_data(&self, pars: &[S]) -> Result<Vec<S>> {
            Ok(vec![pars[1]])
        }
    }

    struct BoundStartMaker;

    impl ModelMaker for BoundStartMaker {
        type Hyper = ();
        type Model<S: Scalar> = BoundStartModel;

        fn make<S: Scalar>(
            &self,
            _upstream: &[S],
            _hyper: Option<&()>,
        ) -> Result<(BoundStartModel, Vec<S>)> {
            Ok((BoundStartModel, vec![S::from_f64(0.0), S::from_f64(2.0)]))
        }
    }

    #[test]
    fn test_fit_leaves_a_bound_started_component() {
        // The free component starts exactly on its lower bound, where the
        // sine reparameterization is flat. The fit must not mistake the
        // flat spot for a stationary point; both modes have to reach the
        // interior optimum at 2.
        let maker = BoundStartMaker;
        let init = [0.5, 1.0];

        for pdf_transform in [false, true] {
            let fitter = ConstrainedFit::new(
                &maker,
                SolverConfig { pdf_transform, ..Default::default() },
            );
            let theta = fitter.fit(&init, &[0.0], None, 0.5).unwrap();
            assert_relative_eq!(theta[1], 2.0, epsilon = 1e-4);
        }
    }

    /// Model whose NLL is the Rosenbrock function in its two free
    /// components; used to force a non-converged termination.
    struct BananaModel;

    impl<S: Scalar> DensityModel<S> for BananaModel {
        fn n_params(&self) -> usize {
            3
        }

        fn suggested_bounds(&self) -> Vec<(f64, f64)> {
            vec![(0.0, 10.0), (-5.0, 5.0), (-5.0, 5.0)]
        }

        fn logpdf(&self, pars: &[S], _data: &[S]) -> Result<S> {
            let one = S::from_f64(1.0);
            let a = pars[1];
            let b = pars[2];
            let r1 = one - a;
            let r2 = b - a * a;
            Ok(-(r1 * r1 + S::from_f64(100.0) * r2 * r2))
        }

        fn expected_data(&self, _pars: &[S]) -> Result<Vec<S>> {
            Ok(vec![S::from_f64(0.0)])
        }
    }

    struct BananaMaker;

    impl ModelMaker for BananaMaker {
        type Hyper = ();
        type Model<S: Scalar> = BananaModel;

        fn make<S: Scalar>(
            &self,
            _upstream: &[S],
            _hyper: Option<&()>,
        ) -> Result<(BananaModel, Vec<S>)> {
            Ok((BananaModel, vec![S::from_f64(0.0), S::from_f64(-1.2), S::from_f64(1.0)]))
        }
    }

    #[test]
    fn test_exhausted_budget_surfaces_fit_non_convergence() {
        let maker = BananaMaker;
        let config = SolverConfig {
            pdf_transform: false,
            optimizer: OptimizerConfig { max_iter: 1, tol: 1e-12, m: 10 },
        };
        let fitter = ConstrainedFit::new(&maker, config);

        let err = fitter.fit(&[1.0, -1.2, 1.0], &[0.0], None, 1.0).unwrap_err();
        assert!(matches!(err, Error::FitNonConvergence(_)), "got {err}");
    }

    #[test]
    fn test_init_length_mismatch_rejected() {
        let maker = LinearMaker;
        let fitter = ConstrainedFit::new(&maker, SolverConfig::default());
        let err = fitter.fit(&[0.5], &[2.0], None, 0.5).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
