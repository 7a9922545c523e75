//! Expected CLs from a profile-likelihood test statistic on Asimov data.
//!
//! The pipeline per evaluation:
//!
//! 1. build the model and its background-only point from the upstream
//!    parameters,
//! 2. generate the expected (Asimov) dataset at that point,
//! 3. profile: constrained fit with the signal strength pinned at `test_mu`,
//! 4. `q = -2 (logpdf(numerator) - logpdf(denominator))` where the
//!    denominator is the background-only point itself — on Asimov data the
//!    global best fit coincides with the generating point, so it is never
//!    fitted (the coupling is exact, not an approximation),
//! 5. one-sided convention: `q` is zeroed unless `muhat < test_mu`, then
//!    `CLsb = 1 - Φ(√q)`, `CLb = 1 - Φ(0) = 0.5`, `CLs = CLsb / CLb`.
//!
//! Everything stays differentiable with respect to the upstream parameters:
//! the fit point's derivative enters via the implicit function theorem, the
//! rest through forward-mode duals.

use ds_ad::{Dual, Scalar};
use ds_core::{DensityModel, Error, ModelMaker, Result};
use ds_fit::fit::{ConstrainedFit, SolverConfig};
use ds_fit::transforms;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A p-value selectable from the CLs assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PValue {
    /// `CLs = CLsb / CLb`, the exclusion p-value ratio.
    Cls,
    /// `CLsb = 1 - Φ(√q)`, the signal-plus-background p-value.
    PSb,
    /// `CLb = 1 - Φ(0) = 0.5`, the background-only p-value (constant under
    /// the Asimov construction).
    PB,
}

impl PValue {
    /// Canonical key, matching what [`FromStr`] accepts.
    pub fn as_str(&self) -> &'static str {
        match self {
            PValue::Cls => "CLs",
            PValue::PSb => "p_sb",
            PValue::PB => "p_b",
        }
    }
}

impl FromStr for PValue {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "CLs" => Ok(PValue::Cls),
            "p_sb" => Ok(PValue::PSb),
            "p_b" => Ok(PValue::PB),
            other => Err(Error::InvalidArgument(format!(
                "unknown pvalue key '{other}' (expected one of: CLs, p_sb, p_b)"
            ))),
        }
    }
}

/// Parse an ordered p-value request from its string keys.
pub fn parse_pvalues(names: &[&str]) -> Result<Vec<PValue>> {
    names.iter().map(|s| s.parse()).collect()
}

/// Per-scalar CLs assembly from the test statistic and the zeroing branch.
///
/// The branch is decided on values (outside this function) so that a `Dual`
/// sweep takes the same arm as the value computation; at `q <= 0` the square
/// root's one-sided kink contributes zero derivative.
fn assemble<S: Scalar>(q: S, zeroed: bool) -> (S, S, S) {
    let zero = S::from_f64(0.0);
    let q_eff = if zeroed || q.value() <= 0.0 { zero } else { q };
    let sqrtqmu = if q_eff.value() > 0.0 { q_eff.sqrt() } else { zero };
    let clsb = S::from_f64(1.0) - sqrtqmu.norm_cdf();
    let clb = S::from_f64(0.5);
    let cls = clsb / clb;
    (cls, clsb, clb)
}

/// The expected-CLs statistic over a model builder.
///
/// Construct once per builder + solver configuration; each call to
/// [`evaluate`](Self::evaluate) builds everything else fresh and is
/// side-effect-free.
pub struct ExpectedCls<'a, M: ModelMaker> {
    maker: &'a M,
    config: SolverConfig,
}

impl<'a, M: ModelMaker> ExpectedCls<'a, M> {
    /// Create the statistic over `maker` with the given solver settings.
    pub fn new(maker: &'a M, config: SolverConfig) -> Self {
        Self { maker, config }
    }

    /// Evaluate the requested p-values at `(params, test_mu)`, returned in
    /// request order.
    pub fn evaluate(
        &self,
        params: &[f64],
        test_mu: f64,
        hyper: Option<&M::Hyper>,
        pvalues: &[PValue],
    ) -> Result<Vec<f64>> {
        let (q, zeroed) = self.test_statistic(params, test_mu, hyper)?;
        let (cls, clsb, clb) = assemble(q, zeroed);
        Ok(pvalues
            .iter()
            .map(|p| match p {
                PValue::Cls => cls,
                PValue::PSb => clsb,
                PValue::PB => clb,
            })
            .collect())
    }

    /// Convenience for the default request: `CLs` only.
    pub fn cls(&self, params: &[f64], test_mu: f64, hyper: Option<&M::Hyper>) -> Result<f64> {
        self.evaluate(params, test_mu, hyper, &[PValue::Cls])?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Computation("empty pvalue assembly".to_string()))
    }

    /// Evaluate the requested p-values together with their jacobian over the
    /// upstream parameters: `jacobian[j][k] = ∂pvalue_j / ∂params_k`.
    ///
    /// One constrained fit (plus its implicit-function columns), then one
    /// forward-mode sweep per upstream component through the analytic
    /// assembly. The zeroing branch is fixed by the value computation and
    /// contributes zero derivative.
    pub fn evaluate_with_grad(
        &self,
        params: &[f64],
        test_mu: f64,
        hyper: Option<&M::Hyper>,
        pvalues: &[PValue],
    ) -> Result<(Vec<f64>, Vec<Vec<f64>>)> {
        let fitter = ConstrainedFit::new(self.maker, self.config.clone());
        let (model, bonlypars) = self.maker.make::<f64>(params, hyper)?;
        Self::check_model(&model)?;
        let exp_data = model.expected_data(&bonlypars)?;

        let mut init = vec![1.0; model.n_params()];
        init[0] = test_mu;
        let (numerator, dnumerator) = fitter.fit_and_grad(&init, params, hyper, test_mu)?;

        let q = -2.0
            * (model.logpdf(&numerator, &exp_data)? - model.logpdf(&bonlypars, &exp_data)?);
        let muhat = bonlypars[0];
        let zeroed = muhat >= test_mu;

        let (cls, clsb, clb) = assemble(q, zeroed);
        let values: Vec<f64> = pvalues
            .iter()
            .map(|p| match p {
                PValue::Cls => cls,
                PValue::PSb => clsb,
                PValue::PB => clb,
            })
            .collect();

        // One dual sweep per upstream component, with the fit point's
        // derivative injected from the implicit-function columns.
        let sweeps: Vec<Result<Vec<f64>>> = (0..params.len())
            .into_par_iter()
            .map(|k| {
                let seeded: Vec<Dual> = params
                    .iter()
                    .enumerate()
                    .map(|(i, &v)| if i == k { Dual::var(v) } else { Dual::constant(v) })
                    .collect();
                let (model_k, bonly_k) = self.maker.make::<Dual>(&seeded, hyper)?;
                let data_k = model_k.expected_data(&bonly_k)?;
                let num_k: Vec<Dual> = numerator
                    .iter()
                    .zip(dnumerator[k].iter())
                    .map(|(&v, &d)| Dual::new(v, d))
                    .collect();

                let q_k = Dual::constant(-2.0)
                    * (model_k.logpdf(&num_k, &data_k)? - model_k.logpdf(&bonly_k, &data_k)?);
                let (cls_k, clsb_k, _clb_k) = assemble(q_k, zeroed);

                Ok(pvalues
                    .iter()
                    .map(|p| match p {
                        PValue::Cls => cls_k.dot,
                        PValue::PSb => clsb_k.dot,
                        PValue::PB => 0.0,
                    })
                    .collect())
            })
            .collect();
        let per_upstream: Vec<Vec<f64>> = sweeps.into_iter().collect::<Result<_>>()?;

        let jacobian: Vec<Vec<f64>> = (0..pvalues.len())
            .map(|j| per_upstream.iter().map(|col| col[j]).collect())
            .collect();

        Ok((values, jacobian))
    }

    /// Steps 1–4 of the assembly: the (unzeroed) test statistic and the
    /// one-sided branch decision.
    fn test_statistic(
        &self,
        params: &[f64],
        test_mu: f64,
        hyper: Option<&M::Hyper>,
    ) -> Result<(f64, bool)> {
        let fitter = ConstrainedFit::new(self.maker, self.config.clone());
        let (model, bonlypars) = self.maker.make::<f64>(params, hyper)?;
        Self::check_model(&model)?;
        let exp_data = model.expected_data(&bonlypars)?;

        let mut init = vec![1.0; model.n_params()];
        init[0] = test_mu;
        let numerator = fitter.fit(&init, params, hyper, test_mu)?;

        // Analytic shortcut: the denominator is the background-only point,
        // never a fitted one (exact on Asimov data generated at that point).
        let q = -2.0
            * (model.logpdf(&numerator, &exp_data)? - model.logpdf(&bonlypars, &exp_data)?);
        let muhat = bonlypars[0];
        Ok((q, muhat >= test_mu))
    }

    fn check_model(model: &M::Model<f64>) -> Result<()> {
        if model.n_params() == 0 {
            return Err(Error::InvalidArgument(
                "model must expose at least the signal-strength parameter".to_string(),
            ));
        }
        transforms::check_bounds(&model.suggested_bounds())
    }
}
