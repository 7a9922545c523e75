//! [`Scalar`] trait: abstraction over `f64` and [`Dual`](crate::dual::Dual)
//! that enables writing likelihood, transform, and p-value code once, then
//! reusing it for both evaluation **and** forward-mode gradient computation.

use crate::dual::Dual;
use statrs::function::erf::erfc;
use statrs::function::gamma::ln_gamma;
use std::iter::Sum;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// A scalar type suitable for likelihood and p-value computation.
///
/// Implement this for `f64` (plain evaluation) and `Dual` (forward-mode AD).
pub trait Scalar:
    Copy
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + Sum
    + PartialOrd
    + Send
    + Sync
    + 'static
    + Sized
{
    /// Wrap an `f64` constant (derivative = 0 for AD types).
    fn from_f64(v: f64) -> Self;

    /// Extract the primal (function) value.
    fn value(&self) -> f64;

    /// Natural logarithm.
    fn ln(self) -> Self;

    /// Exponential.
    fn exp(self) -> Self;

    /// Square root.
    fn sqrt(self) -> Self;

    /// Sine.
    fn sin(self) -> Self;

    /// Cosine.
    fn cos(self) -> Self;

    /// Arcsine (principal branch).
    fn asin(self) -> Self;

    /// Power with f64 exponent.
    fn powf(self, n: f64) -> Self;

    /// Integer power.
    fn powi(self, n: i32) -> Self;

    /// Absolute value.
    fn abs(self) -> Self;

    /// Maximum of two values (non-smooth; passes derivative of the winner).
    fn max_s(self, other: Self) -> Self;

    /// Standard normal CDF `Φ(x)`.
    fn norm_cdf(self) -> Self;

    /// Natural log of the gamma function.
    fn ln_gamma(self) -> Self;
}

// --- f64 implementation ---

impl Scalar for f64 {
    #[inline]
    fn from_f64(v: f64) -> Self {
        v
    }

    #[inline]
    fn value(&self) -> f64 {
        *self
    }

    #[inline]
    fn ln(self) -> Self {
        f64::ln(self)
    }

    #[inline]
    fn exp(self) -> Self {
        f64::exp(self)
    }

    #[inline]
    fn sqrt(self) -> Self {
        f64::sqrt(self)
    }

    #[inline]
    fn sin(self) -> Self {
        f64::sin(self)
    }

    #[inline]
    fn cos(self) -> Self {
        f64::cos(self)
    }

    #[inline]
    fn asin(self) -> Self {
        f64::asin(self)
    }

    #[inline]
    fn powf(self, n: f64) -> Self {
        f64::powf(self, n)
    }

    #[inline]
    fn powi(self, n: i32) -> Self {
        f64::powi(self, n)
    }

    #[inline]
    fn abs(self) -> Self {
        f64::abs(self)
    }

    #[inline]
    fn max_s(self, other: Self) -> Self {
        f64::max(self, other)
    }

    #[inline]
    fn norm_cdf(self) -> Self {
        0.5 * erfc(-self / std::f64::consts::SQRT_2)
    }

    #[inline]
    fn ln_gamma(self) -> Self {
        ln_gamma(self)
    }
}

// --- Dual implementation ---

impl Scalar for Dual {
    #[inline]
    fn from_f64(v: f64) -> Self {
        Dual::constant(v)
    }

    #[inline]
    fn value(&self) -> f64 {
        self.val
    }

    #[inline]
    fn ln(self) -> Self {
        Dual::ln(self)
    }

    #[inline]
    fn exp(self) -> Self {
        Dual::exp(self)
    }

    #[inline]
    fn sqrt(self) -> Self {
        Dual::sqrt(self)
    }

    #[inline]
    fn sin(self) -> Self {
        Dual::sin(self)
    }

    #[inline]
    fn cos(self) -> Self {
        Dual::cos(self)
    }

    #[inline]
    fn asin(self) -> Self {
        Dual::asin(self)
    }

    #[inline]
    fn powf(self, n: f64) -> Self {
        Dual::powf(self, n)
    }

    #[inline]
    fn powi(self, n: i32) -> Self {
        Dual::powi(self, n)
    }

    #[inline]
    fn abs(self) -> Self {
        Dual::abs(self)
    }

    #[inline]
    fn max_s(self, other: Self) -> Self {
        Dual::max(self, other)
    }

    #[inline]
    fn norm_cdf(self) -> Self {
        Dual::norm_cdf(self)
    }

    #[inline]
    fn ln_gamma(self) -> Self {
        Dual::ln_gamma(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Generic Poisson NLL for a single bin.
    fn poisson_nll_bin<S: Scalar>(obs: f64, expected: S) -> S {
        let obs_s = S::from_f64(obs);
        let expected = expected.max_s(S::from_f64(1e-10));
        if obs > 0.0 { expected - obs_s * expected.ln() } else { expected }
    }

    #[test]
    fn test_scalar_f64_poisson() {
        let nll = poisson_nll_bin::<f64>(10.0, 12.0);
        let expected = 12.0 - 10.0 * 12.0_f64.ln();
        assert_relative_eq!(nll, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_scalar_dual_poisson_gradient() {
        // d/dlam [lam - n*ln(lam)] = 1 - n/lam
        let lam = Dual::var(12.0);
        let nll = poisson_nll_bin(10.0, lam);
        let expected_grad = 1.0 - 10.0 / 12.0;
        assert_relative_eq!(nll.dot, expected_grad, epsilon = 1e-12);
    }

    #[test]
    fn test_scalar_generic_code_works_for_both() {
        fn cls_like<S: Scalar>(q: S) -> S {
            // 1 - Φ(√q) over the constant Φ(0) = 0.5
            let p_sb = S::from_f64(1.0) - q.sqrt().norm_cdf();
            p_sb / S::from_f64(0.5)
        }

        // f64: just value
        let val: f64 = cls_like(0.0);
        assert_relative_eq!(val, 1.0, epsilon = 1e-12);

        // Dual: value + derivative. d/dq [(1 - Φ(√q))/0.5] = -φ(√q)/√q at q=1.
        let q = Dual::var(1.0);
        let out = cls_like(q);
        let pdf1 = (-0.5_f64).exp() / (2.0 * std::f64::consts::PI).sqrt();
        assert_relative_eq!(out.val, 2.0 * (1.0 - 1.0_f64.norm_cdf()), epsilon = 1e-12);
        assert_relative_eq!(out.dot, -pdf1 / 0.5 / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_norm_cdf_matches_between_impls() {
        for &x in &[-2.5, -0.3, 0.0, 0.7, 3.1] {
            let d = Dual::constant(x).norm_cdf();
            assert_relative_eq!(d.val, x.norm_cdf(), epsilon = 1e-15);
        }
    }
}
