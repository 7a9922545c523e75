//! Forward-mode automatic differentiation via dual numbers.
//!
//! A [`Dual`] carries a primal value and one tangent; arithmetic propagates
//! both. Seed a variable with [`Dual::var`] (tangent 1) and every downstream
//! quantity's `dot` is its exact derivative with respect to that variable.

use statrs::function::erf::erfc;
use statrs::function::gamma::{digamma, ln_gamma};
use std::iter::Sum;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Natural log of `sqrt(2π)`.
const LN_SQRT_2PI: f64 = 0.918_938_533_204_672_7;

/// A dual number for forward-mode AD.
///
/// `val` holds the primal value, `dot` holds the tangent (derivative).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dual {
    /// Primal (function) value.
    pub val: f64,
    /// Tangent (derivative) value.
    pub dot: f64,
}

impl Dual {
    /// Create a constant (derivative = 0).
    #[inline]
    pub fn constant(val: f64) -> Self {
        Self { val, dot: 0.0 }
    }

    /// Create an independent variable (derivative = 1).
    #[inline]
    pub fn var(val: f64) -> Self {
        Self { val, dot: 1.0 }
    }

    /// Create a dual with explicit tangent.
    #[inline]
    pub fn new(val: f64, dot: f64) -> Self {
        Self { val, dot }
    }

    /// Natural logarithm: d/dx ln(x) = 1/x.
    #[inline]
    pub fn ln(self) -> Self {
        Self { val: self.val.ln(), dot: self.dot / self.val }
    }

    /// Exponential: d/dx exp(x) = exp(x).
    #[inline]
    pub fn exp(self) -> Self {
        let e = self.val.exp();
        Self { val: e, dot: self.dot * e }
    }

    /// Power with f64 exponent: d/dx x^n = n * x^(n-1).
    #[inline]
    pub fn powf(self, n: f64) -> Self {
        Self { val: self.val.powf(n), dot: self.dot * n * self.val.powf(n - 1.0) }
    }

    /// Integer power: d/dx x^n = n * x^(n-1).
    #[inline]
    pub fn powi(self, n: i32) -> Self {
        Self { val: self.val.powi(n), dot: self.dot * (n as f64) * self.val.powi(n - 1) }
    }

    /// Square root: d/dx sqrt(x) = 1/(2*sqrt(x)).
    #[inline]
    pub fn sqrt(self) -> Self {
        let s = self.val.sqrt();
        Self { val: s, dot: self.dot / (2.0 * s) }
    }

    /// Sine: d/dx sin(x) = cos(x).
    #[inline]
    pub fn sin(self) -> Self {
        Self { val: self.val.sin(), dot: self.dot * self.val.cos() }
    }

    /// Cosine: d/dx cos(x) = -sin(x).
    #[inline]
    pub fn cos(self) -> Self {
        Self { val: self.val.cos(), dot: -self.dot * self.val.sin() }
    }

    /// Arcsine (principal branch): d/dx asin(x) = 1/sqrt(1 - x^2).
    ///
    /// The tangent is infinite at |x| = 1, matching the transform's
    /// boundary behavior.
    #[inline]
    pub fn asin(self) -> Self {
        Self { val: self.val.asin(), dot: self.dot / (1.0 - self.val * self.val).sqrt() }
    }

    /// Absolute value: d/dx |x| = sign(x).
    #[inline]
    pub fn abs(self) -> Self {
        Self { val: self.val.abs(), dot: self.dot * self.val.signum() }
    }

    /// Maximum of two duals. Derivative follows the larger operand.
    #[inline]
    pub fn max(self, other: Self) -> Self {
        if self.val >= other.val { self } else { other }
    }

    /// Standard normal CDF: `Φ(x) = 0.5*erfc(-x/√2)`; d/dx Φ(x) = φ(x).
    #[inline]
    pub fn norm_cdf(self) -> Self {
        let pdf = (-0.5 * self.val * self.val).exp() * (-LN_SQRT_2PI).exp();
        Self {
            val: 0.5 * erfc(-self.val / std::f64::consts::SQRT_2),
            dot: self.dot * pdf,
        }
    }

    /// Log-gamma: d/dx ln Γ(x) = ψ(x) (digamma).
    #[inline]
    pub fn ln_gamma(self) -> Self {
        Self { val: ln_gamma(self.val), dot: self.dot * digamma(self.val) }
    }
}

// --- Arithmetic: Dual op Dual ---

impl Add for Dual {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self { val: self.val + rhs.val, dot: self.dot + rhs.dot }
    }
}

impl Sub for Dual {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self { val: self.val - rhs.val, dot: self.dot - rhs.dot }
    }
}

impl Mul for Dual {
    type Output = Self;
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        Self { val: self.val * rhs.val, dot: self.dot * rhs.val + self.val * rhs.dot }
    }
}

impl Div for Dual {
    type Output = Self;
    #[inline]
    fn div(self, rhs: Self) -> Self {
        Self {
            val: self.val / rhs.val,
            dot: (self.dot * rhs.val - self.val * rhs.dot) / (rhs.val * rhs.val),
        }
    }
}

impl Neg for Dual {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self { val: -self.val, dot: -self.dot }
    }
}

// --- Sum ---

impl Sum for Dual {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Dual::constant(0.0), |acc, x| acc + x)
    }
}

// --- From ---

impl From<f64> for Dual {
    fn from(val: f64) -> Self {
        Self::constant(val)
    }
}

// --- PartialOrd ---

impl PartialOrd for Dual {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.val.partial_cmp(&other.val)
    }
}
