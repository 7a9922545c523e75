//! Bounded ↔ unconstrained reparameterization.
//!
//! `to_bounded` maps the whole real line onto a closed interval `[a, b]`
//! through a sine; restricted to `[-π/2, π/2]` it is a bijection with
//! inverse `to_inf`. Optimizing in the unconstrained image removes boundary
//! effects from the fit landscape.
//!
//! All entry points are generic over [`Scalar`], so the same code produces
//! values (`f64`) and derivatives (`Dual`).

use ds_ad::Scalar;
use ds_core::{Error, Result};

/// Relative slack on the arcsine argument before an input counts as
/// out of domain. Absorbs floating-point noise at the interval ends.
const DOMAIN_SLACK: f64 = 1e-12;

fn check_pair(a: f64, b: f64) -> Result<()> {
    if !(a.is_finite() && b.is_finite() && a < b) {
        return Err(Error::DegenerateBounds(format!("({a}, {b})")));
    }
    Ok(())
}

/// Validate a bounds table: every pair must be finite with `lower < upper`.
pub fn check_bounds(bounds: &[(f64, f64)]) -> Result<()> {
    for &(a, b) in bounds {
        check_pair(a, b)?;
    }
    Ok(())
}

/// Map an unconstrained scalar onto `[a, b]`:
/// `to_bounded(x) = a + (b - a)/2 * (sin(x) + 1)`.
///
/// Total: the sine keeps the result in `[a, b]` for arbitrarily large `|x|`.
pub fn to_bounded<S: Scalar>(x: S, bounds: (f64, f64)) -> Result<S> {
    let (a, b) = bounds;
    check_pair(a, b)?;
    let half_width = S::from_f64(0.5 * (b - a));
    Ok(S::from_f64(a) + half_width * (x.sin() + S::from_f64(1.0)))
}

/// Map a bounded scalar in `[a, b]` back to the principal branch:
/// `to_inf(y) = asin(2(y - a)/(b - a) - 1)`.
///
/// Inputs outside `[a, b]` (beyond a small floating-point slack) are a
/// [`Error::Domain`]; NaN is never propagated. Inputs within the slack are
/// snapped to the interval end.
pub fn to_inf<S: Scalar>(y: S, bounds: (f64, f64)) -> Result<S> {
    let (a, b) = bounds;
    check_pair(a, b)?;
    let u = (y - S::from_f64(a)) / S::from_f64(0.5 * (b - a)) - S::from_f64(1.0);
    let uv = u.value();
    if !uv.is_finite() || uv.abs() > 1.0 + DOMAIN_SLACK {
        return Err(Error::Domain(format!(
            "inverse-transform input {} outside [{a}, {b}]",
            y.value()
        )));
    }
    let u = if uv > 1.0 {
        S::from_f64(1.0)
    } else if uv < -1.0 {
        S::from_f64(-1.0)
    } else {
        u
    };
    Ok(u.asin())
}

/// Per-component [`to_bounded`] against a bounds table.
pub fn to_bounded_vec<S: Scalar>(x: &[S], bounds: &[(f64, f64)]) -> Result<Vec<S>> {
    if x.len() != bounds.len() {
        return Err(Error::InvalidArgument(format!(
            "vector length {} != bounds length {}",
            x.len(),
            bounds.len()
        )));
    }
    x.iter().zip(bounds.iter()).map(|(&xi, &bi)| to_bounded(xi, bi)).collect()
}

/// Per-component [`to_inf`] against a bounds table.
pub fn to_inf_vec<S: Scalar>(y: &[S], bounds: &[(f64, f64)]) -> Result<Vec<S>> {
    if y.len() != bounds.len() {
        return Err(Error::InvalidArgument(format!(
            "vector length {} != bounds length {}",
            y.len(),
            bounds.len()
        )));
    }
    y.iter().zip(bounds.iter()).map(|(&yi, &bi)| to_inf(yi, bi)).collect()
}
