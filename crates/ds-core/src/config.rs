//! Process-wide numeric configuration.
//!
//! Numeric precision and finite-difference settings are an explicit
//! initialization step, not a hidden import-time side effect. Call [`init`]
//! once at process start; every component reads the frozen value through
//! [`global`], which freezes the defaults if [`init`] was never called.

use crate::{Error, Result};
use std::sync::OnceLock;

/// Floating-point precision of the numeric core.
///
/// Only double precision is supported; the variant exists so the required
/// "64-bit mode enabled before any computation" contract is an explicit,
/// checkable configuration rather than an implicit assumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    /// IEEE-754 binary64 everywhere.
    Double,
}

/// Process-wide numeric settings.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericConfig {
    /// Floating-point precision (always [`Precision::Double`]).
    pub precision: Precision,
    /// Relative step scale for the forward-difference second-derivative
    /// assembly in the fit component's implicit-function gradients.
    pub fd_step: f64,
}

impl Default for NumericConfig {
    fn default() -> Self {
        Self { precision: Precision::Double, fd_step: 1e-4 }
    }
}

static CONFIG: OnceLock<NumericConfig> = OnceLock::new();

/// Install the process-wide numeric configuration.
///
/// Idempotent: re-invoking with an identical configuration is a no-op.
/// Re-invoking with a different configuration after the first freeze is an
/// [`Error::InvalidArgument`] — the backend must not change mid-process.
pub fn init(cfg: NumericConfig) -> Result<()> {
    if !(cfg.fd_step.is_finite() && cfg.fd_step > 0.0) {
        return Err(Error::InvalidArgument(format!(
            "fd_step must be finite and > 0, got {}",
            cfg.fd_step
        )));
    }
    let installed = CONFIG.get_or_init(|| cfg.clone());
    if *installed != cfg {
        return Err(Error::InvalidArgument(format!(
            "numeric configuration already frozen to {:?}, cannot re-initialize to {:?}",
            installed, cfg
        )));
    }
    Ok(())
}

/// Read the process-wide numeric configuration, freezing the defaults if
/// [`init`] was never called.
pub fn global() -> &'static NumericConfig {
    CONFIG.get_or_init(NumericConfig::default)
}
