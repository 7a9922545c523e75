//! # ds-core
//!
//! Core types for diffstat: the error taxonomy, the collaborator traits
//! (statistical model + model builder), and the process-wide numeric
//! configuration.
//!
//! ## Architecture
//!
//! The fit and inference crates depend on the `DensityModel`/`ModelMaker`
//! traits defined here, NOT on any concrete model implementation. Models
//! are external collaborators supplied by callers.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Process-wide numeric configuration (set-once, idempotent).
pub mod config;
/// Error taxonomy and `Result` alias.
pub mod error;
/// Collaborator traits: differentiable models and model builders.
pub mod traits;

pub use config::{NumericConfig, Precision};
pub use error::{Error, Result};
pub use traits::{DensityModel, ModelMaker};
