//! `latfit` library crate.
//!
//! A resampled-statistics fitting engine: it propagates Monte-Carlo /
//! resampling uncertainty (jackknife, bootstrap) through arbitrary nonlinear
//! model fits by re-running a pluggable minimizer over every replica of the
//! data.
//!
//! The building blocks, leaves first:
//!
//! - [`sample`]: the ensemble container (central value + N replicas) with
//!   slot-wise arithmetic and scheme-explicit variance/covariance reductions
//! - [`model`]: an opaque, reentrant model callable with fixed arities
//! - [`data`]: the multi-dimensional sample container aggregating x/y axes
//! - [`min`]: the minimizer abstraction (state, bounds, retry policy) and its
//!   backends
//! - [`fit`]: the orchestrator driving one minimization per ensemble slot
//! - [`io`]: a tagged-variant registry for persisted entries
//!
//! There is deliberately no CLI or file-format code here; drivers are thin
//! wrappers over this library.

pub mod data;
pub mod error;
pub mod fit;
pub mod io;
pub mod min;
pub mod model;
pub mod sample;

pub use error::{Error, Result};
