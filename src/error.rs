//! Error taxonomy for the fitting core.
//!
//! Size and range violations abort the call that triggered them; nothing is
//! silently truncated, padded or defaulted. Minimizer non-convergence is *not*
//! an error: it degrades to a best-effort result plus a retrievable
//! diagnostic (see [`crate::min`] and [`crate::fit`]).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Two samples used together do not share the same ensemble size.
    #[error("ensemble size mismatch: {left} vs {right}")]
    SizeMismatch { left: usize, right: usize },

    /// A fit call found samples with inconsistent ensemble sizes.
    #[error("inconsistent ensemble: {0}")]
    InconsistentEnsemble(String),

    /// An index is outside a declared range.
    #[error("{what} index {index} out of range (0..{len})")]
    OutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    /// A dimension or entry name collides with an existing one.
    #[error("name '{0}' already exists")]
    AlreadyExists(String),

    /// A named registry entry does not exist.
    #[error("no entry named '{0}'")]
    NotFound(String),

    /// A named registry entry holds a different variant than requested.
    #[error("entry '{name}' holds {actual}, expected {expected}")]
    WrongKind {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// A caller-supplied argument violates a documented contract.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;
