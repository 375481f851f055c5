//! Backend contract for minimizer implementations.
//!
//! A backend performs one minimization *pass* and reports a status the
//! retry driver in [`crate::min::Minimizer`] can classify. Backends never
//! loop themselves; the coarse-then-thorough escalation and the retry
//! ceiling live in the driver so every backend (including test mocks) gets
//! the same policy.

use crate::error::Result;
use crate::min::{MinimizerState, Objective};

/// Strategy level for one pass.
///
/// A coarse pass runs with a reduced iteration budget and loosened
/// tolerance; it seeds reasonable starting curvature before the thorough
/// passes take over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effort {
    Coarse,
    Thorough,
}

/// Iteration/precision controls handed to a backend, with the effort
/// derating applied via [`MinimizeControls::budget`].
#[derive(Debug, Clone, Copy)]
pub struct MinimizeControls {
    pub max_iteration: u64,
    pub precision: f64,
}

impl MinimizeControls {
    /// Iteration budget and tolerance for the given effort level.
    pub fn budget(&self, effort: Effort) -> (u64, f64) {
        match effort {
            Effort::Coarse => ((self.max_iteration / 10).max(10), self.precision * 100.0),
            Effort::Thorough => (self.max_iteration, self.precision),
        }
    }
}

/// Backend-reported quality of a minimization pass.
///
/// Everything that is not [`BackendStatus::Valid`] triggers a retry in the
/// driver; the four named kinds map to the recoverable conditions a
/// Minuit-style backend distinguishes, [`BackendStatus::Failed`] covers any
/// other failure and is retried the same way.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendStatus {
    Valid,
    CovarianceForcedPosDef,
    HesseInvalid,
    PrecisionNotReached,
    IterationLimit,
    Failed(String),
}

impl BackendStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, BackendStatus::Valid)
    }

    /// Warning text for a non-valid status, `None` for a valid one.
    pub fn warning(&self) -> Option<String> {
        match self {
            BackendStatus::Valid => None,
            BackendStatus::CovarianceForcedPosDef => {
                Some("invalid minimum: covariance matrix was made positive definite".into())
            }
            BackendStatus::HesseInvalid => {
                Some("invalid minimum: Hessian analysis is not valid".into())
            }
            BackendStatus::PrecisionNotReached => {
                Some("invalid minimum: requested precision not reached".into())
            }
            BackendStatus::IterationLimit => {
                Some("invalid minimum: iteration limit reached".into())
            }
            BackendStatus::Failed(msg) => Some(format!("minimization failed: {msg}")),
        }
    }
}

/// Outcome of one backend pass.
#[derive(Debug, Clone)]
pub struct BackendReport {
    /// Best parameter values found by this pass.
    pub params: Vec<f64>,
    /// Objective value at `params`.
    pub value: f64,
    pub status: BackendStatus,
    /// Iterations actually spent.
    pub n_iter: u64,
}

/// One minimization pass over `objective`, starting from `state`.
///
/// Implementations must honor the per-parameter bounds in `state` and must
/// not keep mutable state across calls (the driver may invoke the same
/// backend from several cloned minimizers in parallel).
pub trait MinimizerBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn run(
        &self,
        objective: &dyn Objective,
        state: &MinimizerState,
        effort: Effort,
        controls: &MinimizeControls,
    ) -> Result<BackendReport>;
}
