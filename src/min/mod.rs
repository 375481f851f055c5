//! Minimizer abstraction.
//!
//! Responsibilities:
//!
//! - hold the per-parameter state (current values, optional bounds) and the
//!   convergence controls
//! - drive a pluggable [`MinimizerBackend`] through the retry protocol:
//!   one coarse pre-pass, then thorough passes until the backend reports a
//!   valid minimum or the retry ceiling is reached
//! - surface the terminal status and the per-attempt log so callers can
//!   decide whether a non-converged result is acceptable
//!
//! Non-convergence is never an error here: after the retry ceiling the last
//! result is returned as-is and [`Minimizer::last_status`] tells the caller
//! what happened. Verbosity only gates progress reporting on stderr; it
//! never changes the numbers.

use std::sync::Arc;

use nalgebra::DVector;

use crate::error::{Error, Result};

pub mod backend;
mod combined;
mod quasi_newton;
mod simplex;

pub use backend::{BackendReport, BackendStatus, Effort, MinimizeControls, MinimizerBackend};
pub use combined::CombinedBackend;
pub use quasi_newton::QuasiNewtonBackend;
pub use simplex::SimplexBackend;

/// Scalar objective with a fixed parameter arity.
pub trait Objective: Send + Sync {
    fn n_par(&self) -> usize;

    fn eval(&self, p: &[f64]) -> f64;

    /// Gradient at `p`; the default uses central differences with an
    /// adaptive step.
    fn gradient(&self, p: &[f64]) -> Vec<f64> {
        let mut grad = vec![0.0; p.len()];
        let mut probe = p.to_vec();
        for i in 0..p.len() {
            let eps = 1e-8 * p[i].abs().max(1.0);
            probe[i] = p[i] + eps;
            let f_plus = self.eval(&probe);
            probe[i] = p[i] - eps;
            let f_minus = self.eval(&probe);
            probe[i] = p[i];
            grad[i] = (f_plus - f_minus) / (2.0 * eps);
        }
        grad
    }
}

/// Adapter turning a plain closure into an [`Objective`].
pub struct FnObjective<F> {
    n_par: usize,
    f: F,
}

impl<F: Fn(&[f64]) -> f64 + Send + Sync> FnObjective<F> {
    pub fn new(n_par: usize, f: F) -> Self {
        Self { n_par, f }
    }
}

impl<F: Fn(&[f64]) -> f64 + Send + Sync> Objective for FnObjective<F> {
    fn n_par(&self) -> usize {
        self.n_par
    }

    fn eval(&self, p: &[f64]) -> f64 {
        (self.f)(p)
    }
}

/// Per-parameter minimizer state: current value plus independently optional
/// lower/upper bounds.
#[derive(Debug, Clone)]
pub struct MinimizerState {
    values: Vec<f64>,
    lower: Vec<Option<f64>>,
    upper: Vec<Option<f64>>,
}

impl MinimizerState {
    pub fn new(dim: usize) -> Self {
        Self {
            values: vec![0.0; dim],
            lower: vec![None; dim],
            upper: vec![None; dim],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Replaces the state with a fresh one of the given dimension. Values
    /// and bounds are discarded, not migrated.
    pub fn resize(&mut self, dim: usize) {
        *self = Self::new(dim);
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn set_values(&mut self, values: &[f64]) {
        debug_assert_eq!(values.len(), self.values.len());
        self.values.copy_from_slice(values);
    }

    /// Copy of this state with different current values (bounds kept).
    pub fn with_values(&self, values: &[f64]) -> Self {
        let mut out = self.clone();
        out.set_values(values);
        out
    }

    pub fn lower(&self, i: usize) -> Option<f64> {
        self.lower.get(i).copied().flatten()
    }

    pub fn upper(&self, i: usize) -> Option<f64> {
        self.upper.get(i).copied().flatten()
    }

    /// Sets the bounds of parameter `i`; each side is independently
    /// optional (`None` = unbounded on that side).
    pub fn set_bounds(&mut self, i: usize, low: Option<f64>, high: Option<f64>) -> Result<()> {
        if i >= self.len() {
            return Err(Error::OutOfRange {
                what: "parameter",
                index: i,
                len: self.len(),
            });
        }
        if let (Some(lo), Some(hi)) = (low, high)
            && lo >= hi
        {
            return Err(Error::InvalidArgument(format!(
                "empty bound interval for parameter {i}: [{lo}, {hi}]"
            )));
        }
        self.lower[i] = low;
        self.upper[i] = high;
        Ok(())
    }

    /// Projects `p` into the bound box.
    pub fn clamped(&self, p: &[f64]) -> Vec<f64> {
        p.iter()
            .enumerate()
            .map(|(i, &v)| {
                let v = match self.lower(i) {
                    Some(lo) => v.max(lo),
                    None => v,
                };
                match self.upper(i) {
                    Some(hi) => v.min(hi),
                    None => v,
                }
            })
            .collect()
    }
}

/// Progress-reporting level. Never affects numerical behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Silent,
    /// Per-pass banners and terminal warnings on stderr.
    Normal,
    /// `Normal` plus per-attempt values, iteration counts and statuses.
    Debug,
}

/// Algorithm family selection for [`Minimizer::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// Gradient-based quasi-Newton pass (L-BFGS).
    QuasiNewton,
    /// Derivative-free Nelder-Mead simplex.
    Simplex,
    /// Quasi-Newton first, simplex fallback on an invalid minimum.
    Combined,
}

/// One entry of the per-minimization attempt log.
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    /// 1-based thorough-pass attempt number.
    pub attempt: u32,
    pub value: f64,
    pub status: BackendStatus,
}

/// Backend-agnostic minimizer front-end.
///
/// Cloning yields an independent minimizer sharing only the (stateless)
/// backend — the per-slot fit loop relies on this to give every parallel
/// worker its own state.
#[derive(Clone)]
pub struct Minimizer {
    backend: Arc<dyn MinimizerBackend>,
    state: MinimizerState,
    max_iteration: u64,
    precision: f64,
    verbosity: Verbosity,
    last_status: Option<BackendStatus>,
    attempts: Vec<AttemptRecord>,
}

impl Minimizer {
    /// Thorough-pass retry ceiling.
    pub const MAX_TRY: u32 = 10;

    pub fn new(algorithm: Algorithm) -> Self {
        let backend: Arc<dyn MinimizerBackend> = match algorithm {
            Algorithm::QuasiNewton => Arc::new(QuasiNewtonBackend),
            Algorithm::Simplex => Arc::new(SimplexBackend),
            Algorithm::Combined => Arc::new(CombinedBackend::default()),
        };
        Self::with_backend(backend)
    }

    /// Builds a minimizer around a custom backend (used for alternative
    /// implementations and deterministic test mocks).
    pub fn with_backend(backend: Arc<dyn MinimizerBackend>) -> Self {
        Self {
            backend,
            state: MinimizerState::new(0),
            max_iteration: 10_000,
            precision: 1e-7,
            verbosity: Verbosity::Silent,
            last_status: None,
            attempts: Vec::new(),
        }
    }

    /// Seeds the starting point. Resizes the state (dropping bounds) when
    /// the arity changes.
    pub fn set_init(&mut self, init: &DVector<f64>) {
        if init.len() != self.state.len() {
            self.state.resize(init.len());
        }
        self.state.set_values(init.as_slice());
    }

    /// See [`MinimizerState::set_bounds`].
    pub fn set_bounds(&mut self, i: usize, low: Option<f64>, high: Option<f64>) -> Result<()> {
        self.state.set_bounds(i, low, high)
    }

    pub fn set_max_iteration(&mut self, count: u64) {
        self.max_iteration = count;
    }

    pub fn set_precision(&mut self, tolerance: f64) {
        self.precision = tolerance;
    }

    pub fn set_verbosity(&mut self, verbosity: Verbosity) {
        self.verbosity = verbosity;
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn state(&self) -> &MinimizerState {
        &self.state
    }

    /// Terminal backend status of the last [`Self::minimize`] call.
    pub fn last_status(&self) -> Option<&BackendStatus> {
        self.last_status.as_ref()
    }

    /// Per-attempt log of the last [`Self::minimize`] call (thorough passes
    /// only; the coarse pre-pass is not classified).
    pub fn attempts(&self) -> &[AttemptRecord] {
        &self.attempts
    }

    /// Locates a minimum of `objective`, starting from the current state.
    ///
    /// Protocol: resize the state if the objective arity differs; one
    /// coarse pre-pass; then thorough passes until the backend reports a
    /// valid minimum or [`Self::MAX_TRY`] attempts were spent. Every
    /// non-valid attempt records a warning in the attempt log. After the
    /// ceiling the last result is returned regardless of validity — inspect
    /// [`Self::last_status`] to tell the difference.
    pub fn minimize(&mut self, objective: &dyn Objective) -> Result<DVector<f64>> {
        if objective.n_par() == 0 {
            return Err(Error::InvalidArgument(
                "objective has zero parameters".into(),
            ));
        }
        if objective.n_par() != self.state.len() {
            self.state.resize(objective.n_par());
        }
        self.attempts.clear();

        let controls = MinimizeControls {
            max_iteration: self.max_iteration,
            precision: self.precision,
        };

        if self.verbosity >= Verbosity::Normal {
            eprintln!("========== {} pre-minimization", self.backend.name());
        }
        let report = self
            .backend
            .run(objective, &self.state, Effort::Coarse, &controls)?;
        self.state.set_values(&report.params);
        if self.verbosity >= Verbosity::Debug {
            eprintln!(
                "pre-minimization: value = {:e} after {} iterations",
                report.value, report.n_iter
            );
        }

        let mut report = report;
        let mut n = 0u32;
        loop {
            n += 1;
            if self.verbosity >= Verbosity::Normal {
                eprintln!("========== {} minimization, try #{n}", self.backend.name());
            }
            report = self
                .backend
                .run(objective, &self.state, Effort::Thorough, &controls)?;
            self.state.set_values(&report.params);
            self.attempts.push(AttemptRecord {
                attempt: n,
                value: report.value,
                status: report.status.clone(),
            });
            if self.verbosity >= Verbosity::Debug {
                eprintln!(
                    "try #{n}: value = {:e} after {} iterations, status: {:?}",
                    report.value, report.n_iter, report.status
                );
            }
            if report.status.is_valid() || n >= Self::MAX_TRY {
                break;
            }
            if self.verbosity >= Verbosity::Normal
                && let Some(warning) = report.status.warning()
            {
                eprintln!("warning: {warning} (retrying)");
            }
        }
        if self.verbosity >= Verbosity::Normal {
            eprintln!("==============================");
            if let Some(warning) = report.status.warning() {
                eprintln!("warning: {warning}");
            }
        }

        self.last_status = Some(report.status);
        Ok(DVector::from_vec(report.params))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Backend that reports scripted statuses on thorough passes.
    struct ScriptedBackend {
        thorough_calls: Mutex<u32>,
        valid_on: Option<u32>,
    }

    impl ScriptedBackend {
        fn new(valid_on: Option<u32>) -> Self {
            Self {
                thorough_calls: Mutex::new(0),
                valid_on,
            }
        }

        fn calls(&self) -> u32 {
            *self.thorough_calls.lock().unwrap()
        }
    }

    impl MinimizerBackend for ScriptedBackend {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn run(
            &self,
            objective: &dyn Objective,
            state: &MinimizerState,
            effort: Effort,
            _controls: &MinimizeControls,
        ) -> Result<BackendReport> {
            let attempt = if effort == Effort::Thorough {
                let mut calls = self.thorough_calls.lock().unwrap();
                *calls += 1;
                *calls
            } else {
                0
            };
            let status = match (effort, self.valid_on) {
                (Effort::Coarse, _) => BackendStatus::Valid,
                (Effort::Thorough, Some(v)) if attempt >= v => BackendStatus::Valid,
                (Effort::Thorough, _) => BackendStatus::PrecisionNotReached,
            };
            // Encode the attempt number into the result so the test can see
            // which pass produced the returned parameters.
            let params = vec![attempt as f64; state.len()];
            let value = objective.eval(&params);
            Ok(BackendReport {
                params,
                value,
                status,
                n_iter: 1,
            })
        }
    }

    fn flat(n_par: usize) -> FnObjective<impl Fn(&[f64]) -> f64 + Send + Sync> {
        FnObjective::new(n_par, |_p: &[f64]| 0.0)
    }

    #[test]
    fn retry_stops_on_first_valid_attempt() {
        let backend = Arc::new(ScriptedBackend::new(Some(10)));
        let mut min = Minimizer::with_backend(backend.clone());
        min.set_init(&DVector::from_vec(vec![0.0, 0.0]));

        let result = min.minimize(&flat(2)).unwrap();

        assert_eq!(backend.calls(), 10);
        assert_eq!(result.as_slice(), &[10.0, 10.0]);
        assert!(matches!(min.last_status(), Some(BackendStatus::Valid)));
        assert_eq!(min.attempts().len(), 10);
        assert!(min.attempts()[..9].iter().all(|a| !a.status.is_valid()));
    }

    #[test]
    fn retry_ceiling_returns_last_result() {
        let backend = Arc::new(ScriptedBackend::new(None));
        let mut min = Minimizer::with_backend(backend.clone());
        min.set_init(&DVector::from_vec(vec![0.0]));

        let result = min.minimize(&flat(1)).unwrap();

        // Exactly MAX_TRY thorough passes, never more; the last attempt's
        // result comes back even though it is invalid.
        assert_eq!(backend.calls(), Minimizer::MAX_TRY);
        assert_eq!(result.as_slice(), &[10.0]);
        assert!(matches!(
            min.last_status(),
            Some(BackendStatus::PrecisionNotReached)
        ));
    }

    #[test]
    fn verbosity_never_changes_the_numbers() {
        let run = |verbosity| {
            let backend = Arc::new(ScriptedBackend::new(Some(3)));
            let mut min = Minimizer::with_backend(backend);
            min.set_verbosity(verbosity);
            min.set_init(&DVector::from_vec(vec![0.0, 0.0]));
            min.minimize(&flat(2)).unwrap()
        };
        assert_eq!(run(Verbosity::Silent), run(Verbosity::Normal));
        assert_eq!(run(Verbosity::Silent), run(Verbosity::Debug));
    }

    #[test]
    fn state_resizes_on_arity_change() {
        let backend = Arc::new(ScriptedBackend::new(Some(1)));
        let mut min = Minimizer::with_backend(backend);
        min.set_init(&DVector::from_vec(vec![1.0, 2.0, 3.0]));
        min.set_bounds(2, Some(0.0), None).unwrap();

        min.minimize(&flat(2)).unwrap();

        // Fresh state at the new arity: old values and bounds are gone.
        assert_eq!(min.state().len(), 2);
        assert_eq!(min.state().lower(1), None);
    }

    #[test]
    fn bounds_are_independent_per_side() {
        let mut state = MinimizerState::new(2);
        state.set_bounds(0, Some(-1.0), None).unwrap();
        state.set_bounds(1, None, Some(2.0)).unwrap();
        assert_eq!(state.lower(0), Some(-1.0));
        assert_eq!(state.upper(0), None);
        assert_eq!(state.clamped(&[-5.0, 5.0]), vec![-1.0, 2.0]);
    }

    #[test]
    fn bounds_out_of_range_fail() {
        let mut state = MinimizerState::new(1);
        assert!(state.set_bounds(1, Some(0.0), None).is_err());
        assert!(state.set_bounds(0, Some(1.0), Some(1.0)).is_err());
    }
}
