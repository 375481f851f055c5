//! Quasi-Newton backend: argmin L-BFGS with More-Thuente line search.
//!
//! Box bounds are handled by clamping the parameters inside the cost and
//! gradient callbacks plus a projected-gradient correction: when a
//! parameter sits on a bound and the gradient points further outside, that
//! component is zeroed so the line search does not keep stepping into the
//! flat clamped region.

use argmin::core::{
    CostFunction, Error as ArgminError, Executor, Gradient, State, TerminationReason,
    TerminationStatus,
};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;

use crate::error::{Error, Result};
use crate::min::backend::{BackendReport, BackendStatus, Effort, MinimizeControls, MinimizerBackend};
use crate::min::{MinimizerState, Objective};

/// Number of corrections kept for the inverse-Hessian approximation.
const LBFGS_MEMORY: usize = 7;

#[derive(Debug, Clone, Copy, Default)]
pub struct QuasiNewtonBackend;

struct Problem<'a> {
    objective: &'a dyn Objective,
    state: &'a MinimizerState,
}

impl CostFunction for Problem<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, p: &Self::Param) -> std::result::Result<f64, ArgminError> {
        Ok(self.objective.eval(&self.state.clamped(p)))
    }
}

impl Gradient for Problem<'_> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, p: &Self::Param) -> std::result::Result<Vec<f64>, ArgminError> {
        let clamped = self.state.clamped(p);
        let mut g = self.objective.gradient(&clamped);
        const EPS: f64 = 1e-12;
        for (i, (&x, gi)) in clamped.iter().zip(g.iter_mut()).enumerate() {
            if let Some(lo) = self.state.lower(i)
                && x <= lo + EPS
                && *gi > 0.0
            {
                *gi = 0.0;
            }
            if let Some(hi) = self.state.upper(i)
                && x >= hi - EPS
                && *gi < 0.0
            {
                *gi = 0.0;
            }
        }
        Ok(g)
    }
}

impl MinimizerBackend for QuasiNewtonBackend {
    fn name(&self) -> &'static str {
        "l-bfgs"
    }

    fn run(
        &self,
        objective: &dyn Objective,
        state: &MinimizerState,
        effort: Effort,
        controls: &MinimizeControls,
    ) -> Result<BackendReport> {
        let (max_iters, tol) = controls.budget(effort);
        let start = state.clamped(state.values());

        let linesearch = MoreThuenteLineSearch::new();
        let solver = LBFGS::new(linesearch, LBFGS_MEMORY)
            .with_tolerance_grad(tol)
            .map_err(|e| Error::InvalidArgument(format!("l-bfgs gradient tolerance: {e}")))?
            .with_tolerance_cost((0.1 * tol).max(1e-14))
            .map_err(|e| Error::InvalidArgument(format!("l-bfgs cost tolerance: {e}")))?;

        let problem = Problem { objective, state };
        let run = Executor::new(problem, solver)
            .configure(|s| s.param(start.clone()).max_iters(max_iters))
            .run();

        let res = match run {
            Ok(res) => res,
            // A hard solver failure (e.g. the line search cannot make
            // progress) is reported, not propagated: the retry driver
            // decides what to do with it.
            Err(e) => {
                let value = objective.eval(&start);
                return Ok(BackendReport {
                    params: start,
                    value,
                    status: BackendStatus::Failed(e.to_string()),
                    n_iter: 0,
                });
            }
        };

        let run_state = res.state();
        let params = match run_state.get_best_param() {
            Some(p) => state.clamped(p),
            None => start.clone(),
        };
        let value = run_state.get_best_cost();
        let value = if value.is_finite() { value } else { objective.eval(&params) };
        let status = classify(run_state.get_termination_status());

        Ok(BackendReport {
            params,
            value,
            status,
            n_iter: run_state.get_iter(),
        })
    }
}

pub(crate) fn classify(termination: &TerminationStatus) -> BackendStatus {
    match termination {
        TerminationStatus::Terminated(TerminationReason::SolverConverged)
        | TerminationStatus::Terminated(TerminationReason::TargetCostReached) => {
            BackendStatus::Valid
        }
        TerminationStatus::Terminated(TerminationReason::MaxItersReached) => {
            BackendStatus::IterationLimit
        }
        TerminationStatus::Terminated(TerminationReason::SolverExit(msg)) => {
            BackendStatus::Failed(msg.clone())
        }
        TerminationStatus::Terminated(other) => BackendStatus::Failed(other.to_string()),
        TerminationStatus::NotTerminated => BackendStatus::PrecisionNotReached,
    }
}
