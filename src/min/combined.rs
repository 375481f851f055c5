//! Combined backend: quasi-Newton first, simplex rescue.
//!
//! The gradient pass is cheap and usually sufficient; when it ends on an
//! invalid minimum the simplex pass restarts from the gradient pass's best
//! point and the better of the two results wins.

use crate::error::Result;
use crate::min::backend::{BackendReport, Effort, MinimizeControls, MinimizerBackend};
use crate::min::quasi_newton::QuasiNewtonBackend;
use crate::min::simplex::SimplexBackend;
use crate::min::{MinimizerState, Objective};

#[derive(Debug, Clone, Copy, Default)]
pub struct CombinedBackend {
    quasi_newton: QuasiNewtonBackend,
    simplex: SimplexBackend,
}

impl MinimizerBackend for CombinedBackend {
    fn name(&self) -> &'static str {
        "l-bfgs+nelder-mead"
    }

    fn run(
        &self,
        objective: &dyn Objective,
        state: &MinimizerState,
        effort: Effort,
        controls: &MinimizeControls,
    ) -> Result<BackendReport> {
        let first = self.quasi_newton.run(objective, state, effort, controls)?;
        if first.status.is_valid() {
            return Ok(first);
        }

        let seeded = state.with_values(&first.params);
        let second = self.simplex.run(objective, &seeded, effort, controls)?;

        // Keep whichever pass reached the lower value; the iteration count
        // covers both passes either way.
        let n_iter = first.n_iter + second.n_iter;
        let mut best = if second.value <= first.value { second } else { first };
        best.n_iter = n_iter;
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::DVector;

    use super::*;
    use crate::min::{Algorithm, FnObjective, Minimizer};

    #[test]
    fn combined_solves_smooth_problem_via_gradient_pass() {
        let objective =
            FnObjective::new(2, |p: &[f64]| (p[0] - 4.0).powi(2) + (p[1] + 1.0).powi(2));
        let mut min = Minimizer::new(Algorithm::Combined);
        min.set_init(&DVector::from_vec(vec![0.0, 0.0]));
        let x = min.minimize(&objective).unwrap();
        assert_relative_eq!(x[0], 4.0, epsilon = 1e-5);
        assert_relative_eq!(x[1], -1.0, epsilon = 1e-5);
        assert!(min.last_status().unwrap().is_valid());
    }

    #[test]
    fn combined_falls_back_to_simplex_on_kinked_objective() {
        // |x - 1| has no gradient at the minimum; the simplex rescue still
        // has to land close.
        let objective = FnObjective::new(1, |p: &[f64]| (p[0] - 1.0).abs());
        let mut min = Minimizer::new(Algorithm::Combined);
        min.set_init(&DVector::from_vec(vec![-2.0]));
        let x = min.minimize(&objective).unwrap();
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-3);
    }
}
