//! Fit model abstraction.
//!
//! A [`Model`] pairs an externally-supplied callable with its declared
//! arities: the number of independent variables it reads and the number of
//! parameters it takes. The engine does not care how the callable was
//! produced — compiled from an expression source, or written natively — it
//! only relies on the arity contract and on the callable being a pure,
//! reentrant function (no interior state), so it can be evaluated from many
//! fit slots concurrently.

use std::fmt;
use std::sync::Arc;

/// Immutable model: callable + fixed arities. Cloning is cheap (the callable
/// is shared).
#[derive(Clone)]
pub struct Model {
    f: Arc<dyn Fn(&[f64], &[f64]) -> f64 + Send + Sync>,
    n_arg: usize,
    n_par: usize,
}

impl Model {
    /// Wraps a callable taking `n_arg` independent-variable values and
    /// `n_par` parameters.
    pub fn new(
        n_arg: usize,
        n_par: usize,
        f: impl Fn(&[f64], &[f64]) -> f64 + Send + Sync + 'static,
    ) -> Self {
        Self {
            f: Arc::new(f),
            n_arg,
            n_par,
        }
    }

    /// Declared independent-variable arity.
    pub fn n_arg(&self) -> usize {
        self.n_arg
    }

    /// Declared parameter arity.
    pub fn n_par(&self) -> usize {
        self.n_par
    }

    /// Evaluates the model at `x` (length `n_arg`) with parameters `p`
    /// (length `n_par`).
    ///
    /// # Panics
    /// The callable may index past the end of undersized slices; callers
    /// must respect the declared arities.
    pub fn eval(&self, x: &[f64], p: &[f64]) -> f64 {
        debug_assert_eq!(x.len(), self.n_arg);
        debug_assert_eq!(p.len(), self.n_par);
        (self.f)(x, p)
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("n_arg", &self.n_arg)
            .field("n_par", &self.n_par)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eval_uses_both_argument_sets() {
        let f = Model::new(2, 2, |x, p| p[1] * (-x[0] * p[0]).exp() + x[1]);
        let y = f.eval(&[0.0, 3.0], &[0.5, 5.0]);
        assert_eq!(y, 8.0);
        assert_eq!(f.n_arg(), 2);
        assert_eq!(f.n_par(), 2);
    }
}
