//! Scheme-explicit reductions over replica slots.
//!
//! Jackknife and bootstrap ensembles carry different variance scalings, so
//! every reduction here takes the [`ResamplingScheme`] explicitly — nothing
//! assumes a scheme silently. All reductions run over the replica slots
//! `1..=N` only; the central slot never enters a spread estimate.
//!
//! With deviations `d_i = θ_i - θ̄` from the replica mean `θ̄`:
//!
//! - jackknife: `var = (N - 1) / N * Σ d_i²`
//! - bootstrap: `var = 1 / (N - 1) * Σ d_i²`
//!
//! Both are deterministic: a fixed input ensemble always yields the same
//! result (no RNG in any reduction).

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::Sample;
use crate::error::{Error, Result};

/// How the replica ensemble was generated, which fixes the variance scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResamplingScheme {
    /// Leave-one-out resampling; replicas are strongly correlated, so the
    /// spread of the replica cloud is scaled *up* by `(N - 1)`.
    Jackknife,
    /// Independent bootstrap draws; the replica cloud spread estimates the
    /// sampling variance directly (unbiased `1 / (N - 1)` normalization).
    Bootstrap,
}

impl ResamplingScheme {
    /// Factor applied to the raw deviation sum `Σ d_i d_iᵀ`.
    ///
    /// Returns 0 for fewer than two replicas: a single draw carries no
    /// spread information.
    pub fn sum_factor(self, n_replica: usize) -> f64 {
        if n_replica < 2 {
            return 0.0;
        }
        let n = n_replica as f64;
        match self {
            ResamplingScheme::Jackknife => (n - 1.0) / n,
            ResamplingScheme::Bootstrap => 1.0 / (n - 1.0),
        }
    }
}

impl Sample<f64> {
    /// Mean over the replica slots (slot 0 excluded).
    pub fn replica_mean(&self) -> f64 {
        let n = self.n_replica();
        if n == 0 {
            return f64::NAN;
        }
        self.replicas().iter().sum::<f64>() / n as f64
    }

    /// Scheme-scaled variance over the replica slots.
    pub fn variance(&self, scheme: ResamplingScheme) -> f64 {
        let mean = self.replica_mean();
        let sum: f64 = self.replicas().iter().map(|v| (v - mean) * (v - mean)).sum();
        scheme.sum_factor(self.n_replica()) * sum
    }
}

impl Sample<DVector<f64>> {
    /// Mean vector over the replica slots.
    ///
    /// Fails with `SizeMismatch` if the replica vectors do not all share
    /// one length.
    pub fn replica_mean(&self) -> Result<DVector<f64>> {
        let dim = self.check_uniform_dim()?;
        let n = self.n_replica();
        if n == 0 {
            return Err(Error::InvalidArgument(
                "replica mean needs at least one replica".into(),
            ));
        }
        let mut mean = DVector::zeros(dim);
        for r in self.replicas() {
            mean += r;
        }
        Ok(mean / n as f64)
    }

    /// Scheme-scaled covariance matrix over the replica slots.
    pub fn covariance(&self, scheme: ResamplingScheme) -> Result<DMatrix<f64>> {
        let dim = self.check_uniform_dim()?;
        let mean = self.replica_mean()?;
        let mut sum = DMatrix::zeros(dim, dim);
        for r in self.replicas() {
            let d = r - &mean;
            sum += &d * d.transpose();
        }
        Ok(sum * scheme.sum_factor(self.n_replica()))
    }

    /// Diagonal of [`Self::covariance`].
    pub fn variance(&self, scheme: ResamplingScheme) -> Result<DVector<f64>> {
        Ok(self.covariance(scheme)?.diagonal())
    }

    fn check_uniform_dim(&self) -> Result<usize> {
        let dim = self.central().len();
        for v in self.iter() {
            if v.len() != dim {
                return Err(Error::SizeMismatch {
                    left: dim,
                    right: v.len(),
                });
            }
        }
        Ok(dim)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn sample(values: &[f64]) -> Sample<f64> {
        Sample::from_slots(values.to_vec()).unwrap()
    }

    #[test]
    fn variance_is_scheme_specific_and_deterministic() {
        // central = 0.0, replicas = [1, 2, 3, 4]; mean = 2.5, Σ d² = 5.0
        let s = sample(&[0.0, 1.0, 2.0, 3.0, 4.0]);
        let jk = s.variance(ResamplingScheme::Jackknife);
        let bs = s.variance(ResamplingScheme::Bootstrap);
        assert_relative_eq!(jk, 3.0 / 4.0 * 5.0, epsilon = 1e-12);
        assert_relative_eq!(bs, 5.0 / 3.0, epsilon = 1e-12);
        // deterministic: same input, same output
        assert_eq!(jk, s.variance(ResamplingScheme::Jackknife));
    }

    #[test]
    fn variance_excludes_central_slot() {
        let a = sample(&[0.0, 1.0, 2.0, 3.0]);
        let b = sample(&[1.0e6, 1.0, 2.0, 3.0]);
        assert_eq!(
            a.variance(ResamplingScheme::Bootstrap),
            b.variance(ResamplingScheme::Bootstrap)
        );
    }

    #[test]
    fn single_replica_has_zero_spread() {
        let s = sample(&[0.0, 1.0]);
        assert_eq!(s.variance(ResamplingScheme::Jackknife), 0.0);
        assert_eq!(s.variance(ResamplingScheme::Bootstrap), 0.0);
    }

    #[test]
    fn vector_covariance_matches_scalar_variance_on_diagonal() {
        let a = sample(&[0.0, 1.0, 2.0, 3.0, 4.0]);
        let b = sample(&[0.0, -1.0, 1.0, -1.0, 1.0]);
        let v = Sample::collect_vector(&[&a, &b]).unwrap();
        let cov = v.covariance(ResamplingScheme::Bootstrap).unwrap();
        assert_relative_eq!(
            cov[(0, 0)],
            a.variance(ResamplingScheme::Bootstrap),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            cov[(1, 1)],
            b.variance(ResamplingScheme::Bootstrap),
            epsilon = 1e-12
        );
        // symmetry
        assert_relative_eq!(cov[(0, 1)], cov[(1, 0)], epsilon = 1e-12);
    }
}
