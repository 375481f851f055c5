//! Fit outcome: per-slot parameter estimates plus goodness-of-fit.
//!
//! The parameter estimates form a [`Sample`] themselves, so the usual
//! scheme-explicit reductions give parameter errors and correlations. All
//! accessors are read-only views over data fixed at construction.

use nalgebra::{DMatrix, DVector};
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::error::Result;
use crate::min::BackendStatus;
use crate::sample::{ResamplingScheme, Sample};

/// Terminal status of a fit slot that did not reach a valid minimum.
#[derive(Debug, Clone)]
pub struct SlotDiagnostic {
    pub slot: usize,
    pub status: BackendStatus,
}

/// Result of fitting a model to every slot of a resampled dataset.
#[derive(Debug, Clone)]
pub struct SampleFitResult {
    params: Sample<DVector<f64>>,
    chi2: Sample<f64>,
    n_dof: usize,
    scheme: ResamplingScheme,
    flagged: Vec<SlotDiagnostic>,
}

impl SampleFitResult {
    pub(crate) fn new(
        params: Sample<DVector<f64>>,
        chi2: Sample<f64>,
        n_dof: usize,
        scheme: ResamplingScheme,
        flagged: Vec<SlotDiagnostic>,
    ) -> Self {
        Self {
            params,
            chi2,
            n_dof,
            scheme,
            flagged,
        }
    }

    /// Full per-slot parameter ensemble.
    pub fn params(&self) -> &Sample<DVector<f64>> {
        &self.params
    }

    /// Central-slot parameter estimate.
    pub fn central(&self) -> &DVector<f64> {
        self.params.central()
    }

    /// Parameter covariance over the replica slots, scaled for the dataset's
    /// resampling scheme.
    pub fn covariance(&self) -> Result<DMatrix<f64>> {
        self.params.covariance(self.scheme)
    }

    /// Per-parameter variance (diagonal of [`Self::covariance`]).
    pub fn variance(&self) -> Result<DVector<f64>> {
        self.params.variance(self.scheme)
    }

    /// Central-slot chi-square.
    pub fn chi2(&self) -> f64 {
        *self.chi2.central()
    }

    /// Per-slot chi-square ensemble.
    pub fn chi2_sample(&self) -> &Sample<f64> {
        &self.chi2
    }

    /// Degrees of freedom: data points minus fitted parameters.
    pub fn n_dof(&self) -> usize {
        self.n_dof
    }

    /// Chi-square per degree of freedom. A saturated fit (`n_dof == 0`,
    /// as many parameters as data points) has no meaningful figure here:
    /// the division yields an infinity (or NaN at exactly zero chi-square),
    /// mirroring [`Self::p_value`]'s degradation.
    pub fn chi2_per_dof(&self) -> f64 {
        self.chi2() / self.n_dof as f64
    }

    /// Upper-tail chi-square probability of the central-slot fit, `NaN` when
    /// it is undefined (zero degrees of freedom or a non-finite chi-square).
    pub fn p_value(&self) -> f64 {
        match ChiSquared::new(self.n_dof as f64) {
            Ok(dist) => dist.sf(self.chi2()),
            Err(_) => f64::NAN,
        }
    }

    pub fn scheme(&self) -> ResamplingScheme {
        self.scheme
    }

    /// Slots whose minimization ended on a non-valid status. Their last
    /// estimate is still part of [`Self::params`].
    pub fn non_convergent_slots(&self) -> &[SlotDiagnostic] {
        &self.flagged
    }

    /// True when every slot converged to a valid minimum.
    pub fn is_clean(&self) -> bool {
        self.flagged.is_empty()
    }
}
