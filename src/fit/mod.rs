//! Fit orchestration over a resampled dataset.
//!
//! Responsibilities:
//!
//! - validate that the dataset, model and initial guess agree on ensemble
//!   size and arities before any numerical work starts
//! - build the per-slot weighted least-squares objective
//! - minimize every slot independently (rayon), each slot on its own cloned
//!   minimizer so no solver state leaks between slots
//! - collect the per-slot estimates into a [`SampleFitResult`]
//!
//! The error model is y-only: row weights come from the y samples' replica
//! spread under the dataset's resampling scheme, and x values enter as fixed
//! covariates whether or not the dimension is marked exact. A row whose y
//! spread is zero or non-finite gets unit weight, so noise-free synthetic
//! data stays fittable.
//!
//! A slot that fails to converge is *not* an error: it keeps its last
//! estimate and shows up in [`SampleFitResult::non_convergent_slots`].

use nalgebra::DVector;
use rayon::prelude::*;

use crate::data::MultiDimSampleData;
use crate::error::{Error, Result};
use crate::min::{Minimizer, Objective};
use crate::model::Model;
use crate::sample::Sample;

mod result;

pub use result::{SampleFitResult, SlotDiagnostic};

/// Weighted least-squares objective for one slot: the dataset's x and y
/// values at that slot, with weights shared across slots.
struct SlotObjective<'a> {
    model: &'a Model,
    /// Per row, the x vector at this slot (row-major over declared x dims).
    rows_x: Vec<Vec<f64>>,
    /// `y[j * n_row + r]` is the y value of dimension `j` at row `r`.
    y: Vec<f64>,
    /// Same layout as `y`.
    weights: &'a [f64],
}

impl Objective for SlotObjective<'_> {
    fn n_par(&self) -> usize {
        self.model.n_par()
    }

    fn eval(&self, p: &[f64]) -> f64 {
        let n_row = self.rows_x.len();
        let n_y_dim = self.y.len() / n_row;
        let mut chi2 = 0.0;
        for (r, x) in self.rows_x.iter().enumerate() {
            let f = self.model.eval(x, p);
            for j in 0..n_y_dim {
                let i = j * n_row + r;
                let d = f - self.y[i];
                chi2 += self.weights[i] * d * d;
            }
        }
        chi2
    }
}

/// Checks that every sample in `data` shares the container's ensemble size.
fn validate_ensemble(data: &MultiDimSampleData) -> Result<()> {
    let size = data.size();
    for d in 0..data.n_x_dim() {
        for p in 0..data.n_point(d)? {
            let s = data.x(p, d)?;
            if s.size() != size {
                return Err(Error::InconsistentEnsemble(format!(
                    "x dimension '{}' point {p} has {} slots, dataset has {size}",
                    data.x_dim_name(d)?,
                    s.size()
                )));
            }
        }
    }
    for j in 0..data.n_y_dim() {
        for r in 0..data.n_row() {
            let s = data.y(r, j)?;
            if s.size() != size {
                return Err(Error::InconsistentEnsemble(format!(
                    "y dimension '{}' row {r} has {} slots, dataset has {size}",
                    data.y_dim_name(j)?,
                    s.size()
                )));
            }
        }
    }
    Ok(())
}

/// Per-(y dim, row) weights from the replica spread, computed once and
/// shared by every slot.
fn row_weights(data: &MultiDimSampleData) -> Result<Vec<f64>> {
    let scheme = data.scheme();
    let mut weights = Vec::with_capacity(data.n_y_dim() * data.n_row());
    for j in 0..data.n_y_dim() {
        for r in 0..data.n_row() {
            let var = data.y(r, j)?.variance(scheme);
            weights.push(if var.is_finite() && var > 0.0 { 1.0 / var } else { 1.0 });
        }
    }
    Ok(weights)
}

/// The x vectors of every row at slot `slot`.
fn rows_at_slot(data: &MultiDimSampleData, slot: usize) -> Result<Vec<Vec<f64>>> {
    let mut rows = Vec::with_capacity(data.n_row());
    for r in 0..data.n_row() {
        let index = data.unflatten_index(r)?;
        let mut x = Vec::with_capacity(data.n_x_dim());
        for (d, &p) in index.iter().enumerate() {
            x.push(data.x(p, d)?[slot]);
        }
        rows.push(x);
    }
    Ok(rows)
}

fn y_at_slot(data: &MultiDimSampleData, slot: usize) -> Result<Vec<f64>> {
    let mut y = Vec::with_capacity(data.n_y_dim() * data.n_row());
    for j in 0..data.n_y_dim() {
        for r in 0..data.n_row() {
            y.push(data.y(r, j)?[slot]);
        }
    }
    Ok(y)
}

/// Fits `model` to every slot of `data` by weighted least squares.
///
/// `minimizer` is a template: each slot clones it and seeds it with `init`,
/// so bounds and controls set on it apply uniformly while per-slot solver
/// state stays private. Slots run in parallel; results land in slot order
/// regardless of completion order.
pub fn fit_sample_data(
    data: &MultiDimSampleData,
    minimizer: &Minimizer,
    init: &DVector<f64>,
    model: &Model,
) -> Result<SampleFitResult> {
    if data.n_row() == 0 || data.n_y_dim() == 0 {
        return Err(Error::InvalidArgument(
            "cannot fit an empty dataset".into(),
        ));
    }
    if model.n_arg() != data.n_x_dim() {
        return Err(Error::InvalidArgument(format!(
            "model reads {} variables, dataset declares {} x dimensions",
            model.n_arg(),
            data.n_x_dim()
        )));
    }
    if model.n_par() != init.len() {
        return Err(Error::InvalidArgument(format!(
            "model takes {} parameters, initial guess has {}",
            model.n_par(),
            init.len()
        )));
    }
    let n_data = data.n_row() * data.n_y_dim();
    if model.n_par() > n_data {
        return Err(Error::InvalidArgument(format!(
            "{} parameters cannot be constrained by {n_data} data points",
            model.n_par()
        )));
    }
    validate_ensemble(data)?;

    let weights = row_weights(data)?;

    let slots = (0..data.size())
        .into_par_iter()
        .map(|slot| {
            let objective = SlotObjective {
                model,
                rows_x: rows_at_slot(data, slot)?,
                y: y_at_slot(data, slot)?,
                weights: &weights,
            };
            let mut local = minimizer.clone();
            local.set_init(init);
            let params = local.minimize(&objective)?;
            let chi2 = objective.eval(params.as_slice());
            let status = local.last_status().cloned();
            Ok((params, chi2, status))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut param_slots = Vec::with_capacity(slots.len());
    let mut chi2_slots = Vec::with_capacity(slots.len());
    let mut flagged = Vec::new();
    for (slot, (params, chi2, status)) in slots.into_iter().enumerate() {
        param_slots.push(params);
        chi2_slots.push(chi2);
        if let Some(status) = status
            && !status.is_valid()
        {
            flagged.push(SlotDiagnostic { slot, status });
        }
    }

    Ok(SampleFitResult::new(
        Sample::from_slots(param_slots)?,
        Sample::from_slots(chi2_slots)?,
        n_data - model.n_par(),
        data.scheme(),
        flagged,
    ))
}
