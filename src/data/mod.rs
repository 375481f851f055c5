//! Multi-dimensional resampled dataset.
//!
//! A [`MultiDimSampleData`] declares named x dimensions (each a grid of
//! points) and named y dimensions (one value per grid row), and stores a
//! [`Sample`] per point/row so the whole dataset is resampled coherently.
//! The grid rows are the Cartesian product of the x-dimension points,
//! enumerated row-major in declaration order; [`flatten_index`] and
//! [`unflatten_index`] convert between a per-dimension multi-index and the
//! flat row number and are exact inverses over the declared ranges.
//!
//! Declare every x dimension before filling in y values: adding an x
//! dimension changes the row count and resets the y storage to fresh
//! zero-filled samples.
//!
//! [`flatten_index`]: MultiDimSampleData::flatten_index
//! [`unflatten_index`]: MultiDimSampleData::unflatten_index

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fit::{self, SampleFitResult};
use crate::min::Minimizer;
use crate::model::Model;
use crate::sample::{ResamplingScheme, Sample};

pub mod synth;

/// Declared independent-variable dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XDim {
    name: String,
    n_point: usize,
    /// Exact dimensions carry no statistical spread of their own (e.g. an
    /// integer time slice). Recorded per dimension; under the y-only error
    /// model it does not change the weighting.
    exact: bool,
}

/// Declared observable dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YDim {
    name: String,
}

/// Serializes through a raw mirror struct so deserialized input is validated
/// against the structural invariants the mutator API maintains (storage
/// shaped by the declared dimensions, unique names per axis).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawDataset", into = "RawDataset")]
pub struct MultiDimSampleData {
    n_replica: usize,
    scheme: ResamplingScheme,
    x_dims: Vec<XDim>,
    y_dims: Vec<YDim>,
    /// `x[dim][point]`
    x: Vec<Vec<Sample<f64>>>,
    /// `y[y_dim][row]`
    y: Vec<Vec<Sample<f64>>>,
}

/// Unvalidated wire shape of [`MultiDimSampleData`].
#[derive(Clone, Serialize, Deserialize)]
struct RawDataset {
    n_replica: usize,
    scheme: ResamplingScheme,
    x_dims: Vec<XDim>,
    y_dims: Vec<YDim>,
    x: Vec<Vec<Sample<f64>>>,
    y: Vec<Vec<Sample<f64>>>,
}

impl From<MultiDimSampleData> for RawDataset {
    fn from(data: MultiDimSampleData) -> Self {
        Self {
            n_replica: data.n_replica,
            scheme: data.scheme,
            x_dims: data.x_dims,
            y_dims: data.y_dims,
            x: data.x,
            y: data.y,
        }
    }
}

impl TryFrom<RawDataset> for MultiDimSampleData {
    type Error = Error;

    fn try_from(raw: RawDataset) -> Result<Self> {
        for (d, x_dim) in raw.x_dims.iter().enumerate() {
            if x_dim.n_point == 0 {
                return Err(Error::InvalidArgument(format!(
                    "x dimension '{}' declares zero points",
                    x_dim.name
                )));
            }
            if raw.x_dims[..d].iter().any(|o| o.name == x_dim.name) {
                return Err(Error::AlreadyExists(x_dim.name.clone()));
            }
        }
        for (j, y_dim) in raw.y_dims.iter().enumerate() {
            if raw.y_dims[..j].iter().any(|o| o.name == y_dim.name) {
                return Err(Error::AlreadyExists(y_dim.name.clone()));
            }
        }
        if raw.x.len() != raw.x_dims.len() {
            return Err(Error::InvalidArgument(format!(
                "{} x storage entries for {} declared x dimensions",
                raw.x.len(),
                raw.x_dims.len()
            )));
        }
        for (points, x_dim) in raw.x.iter().zip(raw.x_dims.iter()) {
            if points.len() != x_dim.n_point {
                return Err(Error::InvalidArgument(format!(
                    "x dimension '{}' declares {} points but stores {}",
                    x_dim.name,
                    x_dim.n_point,
                    points.len()
                )));
            }
        }
        if raw.y.len() != raw.y_dims.len() {
            return Err(Error::InvalidArgument(format!(
                "{} y storage entries for {} declared y dimensions",
                raw.y.len(),
                raw.y_dims.len()
            )));
        }
        let n_row: usize = raw.x_dims.iter().map(|d| d.n_point).product();
        for (j, rows) in raw.y.iter().enumerate() {
            if rows.len() != n_row {
                return Err(Error::InvalidArgument(format!(
                    "y dimension '{}' stores {} rows, grid has {n_row}",
                    raw.y_dims[j].name,
                    rows.len()
                )));
            }
        }
        Ok(Self {
            n_replica: raw.n_replica,
            scheme: raw.scheme,
            x_dims: raw.x_dims,
            y_dims: raw.y_dims,
            x: raw.x,
            y: raw.y,
        })
    }
}

impl MultiDimSampleData {
    /// Empty dataset for an ensemble of `n_replica` replicas produced with
    /// `scheme`. The scheme is fixed here because it is a property of the
    /// ensemble, not of any later reduction.
    pub fn new(n_replica: usize, scheme: ResamplingScheme) -> Self {
        Self {
            n_replica,
            scheme,
            x_dims: Vec::new(),
            y_dims: Vec::new(),
            x: Vec::new(),
            y: Vec::new(),
        }
    }

    /// Ensemble slot count, replicas plus the central slot.
    pub fn size(&self) -> usize {
        self.n_replica + 1
    }

    pub fn n_replica(&self) -> usize {
        self.n_replica
    }

    pub fn scheme(&self) -> ResamplingScheme {
        self.scheme
    }

    pub fn n_x_dim(&self) -> usize {
        self.x_dims.len()
    }

    pub fn n_y_dim(&self) -> usize {
        self.y_dims.len()
    }

    /// Grid rows: the product of the declared x-dimension point counts.
    pub fn n_row(&self) -> usize {
        self.x_dims.iter().map(|d| d.n_point).product()
    }

    /// Point count of x dimension `dim`.
    pub fn n_point(&self, dim: usize) -> Result<usize> {
        Ok(self.x_dim(dim)?.n_point)
    }

    /// Declares a new x dimension with `n_point` grid points. Resets the y
    /// storage (the row count changes).
    pub fn add_x_dim(&mut self, name: &str, n_point: usize) -> Result<()> {
        if n_point == 0 {
            return Err(Error::InvalidArgument(format!(
                "x dimension '{name}' needs at least one point"
            )));
        }
        if self.x_dims.iter().any(|d| d.name == name) {
            return Err(Error::AlreadyExists(name.into()));
        }
        self.x_dims.push(XDim {
            name: name.into(),
            n_point,
            exact: false,
        });
        self.x.push(vec![Sample::new(self.n_replica); n_point]);
        let n_row = self.n_row();
        for rows in &mut self.y {
            *rows = vec![Sample::new(self.n_replica); n_row];
        }
        Ok(())
    }

    /// Declares a new y dimension, one zero-filled sample per grid row.
    pub fn add_y_dim(&mut self, name: &str) -> Result<()> {
        if self.y_dims.iter().any(|d| d.name == name) {
            return Err(Error::AlreadyExists(name.into()));
        }
        self.y_dims.push(YDim { name: name.into() });
        self.y.push(vec![Sample::new(self.n_replica); self.n_row()]);
        Ok(())
    }

    pub fn x_dim_name(&self, dim: usize) -> Result<&str> {
        Ok(&self.x_dim(dim)?.name)
    }

    pub fn y_dim_name(&self, y_dim: usize) -> Result<&str> {
        Ok(&self
            .y_dims
            .get(y_dim)
            .ok_or(Error::OutOfRange {
                what: "y dimension",
                index: y_dim,
                len: self.y_dims.len(),
            })?
            .name)
    }

    /// Marks x dimension `dim` as exact (or clears the mark).
    pub fn mark_exact(&mut self, dim: usize, exact: bool) -> Result<()> {
        let len = self.x_dims.len();
        self.x_dims
            .get_mut(dim)
            .ok_or(Error::OutOfRange {
                what: "x dimension",
                index: dim,
                len,
            })?
            .exact = exact;
        Ok(())
    }

    pub fn is_exact(&self, dim: usize) -> Result<bool> {
        Ok(self.x_dim(dim)?.exact)
    }

    /// The x sample at grid point `point` of dimension `dim`.
    pub fn x(&self, point: usize, dim: usize) -> Result<&Sample<f64>> {
        let n_point = self.n_point(dim)?;
        self.x[dim].get(point).ok_or(Error::OutOfRange {
            what: "x point",
            index: point,
            len: n_point,
        })
    }

    pub fn x_mut(&mut self, point: usize, dim: usize) -> Result<&mut Sample<f64>> {
        let n_point = self.n_point(dim)?;
        self.x[dim].get_mut(point).ok_or(Error::OutOfRange {
            what: "x point",
            index: point,
            len: n_point,
        })
    }

    /// The y sample of dimension `y_dim` at flat row `row`.
    pub fn y(&self, row: usize, y_dim: usize) -> Result<&Sample<f64>> {
        let n_row = self.n_row();
        self.y
            .get(y_dim)
            .ok_or(Error::OutOfRange {
                what: "y dimension",
                index: y_dim,
                len: self.y_dims.len(),
            })?
            .get(row)
            .ok_or(Error::OutOfRange {
                what: "row",
                index: row,
                len: n_row,
            })
    }

    pub fn y_mut(&mut self, row: usize, y_dim: usize) -> Result<&mut Sample<f64>> {
        let n_row = self.n_row();
        let n_y_dim = self.y_dims.len();
        self.y
            .get_mut(y_dim)
            .ok_or(Error::OutOfRange {
                what: "y dimension",
                index: y_dim,
                len: n_y_dim,
            })?
            .get_mut(row)
            .ok_or(Error::OutOfRange {
                what: "row",
                index: row,
                len: n_row,
            })
    }

    /// Flat row number of a per-dimension multi-index, row-major in
    /// declaration order (the last declared dimension varies fastest).
    pub fn flatten_index(&self, index: &[usize]) -> Result<usize> {
        if index.len() != self.x_dims.len() {
            return Err(Error::InvalidArgument(format!(
                "multi-index has {} entries, dataset declares {} x dimensions",
                index.len(),
                self.x_dims.len()
            )));
        }
        let mut flat = 0;
        for (d, (&i, x_dim)) in index.iter().zip(self.x_dims.iter()).enumerate() {
            if i >= x_dim.n_point {
                return Err(Error::OutOfRange {
                    what: "x point",
                    index: i,
                    len: self.x_dims[d].n_point,
                });
            }
            flat = flat * x_dim.n_point + i;
        }
        Ok(flat)
    }

    /// Inverse of [`Self::flatten_index`].
    pub fn unflatten_index(&self, row: usize) -> Result<Vec<usize>> {
        if row >= self.n_row() {
            return Err(Error::OutOfRange {
                what: "row",
                index: row,
                len: self.n_row(),
            });
        }
        let mut rest = row;
        let mut index = vec![0; self.x_dims.len()];
        for (d, x_dim) in self.x_dims.iter().enumerate().rev() {
            index[d] = rest % x_dim.n_point;
            rest /= x_dim.n_point;
        }
        Ok(index)
    }

    /// Fits `model` to this dataset; see [`fit::fit_sample_data`].
    pub fn fit(
        &self,
        minimizer: &Minimizer,
        init: &DVector<f64>,
        model: &Model,
    ) -> Result<SampleFitResult> {
        fit::fit_sample_data(self, minimizer, init, model)
    }

    fn x_dim(&self, dim: usize) -> Result<&XDim> {
        self.x_dims.get(dim).ok_or(Error::OutOfRange {
            what: "x dimension",
            index: dim,
            len: self.x_dims.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> MultiDimSampleData {
        let mut data = MultiDimSampleData::new(2, ResamplingScheme::Jackknife);
        data.add_x_dim("t", 3).unwrap();
        data.add_x_dim("m", 2).unwrap();
        data.add_x_dim("beta", 4).unwrap();
        data.add_y_dim("corr").unwrap();
        data
    }

    #[test]
    fn flatten_unflatten_is_a_bijection() {
        let data = grid();
        assert_eq!(data.n_row(), 24);
        let mut seen = vec![false; data.n_row()];
        for i in 0..3 {
            for j in 0..2 {
                for k in 0..4 {
                    let flat = data.flatten_index(&[i, j, k]).unwrap();
                    assert!(!seen[flat], "row {flat} hit twice");
                    seen[flat] = true;
                    assert_eq!(data.unflatten_index(flat).unwrap(), vec![i, j, k]);
                }
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn last_dimension_varies_fastest() {
        let data = grid();
        assert_eq!(data.flatten_index(&[0, 0, 0]).unwrap(), 0);
        assert_eq!(data.flatten_index(&[0, 0, 1]).unwrap(), 1);
        assert_eq!(data.flatten_index(&[0, 1, 0]).unwrap(), 4);
        assert_eq!(data.flatten_index(&[1, 0, 0]).unwrap(), 8);
    }

    #[test]
    fn duplicate_dimension_names_are_rejected_per_axis() {
        let mut data = grid();
        assert!(matches!(
            data.add_x_dim("t", 5),
            Err(Error::AlreadyExists(_))
        ));
        assert!(matches!(
            data.add_y_dim("corr"),
            Err(Error::AlreadyExists(_))
        ));
        // the two axes are separate namespaces
        data.add_y_dim("t").unwrap();
    }

    #[test]
    fn out_of_range_indices_fail() {
        let mut data = grid();
        assert!(data.x(3, 0).is_err());
        assert!(data.x(0, 3).is_err());
        assert!(data.y(24, 0).is_err());
        assert!(data.y(0, 2).is_err());
        assert!(data.flatten_index(&[0, 0]).is_err());
        assert!(data.flatten_index(&[0, 2, 0]).is_err());
        assert!(data.unflatten_index(24).is_err());
        assert!(data.mark_exact(3, true).is_err());
    }

    #[test]
    fn exact_mark_is_per_dimension() {
        let mut data = grid();
        assert!(!data.is_exact(0).unwrap());
        data.mark_exact(0, true).unwrap();
        assert!(data.is_exact(0).unwrap());
        assert!(!data.is_exact(1).unwrap());
        data.mark_exact(0, false).unwrap();
        assert!(!data.is_exact(0).unwrap());
    }

    #[test]
    fn serde_round_trips_and_rejects_inconsistent_storage() {
        let mut data = grid();
        *data.y_mut(5, 0).unwrap() = Sample::fill(2, 3.5);
        let json = serde_json::to_value(&data).unwrap();

        let back: MultiDimSampleData = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(back.n_row(), 24);
        assert_eq!(*back.y(5, 0).unwrap().central(), 3.5);
        assert_eq!(back.scheme(), ResamplingScheme::Jackknife);

        // drop one y row: the storage no longer matches the declared grid
        let mut tampered = json.clone();
        tampered["y"][0].as_array_mut().unwrap().pop();
        assert!(serde_json::from_value::<MultiDimSampleData>(tampered).is_err());

        // duplicate an x dimension declaration
        let mut tampered = json;
        let dim = tampered["x_dims"][0].clone();
        tampered["x_dims"].as_array_mut().unwrap()[1] = dim;
        assert!(serde_json::from_value::<MultiDimSampleData>(tampered).is_err());
    }

    #[test]
    fn adding_an_x_dim_resets_y_storage() {
        let mut data = MultiDimSampleData::new(1, ResamplingScheme::Bootstrap);
        data.add_x_dim("t", 2).unwrap();
        data.add_y_dim("corr").unwrap();
        *data.y_mut(1, 0).unwrap() = Sample::fill(1, 7.0);
        data.add_x_dim("m", 3).unwrap();
        assert_eq!(data.n_row(), 6);
        // y was re-dimensioned to the new row count, zero-filled
        assert_eq!(*data.y(5, 0).unwrap().central(), 0.0);
    }
}
