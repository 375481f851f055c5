//! Named result registry.
//!
//! A [`DataTable`] maps names to a closed set of storable value kinds, so a
//! whole analysis (input ensembles, fitted covariances, derived datasets)
//! can travel as one serializable unit. Retrieval is typed: asking for a
//! matrix under a name that holds a sample is a [`Error::WrongKind`], never
//! a silent coercion. The concrete wire format is whatever serde format the
//! caller picks; the table only fixes the in-memory shape.

use std::collections::HashMap;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::data::MultiDimSampleData;
use crate::error::{Error, Result};
use crate::sample::Sample;

/// Storable value kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Entry {
    Matrix(DMatrix<f64>),
    Sample(Sample<f64>),
    Data(MultiDimSampleData),
}

impl Entry {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Entry::Matrix(_) => "matrix",
            Entry::Sample(_) => "sample",
            Entry::Data(_) => "data",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataTable {
    entries: HashMap<String, Entry>,
}

impl DataTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `entry` under `name`, returning the displaced entry if the
    /// name was already taken.
    pub fn insert(&mut self, name: &str, entry: Entry) -> Option<Entry> {
        self.entries.insert(name.into(), entry)
    }

    pub fn remove(&mut self, name: &str) -> Option<Entry> {
        self.entries.remove(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Untyped lookup; `NotFound` for an absent name.
    pub fn get(&self, name: &str) -> Result<&Entry> {
        self.entries
            .get(name)
            .ok_or_else(|| Error::NotFound(name.into()))
    }

    pub fn matrix(&self, name: &str) -> Result<&DMatrix<f64>> {
        match self.get(name)? {
            Entry::Matrix(m) => Ok(m),
            other => Err(wrong_kind(name, "matrix", other)),
        }
    }

    pub fn sample(&self, name: &str) -> Result<&Sample<f64>> {
        match self.get(name)? {
            Entry::Sample(s) => Ok(s),
            other => Err(wrong_kind(name, "sample", other)),
        }
    }

    pub fn data(&self, name: &str) -> Result<&MultiDimSampleData> {
        match self.get(name)? {
            Entry::Data(d) => Ok(d),
            other => Err(wrong_kind(name, "data", other)),
        }
    }
}

fn wrong_kind(name: &str, expected: &'static str, actual: &Entry) -> Error {
    Error::WrongKind {
        name: name.into(),
        expected,
        actual: actual.kind_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_retrieval_checks_the_variant() {
        let mut table = DataTable::new();
        table.insert("cov", Entry::Matrix(DMatrix::identity(2, 2)));
        table.insert("mass", Entry::Sample(Sample::fill(3, 1.0)));

        assert_eq!(table.matrix("cov").unwrap().nrows(), 2);
        assert_eq!(table.sample("mass").unwrap().n_replica(), 3);

        match table.sample("cov") {
            Err(Error::WrongKind {
                expected: "sample",
                actual: "matrix",
                ..
            }) => {}
            other => panic!("expected WrongKind, got {other:?}"),
        }
    }

    #[test]
    fn absent_names_are_not_found() {
        let table = DataTable::new();
        assert!(matches!(table.get("nope"), Err(Error::NotFound(_))));
        assert!(matches!(table.matrix("nope"), Err(Error::NotFound(_))));
    }

    #[test]
    fn insert_reports_displacement() {
        let mut table = DataTable::new();
        assert!(table.insert("m", Entry::Sample(Sample::fill(1, 0.0))).is_none());
        let old = table.insert("m", Entry::Matrix(DMatrix::zeros(1, 1)));
        assert_eq!(old.unwrap().kind_name(), "sample");
        assert_eq!(table.len(), 1);
        assert!(table.remove("m").is_some());
        assert!(table.is_empty());
    }
}
