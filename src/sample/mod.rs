//! Resampled value container.
//!
//! A [`Sample`] is an ordered sequence of `N + 1` slots of one value type:
//!
//! - slot `0` holds the *central* value (the estimate from the full,
//!   unresampled dataset)
//! - slots `1..=N` hold the *replicas* (jackknife / bootstrap draws)
//!
//! Arithmetic is slot-wise: combining two samples pairs central with central
//! and replica `i` with replica `i`. Every binary operation requires equal
//! ensemble sizes and fails with [`Error::SizeMismatch`] otherwise — sizes
//! are never silently truncated or padded.
//!
//! A `Sample` is a plain value type: copies are independent, nothing is
//! shared between instances. Slots are materialized up front (zero-filled
//! for scalars); callers are expected to populate every slot they later
//! reduce over.

use std::ops::{Index, IndexMut};

use nalgebra::DVector;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

pub mod stats;

pub use stats::ResamplingScheme;

/// Slot index of the central value.
pub const CENTRAL: usize = 0;

/// Fixed-size ensemble of values: one central slot plus `N` replica slots.
///
/// Serializes as the bare slot sequence; deserialization routes through
/// [`Sample::from_slots`], so the non-empty invariant also holds for data
/// read back from external input.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample<T> {
    slots: Vec<T>,
}

impl<T> Sample<T> {
    /// Builds a sample from raw slots (`slots[0]` is the central value).
    ///
    /// Fails with `InvalidArgument` if `slots` is empty: a sample always has
    /// at least its central slot.
    pub fn from_slots(slots: Vec<T>) -> Result<Self> {
        if slots.is_empty() {
            return Err(Error::InvalidArgument(
                "a sample needs at least a central slot".into(),
            ));
        }
        Ok(Self { slots })
    }

    /// Total slot count, `N + 1`.
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Replica count `N`.
    pub fn n_replica(&self) -> usize {
        self.slots.len() - 1
    }

    pub fn central(&self) -> &T {
        &self.slots[CENTRAL]
    }

    pub fn central_mut(&mut self) -> &mut T {
        &mut self.slots[CENTRAL]
    }

    /// Replica slots `1..=N`, excluding the central value.
    pub fn replicas(&self) -> &[T] {
        &self.slots[1..]
    }

    pub fn replicas_mut(&mut self) -> &mut [T] {
        &mut self.slots[1..]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.slots.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.slots.iter_mut()
    }

    /// Applies `f` slot-wise, producing a sample of the same ensemble size.
    pub fn map<U>(&self, f: impl Fn(&T) -> U) -> Sample<U> {
        Sample {
            slots: self.slots.iter().map(f).collect(),
        }
    }

    /// Combines two samples slot-wise: central with central, replica `i`
    /// with replica `i`.
    pub fn zip_with<U, V>(
        &self,
        other: &Sample<U>,
        f: impl Fn(&T, &U) -> V,
    ) -> Result<Sample<V>> {
        if self.size() != other.size() {
            return Err(Error::SizeMismatch {
                left: self.size(),
                right: other.size(),
            });
        }
        Ok(Sample {
            slots: self
                .slots
                .iter()
                .zip(other.slots.iter())
                .map(|(a, b)| f(a, b))
                .collect(),
        })
    }
}

impl<T: Clone> Sample<T> {
    /// Builds a sample with every slot set to `value`.
    pub fn fill(n_replica: usize, value: T) -> Self {
        Self {
            slots: vec![value; n_replica + 1],
        }
    }
}

impl Sample<f64> {
    /// Zero-filled scalar sample with `n_replica` replicas.
    pub fn new(n_replica: usize) -> Self {
        Self::fill(n_replica, 0.0)
    }

    pub fn add(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, |a, b| a + b)
    }

    pub fn sub(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, |a, b| a - b)
    }

    pub fn mul(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, |a, b| a * b)
    }

    pub fn div(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, |a, b| a / b)
    }

    /// Assembles scalar samples into one vector-valued sample, slot-wise:
    /// slot `s` of the result is `[parts[0][s], parts[1][s], ...]`.
    pub fn collect_vector(parts: &[&Sample<f64>]) -> Result<Sample<DVector<f64>>> {
        let first = parts.first().ok_or_else(|| {
            Error::InvalidArgument("cannot collect an empty list of samples".into())
        })?;
        for p in parts {
            if p.size() != first.size() {
                return Err(Error::SizeMismatch {
                    left: first.size(),
                    right: p.size(),
                });
            }
        }
        let slots = (0..first.size())
            .map(|s| DVector::from_iterator(parts.len(), parts.iter().map(|p| p[s])))
            .collect();
        Ok(Sample { slots })
    }
}

impl Sample<DVector<f64>> {
    /// Slot-wise vector concatenation (dimension concatenation).
    pub fn concat(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, |a, b| {
            DVector::from_iterator(a.len() + b.len(), a.iter().chain(b.iter()).copied())
        })
    }
}

impl<T: Serialize> Serialize for Sample<T> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.slots.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Sample<T> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Self::from_slots(Vec::deserialize(deserializer)?).map_err(serde::de::Error::custom)
    }
}

impl<T> Index<usize> for Sample<T> {
    type Output = T;

    fn index(&self, slot: usize) -> &T {
        &self.slots[slot]
    }
}

impl<T> IndexMut<usize> for Sample<T> {
    fn index_mut(&mut self, slot: usize) -> &mut T {
        &mut self.slots[slot]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(values: &[f64]) -> Sample<f64> {
        Sample::from_slots(values.to_vec()).unwrap()
    }

    #[test]
    fn from_slots_rejects_empty() {
        assert!(Sample::<f64>::from_slots(vec![]).is_err());
    }

    #[test]
    fn addition_is_slot_wise() {
        let a = sample(&[1.0, 2.0, 3.0]);
        let b = sample(&[10.0, 20.0, 30.0]);
        let c = a.add(&b).unwrap();
        for s in 0..a.size() {
            assert_eq!(c[s], a[s] + b[s]);
        }
    }

    #[test]
    fn mismatched_sizes_fail() {
        let a = sample(&[1.0, 2.0, 3.0]);
        let b = sample(&[1.0, 2.0]);
        match a.add(&b) {
            Err(Error::SizeMismatch { left: 3, right: 2 }) => {}
            other => panic!("expected SizeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn central_and_replicas_split() {
        let mut a = Sample::new(3);
        *a.central_mut() = 7.0;
        a.replicas_mut().copy_from_slice(&[1.0, 2.0, 3.0]);
        assert_eq!(*a.central(), 7.0);
        assert_eq!(a.replicas(), &[1.0, 2.0, 3.0]);
        assert_eq!(a.size(), 4);
        assert_eq!(a.n_replica(), 3);
    }

    #[test]
    fn collect_vector_pairs_matching_slots() {
        let a = sample(&[1.0, 2.0]);
        let b = sample(&[10.0, 20.0]);
        let v = Sample::collect_vector(&[&a, &b]).unwrap();
        assert_eq!(v[0].as_slice(), &[1.0, 10.0]);
        assert_eq!(v[1].as_slice(), &[2.0, 20.0]);
    }

    #[test]
    fn serde_round_trips_and_rejects_empty_ensembles() {
        let s = sample(&[1.0, 2.0, 3.0]);
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, "[1.0,2.0,3.0]");
        let back: Sample<f64> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
        // an empty slot list has no central value and must not construct
        assert!(serde_json::from_str::<Sample<f64>>("[]").is_err());
    }

    #[test]
    fn concat_joins_dimensions_per_slot() {
        let a = sample(&[1.0, 2.0]);
        let b = sample(&[10.0, 20.0]);
        let va = Sample::collect_vector(&[&a]).unwrap();
        let vb = Sample::collect_vector(&[&b]).unwrap();
        let v = va.concat(&vb).unwrap();
        assert_eq!(v[1].as_slice(), &[2.0, 20.0]);
    }
}
