//! Value sets exchanged over links.
//!
//! A [`ValueSet`] holds one sample per element of an element set. Scalars hold a single
//! value per slot while vectors hold an `(x, y, z)` triple per slot, stored as an `n x 3` array.

use crate::errors::{CouplingError, CouplingResult};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of values held by a [`ValueSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Scalar,
    Vector,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Scalar => write!(f, "Scalar"),
            ValueKind::Vector => write!(f, "Vector"),
        }
    }
}

/// An ordered set of numeric samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValueSet {
    /// One value per slot.
    Scalars(Array1<f64>),
    /// One `(x, y, z)` row per slot.
    Vectors(Array2<f64>),
}

impl ValueSet {
    /// Create a scalar value set.
    pub fn scalars(values: impl Into<Vec<f64>>) -> Self {
        ValueSet::Scalars(Array1::from(values.into()))
    }

    /// Create a vector value set from `(x, y, z)` triples.
    pub fn vectors(values: &[[f64; 3]]) -> Self {
        let mut array = Array2::zeros((values.len(), 3));
        for (mut row, value) in array.rows_mut().into_iter().zip(values) {
            row[0] = value[0];
            row[1] = value[1];
            row[2] = value[2];
        }
        ValueSet::Vectors(array)
    }

    /// An empty scalar set.
    pub fn empty() -> Self {
        ValueSet::Scalars(Array1::zeros(0))
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            ValueSet::Scalars(_) => ValueKind::Scalar,
            ValueSet::Vectors(_) => ValueKind::Vector,
        }
    }

    /// Number of slots in the set.
    pub fn count(&self) -> usize {
        match self {
            ValueSet::Scalars(values) => values.len(),
            ValueSet::Vectors(values) => values.nrows(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Scalar value at a slot, if this is a scalar set.
    pub fn scalar(&self, index: usize) -> Option<f64> {
        match self {
            ValueSet::Scalars(values) => values.get(index).copied(),
            ValueSet::Vectors(_) => None,
        }
    }

    /// Vector value at a slot, if this is a vector set.
    pub fn vector(&self, index: usize) -> Option<[f64; 3]> {
        match self {
            ValueSet::Scalars(_) => None,
            ValueSet::Vectors(values) => {
                if index < values.nrows() {
                    Some([
                        values[[index, 0]],
                        values[[index, 1]],
                        values[[index, 2]],
                    ])
                } else {
                    None
                }
            }
        }
    }

    /// Returns true if both sets have the same kind and slot count.
    pub fn is_compatible_with(&self, other: &ValueSet) -> bool {
        self.kind() == other.kind() && self.count() == other.count()
    }

    /// A set of the same shape filled with zeros.
    pub(crate) fn zeros_like(&self) -> Self {
        match self {
            ValueSet::Scalars(values) => ValueSet::Scalars(Array1::zeros(values.len())),
            ValueSet::Vectors(values) => ValueSet::Vectors(Array2::zeros(values.raw_dim())),
        }
    }

    /// Adds `weight * other` to this set in place.
    pub(crate) fn accumulate(&mut self, other: &ValueSet, weight: f64) -> CouplingResult<()> {
        if !self.is_compatible_with(other) {
            return Err(shape_mismatch(self, other));
        }
        match (self, other) {
            (ValueSet::Scalars(a), ValueSet::Scalars(b)) => a.scaled_add(weight, b),
            (ValueSet::Vectors(a), ValueSet::Vectors(b)) => a.scaled_add(weight, b),
            _ => unreachable!("value kinds were checked above"),
        }
        Ok(())
    }

    /// Component-wise `a + w * (b - a)`.
    ///
    /// `w` in `[0, 1]` interpolates between the sets; values outside that range extrapolate.
    pub(crate) fn lerp(a: &ValueSet, b: &ValueSet, w: f64) -> CouplingResult<ValueSet> {
        let mut difference = b.clone();
        difference.accumulate(a, -1.0)?;
        let mut result = a.clone();
        result.accumulate(&difference, w)?;
        Ok(result)
    }
}

fn shape_mismatch(a: &ValueSet, b: &ValueSet) -> CouplingError {
    CouplingError::Validation(format!(
        "Value sets are not compatible: {} x {} vs {} x {}",
        a.kind(),
        a.count(),
        b.kind(),
        b.count()
    ))
}
