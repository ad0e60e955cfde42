//! Small helpers shared by buffers and components.

use crate::errors::{CouplingError, CouplingResult};
use crate::time::Time;
use crate::values::ValueSet;
use serde::{Deserialize, Serialize};

/// Axis of a vector value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn column(&self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Extract a single number from a value set.
///
/// For scalar sets the axis is ignored and the scalar at `index` is returned.
/// For vector sets the requested component of the vector at `index` is returned.
pub fn axis_value(values: &ValueSet, index: usize, axis: Axis) -> CouplingResult<f64> {
    let value = match values {
        ValueSet::Scalars(_) => values.scalar(index),
        ValueSet::Vectors(_) => values.vector(index).map(|v| v[axis.column()]),
    };
    value.ok_or_else(|| {
        CouplingError::Validation(format!(
            "Index {} is out of range for a value set with {} elements",
            index,
            values.count()
        ))
    })
}

/// Returns true if `a` lies entirely before `b`.
///
/// Intervals are half-open so an interval ending exactly where an instant or another interval
/// begins is considered before it.
pub fn is_before(a: &Time, b: &Time) -> bool {
    match (a, b) {
        (Time::Instant(a), Time::Instant(b)) => a.days() < b.days(),
        (Time::Interval(a), Time::Instant(b)) => a.end().days() <= b.days(),
        (Time::Instant(a), Time::Interval(b)) => a.days() < b.start().days(),
        (Time::Interval(a), Time::Interval(b)) => a.end().days() <= b.start().days(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_value_for_scalars_ignores_axis() {
        let values = ValueSet::scalars(vec![1.0, 2.0]);
        assert_eq!(axis_value(&values, 1, Axis::X).unwrap(), 2.0);
        assert_eq!(axis_value(&values, 1, Axis::Z).unwrap(), 2.0);
        assert!(axis_value(&values, 2, Axis::X).is_err());
    }

    #[test]
    fn axis_value_for_vectors() {
        let values = ValueSet::vectors(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert_eq!(axis_value(&values, 0, Axis::Y).unwrap(), 2.0);
        assert_eq!(axis_value(&values, 1, Axis::Z).unwrap(), 6.0);
        assert!(matches!(
            axis_value(&values, 5, Axis::X),
            Err(CouplingError::Validation(_))
        ));
    }

    #[test]
    fn ordering_predicate() {
        let i1 = Time::instant(1.0);
        let i2 = Time::instant(2.0);
        let span = Time::interval(2.0, 3.0).unwrap();
        let later = Time::interval(3.0, 4.0).unwrap();

        assert!(is_before(&i1, &i2));
        assert!(!is_before(&i2, &i1));
        assert!(!is_before(&i2, &i2));
        assert!(is_before(&i1, &span));
        assert!(!is_before(&i2, &span));
        assert!(is_before(&span, &Time::instant(3.0)));
        assert!(!is_before(&span, &Time::instant(2.5)));
        assert!(is_before(&span, &later));
        assert!(!is_before(&later, &span));
    }
}
