//! The four time mappings used by [`SmartBuffer::get_values`](super::SmartBuffer::get_values).
//!
//! Every function expects at least two samples of the matching time kind. Extrapolation
//! only ever looks at the two samples nearest to the boundary being crossed.

use super::Sample;
use crate::errors::{CouplingError, CouplingResult};
use crate::time::{Instant, Time, TimeInterval};
use crate::values::ValueSet;

fn instant_at(samples: &[Sample], index: usize) -> CouplingResult<f64> {
    match samples[index].time() {
        Time::Instant(t) => Ok(t.days()),
        Time::Interval(i) => Err(mixed_kinds(index, i)),
    }
}

fn interval_at(samples: &[Sample], index: usize) -> CouplingResult<TimeInterval> {
    match samples[index].time() {
        Time::Interval(i) => Ok(*i),
        Time::Instant(t) => Err(mixed_kinds(index, t)),
    }
}

fn mixed_kinds(index: usize, time: &dyn std::fmt::Display) -> CouplingError {
    CouplingError::Validation(format!(
        "Sample {} at {} does not match the time kind of the buffer",
        index, time
    ))
}

/// `numerator / denominator`, rejecting the degenerate spans produced by unsorted samples.
fn fraction(numerator: f64, denominator: f64) -> CouplingResult<f64> {
    if denominator <= 0.0 {
        return Err(CouplingError::Validation(
            "Samples must be strictly increasing in time".to_string(),
        ));
    }
    Ok(numerator / denominator)
}

/// Stored instants, requested instant.
///
/// Inside the stored range the two straddling samples are linearly interpolated. Before the
/// first (after the last) sample the line through the first (last) two samples is followed,
/// with its slope scaled by the relaxation factor.
pub(super) fn instants_to_instant(
    samples: &[Sample],
    requested: Instant,
    relaxation: f64,
) -> CouplingResult<ValueSet> {
    let tr = requested.days();
    let last = samples.len() - 1;

    let t_first = instant_at(samples, 0)?;
    if tr <= t_first {
        let t_second = instant_at(samples, 1)?;
        let w = relaxation * fraction(tr - t_first, t_second - t_first)?;
        return ValueSet::lerp(samples[0].values(), samples[1].values(), w);
    }

    let t_last = instant_at(samples, last)?;
    if tr >= t_last {
        let t_before = instant_at(samples, last - 1)?;
        let w = relaxation * fraction(tr - t_last, t_last - t_before)?;
        return ValueSet::lerp(samples[last].values(), samples[last - 1].values(), -w);
    }

    // Index of the last sample at or before the requested time
    let mut lower = 0;
    for index in 1..last {
        if instant_at(samples, index)? <= tr {
            lower = index;
        } else {
            break;
        }
    }
    let t0 = instant_at(samples, lower)?;
    let t1 = instant_at(samples, lower + 1)?;
    let w = fraction(tr - t0, t1 - t0)?;
    ValueSet::lerp(samples[lower].values(), samples[lower + 1].values(), w)
}

/// Stored intervals, requested interval.
///
/// Each stored interval contributes its value weighted by the fraction of the requested
/// interval it overlaps. This covers a stored interval fully inside the request, the request
/// fully inside a stored interval, an exact match, and partial overlaps at either edge.
/// Any part of the request before the first or after the last stored interval is filled with
/// the value extrapolated to the midpoint of that part, using the midpoints of the two
/// nearest intervals.
pub(super) fn intervals_to_interval(
    samples: &[Sample],
    requested: &TimeInterval,
    relaxation: f64,
) -> CouplingResult<ValueSet> {
    let trb = requested.start().days();
    let tre = requested.end().days();
    let span = requested.duration();
    let last = samples.len() - 1;

    let mut result = samples[0].values().zeros_like();

    for (index, sample) in samples.iter().enumerate() {
        let stored = interval_at(samples, index)?;
        let overlap = tre.min(stored.end().days()) - trb.max(stored.start().days());
        if overlap > 0.0 {
            result.accumulate(sample.values(), overlap / span)?;
        }
    }

    let first = interval_at(samples, 0)?;
    if trb < first.start().days() {
        let lo = trb;
        let hi = tre.min(first.start().days());
        let second = interval_at(samples, 1)?;
        let m0 = first.midpoint().days();
        let m1 = second.midpoint().days();
        let w = relaxation * fraction(0.5 * (lo + hi) - m0, m1 - m0)?;
        let value = ValueSet::lerp(samples[0].values(), samples[1].values(), w)?;
        result.accumulate(&value, (hi - lo) / span)?;
    }

    let final_interval = interval_at(samples, last)?;
    if tre > final_interval.end().days() {
        let lo = trb.max(final_interval.end().days());
        let hi = tre;
        let before = interval_at(samples, last - 1)?;
        let m_last = final_interval.midpoint().days();
        let m_before = before.midpoint().days();
        let w = relaxation * fraction(0.5 * (lo + hi) - m_last, m_last - m_before)?;
        let value = ValueSet::lerp(samples[last].values(), samples[last - 1].values(), -w)?;
        result.accumulate(&value, (hi - lo) / span)?;
    }

    Ok(result)
}

/// Stored intervals, requested instant.
///
/// Inside the stored range the value of the containing interval is returned unchanged. The end
/// of the final interval is treated as part of it. Outside of the range the line through the
/// midpoints of the two nearest intervals is followed, damped by the relaxation factor.
pub(super) fn intervals_to_instant(
    samples: &[Sample],
    requested: Instant,
    relaxation: f64,
) -> CouplingResult<ValueSet> {
    let tr = requested.days();
    let last = samples.len() - 1;

    let first = interval_at(samples, 0)?;
    if tr < first.start().days() {
        let m0 = first.midpoint().days();
        let m1 = interval_at(samples, 1)?.midpoint().days();
        let w = relaxation * fraction(tr - m0, m1 - m0)?;
        return ValueSet::lerp(samples[0].values(), samples[1].values(), w);
    }

    let final_interval = interval_at(samples, last)?;
    if tr > final_interval.end().days() {
        let m_last = final_interval.midpoint().days();
        let m_before = interval_at(samples, last - 1)?.midpoint().days();
        let w = relaxation * fraction(tr - m_last, m_last - m_before)?;
        return ValueSet::lerp(samples[last].values(), samples[last - 1].values(), -w);
    }

    // Intervals are contiguous, so the last one starting at or before the requested time
    // contains it.
    let mut containing = 0;
    for index in 1..=last {
        if interval_at(samples, index)?.start().days() <= tr {
            containing = index;
        } else {
            break;
        }
    }
    Ok(samples[containing].values().clone())
}

/// Stored instants, requested interval.
///
/// The stored samples define a piecewise linear function which is integrated over the requested
/// interval with the trapezoidal rule and divided by its length. Segments before the first and
/// after the last sample follow the damped extrapolation of the two nearest samples.
pub(super) fn instants_to_interval(
    samples: &[Sample],
    requested: &TimeInterval,
    relaxation: f64,
) -> CouplingResult<ValueSet> {
    let trb = requested.start().days();
    let tre = requested.end().days();
    let span = requested.duration();
    let last = samples.len() - 1;

    let mut result = samples[0].values().zeros_like();

    // Adds the trapezoid of a linear function `f` between `lo` and `hi`
    let mut add_trapezoid = |f_lo: ValueSet, f_hi: ValueSet, lo: f64, hi: f64| -> CouplingResult<()> {
        let weight = 0.5 * (hi - lo) / span;
        result.accumulate(&f_lo, weight)?;
        result.accumulate(&f_hi, weight)
    };

    for index in 0..last {
        let ta = instant_at(samples, index)?;
        let tb = instant_at(samples, index + 1)?;
        let lo = trb.max(ta);
        let hi = tre.min(tb);
        if hi > lo {
            let (va, vb) = (samples[index].values(), samples[index + 1].values());
            let f_lo = ValueSet::lerp(va, vb, fraction(lo - ta, tb - ta)?)?;
            let f_hi = ValueSet::lerp(va, vb, fraction(hi - ta, tb - ta)?)?;
            add_trapezoid(f_lo, f_hi, lo, hi)?;
        }
    }

    let t_first = instant_at(samples, 0)?;
    if trb < t_first {
        let t_second = instant_at(samples, 1)?;
        let lo = trb;
        let hi = tre.min(t_first);
        let (v0, v1) = (samples[0].values(), samples[1].values());
        let f_lo = ValueSet::lerp(v0, v1, relaxation * fraction(lo - t_first, t_second - t_first)?)?;
        let f_hi = ValueSet::lerp(v0, v1, relaxation * fraction(hi - t_first, t_second - t_first)?)?;
        add_trapezoid(f_lo, f_hi, lo, hi)?;
    }

    let t_last = instant_at(samples, last)?;
    if tre > t_last {
        let t_before = instant_at(samples, last - 1)?;
        let lo = trb.max(t_last);
        let hi = tre;
        let (vn, vb) = (samples[last].values(), samples[last - 1].values());
        let f_lo = ValueSet::lerp(vn, vb, -relaxation * fraction(lo - t_last, t_last - t_before)?)?;
        let f_hi = ValueSet::lerp(vn, vb, -relaxation * fraction(hi - t_last, t_last - t_before)?)?;
        add_trapezoid(f_lo, f_hi, lo, hi)?;
    }

    Ok(result)
}
