//! Time-indexed history of the values exchanged over one link.
//!
//! A [`SmartBuffer`] stores `(time, values)` samples in insertion order and answers
//! "what is the value at time T" for any requested [`Time`], regardless of whether the
//! samples were stored as instants or intervals. The four possible combinations of stored
//! and requested time kinds each have their own mapping:
//!
//! | stored   | requested | mapping                                               |
//! |----------|-----------|-------------------------------------------------------|
//! | Instant  | Instant   | linear interpolation                                  |
//! | Interval | Interval  | time weighted average of the overlapping intervals    |
//! | Interval | Instant   | value of the containing interval                      |
//! | Instant  | Interval  | trapezoidal integration of the piecewise linear series |
//!
//! Requests outside of the stored range are extrapolated from the two nearest samples.
//! The extrapolation is damped by the relaxation factor: `0` persists the boundary value
//! while `1` extends the linear trend unchanged.

mod mapping;


use crate::errors::{CouplingError, CouplingResult};
use crate::time::{Instant, Time, TimeInterval, TimeKind};
use crate::values::ValueSet;
use log::debug;
use serde::{Deserialize, Serialize};

/// Tolerance in days used when checking that intervals are contiguous.
const CONTIGUITY_TOLERANCE: f64 = 1e-10;

/// A single owned sample.
///
/// Samples are copied on insertion and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    time: Time,
    values: ValueSet,
}

impl Sample {
    pub fn time(&self) -> &Time {
        &self.time
    }

    pub fn values(&self) -> &ValueSet {
        &self.values
    }
}

/// Interpolating and extrapolating store of time/value samples.
///
/// A deserialized buffer is checked the same way as one built through
/// [`SmartBuffer::add_values`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredBuffer")]
pub struct SmartBuffer {
    samples: Vec<Sample>,
    relaxation_factor: f64,
    do_extended_data_verification: bool,
}

#[derive(Deserialize)]
struct StoredBuffer {
    samples: Vec<Sample>,
    relaxation_factor: f64,
    do_extended_data_verification: bool,
}

impl TryFrom<StoredBuffer> for SmartBuffer {
    type Error = CouplingError;

    fn try_from(stored: StoredBuffer) -> CouplingResult<Self> {
        let mut buffer = SmartBuffer::new();
        buffer.set_relaxation_factor(stored.relaxation_factor)?;
        buffer.samples = stored.samples;
        buffer.do_extended_data_verification = stored.do_extended_data_verification;
        buffer.verify_after_mutation()?;
        Ok(buffer)
    }
}

impl Default for SmartBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl SmartBuffer {
    /// Create an empty buffer.
    ///
    /// The relaxation factor defaults to `0` (persist boundary values) and extended data
    /// verification is enabled.
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
            relaxation_factor: 0.0,
            do_extended_data_verification: true,
        }
    }

    /// Number of samples held.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn times(&self) -> impl Iterator<Item = &Time> {
        self.samples.iter().map(|s| &s.time)
    }

    pub fn relaxation_factor(&self) -> f64 {
        self.relaxation_factor
    }

    /// Set the damping used when extrapolating outside of the stored range.
    ///
    /// Values outside of `[0, 1]` are rejected.
    pub fn set_relaxation_factor(&mut self, relaxation_factor: f64) -> CouplingResult<()> {
        if !(0.0..=1.0).contains(&relaxation_factor) {
            return Err(CouplingError::Validation(format!(
                "Relaxation factor must be within [0, 1], got {}",
                relaxation_factor
            )));
        }
        self.relaxation_factor = relaxation_factor;
        Ok(())
    }

    pub fn do_extended_data_verification(&self) -> bool {
        self.do_extended_data_verification
    }

    /// Toggle full revalidation of the buffer on every mutating or reading call.
    pub fn set_do_extended_data_verification(&mut self, enabled: bool) {
        self.do_extended_data_verification = enabled;
    }

    /// Append a sample.
    ///
    /// Both arguments are copied. When verification is enabled the existing samples are
    /// revalidated and the new sample must continue the series: same time and value kinds,
    /// the same number of elements, and either a strictly later instant or an interval
    /// starting where the previous one ended. A rejected sample leaves the buffer unchanged.
    pub fn add_values(&mut self, time: &Time, values: &ValueSet) -> CouplingResult<()> {
        let sample = Sample {
            time: *time,
            values: values.clone(),
        };

        if self.do_extended_data_verification {
            if !self.samples.is_empty() {
                self.check_buffer()?;
            }
            if let Some(previous) = self.samples.last() {
                check_successor(previous, &sample, self.samples.len())?;
            }
        }

        self.samples.push(sample);
        Ok(())
    }

    /// Validate the whole buffer.
    ///
    /// The buffer must be non-empty, hold a single time kind and a single value shape,
    /// with strictly increasing instants or contiguous, non-overlapping intervals.
    pub fn check_buffer(&self) -> CouplingResult<()> {
        if self.samples.is_empty() {
            return Err(CouplingError::Validation("Buffer is empty".to_string()));
        }
        check_samples(&self.samples)
    }

    /// Drop every sample lying strictly inside the interval.
    ///
    /// With verification enabled, a removal that would leave a gap between stored intervals is
    /// rejected and the buffer is left unchanged.
    pub fn clear(&mut self, interval: &TimeInterval) -> CouplingResult<()> {
        let retained: Vec<Sample> = self
            .samples
            .iter()
            .filter(|sample| {
                let inside = sample.time.start().days() > interval.start().days()
                    && sample.time.end().days() < interval.end().days();
                !inside
            })
            .cloned()
            .collect();
        if self.do_extended_data_verification {
            check_samples(&retained)?;
        }
        debug!(
            "Cleared {} samples inside {}",
            self.samples.len() - retained.len(),
            interval
        );
        self.samples = retained;
        Ok(())
    }

    /// Drop trailing samples at or after the given time.
    ///
    /// An instant sample is dropped if it is at or after the start of `time`; an interval
    /// sample is dropped if it starts at or after it. Removal stops at the first sample,
    /// scanning from the tail, that is earlier.
    pub fn clear_after(&mut self, time: &Time) -> CouplingResult<()> {
        let limit = time.start().days();
        let before = self.samples.len();
        while let Some(last) = self.samples.last() {
            if last.time.start().days() >= limit {
                self.samples.pop();
            } else {
                break;
            }
        }
        debug!(
            "Cleared {} samples after {}",
            before - self.samples.len(),
            time
        );
        self.verify_after_mutation()
    }

    /// Drop samples preceding the instant, keeping the latest of them.
    ///
    /// An instant sample precedes `instant` if it is strictly earlier; an interval sample
    /// precedes it if it ends at or before it. One preceding sample is always retained so
    /// that values at `instant` can still be interpolated.
    pub fn clear_before(&mut self, instant: Instant) -> CouplingResult<()> {
        let limit = instant.days();
        let preceding = self
            .samples
            .iter()
            .take_while(|sample| match sample.time {
                Time::Instant(t) => t.days() < limit,
                Time::Interval(i) => i.end().days() <= limit,
            })
            .count();

        let to_remove = preceding.saturating_sub(1);
        if to_remove > 0 {
            self.samples.drain(..to_remove);
            debug!("Cleared {} samples before {}", to_remove, instant);
        }
        self.verify_after_mutation()
    }

    /// Time of the sample at `index`.
    pub fn get_time_at(&self, index: usize) -> CouplingResult<Time> {
        if self.do_extended_data_verification {
            self.check_buffer()?;
        }
        self.samples
            .get(index)
            .map(|s| s.time)
            .ok_or_else(|| out_of_range(index, self.samples.len()))
    }

    /// Values of the sample at `index`.
    pub fn get_values_at(&self, index: usize) -> CouplingResult<&ValueSet> {
        if self.do_extended_data_verification {
            self.check_buffer()?;
        }
        self.samples
            .get(index)
            .map(|s| &s.values)
            .ok_or_else(|| out_of_range(index, self.samples.len()))
    }

    /// Values at the requested time.
    ///
    /// An empty buffer yields an empty scalar set and a buffer with a single sample yields that
    /// sample for any time. Otherwise the mapping is selected from the stored and requested
    /// time kinds (see the module documentation).
    pub fn get_values(&self, requested: &Time) -> CouplingResult<ValueSet> {
        if self.samples.is_empty() {
            return Ok(ValueSet::empty());
        }
        if self.do_extended_data_verification {
            self.check_buffer()?;
        }
        if self.samples.len() == 1 {
            return Ok(self.samples[0].values.clone());
        }

        let relaxation = self.relaxation_factor;
        match (self.samples[0].time.kind(), requested) {
            (TimeKind::Instant, Time::Instant(t)) => {
                mapping::instants_to_instant(&self.samples, *t, relaxation)
            }
            (TimeKind::Interval, Time::Interval(i)) => {
                mapping::intervals_to_interval(&self.samples, i, relaxation)
            }
            (TimeKind::Interval, Time::Instant(t)) => {
                mapping::intervals_to_instant(&self.samples, *t, relaxation)
            }
            (TimeKind::Instant, Time::Interval(i)) => {
                mapping::instants_to_interval(&self.samples, i, relaxation)
            }
        }
    }

    fn verify_after_mutation(&self) -> CouplingResult<()> {
        if self.do_extended_data_verification && !self.samples.is_empty() {
            self.check_buffer()
        } else {
            Ok(())
        }
    }
}

fn out_of_range(index: usize, len: usize) -> CouplingError {
    CouplingError::Validation(format!(
        "Index {} is out of range for a buffer holding {} samples",
        index, len
    ))
}

fn check_samples(samples: &[Sample]) -> CouplingResult<()> {
    for (index, pair) in samples.windows(2).enumerate() {
        check_successor(&pair[0], &pair[1], index + 1)?;
    }
    Ok(())
}

/// Check that `next` may follow `previous` in a buffer.
fn check_successor(previous: &Sample, next: &Sample, index: usize) -> CouplingResult<()> {
    if previous.time.kind() != next.time.kind() {
        return Err(CouplingError::Validation(format!(
            "Sample {} is an {} but the buffer holds {} samples",
            index,
            next.time.kind(),
            previous.time.kind()
        )));
    }
    if !previous.values.is_compatible_with(&next.values) {
        return Err(CouplingError::Validation(format!(
            "Sample {} holds {} {} values but the buffer holds {} {} values",
            index,
            next.values.count(),
            next.values.kind(),
            previous.values.count(),
            previous.values.kind()
        )));
    }
    match (&previous.time, &next.time) {
        (Time::Instant(a), Time::Instant(b)) => {
            if b.days() <= a.days() {
                return Err(CouplingError::Validation(format!(
                    "Instants must be strictly increasing: sample {} at {} follows {}",
                    index, b, a
                )));
            }
        }
        (Time::Interval(a), Time::Interval(b)) => {
            let gap = b.start().days() - a.end().days();
            if gap < -CONTIGUITY_TOLERANCE {
                return Err(CouplingError::Validation(format!(
                    "Intervals must not overlap: sample {} {} overlaps {}",
                    index, b, a
                )));
            }
            if gap > CONTIGUITY_TOLERANCE {
                return Err(CouplingError::Validation(format!(
                    "Intervals must be contiguous: sample {} {} does not start where {} ends",
                    index, b, a
                )));
            }
        }
        _ => unreachable!("time kinds were checked above"),
    }
    Ok(())
}
