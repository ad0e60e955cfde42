//! Time representations exchanged between components.
//!
//! Times are expressed as a real-valued day count (for example a Modified Julian Day).
//! A component either reports values at a single [`Instant`] or as an aggregate over a
//! half-open [`TimeInterval`]. [`Time`] is the tagged union of the two and is what buffers
//! and links operate on.

use crate::errors::{CouplingError, CouplingResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Number of seconds in one day, used to convert time steps to day counts.
pub const SECONDS_PER_DAY: f64 = 86400.0;

/// A single point in time as a real-valued day count.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Instant(pub f64);

impl Instant {
    pub fn new(days: f64) -> Self {
        Self(days)
    }

    /// The underlying day count.
    pub fn days(&self) -> f64 {
        self.0
    }

    /// Returns a new instant shifted by a number of seconds.
    pub fn plus_seconds(&self, seconds: f64) -> Self {
        Self(self.0 + seconds / SECONDS_PER_DAY)
    }
}

impl From<f64> for Instant {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A half-open span of time `[start, end)`.
///
/// The start must be strictly before the end. This also holds for deserialized intervals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "IntervalBounds")]
pub struct TimeInterval {
    start: Instant,
    end: Instant,
}

/// Unchecked form of [`TimeInterval`] as it appears in serialized data
#[derive(Deserialize)]
struct IntervalBounds {
    start: Instant,
    end: Instant,
}

impl TryFrom<IntervalBounds> for TimeInterval {
    type Error = CouplingError;

    fn try_from(bounds: IntervalBounds) -> CouplingResult<Self> {
        TimeInterval::new(bounds.start, bounds.end)
    }
}

impl TimeInterval {
    /// Create a new interval.
    ///
    /// Returns a validation error if `start >= end` or either bound is not finite.
    pub fn new(start: impl Into<Instant>, end: impl Into<Instant>) -> CouplingResult<Self> {
        let start = start.into();
        let end = end.into();
        if !start.0.is_finite() || !end.0.is_finite() {
            return Err(CouplingError::Validation(format!(
                "Interval bounds must be finite, got [{}, {})",
                start, end
            )));
        }
        if start.0 >= end.0 {
            return Err(CouplingError::Validation(format!(
                "Interval start must be before its end, got [{}, {})",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> Instant {
        self.start
    }

    pub fn end(&self) -> Instant {
        self.end
    }

    /// Length of the interval in days.
    pub fn duration(&self) -> f64 {
        self.end.0 - self.start.0
    }

    /// The instant halfway between start and end.
    pub fn midpoint(&self) -> Instant {
        Instant(0.5 * (self.start.0 + self.end.0))
    }

    /// Returns true if the instant lies within `[start, end)`.
    pub fn contains(&self, instant: Instant) -> bool {
        self.start.0 <= instant.0 && instant.0 < self.end.0
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// The representation a [`Time`] uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeKind {
    Instant,
    Interval,
}

impl fmt::Display for TimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeKind::Instant => write!(f, "Instant"),
            TimeKind::Interval => write!(f, "Interval"),
        }
    }
}

/// Either an instant or an interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Time {
    Instant(Instant),
    Interval(TimeInterval),
}

impl Time {
    pub fn instant(days: f64) -> Self {
        Time::Instant(Instant(days))
    }

    /// Create an interval time, validating that `start < end`.
    pub fn interval(start: f64, end: f64) -> CouplingResult<Self> {
        TimeInterval::new(start, end).map(Time::Interval)
    }

    pub fn kind(&self) -> TimeKind {
        match self {
            Time::Instant(_) => TimeKind::Instant,
            Time::Interval(_) => TimeKind::Interval,
        }
    }

    /// The earliest instant covered by this time.
    pub fn start(&self) -> Instant {
        match self {
            Time::Instant(t) => *t,
            Time::Interval(i) => i.start(),
        }
    }

    /// The latest instant covered by this time.
    pub fn end(&self) -> Instant {
        match self {
            Time::Instant(t) => *t,
            Time::Interval(i) => i.end(),
        }
    }
}

impl From<Instant> for Time {
    fn from(value: Instant) -> Self {
        Time::Instant(value)
    }
}

impl From<TimeInterval> for Time {
    fn from(value: TimeInterval) -> Self {
        Time::Interval(value)
    }
}

impl PartialOrd for Time {
    /// Times are ordered by their underlying day counts, start first and then end.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.start().partial_cmp(&other.start())? {
            Ordering::Equal => self.end().partial_cmp(&other.end()),
            ordering => Some(ordering),
        }
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Time::Instant(t) => write!(f, "{}", t),
            Time::Interval(i) => write!(f, "{}", i),
        }
    }
}

/// An aggregated span of time reported by a component or group.
///
/// Unlike [`TimeInterval`] the bounds are not checked, so a horizon built by intersecting
/// disagreeing spans may be inverted. Such a horizon is reported as empty rather than corrected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeHorizon {
    pub start: Instant,
    pub end: Instant,
}

impl TimeHorizon {
    pub fn new(start: impl Into<Instant>, end: impl Into<Instant>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Returns true if the horizon covers no time at all.
    pub fn is_empty(&self) -> bool {
        self.start.0 > self.end.0
    }

    /// The overlap of two horizons: latest start and earliest end.
    pub fn intersect(&self, other: &TimeHorizon) -> TimeHorizon {
        TimeHorizon {
            start: Instant(self.start.0.max(other.start.0)),
            end: Instant(self.end.0.min(other.end.0)),
        }
    }
}

impl From<TimeInterval> for TimeHorizon {
    fn from(value: TimeInterval) -> Self {
        Self::new(value.start(), value.end())
    }
}
