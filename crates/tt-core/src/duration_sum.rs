//! Accumulator tracking exact and rounded duration totals.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::range::DateRange;
use crate::rounding::RoundingConfig;

/// Returned when merging sums built under different configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot merge duration sums with different rounding, accepted range or reference time")]
pub struct IncompatibleSums;

/// Sum of durations with an exact and a rounded total.
///
/// Rounding applies to every contribution on its own, so the rounded total
/// is the sum of rounded contributions and never the rounding of the exact
/// total. Intervals may be clipped against an accepted range, and intervals
/// without an end are closed at the reference time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DurationSum {
    exact: Duration,
    rounded: Duration,
    rounding: RoundingConfig,
    accepted_range: Option<DateRange>,
    reference_time: Option<DateTime<Utc>>,
}

impl DurationSum {
    pub fn new(rounding: RoundingConfig) -> Self {
        Self {
            rounding,
            ..Self::default()
        }
    }

    /// Clips every added interval to `range`.
    ///
    /// Only closed ranges can clip; an open range is ignored.
    #[must_use]
    pub fn with_accepted_range(mut self, range: DateRange) -> Self {
        self.accepted_range = range.is_closed().then_some(range);
        self
    }

    /// Closes intervals without an end at `reference_time`.
    #[must_use]
    pub fn with_reference_time(mut self, reference_time: Option<DateTime<Utc>>) -> Self {
        self.reference_time = reference_time;
        self
    }

    /// Returns a zeroed sum with the same configuration.
    #[must_use]
    pub fn empty_copy(&self) -> Self {
        Self {
            exact: Duration::zero(),
            rounded: Duration::zero(),
            ..self.clone()
        }
    }

    /// The rounded total.
    pub const fn get(&self) -> Duration {
        self.rounded
    }

    /// The exact total.
    pub const fn get_exact(&self) -> Duration {
        self.exact
    }

    pub const fn rounding(&self) -> RoundingConfig {
        self.rounding
    }

    pub const fn reference_time(&self) -> Option<DateTime<Utc>> {
        self.reference_time
    }

    pub fn is_zero(&self) -> bool {
        self.exact.is_zero() && self.rounded.is_zero()
    }

    /// Adds one contribution, rounding it on its own.
    pub fn add(&mut self, duration: Duration) {
        self.exact += duration;
        self.rounded += self.rounding.round(duration);
    }

    /// Adds the interval `[start, end]`.
    ///
    /// A missing end is replaced by the reference time. If neither is
    /// available the call contributes nothing.
    pub fn add_start_end(&mut self, start: DateTime<Utc>, end: Option<DateTime<Utc>>) {
        if let Some(end) = end.or(self.reference_time) {
            self.add_interval(start, end);
        }
    }

    fn add_interval(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) {
        let duration = self
            .accepted_range
            .map_or(end - start, |range| range.intersection(start, end));
        self.add(duration);
    }

    /// Returns whether `other` was built under the same configuration.
    pub fn is_compatible(&self, other: &Self) -> bool {
        self.rounding == other.rounding
            && self.accepted_range == other.accepted_range
            && self.reference_time == other.reference_time
    }

    /// Adds the totals of `other` verbatim, without re-rounding.
    pub fn add_sum(&mut self, other: &Self) -> Result<(), IncompatibleSums> {
        if !self.is_compatible(other) {
            return Err(IncompatibleSums);
        }
        self.exact += other.exact;
        self.rounded += other.rounded;
        Ok(())
    }
}
