//! Date ranges and calendar-unit interval arithmetic.
//!
//! A [`DateRange`] is a pair of optional UTC instants. Calendar constructors
//! ([`DateRange::day`], [`DateRange::week`], [`DateRange::month`],
//! [`DateRange::year`]) build half-open `[start, end)` ranges whose boundaries
//! are computed in local time of the given timezone and converted to UTC
//! independently, so 23- and 25-hour days come out right.

use std::fmt;

use chrono::{
    DateTime, Datelike, Days, Duration, LocalResult, Months, NaiveDate, NaiveDateTime, NaiveTime,
    TimeZone, Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// A calendar unit used for range construction and bucket splitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalendarUnit {
    Day,
    Week,
    Month,
    Year,
}

/// A range between two optional instants. A `None` bound is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub const fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    /// A range with both bounds set.
    pub const fn closed(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// A range with both bounds open.
    pub const fn unbounded() -> Self {
        Self {
            start: None,
            end: None,
        }
    }

    /// The calendar day containing `instant` in `tz`.
    pub fn day(instant: DateTime<Utc>, tz: Tz) -> Self {
        let date = local_date(instant, tz);
        Self::between_dates(date, add_days(date, 1), tz)
    }

    /// The calendar week containing `instant` in `tz`. Weeks start on Sunday.
    pub fn week(instant: DateTime<Utc>, tz: Tz) -> Self {
        let date = local_date(instant, tz);
        let sunday = date - Days::new(u64::from(date.weekday().num_days_from_sunday()));
        Self::between_dates(sunday, add_days(sunday, 7), tz)
    }

    /// The calendar month containing `instant` in `tz`.
    pub fn month(instant: DateTime<Utc>, tz: Tz) -> Self {
        let date = local_date(instant, tz);
        let first = date - Days::new(u64::from(date.day0()));
        Self::between_dates(first, add_months(first, 1), tz)
    }

    /// The calendar year containing `instant` in `tz`.
    pub fn year(instant: DateTime<Utc>, tz: Tz) -> Self {
        let date = local_date(instant, tz);
        let first = date - Days::new(u64::from(date.ordinal0()));
        Self::between_dates(first, add_months(first, 12), tz)
    }

    /// The range of the given calendar unit containing `instant` in `tz`.
    pub fn for_unit(unit: CalendarUnit, instant: DateTime<Utc>, tz: Tz) -> Self {
        match unit {
            CalendarUnit::Day => Self::day(instant, tz),
            CalendarUnit::Week => Self::week(instant, tz),
            CalendarUnit::Month => Self::month(instant, tz),
            CalendarUnit::Year => Self::year(instant, tz),
        }
    }

    fn between_dates(start: NaiveDate, end: NaiveDate, tz: Tz) -> Self {
        Self::closed(local_midnight(start, tz), local_midnight(end, tz))
    }

    /// True if neither bound is set.
    pub const fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// True if both bounds are set.
    pub const fn is_closed(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }

    /// True if at least one bound is open.
    pub const fn is_open(&self) -> bool {
        !self.is_closed()
    }

    /// Returns whether `instant` lies within the range, inclusive on both ends.
    ///
    /// An open bound does not restrict that side.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start.is_none_or(|start| start <= instant) && self.end.is_none_or(|end| instant <= end)
    }

    /// Returns how much of the interval `[a, b]` overlaps this range.
    ///
    /// Open ranges and disjoint intervals yield zero.
    pub fn intersection(&self, a: DateTime<Utc>, b: DateTime<Utc>) -> Duration {
        let (Some(start), Some(end)) = (self.start, self.end) else {
            return Duration::zero();
        };

        match (self.contains(a), self.contains(b)) {
            (true, true) => b - a,
            (true, false) => end - a,
            (false, true) => b - start,
            (false, false) if a <= start && end <= b => end - start,
            (false, false) => Duration::zero(),
        }
    }

    /// Returns the smallest range spanning both ranges.
    ///
    /// A bound missing on one side is taken from the other.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            start: merge_bound(self.start, other.start, std::cmp::min),
            end: merge_bound(self.end, other.end, std::cmp::max),
        }
    }

    /// Shifts both bounds by calendar arithmetic in `tz`.
    ///
    /// Month and year shifts clamp to the last valid day of the target month
    /// (Jan 31 + 1 month = Feb 28/29). Bounds that overflow the representable
    /// range saturate.
    #[must_use]
    pub fn shift(&self, years: i32, months: i32, days: i32, tz: Tz) -> Self {
        let shift_bound = |bound: DateTime<Utc>| {
            let local = bound.with_timezone(&tz).naive_local();
            let total_months = i64::from(years) * 12 + i64::from(months);
            shift_naive(local, total_months, i64::from(days)).map_or_else(
                || {
                    if total_months < 0 || days < 0 {
                        DateTime::<Utc>::MIN_UTC
                    } else {
                        DateTime::<Utc>::MAX_UTC
                    }
                },
                |shifted| resolve_local(shifted, tz),
            )
        };

        Self {
            start: self.start.map(&shift_bound),
            end: self.end.map(&shift_bound),
        }
    }

    /// Ordered, contiguous ranges of `unit` covering `[start, end)` in `tz`.
    ///
    /// The first range starts at the unit boundary at or before `start`.
    /// Open ranges produce no sub-ranges.
    pub fn units(&self, unit: CalendarUnit, tz: Tz) -> Vec<Self> {
        let (Some(start), Some(end)) = (self.start, self.end) else {
            return Vec::new();
        };

        let mut ranges = Vec::new();
        let mut cursor = start;
        while cursor < end {
            let range = Self::for_unit(unit, cursor, tz);
            let Some(next) = range.end.filter(|next| *next > cursor) else {
                break;
            };
            ranges.push(range);
            cursor = next;
        }
        ranges
    }

    pub fn years(&self, tz: Tz) -> Vec<Self> {
        self.units(CalendarUnit::Year, tz)
    }

    pub fn months(&self, tz: Tz) -> Vec<Self> {
        self.units(CalendarUnit::Month, tz)
    }

    pub fn weeks(&self, tz: Tz) -> Vec<Self> {
        self.units(CalendarUnit::Week, tz)
    }

    pub fn days(&self, tz: Tz) -> Vec<Self> {
        self.units(CalendarUnit::Day, tz)
    }

    /// Renders the shortest human label for this range in `tz`.
    ///
    /// Exact years render as `2018`, exact months as `March 2018`, exact days
    /// as `2018-03-10`. Anything else renders as `start – end`.
    pub fn minimal_string(&self, tz: Tz) -> String {
        if let Some(start) = self.start {
            let local = start.with_timezone(&tz);
            if Self::year(start, tz) == *self {
                return local.format("%Y").to_string();
            }
            if Self::month(start, tz) == *self {
                return local.format("%B %Y").to_string();
            }
            if Self::day(start, tz) == *self {
                return local.format("%Y-%m-%d").to_string();
            }
        }
        self.format_in(tz)
    }

    /// Renders both bounds as local dates in `tz`.
    pub fn format_in(&self, tz: Tz) -> String {
        let render = |bound: Option<DateTime<Utc>>| {
            bound.map_or_else(
                || "…".to_string(),
                |instant| instant.with_timezone(&tz).format("%Y-%m-%d").to_string(),
            )
        };
        format!("{} – {}", render(self.start), render(self.end))
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let render = |bound: Option<DateTime<Utc>>| {
            bound.map_or_else(|| "open".to_string(), |instant| instant.to_rfc3339())
        };
        write!(f, "[{}, {})", render(self.start), render(self.end))
    }
}

fn merge_bound(
    a: Option<DateTime<Utc>>,
    b: Option<DateTime<Utc>>,
    pick: fn(DateTime<Utc>, DateTime<Utc>) -> DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(pick(a, b)),
        (a, b) => a.or(b),
    }
}

fn local_date(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

fn add_days(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX)
}

fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months)).unwrap_or(NaiveDate::MAX)
}

fn shift_naive(local: NaiveDateTime, months: i64, days: i64) -> Option<NaiveDateTime> {
    let month_step = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    let shifted = if months >= 0 {
        local.checked_add_months(month_step)?
    } else {
        local.checked_sub_months(month_step)?
    };

    let day_step = Days::new(days.unsigned_abs());
    if days >= 0 {
        shifted.checked_add_days(day_step)
    } else {
        shifted.checked_sub_days(day_step)
    }
}

/// Converts a local date at midnight to UTC.
fn local_midnight(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    resolve_local(date.and_time(NaiveTime::MIN), tz)
}

/// Converts a local wall-clock time to UTC.
///
/// Ambiguous times (DST fall-back) resolve to the earlier instant. Times in a
/// DST gap move forward to the first local minute that exists.
fn resolve_local(local: NaiveDateTime, tz: Tz) -> DateTime<Utc> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.with_timezone(&Utc),
        LocalResult::None => (1..=MAX_GAP_MINUTES)
            .map(|minutes| local + Duration::minutes(minutes))
            .find_map(|shifted| tz.from_local_datetime(&shifted).earliest())
            .map_or_else(|| Utc.from_utc_datetime(&local), |dt| dt.with_timezone(&Utc)),
    }
}

/// Longest gap searched past. Longer skips fall back to reading the local
/// time as UTC.
const MAX_GAP_MINUTES: i64 = 180;

#[cfg(test)]
mod tests {
    use super::*;

    use chrono_tz::America::New_York;
    use chrono_tz::Europe::Berlin;
    use chrono_tz::UTC;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn range(start: &str, end: &str) -> DateRange {
        DateRange::closed(utc(start), utc(end))
    }

    // ========== Local Time Resolution ==========

    #[test]
    fn gap_resolves_to_first_existing_local_time() {
        use chrono_tz::Australia::Lord_Howe;

        // Lord Howe springs forward 30 minutes, from 02:00 to 02:30
        let in_gap = NaiveDate::from_ymd_opt(2018, 10, 7)
            .unwrap()
            .and_hms_opt(2, 10, 0)
            .unwrap();
        assert_eq!(resolve_local(in_gap, Lord_Howe), utc("2018-10-06T15:30:00Z"));

        let in_gap = NaiveDate::from_ymd_opt(2018, 3, 11)
            .unwrap()
            .and_hms_opt(2, 30, 0)
            .unwrap();
        assert_eq!(resolve_local(in_gap, New_York), utc("2018-03-11T07:00:00Z"));
    }

    // ========== Calendar Constructors ==========

    #[test]
    fn day_range_converts_to_zone_before_truncating() {
        // 23:30 UTC is already the next day in Berlin
        let day = DateRange::day(utc("2018-03-10T23:30:00Z"), Berlin);
        assert_eq!(day, range("2018-03-10T23:00:00Z", "2018-03-11T23:00:00Z"));
    }

    #[test]
    fn instants_with_different_offsets_share_a_local_day() {
        let morning = utc("2018-03-10T08:00:00Z");
        let evening = utc("2018-03-10T22:00:00-05:00");
        assert_eq!(
            DateRange::day(morning, New_York),
            DateRange::day(evening, New_York)
        );
        assert_ne!(DateRange::day(morning, UTC), DateRange::day(evening, UTC));
    }

    #[test]
    fn day_range_spans_dst_spring_forward() {
        let day = DateRange::day(utc("2026-03-29T00:15:00Z"), Berlin);
        assert_eq!(day, range("2026-03-28T23:00:00Z", "2026-03-29T22:00:00Z"));
        assert_eq!(day.end.unwrap() - day.start.unwrap(), Duration::hours(23));
    }

    #[test]
    fn week_starts_on_sunday() {
        // Jan 29, 2025 is a Wednesday
        let week = DateRange::week(utc("2025-01-29T12:00:00Z"), UTC);
        assert_eq!(week, range("2025-01-26T00:00:00Z", "2025-02-02T00:00:00Z"));

        // A Sunday is the first day of its own week
        let sunday = DateRange::week(utc("2025-01-26T00:00:00Z"), UTC);
        assert_eq!(sunday, week);
    }

    #[test]
    fn month_range_handles_leap_february() {
        let feb = DateRange::month(utc("2024-02-15T12:00:00Z"), UTC);
        assert_eq!(feb, range("2024-02-01T00:00:00Z", "2024-03-01T00:00:00Z"));
        assert_eq!(feb.end.unwrap() - feb.start.unwrap(), Duration::days(29));
    }

    #[test]
    fn year_range_in_zone() {
        let year = DateRange::year(utc("2018-06-01T00:00:00Z"), Berlin);
        assert_eq!(year, range("2017-12-31T23:00:00Z", "2018-12-31T23:00:00Z"));
    }

    // ========== Predicates ==========

    #[test]
    fn empty_and_closed_predicates() {
        assert!(DateRange::unbounded().is_empty());
        assert!(!DateRange::unbounded().is_closed());

        let half = DateRange::new(Some(utc("2018-01-01T00:00:00Z")), None);
        assert!(!half.is_empty());
        assert!(half.is_open());

        assert!(range("2018-01-01T00:00:00Z", "2018-01-02T00:00:00Z").is_closed());
    }

    #[test]
    fn contains_is_inclusive_on_both_ends() {
        let r = range("2018-01-01T00:00:00Z", "2018-01-02T00:00:00Z");
        assert!(r.contains(utc("2018-01-01T00:00:00Z")));
        assert!(r.contains(utc("2018-01-02T00:00:00Z")));
        assert!(!r.contains(utc("2018-01-02T00:00:01Z")));
        assert!(!r.contains(utc("2017-12-31T23:59:59Z")));
    }

    // ========== Intersection ==========

    #[test]
    fn intersection_interval_fully_inside() {
        let r = range("2018-01-01T00:00:00Z", "2018-01-02T00:00:00Z");
        let d = r.intersection(utc("2018-01-01T10:00:00Z"), utc("2018-01-01T12:00:00Z"));
        assert_eq!(d, Duration::hours(2));
    }

    #[test]
    fn intersection_only_start_inside() {
        let r = range("2018-01-01T00:00:00Z", "2018-01-02T00:00:00Z");
        let d = r.intersection(utc("2018-01-01T23:00:00Z"), utc("2018-01-02T02:00:00Z"));
        assert_eq!(d, Duration::hours(1));
    }

    #[test]
    fn intersection_only_end_inside() {
        let r = range("2018-01-01T00:00:00Z", "2018-01-02T00:00:00Z");
        let d = r.intersection(utc("2017-12-31T22:00:00Z"), utc("2018-01-01T03:00:00Z"));
        assert_eq!(d, Duration::hours(3));
    }

    #[test]
    fn intersection_range_inside_interval() {
        let r = range("2018-01-01T00:00:00Z", "2018-01-02T00:00:00Z");
        let d = r.intersection(utc("2017-12-31T00:00:00Z"), utc("2018-01-03T00:00:00Z"));
        assert_eq!(d, Duration::hours(24));
    }

    #[test]
    fn intersection_disjoint_or_open_is_zero() {
        let r = range("2018-01-01T00:00:00Z", "2018-01-02T00:00:00Z");
        let d = r.intersection(utc("2018-02-01T00:00:00Z"), utc("2018-02-01T03:00:00Z"));
        assert_eq!(d, Duration::zero());

        let open = DateRange::new(Some(utc("2018-01-01T00:00:00Z")), None);
        let d = open.intersection(utc("2018-01-01T10:00:00Z"), utc("2018-01-01T12:00:00Z"));
        assert_eq!(d, Duration::zero());
    }

    // ========== Shift ==========

    #[test]
    fn shift_by_month_clamps_to_month_length() {
        let jan31 = DateRange::day(utc("2018-01-31T12:00:00Z"), UTC);
        let shifted = jan31.shift(0, 1, 0, UTC);
        assert_eq!(shifted.start, Some(utc("2018-02-28T00:00:00Z")));
        assert_eq!(shifted.end, Some(utc("2018-03-01T00:00:00Z")));
    }

    #[test]
    fn shift_by_year_from_leap_day() {
        let leap = DateRange::day(utc("2024-02-29T12:00:00Z"), UTC);
        let shifted = leap.shift(1, 0, 0, UTC);
        assert_eq!(shifted.start, Some(utc("2025-02-28T00:00:00Z")));
    }

    #[test]
    fn shift_back_one_day_across_dst() {
        let day = DateRange::day(utc("2026-03-30T12:00:00Z"), Berlin);
        let yesterday = day.shift(0, 0, -1, Berlin);
        assert_eq!(yesterday, DateRange::day(utc("2026-03-29T12:00:00Z"), Berlin));
    }

    #[test]
    fn shift_keeps_open_bounds_open() {
        let half = DateRange::new(None, Some(utc("2018-01-01T00:00:00Z")));
        let shifted = half.shift(0, 0, 1, UTC);
        assert_eq!(shifted.start, None);
        assert_eq!(shifted.end, Some(utc("2018-01-02T00:00:00Z")));
    }

    // ========== Iteration ==========

    #[test]
    fn months_cover_range_from_unit_boundary() {
        let r = range("2018-01-15T00:00:00Z", "2018-04-01T00:00:00Z");
        let months = r.months(UTC);
        assert_eq!(months.len(), 3);
        assert_eq!(months[0].start, Some(utc("2018-01-01T00:00:00Z")));
        assert_eq!(months[2].end, Some(utc("2018-04-01T00:00:00Z")));
    }

    #[test]
    fn days_are_contiguous_across_dst() {
        let r = range("2026-03-27T23:00:00Z", "2026-03-31T22:00:00Z");
        let days = r.days(Berlin);
        assert_eq!(days.len(), 4);
        for pair in days.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn year_of_months_has_twelve_entries() {
        let year = DateRange::year(utc("2018-06-01T00:00:00Z"), Berlin);
        assert_eq!(year.months(Berlin).len(), 12);
        assert_eq!(year.years(Berlin), vec![year]);
    }

    #[test]
    fn weeks_iterate_sunday_to_sunday() {
        let r = range("2025-01-01T00:00:00Z", "2025-01-31T00:00:00Z");
        let weeks = r.weeks(UTC);
        assert_eq!(weeks[0].start, Some(utc("2024-12-29T00:00:00Z")));
        assert_eq!(weeks.len(), 5);
    }

    #[test]
    fn open_range_has_no_units() {
        assert!(DateRange::unbounded().days(UTC).is_empty());
    }

    // ========== Union ==========

    #[test]
    fn union_spans_both_ranges() {
        let a = range("2018-01-01T00:00:00Z", "2018-01-02T00:00:00Z");
        let b = range("2018-01-05T00:00:00Z", "2018-01-06T00:00:00Z");
        assert_eq!(
            a.union(&b),
            range("2018-01-01T00:00:00Z", "2018-01-06T00:00:00Z")
        );
        assert_eq!(a.union(&DateRange::unbounded()), a);
    }

    // ========== Rendering ==========

    #[test]
    fn minimal_string_collapses_units() {
        let instant = utc("2018-03-10T12:00:00Z");
        assert_eq!(DateRange::year(instant, UTC).minimal_string(UTC), "2018");
        assert_eq!(
            DateRange::month(instant, UTC).minimal_string(UTC),
            "March 2018"
        );
        assert_eq!(
            DateRange::day(instant, UTC).minimal_string(UTC),
            "2018-03-10"
        );
        assert_eq!(
            range("2018-03-10T00:00:00Z", "2018-03-20T00:00:00Z").minimal_string(UTC),
            "2018-03-10 – 2018-03-20"
        );
    }

    #[test]
    fn minimal_string_uses_zone() {
        let year = DateRange::year(utc("2018-06-01T00:00:00Z"), Berlin);
        assert_eq!(year.minimal_string(Berlin), "2018");
        assert_ne!(year.minimal_string(UTC), "2018");
    }

    #[test]
    fn format_in_marks_open_bounds() {
        let half = DateRange::new(Some(utc("2018-03-10T00:00:00Z")), None);
        assert_eq!(half.format_in(UTC), "2018-03-10 – …");
    }
}
