//! Time frames and sorted frame lists.
//!
//! A [`FrameList`] is always sorted by frame start (stable). Every operation
//! that narrows or partitions a list returns new lists, leaving the source
//! untouched.

use std::collections::{BTreeSet, HashMap};
use std::hash::Hash;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::range::{CalendarUnit, DateRange};
use crate::types::{FrameId, ProjectId, TagId};

/// A recorded time interval attached to a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub id: FrameId,
    pub project_id: ProjectId,
    pub start: DateTime<Utc>,
    /// `None` while the frame is still running.
    pub end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: BTreeSet<TagId>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Frame {
    pub fn new(
        id: FrameId,
        project_id: ProjectId,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            project_id,
            start,
            end,
            tags: BTreeSet::new(),
            archived: false,
            notes: None,
        }
    }

    /// True while the frame has no end.
    pub const fn is_active(&self) -> bool {
        self.end.is_none()
    }

    pub fn is_before(&self, other: &Self) -> bool {
        self.start < other.start
    }

    /// The frame end, or `reference` for active frames.
    pub fn end_or(&self, reference: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
        self.end.or(reference)
    }

    /// Exact duration, closing active frames at `reference`.
    pub fn duration(&self, reference: Option<DateTime<Utc>>) -> Option<Duration> {
        self.end_or(reference).map(|end| end - self.start)
    }
}

/// Frames sorted by start, ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Frame>", into = "Vec<Frame>")]
pub struct FrameList {
    frames: Vec<Frame>,
}

impl FrameList {
    pub fn new(frames: Vec<Frame>) -> Self {
        let mut list = Self { frames };
        list.sort();
        list
    }

    fn sort(&mut self) {
        self.frames.sort_by_key(|frame| frame.start);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.frames.iter()
    }

    pub fn as_slice(&self) -> &[Frame] {
        &self.frames
    }

    pub fn first(&self) -> Option<&Frame> {
        self.frames.first()
    }

    /// Inserts a frame after any frames with the same start.
    pub fn push(&mut self, frame: Frame) {
        let index = self.frames.partition_point(|f| f.start <= frame.start);
        self.frames.insert(index, frame);
    }

    /// Returns the frames matching `predicate`, in order.
    #[must_use]
    pub fn filter<P>(&self, predicate: P) -> Self
    where
        P: Fn(&Frame) -> bool,
    {
        self.frames
            .iter()
            .filter(|frame| predicate(frame))
            .cloned()
            .collect()
    }

    /// Keeps frames that lie within `range`.
    ///
    /// A frame is dropped if it starts before the range start or ends after
    /// the range end. Active frames are kept only if `accept_unstopped` is set.
    #[must_use]
    pub fn filter_by_date_range(&self, range: &DateRange, accept_unstopped: bool) -> Self {
        self.filter(|frame| {
            let starts_inside = range.start.is_none_or(|start| frame.start >= start);
            let ends_inside = frame.end.map_or(accept_unstopped, |end| {
                range.end.is_none_or(|range_end| end <= range_end)
            });
            starts_inside && ends_inside
        })
    }

    #[must_use]
    pub fn exclude_archived(&self) -> Self {
        self.filter(|frame| !frame.archived)
    }

    #[must_use]
    pub fn exclude_active(&self) -> Self {
        self.filter(|frame| !frame.is_active())
    }

    /// Groups frames by `key`.
    ///
    /// Each group is sorted. Groups are ordered by the start of their
    /// earliest frame; empty groups would sort first.
    pub fn split<K, F>(&self, key: F) -> Vec<(K, Self)>
    where
        K: Eq + Hash + Clone,
        F: Fn(&Frame) -> K,
    {
        let mut index: HashMap<K, usize> = HashMap::new();
        let mut groups: Vec<(K, Vec<Frame>)> = Vec::new();

        for frame in &self.frames {
            let k = key(frame);
            let slot = *index.entry(k.clone()).or_insert_with(|| {
                groups.push((k, Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push(frame.clone());
        }

        let mut groups: Vec<(K, Self)> = groups
            .into_iter()
            .map(|(k, frames)| (k, Self::new(frames)))
            .collect();
        groups.sort_by_key(|(_, list)| list.first().map(|frame| frame.start));
        groups
    }

    /// Groups frames by the calendar unit containing their start in `tz`.
    pub fn split_by_unit(&self, unit: CalendarUnit, tz: Tz) -> Vec<(DateRange, Self)> {
        self.split(|frame| DateRange::for_unit(unit, frame.start, tz))
    }

    pub fn split_by_day(&self, tz: Tz) -> Vec<(DateRange, Self)> {
        self.split_by_unit(CalendarUnit::Day, tz)
    }

    pub fn split_by_week(&self, tz: Tz) -> Vec<(DateRange, Self)> {
        self.split_by_unit(CalendarUnit::Week, tz)
    }

    pub fn split_by_month(&self, tz: Tz) -> Vec<(DateRange, Self)> {
        self.split_by_unit(CalendarUnit::Month, tz)
    }

    pub fn split_by_year(&self, tz: Tz) -> Vec<(DateRange, Self)> {
        self.split_by_unit(CalendarUnit::Year, tz)
    }

    /// The span from the earliest start to the latest end.
    ///
    /// Active frames end at `reference`; without one they do not extend
    /// the span. An empty list yields an unbounded range.
    pub fn tracked_range(&self, reference: Option<DateTime<Utc>>) -> DateRange {
        let start = self.first().map(|frame| frame.start);
        let end = self
            .frames
            .iter()
            .filter_map(|frame| frame.end_or(reference))
            .max();
        DateRange::new(start, end)
    }

    /// Exact sum of all frame durations.
    pub fn total_duration(&self, reference: Option<DateTime<Utc>>) -> Duration {
        self.frames
            .iter()
            .filter_map(|frame| frame.duration(reference))
            .fold(Duration::zero(), |total, d| total + d)
    }
}

impl From<Vec<Frame>> for FrameList {
    fn from(frames: Vec<Frame>) -> Self {
        Self::new(frames)
    }
}

impl From<FrameList> for Vec<Frame> {
    fn from(list: FrameList) -> Self {
        list.frames
    }
}

impl FromIterator<Frame> for FrameList {
    fn from_iter<I: IntoIterator<Item = Frame>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a FrameList {
    type Item = &'a Frame;
    type IntoIter = std::slice::Iter<'a, Frame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}
