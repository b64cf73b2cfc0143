//! Result buckets: the nodes of a report tree.
//!
//! A bucket starts as a leaf holding frames. Splitting turns a leaf into an
//! internal node with one child per group. Aggregation runs post-order: a
//! leaf sums its frames, an internal node sums its children's totals, so
//! every level's rounded total equals the sum of its children's.

use chrono::{DateTime, Utc};

use crate::duration_sum::{DurationSum, IncompatibleSums};
use crate::frame::FrameList;
use crate::range::DateRange;
use crate::types::ProjectId;

/// What a bucket stands for within its parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SplitBy {
    CalendarRange(DateRange),
    Project(ProjectId),
}

/// One group produced by a split: its key, nominal range, and frames.
#[derive(Debug, Clone)]
pub struct Partition {
    pub split_by: SplitBy,
    pub date_range: DateRange,
    pub frames: FrameList,
}

/// A node in the report tree.
#[derive(Debug, Clone)]
pub struct ResultBucket {
    date_range: DateRange,
    tracked_date_range: DateRange,
    frame_count: usize,
    duration: DurationSum,
    split_by: Option<SplitBy>,
    frames: FrameList,
    children: Vec<ResultBucket>,
}

impl ResultBucket {
    /// Creates a root bucket. `duration` is the zeroed accumulator every
    /// bucket in the tree starts from.
    pub fn new(frames: FrameList, date_range: DateRange, duration: DurationSum) -> Self {
        Self {
            date_range,
            tracked_date_range: DateRange::unbounded(),
            frame_count: frames.len(),
            duration,
            split_by: None,
            frames,
            children: Vec::new(),
        }
    }

    fn child(&self, partition: Partition) -> Self {
        Self {
            date_range: partition.date_range,
            tracked_date_range: DateRange::unbounded(),
            frame_count: partition.frames.len(),
            duration: self.duration.empty_copy(),
            split_by: Some(partition.split_by),
            frames: partition.frames,
            children: Vec::new(),
        }
    }

    /// The nominal range this bucket covers.
    pub const fn date_range(&self) -> DateRange {
        self.date_range
    }

    /// The span actually covered by this bucket's frames.
    pub const fn tracked_date_range(&self) -> DateRange {
        self.tracked_date_range
    }

    pub const fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub const fn duration(&self) -> &DurationSum {
        &self.duration
    }

    /// `None` only for the root.
    pub const fn split_by(&self) -> Option<&SplitBy> {
        self.split_by.as_ref()
    }

    pub const fn frames(&self) -> &FrameList {
        &self.frames
    }

    pub fn children(&self) -> &[Self] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// True if no frame falls into this bucket.
    pub const fn is_empty(&self) -> bool {
        self.frame_count == 0
    }

    /// Replaces this bucket's children with one bucket per partition.
    pub fn split<I>(&mut self, partitions: I)
    where
        I: IntoIterator<Item = Partition>,
    {
        let children: Vec<Self> = partitions
            .into_iter()
            .map(|partition| self.child(partition))
            .collect();
        self.children = children;
    }

    /// Calls `f` on every leaf, left to right.
    pub fn for_each_leaf_mut<F>(&mut self, f: &mut F)
    where
        F: FnMut(&mut Self),
    {
        if self.is_leaf() {
            f(self);
            return;
        }
        for child in &mut self.children {
            child.for_each_leaf_mut(f);
        }
    }

    /// Number of leaves below (or including) this bucket.
    pub fn leaf_count(&self) -> usize {
        if self.is_leaf() {
            1
        } else {
            self.children.iter().map(Self::leaf_count).sum()
        }
    }

    /// Depth of the tree rooted here; a leaf has depth 0.
    pub fn depth(&self) -> usize {
        self.children
            .iter()
            .map(|child| child.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Recomputes totals bottom-up.
    pub fn update(&mut self) -> Result<(), IncompatibleSums> {
        let mut duration = self.duration.empty_copy();

        if self.is_leaf() {
            for frame in &self.frames {
                duration.add_start_end(frame.start, frame.end);
            }
            self.frame_count = self.frames.len();
            self.tracked_date_range = self.frames.tracked_range(duration.reference_time());
            self.duration = duration;
            return Ok(());
        }

        for child in &mut self.children {
            child.update()?;
        }

        let mut tracked = DateRange::unbounded();
        let mut frame_count = 0;
        for child in &self.children {
            duration.add_sum(&child.duration)?;
            tracked = tracked.union(&child.tracked_date_range);
            frame_count += child.frame_count;
        }
        self.duration = duration;
        self.tracked_date_range = tracked;
        self.frame_count = frame_count;
        Ok(())
    }

    /// Sorts children recursively: calendar buckets by start, project
    /// buckets by the name `project_name` returns.
    pub fn sort_children<F>(&mut self, project_name: &F)
    where
        F: Fn(&ProjectId) -> String,
    {
        self.children
            .sort_by_cached_key(|child| child.sort_key(project_name));
        for child in &mut self.children {
            child.sort_children(project_name);
        }
    }

    fn sort_key<F>(&self, project_name: &F) -> (Option<DateTime<Utc>>, String)
    where
        F: Fn(&ProjectId) -> String,
    {
        match &self.split_by {
            Some(SplitBy::CalendarRange(range)) => (range.start, String::new()),
            Some(SplitBy::Project(id)) => (None, project_name(id)),
            None => (None, String::new()),
        }
    }
}
