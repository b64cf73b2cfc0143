//! Bucket reports.
//!
//! A [`BucketReport`] filters a frame snapshot by archive state, activity,
//! date range and project, builds a [`ResultBucket`] tree by applying each
//! configured [`SplitOperation`] to every leaf in turn, and aggregates the
//! tree bottom-up.
//!
//! # Project resolution
//!
//! The configured project IDs (or every known project when none are
//! configured) form the candidate set. With subprojects enabled, the
//! candidates' descendants are admitted too. The project split keys each
//! frame by its nearest ancestor within the candidate set, so subproject
//! time rolls up into the configured project's bucket.

use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use thiserror::Error;

use crate::bucket::{Partition, ResultBucket, SplitBy};
use crate::duration_sum::{DurationSum, IncompatibleSums};
use crate::frame::FrameList;
use crate::project::ProjectLookup;
use crate::range::{CalendarUnit, DateRange};
use crate::rounding::RoundingConfig;
use crate::split::SplitOperation;
use crate::types::ProjectId;

/// Errors raised while building a report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReportError {
    /// The date filter ends before it starts.
    #[error("date filter starts at {start} but ends at {end}")]
    InvertedDateFilter {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error(transparent)]
    IncompatibleSums(#[from] IncompatibleSums),
}

/// Report parameters.
#[derive(Debug, Clone, Default)]
pub struct ReportConfig {
    /// Projects to report on. Empty means all known projects.
    pub project_ids: Vec<ProjectId>,

    /// Also admit frames of the configured projects' descendants.
    pub include_subprojects: bool,

    /// Only frames fully inside this range are reported, and contributions
    /// are clipped to it when it is closed. Open sides, or the whole range
    /// without a filter, take the frames' own span.
    pub date_filter: Option<DateRange>,

    /// Splits applied in order, one tree level each.
    pub split_operations: Vec<SplitOperation>,

    /// Rounding applied to every frame's contribution.
    pub entry_rounding: RoundingConfig,

    /// Materialize calendar buckets that contain no frames.
    pub show_empty: bool,

    /// Keep frames that are still running.
    pub include_active: bool,

    /// Where running frames end for duration purposes.
    pub reference_time: Option<DateTime<Utc>>,

    /// Keep archived frames.
    pub include_archived: bool,
}

/// Read-only collaborators a report needs.
#[derive(Clone, Copy)]
pub struct ReportContext<'a> {
    /// Zone for calendar truncation and labels.
    pub timezone: Tz,
    pub projects: &'a dyn ProjectLookup,
}

impl<'a> ReportContext<'a> {
    pub const fn new(timezone: Tz, projects: &'a dyn ProjectLookup) -> Self {
        Self { timezone, projects }
    }

    /// Human name of a project, falling back to its ID.
    pub fn project_name(&self, id: &ProjectId) -> String {
        self.projects
            .full_name(id)
            .unwrap_or_else(|| id.to_string())
    }
}

impl fmt::Debug for ReportContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportContext")
            .field("timezone", &self.timezone)
            .finish_non_exhaustive()
    }
}

/// A finished bucket tree plus the parameters that produced it.
#[derive(Debug)]
pub struct BucketReport<'a> {
    config: ReportConfig,
    context: ReportContext<'a>,
    date_range: DateRange,
    result: ResultBucket,
}

impl<'a> BucketReport<'a> {
    /// Builds and aggregates a report over `source`.
    ///
    /// `source` is not modified.
    pub fn build(
        source: &FrameList,
        config: ReportConfig,
        context: ReportContext<'a>,
    ) -> Result<Self, ReportError> {
        if let Some(DateRange {
            start: Some(start),
            end: Some(end),
        }) = config.date_filter
        {
            if start > end {
                return Err(ReportError::InvertedDateFilter { start, end });
            }
        }

        let mut frames = source.clone();
        if !config.include_archived {
            frames = frames.exclude_archived();
        }
        if !config.include_active {
            frames = frames.exclude_active();
        }

        let date_range = match config.date_filter {
            Some(filter) => {
                frames = frames.filter_by_date_range(&filter, config.include_active);
                // Open sides take the kept frames' span so calendar units stay finite
                let tracked = frames.tracked_range(config.reference_time);
                DateRange::new(
                    filter.start.or(tracked.start),
                    filter.end.or(tracked.end),
                )
            }
            None => frames.tracked_range(config.reference_time),
        };

        let candidate_ids = candidate_project_ids(&config.project_ids, context.projects);
        let effective_ids =
            effective_project_ids(&candidate_ids, config.include_subprojects, context.projects);

        let before = frames.len();
        let frames = frames.filter(|frame| effective_ids.contains(&frame.project_id));
        tracing::debug!(
            source = source.len(),
            kept = frames.len(),
            dropped_by_project = before - frames.len(),
            projects = effective_ids.len(),
            %date_range,
            "filtered report frames"
        );

        let mut template =
            DurationSum::new(config.entry_rounding).with_reference_time(config.reference_time);
        if let Some(filter) = config.date_filter {
            template = template.with_accepted_range(filter);
        }

        let mut root = ResultBucket::new(frames, date_range, template);
        let splitter = Splitter {
            timezone: context.timezone,
            projects: context.projects,
            candidate_ids: &candidate_ids,
            show_empty: config.show_empty,
        };
        for &operation in &config.split_operations {
            root.for_each_leaf_mut(&mut |leaf: &mut ResultBucket| {
                let partitions = splitter.partitions(operation, leaf);
                leaf.split(partitions);
            });
            tracing::trace!(%operation, leaves = root.leaf_count(), "applied split");
        }

        let mut report = Self {
            config,
            context,
            date_range,
            result: root,
        };
        report.update()?;
        Ok(report)
    }

    /// Re-aggregates the tree and re-sorts every level.
    pub fn update(&mut self) -> Result<(), ReportError> {
        self.result.update()?;
        let context = self.context;
        self.result
            .sort_children(&|id: &ProjectId| context.project_name(id));
        Ok(())
    }

    /// The root bucket.
    pub const fn result(&self) -> &ResultBucket {
        &self.result
    }

    pub const fn config(&self) -> &ReportConfig {
        &self.config
    }

    pub const fn context(&self) -> ReportContext<'a> {
        self.context
    }

    /// The date filter with open sides filled from the frames' own span.
    pub const fn date_range(&self) -> DateRange {
        self.date_range
    }

    /// Human-readable label for a bucket of this report.
    pub fn title(&self, bucket: &ResultBucket) -> String {
        match bucket.split_by() {
            Some(SplitBy::Project(id)) => self.context.project_name(id),
            Some(SplitBy::CalendarRange(range)) => range.minimal_string(self.context.timezone),
            None if self.date_range.is_closed() => {
                self.date_range.minimal_string(self.context.timezone)
            }
            None if !self.date_range.is_empty() => self.date_range.format_in(self.context.timezone),
            None => "All time".to_string(),
        }
    }

    /// A serializable copy of the whole tree.
    pub fn view(&self) -> BucketView {
        self.view_of(&self.result)
    }

    fn view_of(&self, bucket: &ResultBucket) -> BucketView {
        let project_id = match bucket.split_by() {
            Some(SplitBy::Project(id)) => Some(id.clone()),
            _ => None,
        };
        BucketView {
            title: self.title(bucket),
            project_id,
            date_range: bucket.date_range(),
            tracked_date_range: bucket.tracked_date_range(),
            frame_count: bucket.frame_count(),
            duration_ms: bucket.duration().get().num_milliseconds(),
            exact_duration_ms: bucket.duration().get_exact().num_milliseconds(),
            results: bucket
                .children()
                .iter()
                .map(|child| self.view_of(child))
                .collect(),
        }
    }
}

/// Serializable snapshot of a bucket and its descendants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketView {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<ProjectId>,
    pub date_range: DateRange,
    pub tracked_date_range: DateRange,
    pub frame_count: usize,
    /// Rounded duration.
    pub duration_ms: i64,
    pub exact_duration_ms: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<BucketView>,
}

fn candidate_project_ids(
    configured: &[ProjectId],
    projects: &dyn ProjectLookup,
) -> HashSet<ProjectId> {
    if configured.is_empty() {
        projects.project_ids().into_iter().collect()
    } else {
        configured.iter().cloned().collect()
    }
}

fn effective_project_ids(
    candidates: &HashSet<ProjectId>,
    include_subprojects: bool,
    projects: &dyn ProjectLookup,
) -> HashSet<ProjectId> {
    let mut effective = candidates.clone();
    if include_subprojects {
        for id in candidates {
            effective.extend(projects.collect_subproject_ids(id));
        }
    }
    effective
}

/// Turns one leaf into partitions for a single split operation.
struct Splitter<'a> {
    timezone: Tz,
    projects: &'a dyn ProjectLookup,
    candidate_ids: &'a HashSet<ProjectId>,
    show_empty: bool,
}

impl Splitter<'_> {
    fn partitions(&self, operation: SplitOperation, leaf: &ResultBucket) -> Vec<Partition> {
        match operation.calendar_unit() {
            Some(unit) => self.calendar_partitions(unit, leaf),
            None => self.project_partitions(leaf),
        }
    }

    fn calendar_partitions(&self, unit: CalendarUnit, leaf: &ResultBucket) -> Vec<Partition> {
        let groups = leaf.frames().split_by_unit(unit, self.timezone);
        if !self.show_empty {
            return groups
                .into_iter()
                .map(|(range, frames)| calendar_partition(range, frames))
                .collect();
        }

        let mut by_range: HashMap<DateRange, FrameList> = groups.into_iter().collect();
        let mut partitions: Vec<Partition> = leaf
            .date_range()
            .units(unit, self.timezone)
            .into_iter()
            .map(|range| {
                let frames = by_range.remove(&range).unwrap_or_default();
                calendar_partition(range, frames)
            })
            .collect();
        // Frames outside the nominal range still get their own bucket
        partitions.extend(
            by_range
                .into_iter()
                .map(|(range, frames)| calendar_partition(range, frames)),
        );
        partitions
    }

    fn project_partitions(&self, leaf: &ResultBucket) -> Vec<Partition> {
        leaf.frames()
            .split(|frame| self.resolve_project(&frame.project_id))
            .into_iter()
            .map(|(id, frames)| Partition {
                split_by: SplitBy::Project(id),
                date_range: leaf.date_range(),
                frames,
            })
            .collect()
    }

    /// Frames were filtered to the effective project set, so every frame
    /// has an ancestor among the candidates.
    fn resolve_project(&self, id: &ProjectId) -> ProjectId {
        self.projects
            .find_suitable_project(id, self.candidate_ids)
            .unwrap_or_else(|| {
                panic!("project {id} has no ancestor among the report's projects")
            })
    }
}

const fn calendar_partition(range: DateRange, frames: FrameList) -> Partition {
    Partition {
        split_by: SplitBy::CalendarRange(range),
        date_range: range,
        frames,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;
    use chrono_tz::America::New_York;
    use chrono_tz::UTC;

    use crate::frame::Frame;
    use crate::project::{Project, ProjectTree};
    use crate::rounding::RoundingMode;
    use crate::types::FrameId;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn pid(s: &str) -> ProjectId {
        ProjectId::new(s).unwrap()
    }

    fn frame(id: &str, project: &str, start: &str, end: Option<&str>) -> Frame {
        Frame::new(
            FrameId::new(id).unwrap(),
            pid(project),
            utc(start),
            end.map(utc),
        )
    }

    fn project(id: &str, parent: Option<&str>) -> Project {
        Project {
            id: pid(id),
            name: id.to_string(),
            parent_id: parent.map(pid),
        }
    }

    fn tree() -> ProjectTree {
        ProjectTree::new([
            project("work", None),
            project("acme", Some("work")),
            project("home", None),
        ])
    }

    fn year_range(year: &str) -> DateRange {
        DateRange::year(utc(&format!("{year}-06-01T00:00:00Z")), UTC)
    }

    fn range_of(start: &str, end: &str) -> DateRange {
        DateRange::closed(utc(start), utc(end))
    }

    fn assert_sums_consistent(bucket: &ResultBucket) {
        if bucket.is_leaf() {
            return;
        }
        let rounded = bucket
            .children()
            .iter()
            .fold(Duration::zero(), |acc, c| acc + c.duration().get());
        let exact = bucket
            .children()
            .iter()
            .fold(Duration::zero(), |acc, c| acc + c.duration().get_exact());
        assert_eq!(bucket.duration().get(), rounded);
        assert_eq!(bucket.duration().get_exact(), exact);
        for child in bucket.children() {
            assert_sums_consistent(child);
        }
    }

    #[test]
    fn split_by_year_scenario() {
        let projects = tree();
        let frames = FrameList::new(vec![
            frame("a", "work", "2018-03-10T10:00:00Z", Some("2018-03-10T12:00:00Z")),
            frame("b", "work", "2019-03-10T09:00:00Z", Some("2019-03-10T10:00:00Z")),
        ]);
        let config = ReportConfig {
            split_operations: vec![SplitOperation::Year],
            ..ReportConfig::default()
        };
        let report = BucketReport::build(&frames, config, ReportContext::new(UTC, &projects)).unwrap();

        let root = report.result();
        assert_eq!(root.frame_count(), 2);
        assert_eq!(root.duration().get_exact(), Duration::hours(3));
        assert_eq!(root.children().len(), 2);

        let (y2018, y2019) = (&root.children()[0], &root.children()[1]);
        assert_eq!(y2018.frame_count(), 1);
        assert_eq!(y2018.duration().get_exact(), Duration::hours(2));
        assert_eq!(y2018.date_range(), year_range("2018"));
        assert_eq!(y2019.frame_count(), 1);
        assert_eq!(y2019.duration().get_exact(), Duration::hours(1));
        assert_eq!(report.title(y2019), "2019");
    }

    #[test]
    fn sums_are_consistent_at_every_level() {
        let projects = tree();
        let frames = FrameList::new(vec![
            frame("a", "work", "2018-01-10T10:00:00Z", Some("2018-01-10T10:07:00Z")),
            frame("b", "acme", "2018-01-11T10:00:00Z", Some("2018-01-11T10:01:00Z")),
            frame("c", "home", "2018-02-10T10:00:00Z", Some("2018-02-10T11:13:00Z")),
            frame("d", "work", "2019-03-10T09:00:00Z", Some("2019-03-10T09:22:00Z")),
            frame("e", "acme", "2019-03-12T09:00:00Z", Some("2019-03-12T09:00:30Z")),
        ]);
        let config = ReportConfig {
            split_operations: vec![
                SplitOperation::Project,
                SplitOperation::Year,
                SplitOperation::Month,
            ],
            entry_rounding: RoundingConfig::new(RoundingMode::Up, Duration::minutes(15)),
            ..ReportConfig::default()
        };
        let report = BucketReport::build(&frames, config, ReportContext::new(UTC, &projects)).unwrap();

        assert_eq!(report.result().depth(), 3);
        assert_sums_consistent(report.result());
        assert_eq!(report.result().frame_count(), 5);
    }

    #[test]
    fn subproject_frames_roll_up_into_parent() {
        let projects = tree();
        let frames = FrameList::new(vec![frame(
            "a",
            "acme",
            "2018-03-10T10:00:00Z",
            Some("2018-03-10T11:00:00Z"),
        )]);
        let config = ReportConfig {
            project_ids: vec![pid("work")],
            include_subprojects: true,
            split_operations: vec![SplitOperation::Project],
            ..ReportConfig::default()
        };
        let report = BucketReport::build(&frames, config, ReportContext::new(UTC, &projects)).unwrap();

        let children = report.result().children();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].split_by(), Some(&SplitBy::Project(pid("work"))));
        assert_eq!(children[0].duration().get_exact(), Duration::hours(1));
        assert_eq!(report.title(&children[0]), "work");
    }

    #[test]
    fn subproject_frames_excluded_without_flag() {
        let projects = tree();
        let frames = FrameList::new(vec![
            frame("a", "acme", "2018-03-10T10:00:00Z", Some("2018-03-10T11:00:00Z")),
            frame("b", "work", "2018-03-10T12:00:00Z", Some("2018-03-10T12:30:00Z")),
        ]);
        let config = ReportConfig {
            project_ids: vec![pid("work")],
            ..ReportConfig::default()
        };
        let report = BucketReport::build(&frames, config, ReportContext::new(UTC, &projects)).unwrap();
        assert_eq!(report.result().frame_count(), 1);
        assert_eq!(
            report.result().duration().get_exact(),
            Duration::minutes(30)
        );
    }

    #[test]
    fn project_buckets_sort_by_full_name() {
        let projects = tree();
        let frames = FrameList::new(vec![
            frame("a", "work", "2018-03-10T08:00:00Z", Some("2018-03-10T09:00:00Z")),
            frame("b", "home", "2018-03-10T10:00:00Z", Some("2018-03-10T11:00:00Z")),
            frame("c", "acme", "2018-03-10T12:00:00Z", Some("2018-03-10T13:00:00Z")),
        ]);
        let config = ReportConfig {
            split_operations: vec![SplitOperation::Project],
            ..ReportConfig::default()
        };
        let report = BucketReport::build(&frames, config, ReportContext::new(UTC, &projects)).unwrap();
        let titles: Vec<String> = report
            .result()
            .children()
            .iter()
            .map(|c| report.title(c))
            .collect();
        assert_eq!(titles, vec!["home", "work", "work/acme"]);
    }

    #[test]
    fn show_empty_materializes_every_month() {
        let projects = tree();
        let frames = FrameList::new(vec![frame(
            "a",
            "work",
            "2018-03-10T10:00:00Z",
            Some("2018-03-10T12:00:00Z"),
        )]);
        let config = ReportConfig {
            date_filter: Some(year_range("2018")),
            split_operations: vec![SplitOperation::Month],
            show_empty: true,
            ..ReportConfig::default()
        };
        let report = BucketReport::build(&frames, config, ReportContext::new(UTC, &projects)).unwrap();

        let months = report.result().children();
        assert_eq!(months.len(), 12);
        assert_eq!(report.title(&months[0]), "January 2018");
        assert_eq!(report.title(&months[2]), "March 2018");
        assert_eq!(months[2].duration().get_exact(), Duration::hours(2));
        assert!(months.iter().filter(|m| m.is_empty()).count() == 11);
        assert_sums_consistent(report.result());
    }

    #[test]
    fn show_empty_under_year_split_fills_each_year() {
        let projects = tree();
        let frames = FrameList::new(vec![
            frame("a", "work", "2018-03-10T10:00:00Z", Some("2018-03-10T12:00:00Z")),
            frame("b", "work", "2019-11-10T09:00:00Z", Some("2019-11-10T10:00:00Z")),
        ]);
        let config = ReportConfig {
            split_operations: vec![SplitOperation::Year, SplitOperation::Month],
            show_empty: true,
            ..ReportConfig::default()
        };
        let report = BucketReport::build(&frames, config, ReportContext::new(UTC, &projects)).unwrap();
        let years = report.result().children();
        assert_eq!(years.len(), 2);
        assert_eq!(years[0].children().len(), 12);
        assert_eq!(years[1].children().len(), 12);
    }

    #[test]
    fn without_show_empty_only_populated_buckets_exist() {
        let projects = tree();
        let frames = FrameList::new(vec![frame(
            "a",
            "work",
            "2018-03-10T10:00:00Z",
            Some("2018-03-10T12:00:00Z"),
        )]);
        let config = ReportConfig {
            date_filter: Some(year_range("2018")),
            split_operations: vec![SplitOperation::Month],
            ..ReportConfig::default()
        };
        let report = BucketReport::build(&frames, config, ReportContext::new(UTC, &projects)).unwrap();
        assert_eq!(report.result().children().len(), 1);
    }

    #[test]
    fn empty_source_yields_zero_root() {
        let projects = tree();
        let config = ReportConfig {
            split_operations: vec![SplitOperation::Project, SplitOperation::Day],
            ..ReportConfig::default()
        };
        let report = BucketReport::build(
            &FrameList::default(),
            config,
            ReportContext::new(UTC, &projects),
        )
        .unwrap();
        assert!(report.result().is_leaf());
        assert!(report.result().duration().is_zero());
        assert_eq!(report.title(report.result()), "All time");
    }

    #[test]
    fn show_empty_with_start_only_filter_spans_to_last_frame() {
        let projects = tree();
        let frames = FrameList::new(vec![
            frame("a", "work", "2018-01-10T10:00:00Z", Some("2018-01-10T12:00:00Z")),
            frame("b", "work", "2018-04-10T09:00:00Z", Some("2018-04-10T10:00:00Z")),
        ]);
        let config = ReportConfig {
            date_filter: Some(DateRange::new(Some(utc("2018-01-01T00:00:00Z")), None)),
            split_operations: vec![SplitOperation::Month],
            show_empty: true,
            ..ReportConfig::default()
        };
        let report = BucketReport::build(&frames, config, ReportContext::new(UTC, &projects)).unwrap();

        assert_eq!(
            report.date_range(),
            range_of("2018-01-01T00:00:00Z", "2018-04-10T10:00:00Z")
        );
        assert_eq!(report.title(report.result()), "2018-01-01 – 2018-04-10");
        let titles: Vec<String> = report
            .result()
            .children()
            .iter()
            .map(|m| report.title(m))
            .collect();
        assert_eq!(
            titles,
            vec!["January 2018", "February 2018", "March 2018", "April 2018"]
        );
        assert_sums_consistent(report.result());
    }

    #[test]
    fn half_open_filter_without_frames_keeps_bound_in_title() {
        let projects = tree();
        let config = ReportConfig {
            date_filter: Some(DateRange::new(Some(utc("2018-01-01T00:00:00Z")), None)),
            split_operations: vec![SplitOperation::Month],
            show_empty: true,
            ..ReportConfig::default()
        };
        let report = BucketReport::build(
            &FrameList::default(),
            config,
            ReportContext::new(UTC, &projects),
        )
        .unwrap();
        assert!(report.result().is_leaf());
        assert_eq!(report.title(report.result()), "2018-01-01 – …");
    }

    #[test]
    fn empty_source_with_filter_and_show_empty_has_empty_leaves() {
        let projects = tree();
        let config = ReportConfig {
            date_filter: Some(year_range("2018")),
            split_operations: vec![SplitOperation::Month],
            show_empty: true,
            ..ReportConfig::default()
        };
        let report = BucketReport::build(
            &FrameList::default(),
            config,
            ReportContext::new(UTC, &projects),
        )
        .unwrap();
        assert_eq!(report.result().children().len(), 12);
        assert!(report.result().duration().is_zero());
        assert_eq!(report.title(report.result()), "2018");
    }

    #[test]
    fn date_filter_drops_partial_frames_and_clips_active_ones() {
        let projects = tree();
        let frames = FrameList::new(vec![
            frame("inside", "work", "2018-01-01T10:00:00Z", Some("2018-01-01T11:00:00Z")),
            frame("overlap", "work", "2017-12-31T23:00:00Z", Some("2018-01-01T01:00:00Z")),
            frame("active", "work", "2018-01-01T22:00:00Z", None),
        ]);
        let day = DateRange::day(utc("2018-01-01T12:00:00Z"), UTC);
        let config = ReportConfig {
            date_filter: Some(day),
            include_active: true,
            reference_time: Some(utc("2018-01-02T03:00:00Z")),
            ..ReportConfig::default()
        };
        let report = BucketReport::build(&frames, config, ReportContext::new(UTC, &projects)).unwrap();
        assert_eq!(report.result().frame_count(), 2);
        assert_eq!(report.result().duration().get_exact(), Duration::hours(3));
    }

    #[test]
    fn active_and_archived_frames_are_opt_in() {
        let projects = tree();
        let mut archived = frame("archived", "work", "2018-01-01T08:00:00Z", Some("2018-01-01T09:00:00Z"));
        archived.archived = true;
        let frames = FrameList::new(vec![
            archived,
            frame("done", "work", "2018-01-01T10:00:00Z", Some("2018-01-01T11:00:00Z")),
            frame("active", "work", "2018-01-01T12:00:00Z", None),
        ]);
        let context = ReportContext::new(UTC, &projects);

        let report = BucketReport::build(&frames, ReportConfig::default(), context).unwrap();
        assert_eq!(report.result().frame_count(), 1);

        let config = ReportConfig {
            include_archived: true,
            include_active: true,
            reference_time: Some(utc("2018-01-01T12:30:00Z")),
            ..ReportConfig::default()
        };
        let report = BucketReport::build(&frames, config, context).unwrap();
        assert_eq!(report.result().frame_count(), 3);
        assert_eq!(
            report.result().duration().get_exact(),
            Duration::minutes(150)
        );
    }

    #[test]
    fn source_list_is_not_modified() {
        let projects = tree();
        let frames = FrameList::new(vec![
            frame("a", "work", "2018-01-01T10:00:00Z", Some("2018-01-01T11:00:00Z")),
            frame("b", "home", "2019-01-01T10:00:00Z", Some("2019-01-01T11:00:00Z")),
        ]);
        let snapshot = frames.clone();
        let config = ReportConfig {
            project_ids: vec![pid("home")],
            date_filter: Some(year_range("2019")),
            ..ReportConfig::default()
        };
        BucketReport::build(&frames, config, ReportContext::new(UTC, &projects)).unwrap();
        assert_eq!(frames, snapshot);
    }

    #[test]
    fn frames_of_unknown_projects_are_dropped() {
        let projects = tree();
        let frames = FrameList::new(vec![frame(
            "a",
            "unknown",
            "2018-01-01T10:00:00Z",
            Some("2018-01-01T11:00:00Z"),
        )]);
        let config = ReportConfig {
            split_operations: vec![SplitOperation::Project],
            ..ReportConfig::default()
        };
        let report = BucketReport::build(&frames, config, ReportContext::new(UTC, &projects)).unwrap();
        assert!(report.result().is_empty());
    }

    #[test]
    fn day_split_respects_timezone() {
        let projects = tree();
        let frames = FrameList::new(vec![
            frame("morning", "work", "2018-03-10T08:00:00Z", Some("2018-03-10T09:00:00Z")),
            frame("evening", "work", "2018-03-10T22:00:00-05:00", Some("2018-03-10T23:00:00-05:00")),
        ]);
        let config = ReportConfig {
            split_operations: vec![SplitOperation::Day],
            ..ReportConfig::default()
        };
        let report =
            BucketReport::build(&frames, config.clone(), ReportContext::new(New_York, &projects))
                .unwrap();
        assert_eq!(report.result().children().len(), 1);
        assert_eq!(report.title(&report.result().children()[0]), "2018-03-10");

        let report = BucketReport::build(&frames, config, ReportContext::new(UTC, &projects)).unwrap();
        assert_eq!(report.result().children().len(), 2);
    }

    #[test]
    fn inverted_date_filter_is_rejected() {
        let projects = tree();
        let config = ReportConfig {
            date_filter: Some(DateRange::closed(
                utc("2018-02-01T00:00:00Z"),
                utc("2018-01-01T00:00:00Z"),
            )),
            ..ReportConfig::default()
        };
        let err = BucketReport::build(
            &FrameList::default(),
            config,
            ReportContext::new(UTC, &projects),
        )
        .unwrap_err();
        assert!(matches!(err, ReportError::InvertedDateFilter { .. }));
    }

    #[test]
    fn tracked_range_is_union_of_children() {
        let projects = tree();
        let frames = FrameList::new(vec![
            frame("a", "work", "2018-03-10T10:00:00Z", Some("2018-03-10T12:00:00Z")),
            frame("b", "home", "2018-05-10T09:00:00Z", Some("2018-05-10T10:00:00Z")),
        ]);
        let config = ReportConfig {
            split_operations: vec![SplitOperation::Project],
            ..ReportConfig::default()
        };
        let report = BucketReport::build(&frames, config, ReportContext::new(UTC, &projects)).unwrap();
        assert_eq!(
            report.result().tracked_date_range(),
            DateRange::closed(utc("2018-03-10T10:00:00Z"), utc("2018-05-10T10:00:00Z"))
        );
        assert_eq!(report.date_range(), report.result().tracked_date_range());
    }

    fn outline(report: &BucketReport<'_>, bucket: &ResultBucket, depth: usize, out: &mut String) {
        out.push_str(&format!(
            "{}{} ({}m)\n",
            "  ".repeat(depth),
            report.title(bucket),
            bucket.duration().get().num_minutes()
        ));
        for child in bucket.children() {
            outline(report, child, depth + 1, out);
        }
    }

    #[test]
    fn nested_titles() {
        let projects = tree();
        let frames = FrameList::new(vec![
            frame("a", "work", "2018-03-10T10:00:00Z", Some("2018-03-10T12:00:00Z")),
            frame("b", "home", "2018-04-02T10:00:00Z", Some("2018-04-02T10:20:00Z")),
            frame("c", "acme", "2019-03-10T09:00:00Z", Some("2019-03-10T10:00:00Z")),
        ]);
        let config = ReportConfig {
            split_operations: vec![SplitOperation::Year, SplitOperation::Project],
            entry_rounding: RoundingConfig::new(RoundingMode::Nearest, Duration::minutes(15)),
            ..ReportConfig::default()
        };
        let report = BucketReport::build(&frames, config, ReportContext::new(UTC, &projects)).unwrap();

        let mut out = String::new();
        outline(&report, report.result(), 0, &mut out);
        insta::assert_snapshot!(out, @r"
        2018-03-10 – 2019-03-10 (195m)
          2018 (135m)
            home (15m)
            work (120m)
          2019 (60m)
            work/acme (60m)
        ");
    }

    #[test]
    #[should_panic(expected = "has no ancestor")]
    fn unresolvable_project_is_fatal() {
        let projects = tree();
        let candidates = HashSet::from([pid("home")]);
        let splitter = Splitter {
            timezone: UTC,
            projects: &projects,
            candidate_ids: &candidates,
            show_empty: false,
        };
        let root = ResultBucket::new(
            FrameList::new(vec![frame("a", "work", "2018-01-01T10:00:00Z", None)]),
            DateRange::unbounded(),
            DurationSum::default(),
        );
        splitter.partitions(SplitOperation::Project, &root);
    }

    #[test]
    fn view_serializes_tree() {
        let projects = tree();
        let frames = FrameList::new(vec![frame(
            "a",
            "acme",
            "2018-03-10T10:00:00Z",
            Some("2018-03-10T11:00:00Z"),
        )]);
        let config = ReportConfig {
            split_operations: vec![SplitOperation::Project],
            ..ReportConfig::default()
        };
        let report = BucketReport::build(&frames, config, ReportContext::new(UTC, &projects)).unwrap();
        let json = serde_json::to_value(report.view()).unwrap();

        assert_eq!(json["frame_count"], 1);
        assert_eq!(json["exact_duration_ms"], 3_600_000);
        assert_eq!(json["results"][0]["title"], "work/acme");
        assert_eq!(json["results"][0]["project_id"], "acme");
        assert!(json["results"][0].get("results").is_none());
        assert_eq!(
            json["date_range"]["start"],
            serde_json::json!("2018-03-10T10:00:00Z")
        );
    }
}
