//! Per-project statistics over the standard periods.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::bucket::SplitBy;
use crate::duration_sum::DurationSum;
use crate::frame::FrameList;
use crate::range::DateRange;
use crate::report::{BucketReport, ReportConfig, ReportContext, ReportError};
use crate::rounding::RoundingConfig;
use crate::split::SplitOperation;
use crate::types::ProjectId;

/// A reporting period relative to a reference instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    Today,
    Yesterday,
    Week,
    Month,
    Year,
    All,
}

impl Period {
    pub const ALL: [Self; 6] = [
        Self::Today,
        Self::Yesterday,
        Self::Week,
        Self::Month,
        Self::Year,
        Self::All,
    ];

    /// The calendar range of this period around `reference`, or `None` for
    /// all time.
    pub fn date_range(self, reference: DateTime<Utc>, tz: Tz) -> Option<DateRange> {
        match self {
            Self::Today => Some(DateRange::day(reference, tz)),
            Self::Yesterday => Some(DateRange::day(reference, tz).shift(0, 0, -1, tz)),
            Self::Week => Some(DateRange::week(reference, tz)),
            Self::Month => Some(DateRange::month(reference, tz)),
            Self::Year => Some(DateRange::year(reference, tz)),
            Self::All => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Today => "today",
            Self::Yesterday => "yesterday",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
            Self::All => "all",
        }
    }
}

/// One duration sum per period.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeriodTotals {
    pub today: DurationSum,
    pub yesterday: DurationSum,
    pub week: DurationSum,
    pub month: DurationSum,
    pub year: DurationSum,
    pub all: DurationSum,
}

impl PeriodTotals {
    pub const fn get(&self, period: Period) -> &DurationSum {
        match period {
            Period::Today => &self.today,
            Period::Yesterday => &self.yesterday,
            Period::Week => &self.week,
            Period::Month => &self.month,
            Period::Year => &self.year,
            Period::All => &self.all,
        }
    }

    const fn get_mut(&mut self, period: Period) -> &mut DurationSum {
        match period {
            Period::Today => &mut self.today,
            Period::Yesterday => &mut self.yesterday,
            Period::Week => &mut self.week,
            Period::Month => &mut self.month,
            Period::Year => &mut self.year,
            Period::All => &mut self.all,
        }
    }
}

/// Tracked time of one project.
///
/// `tracked` counts frames of the project itself, `total` also counts its
/// subprojects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSummary {
    pub project_id: ProjectId,
    pub tracked: PeriodTotals,
    pub total: PeriodTotals,
}

impl ProjectSummary {
    pub fn new(project_id: ProjectId) -> Self {
        Self {
            project_id,
            tracked: PeriodTotals::default(),
            total: PeriodTotals::default(),
        }
    }
}

/// Flags applied identically to every pass of [`project_summaries`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryOptions {
    pub include_archived: bool,
    pub include_active: bool,
    /// End of running frames; defaults to the summary's reference instant.
    pub reference_end: Option<DateTime<Utc>>,
    pub entry_rounding: RoundingConfig,
}

impl SummaryOptions {
    fn report_config(
        &self,
        reference: DateTime<Utc>,
        date_filter: Option<DateRange>,
        project_ids: Vec<ProjectId>,
        include_subprojects: bool,
        split_operations: Vec<SplitOperation>,
    ) -> ReportConfig {
        ReportConfig {
            project_ids,
            include_subprojects,
            date_filter,
            split_operations,
            entry_rounding: self.entry_rounding,
            show_empty: false,
            include_active: self.include_active,
            reference_time: self.reference_end.or(Some(reference)),
            include_archived: self.include_archived,
        }
    }
}

/// Computes tracked and total time of every known project for each
/// [`Period`] around `reference`.
pub fn project_summaries(
    frames: &FrameList,
    reference: DateTime<Utc>,
    options: SummaryOptions,
    context: ReportContext<'_>,
) -> Result<BTreeMap<ProjectId, ProjectSummary>, ReportError> {
    let mut summaries: BTreeMap<ProjectId, ProjectSummary> = context
        .projects
        .project_ids()
        .into_iter()
        .map(|id| (id.clone(), ProjectSummary::new(id)))
        .collect();

    for period in Period::ALL {
        let date_filter = period.date_range(reference, context.timezone);

        let own = BucketReport::build(
            frames,
            options.report_config(
                reference,
                date_filter,
                Vec::new(),
                false,
                vec![SplitOperation::Project],
            ),
            context,
        )?;
        let zero = own.result().duration().empty_copy();
        for summary in summaries.values_mut() {
            *summary.tracked.get_mut(period) = zero.clone();
        }
        for bucket in own.result().children() {
            if let Some(SplitBy::Project(id)) = bucket.split_by() {
                if let Some(summary) = summaries.get_mut(id) {
                    *summary.tracked.get_mut(period) = bucket.duration().clone();
                }
            }
        }

        for (id, summary) in &mut summaries {
            let total = BucketReport::build(
                frames,
                options.report_config(reference, date_filter, vec![id.clone()], true, Vec::new()),
                context,
            )?;
            *summary.total.get_mut(period) = total.result().duration().clone();
        }

        tracing::trace!(period = period.label(), "summarized period");
    }

    tracing::debug!(projects = summaries.len(), "built project summaries");
    Ok(summaries)
}
