//! Core domain logic for the time tracker.
//!
//! This crate contains the fundamental types and logic for:
//! - Date ranges: calendar truncation, iteration and shifting in a timezone
//! - Duration sums: exact and per-entry rounded totals
//! - Frame lists: filtering and grouping recorded intervals
//! - Bucket reports: splitting frames into a tree of aggregated buckets
//! - Project summaries: per-project totals over the standard periods

mod bucket;
mod duration_sum;
mod frame;
pub mod project;
pub mod range;
mod report;
pub mod rounding;
mod split;
mod summary;
pub mod types;

pub use bucket::{Partition, ResultBucket, SplitBy};
pub use duration_sum::{DurationSum, IncompatibleSums};
pub use frame::{Frame, FrameList};
pub use project::{Project, ProjectLookup, ProjectTree};
pub use range::{CalendarUnit, DateRange};
pub use report::{BucketReport, BucketView, ReportConfig, ReportContext, ReportError};
pub use rounding::{RoundingConfig, RoundingMode, UnknownRoundingMode, round_duration};
pub use split::{SplitOperation, UnknownSplitOperation};
pub use summary::{Period, PeriodTotals, ProjectSummary, SummaryOptions, project_summaries};
pub use types::{FrameId, ProjectId, TagId, ValidationError};
