//! Split operations: one level of a report tree each.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::range::CalendarUnit;

/// A partitioning step applied to every leaf of a report tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SplitOperation {
    Year,
    Month,
    Week,
    Day,
    Project,
}

/// Error for a split name that is not one of the known operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown split operation: {0}")]
pub struct UnknownSplitOperation(String);

impl SplitOperation {
    const ALL: [Self; 5] = [Self::Year, Self::Month, Self::Week, Self::Day, Self::Project];

    /// The calendar unit for date splits, `None` for the project split.
    pub const fn calendar_unit(self) -> Option<CalendarUnit> {
        match self {
            Self::Year => Some(CalendarUnit::Year),
            Self::Month => Some(CalendarUnit::Month),
            Self::Week => Some(CalendarUnit::Week),
            Self::Day => Some(CalendarUnit::Day),
            Self::Project => None,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Month => "month",
            Self::Week => "week",
            Self::Day => "day",
            Self::Project => "project",
        }
    }

    /// Parses a comma-separated list such as `project,year,month`.
    ///
    /// Blank entries are skipped, so an empty string yields no splits.
    pub fn parse_list(s: &str) -> Result<Vec<Self>, UnknownSplitOperation> {
        s.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::parse)
            .collect()
    }
}

impl fmt::Display for SplitOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SplitOperation {
    type Err = UnknownSplitOperation;

    /// Accepts the singular name or its plural (`months`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let singular = s.strip_suffix('s').unwrap_or(s);
        Self::ALL
            .into_iter()
            .find(|op| op.name() == singular)
            .ok_or_else(|| UnknownSplitOperation(s.to_string()))
    }
}
