//! Rounding policy for duration contributions.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const NANOS_PER_SEC: i128 = 1_000_000_000;

/// How a single duration contribution is rounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RoundingMode {
    /// Keep the exact value.
    #[default]
    None,
    /// Round to the nearest multiple; halfway values round up.
    Nearest,
    /// Round up to the next multiple unless already on one.
    Up,
}

impl fmt::Display for RoundingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Nearest => "nearest",
            Self::Up => "up",
        };
        write!(f, "{s}")
    }
}

impl FromStr for RoundingMode {
    type Err = UnknownRoundingMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" | "" => Ok(Self::None),
            "nearest" => Ok(Self::Nearest),
            "up" => Ok(Self::Up),
            _ => Err(UnknownRoundingMode(s.to_string())),
        }
    }
}

impl Serialize for RoundingMode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RoundingMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Error type for unknown rounding mode strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown rounding mode: {0} (expected none, nearest or up)")]
pub struct UnknownRoundingMode(String);

/// Rounding mode plus the multiple to round to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RoundingConfig {
    pub mode: RoundingMode,
    pub size: Duration,
}

impl RoundingConfig {
    pub const fn new(mode: RoundingMode, size: Duration) -> Self {
        Self { mode, size }
    }

    /// A policy that leaves every value unchanged.
    pub const fn none() -> Self {
        Self {
            mode: RoundingMode::None,
            size: Duration::zero(),
        }
    }

    /// Rounds `value` according to this policy.
    pub fn round(&self, value: Duration) -> Duration {
        round_duration(value, self)
    }
}

/// Rounds `value` to a multiple of `config.size`.
///
/// A zero or negative size leaves the value unchanged, whatever the mode.
pub fn round_duration(value: Duration, config: &RoundingConfig) -> Duration {
    let size = to_nanos(config.size);
    if size <= 0 {
        return value;
    }

    let exact = to_nanos(value);
    let rounded = match config.mode {
        RoundingMode::None => return value,
        RoundingMode::Nearest => round_nearest(exact, size),
        RoundingMode::Up => {
            let nearest = round_nearest(exact, size);
            if nearest < exact {
                nearest + size
            } else {
                nearest
            }
        }
    };
    from_nanos(rounded)
}

fn round_nearest(value: i128, size: i128) -> i128 {
    let remainder = value.rem_euclid(size);
    let floor = value - remainder;
    if remainder >= size - remainder {
        floor + size
    } else {
        floor
    }
}

fn to_nanos(duration: Duration) -> i128 {
    i128::from(duration.num_seconds()) * NANOS_PER_SEC + i128::from(duration.subsec_nanos())
}

fn from_nanos(nanos: i128) -> Duration {
    let saturated = if nanos < 0 {
        Duration::MIN
    } else {
        Duration::MAX
    };
    let subsec = i64::try_from(nanos.rem_euclid(NANOS_PER_SEC)).unwrap_or_default();
    i64::try_from(nanos.div_euclid(NANOS_PER_SEC))
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|secs| secs.checked_add(&Duration::nanoseconds(subsec)))
        .unwrap_or(saturated)
}
