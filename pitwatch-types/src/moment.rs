//! Comparison-ordered moments in the feed's textual calendar format.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, NaiveDateTime};
use thiserror::Error;

/// Textual timestamp format used by both the source table and the wire
/// format, e.g. `07/04/2024 08:30`.
pub const WIRE_TIME_FORMAT: &str = "%m/%d/%Y %H:%M";

/// A minute-precision moment as carried by the feed and the wire format.
///
/// `Moment` is a thin ordering wrapper around [`chrono::NaiveDateTime`];
/// formatting and parsing always use [`WIRE_TIME_FORMAT`], so a formatted
/// moment parses back to the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Moment(NaiveDateTime);

/// Error parsing a textual moment.
#[derive(Debug, Error)]
#[error("invalid timestamp '{input}': {source}")]
pub struct MomentError {
    /// The text that failed to parse.
    pub input: String,
    #[source]
    source: chrono::ParseError,
}

impl Moment {
    /// Parse a moment from the `MM/DD/YYYY HH:MM` wire format.
    pub fn parse(s: &str) -> Result<Self, MomentError> {
        NaiveDateTime::parse_from_str(s, WIRE_TIME_FORMAT)
            .map(Moment)
            .map_err(|source| MomentError { input: s.to_string(), source })
    }

    /// The moment `minutes` after this one. Handy for building test series
    /// at the feed's fixed cadence.
    pub fn plus_minutes(self, minutes: i64) -> Self {
        Moment(self.0 + Duration::minutes(minutes))
    }
}

impl fmt::Display for Moment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(WIRE_TIME_FORMAT))
    }
}

impl FromStr for Moment {
    type Err = MomentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Moment::parse(s)
    }
}
