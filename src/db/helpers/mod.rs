use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};

use crate::models::{Outcome, PuzzleType};

pub fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

/// Fixed-width RFC 3339 so stored timestamps sort lexicographically.
pub fn format_datetime(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_outcome(value: &str) -> Result<Outcome> {
    value
        .parse()
        .with_context(|| format!("unknown attempt outcome {value}"))
}

pub fn parse_puzzle(value: &str) -> Result<PuzzleType> {
    value
        .parse()
        .with_context(|| format!("unknown puzzle type {value}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formatted_timestamps_sort_chronologically() {
        let early = Utc.with_ymd_and_hms(2024, 1, 9, 23, 59, 59).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        assert!(format_datetime(&early) < format_datetime(&late));
        assert_eq!(format_datetime(&late), "2024-01-10T00:00:00.000Z");
        assert_eq!(parse_datetime(&format_datetime(&late), "ts").unwrap(), late);
    }

    #[test]
    fn rejects_negative_and_unknown_values() {
        assert!(to_u64(-1, "raw_duration_ms").is_err());
        assert!(parse_outcome("MAYBE").is_err());
        assert!(parse_puzzle("CUBE_9X9").is_err());
        assert_eq!(parse_outcome("PLUS_TWO").unwrap(), Outcome::PlusTwo);
    }
}
