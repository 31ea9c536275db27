//! Attempt-related data models.
//!
//! An `Attempt` is one timed solve. Its raw duration always holds the measured base
//! time; the +2 penalty is applied when the effective duration is read.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::stats::StatsError;

/// Penalty added to the raw duration of a `PlusTwo` attempt.
pub const PLUS_TWO_PENALTY_MS: u64 = 2_000;

/// Upper bound for a raw duration. Anything longer is rejected as malformed.
pub const MAX_DURATION_MS: u64 = 24 * 60 * 60 * 1_000;

pub const DEFAULT_TAG: &str = "normal";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Ok,
    PlusTwo,
    Dnf,
}

impl Default for Outcome {
    fn default() -> Self {
        Outcome::Ok
    }
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Ok => "OK",
            Outcome::PlusTwo => "PLUS_TWO",
            Outcome::Dnf => "DNF",
        }
    }
}

impl FromStr for Outcome {
    type Err = StatsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "OK" => Ok(Outcome::Ok),
            // Older records spell the penalty without the underscore.
            "PLUS_TWO" | "PLUS2" => Ok(Outcome::PlusTwo),
            "DNF" => Ok(Outcome::Dnf),
            other => Err(StatsError::UnknownOutcome(other.to_string())),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PuzzleType {
    #[serde(rename = "CUBE_2X2")]
    Cube2x2,
    #[serde(rename = "CUBE_3X3")]
    Cube3x3,
    #[serde(rename = "CUBE_4X4")]
    Cube4x4,
    #[serde(rename = "CUBE_5X5")]
    Cube5x5,
    #[serde(rename = "CUBE_6X6")]
    Cube6x6,
    #[serde(rename = "CUBE_7X7")]
    Cube7x7,
    Pyraminx,
    Megaminx,
    Skewb,
    #[serde(rename = "SQUARE_1")]
    Square1,
}

impl PuzzleType {
    pub const ALL: [PuzzleType; 10] = [
        PuzzleType::Cube2x2,
        PuzzleType::Cube3x3,
        PuzzleType::Cube4x4,
        PuzzleType::Cube5x5,
        PuzzleType::Cube6x6,
        PuzzleType::Cube7x7,
        PuzzleType::Pyraminx,
        PuzzleType::Megaminx,
        PuzzleType::Skewb,
        PuzzleType::Square1,
    ];

    /// Stable name used in storage keys and database rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            PuzzleType::Cube2x2 => "CUBE_2X2",
            PuzzleType::Cube3x3 => "CUBE_3X3",
            PuzzleType::Cube4x4 => "CUBE_4X4",
            PuzzleType::Cube5x5 => "CUBE_5X5",
            PuzzleType::Cube6x6 => "CUBE_6X6",
            PuzzleType::Cube7x7 => "CUBE_7X7",
            PuzzleType::Pyraminx => "PYRAMINX",
            PuzzleType::Megaminx => "MEGAMINX",
            PuzzleType::Skewb => "SKEWB",
            PuzzleType::Square1 => "SQUARE_1",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PuzzleType::Cube2x2 => "2x2 Cube",
            PuzzleType::Cube3x3 => "3x3 Cube",
            PuzzleType::Cube4x4 => "4x4 Cube",
            PuzzleType::Cube5x5 => "5x5 Cube",
            PuzzleType::Cube6x6 => "6x6 Cube",
            PuzzleType::Cube7x7 => "7x7 Cube",
            PuzzleType::Pyraminx => "Pyraminx",
            PuzzleType::Megaminx => "Megaminx",
            PuzzleType::Skewb => "Skewb",
            PuzzleType::Square1 => "Square-1",
        }
    }

    pub fn from_display_name(name: &str) -> Result<Self, StatsError> {
        PuzzleType::ALL
            .into_iter()
            .find(|puzzle| puzzle.display_name() == name)
            .ok_or_else(|| StatsError::UnknownPuzzle(name.to_string()))
    }
}

impl Default for PuzzleType {
    fn default() -> Self {
        PuzzleType::Cube3x3
    }
}

impl FromStr for PuzzleType {
    type Err = StatsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        PuzzleType::ALL
            .into_iter()
            .find(|puzzle| puzzle.as_str() == value)
            .ok_or_else(|| StatsError::UnknownPuzzle(value.to_string()))
    }
}

impl fmt::Display for PuzzleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The (puzzle, tag) pair every statistic is scoped to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct CategoryKey {
    pub puzzle: PuzzleType,
    pub tag: String,
}

impl CategoryKey {
    pub fn new(puzzle: PuzzleType, tag: impl Into<String>) -> Self {
        Self {
            puzzle,
            tag: tag.into(),
        }
    }

    /// `<PUZZLE>_<tag>`, e.g. `CUBE_3X3_normal`.
    pub fn storage_key(&self) -> String {
        format!("{}_{}", self.puzzle.as_str(), self.tag)
    }
}

impl Default for CategoryKey {
    fn default() -> Self {
        Self::new(PuzzleType::default(), DEFAULT_TAG)
    }
}

impl fmt::Display for CategoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.puzzle.as_str(), self.tag)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    /// Empty until the store assigns one.
    #[serde(default)]
    pub id: String,
    pub category: CategoryKey,
    pub timestamp: DateTime<Utc>,
    pub raw_duration_ms: u64,
    #[serde(default)]
    pub outcome: Outcome,
    #[serde(default)]
    pub scramble: String,
    #[serde(default)]
    pub comment: String,
}

impl Attempt {
    pub fn new(category: CategoryKey, raw_duration_ms: u64, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: String::new(),
            category,
            timestamp,
            raw_duration_ms,
            outcome: Outcome::Ok,
            scramble: String::new(),
            comment: String::new(),
        }
    }

    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn with_scramble(mut self, scramble: impl Into<String>) -> Self {
        self.scramble = scramble.into();
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn is_persisted(&self) -> bool {
        !self.id.is_empty()
    }

    pub fn is_dnf(&self) -> bool {
        self.outcome == Outcome::Dnf
    }

    /// Raw duration plus any penalty, or `None` for a DNF.
    pub fn effective_duration_ms(&self) -> Option<u64> {
        match self.outcome {
            Outcome::Ok => Some(self.raw_duration_ms),
            Outcome::PlusTwo => Some(self.raw_duration_ms + PLUS_TWO_PENALTY_MS),
            Outcome::Dnf => None,
        }
    }

    /// Rejects attempts the aggregates cannot absorb soundly.
    pub fn validate(&self) -> Result<(), StatsError> {
        if self.raw_duration_ms > MAX_DURATION_MS {
            return Err(StatsError::DurationOutOfRange(self.raw_duration_ms));
        }
        if self.category.tag.trim().is_empty() {
            return Err(StatsError::EmptyTag);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn attempt(raw: u64, outcome: Outcome) -> Attempt {
        Attempt::new(
            CategoryKey::default(),
            raw,
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        )
        .with_outcome(outcome)
    }

    #[test]
    fn plus_two_is_applied_on_read_only() {
        let penalized = attempt(8_000, Outcome::PlusTwo);
        assert_eq!(penalized.raw_duration_ms, 8_000);
        assert_eq!(penalized.effective_duration_ms(), Some(10_000));

        let restored = penalized.with_outcome(Outcome::Ok);
        assert_eq!(restored.effective_duration_ms(), Some(8_000));
    }

    #[test]
    fn dnf_has_no_effective_duration() {
        assert_eq!(attempt(9_000, Outcome::Dnf).effective_duration_ms(), None);
    }

    #[test]
    fn validate_rejects_malformed_attempts() {
        assert_eq!(
            attempt(MAX_DURATION_MS + 1, Outcome::Ok).validate(),
            Err(StatsError::DurationOutOfRange(MAX_DURATION_MS + 1))
        );

        let mut untagged = attempt(1_000, Outcome::Ok);
        untagged.category.tag = "  ".into();
        assert_eq!(untagged.validate(), Err(StatsError::EmptyTag));

        assert!(attempt(0, Outcome::Ok).validate().is_ok());
    }

    #[test]
    fn outcome_parsing_fails_fast() {
        assert_eq!("PLUS2".parse::<Outcome>(), Ok(Outcome::PlusTwo));
        assert_eq!("DNF".parse::<Outcome>(), Ok(Outcome::Dnf));
        assert_eq!(
            "SKIPPED".parse::<Outcome>(),
            Err(StatsError::UnknownOutcome("SKIPPED".into()))
        );
    }

    #[test]
    fn puzzle_names_round_trip() {
        for puzzle in PuzzleType::ALL {
            assert_eq!(puzzle.as_str().parse::<PuzzleType>(), Ok(puzzle));
            assert_eq!(PuzzleType::from_display_name(puzzle.display_name()), Ok(puzzle));
        }
        assert!("CUBE_9X9".parse::<PuzzleType>().is_err());
    }

    #[test]
    fn serde_uses_storage_names() {
        let json = serde_json::to_string(&attempt(1_000, Outcome::PlusTwo)).unwrap();
        assert!(json.contains("\"puzzle\":\"CUBE_3X3\""));
        assert!(json.contains("\"outcome\":\"PLUS_TWO\""));
        assert!(json.contains("\"rawDurationMs\":1000"));
    }

    #[test]
    fn storage_key_joins_puzzle_and_tag() {
        let key = CategoryKey::new(PuzzleType::Square1, "oh");
        assert_eq!(key.storage_key(), "SQUARE_1_oh");
    }
}
